//! Core ledger types.
//!
//! All amounts are `u64` in the smallest unit of the custodied token.
//! Accounts are opaque 32-byte identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque 32-byte account identifier.
///
/// Identifies token holders, ledger owners, and custody accounts. The zero
/// account is reserved and never a valid owner.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// The zero account (32 zero bytes). Reserved; rejected as an ownership target.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create an AccountId from a byte array.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero account.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for AccountId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
