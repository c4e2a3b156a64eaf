//! Owner-gated mutation guard.
//!
//! Both ledgers are administered by a single privileged account. The check
//! is an explicit guard evaluated at the top of every owner-only operation,
//! a capability check against a stored identity rather than role logic.

use crate::error::OwnershipError;
use crate::types::AccountId;

/// The privileged account of a ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ownership {
    owner: AccountId,
}

impl Ownership {
    /// Create with the initial privileged account.
    pub fn new(owner: AccountId) -> Self {
        Self { owner }
    }

    /// The current owner.
    pub fn owner(&self) -> AccountId {
        self.owner
    }

    /// Reject any caller other than the current owner.
    pub fn require(&self, caller: &AccountId) -> Result<(), OwnershipError> {
        if *caller != self.owner {
            return Err(OwnershipError::NotOwner);
        }
        Ok(())
    }

    /// Transfer ownership to `new_owner`.
    ///
    /// Only the current owner may transfer, and the zero account is rejected.
    /// Returns the previous owner.
    pub fn transfer(
        &mut self,
        caller: &AccountId,
        new_owner: AccountId,
    ) -> Result<AccountId, OwnershipError> {
        self.require(caller)?;
        if new_owner.is_zero() {
            return Err(OwnershipError::ZeroOwnerAccount);
        }
        let previous = self.owner;
        self.owner = new_owner;
        Ok(previous)
    }
}
