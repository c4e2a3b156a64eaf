//! Transferable-balance interface and in-memory implementation.
//!
//! Both ledger engines custody funds through the [`TokenLedger`] trait: an
//! opaque collaborator with standard debit/credit semantics and an
//! allowance step before pulling funds from a payer. The [`MemoryToken`]
//! implementation backs tests and embedders that keep balances in process;
//! a production deployment would adapt the trait to its settlement layer.
//!
//! All methods take `&self` so engines can share the collaborator behind an
//! `Arc`; [`MemoryToken`] serializes access internally.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::TokenError;
use crate::types::AccountId;

/// A fungible token balance ledger.
///
/// Transfers are atomic: on error no balance or allowance changes.
pub trait TokenLedger: Send + Sync {
    /// Move `amount` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// [`TokenError::InsufficientBalance`] if `from` holds less than `amount`.
    fn transfer(&self, from: &AccountId, to: &AccountId, amount: u64) -> Result<(), TokenError>;

    /// Move `amount` from `from` to `to` on behalf of `spender`.
    ///
    /// Consumes `spender`'s allowance from `from`.
    ///
    /// # Errors
    ///
    /// - [`TokenError::InsufficientAllowance`] if the approved amount is too small
    /// - [`TokenError::InsufficientBalance`] if `from` holds less than `amount`
    fn transfer_from(
        &self,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), TokenError>;

    /// Current balance of `account`.
    fn balance_of(&self, account: &AccountId) -> u64;
}

impl<T: TokenLedger + ?Sized> TokenLedger for Arc<T> {
    fn transfer(&self, from: &AccountId, to: &AccountId, amount: u64) -> Result<(), TokenError> {
        (**self).transfer(from, to, amount)
    }

    fn transfer_from(
        &self,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), TokenError> {
        (**self).transfer_from(spender, from, to, amount)
    }

    fn balance_of(&self, account: &AccountId) -> u64 {
        (**self).balance_of(account)
    }
}

#[derive(Default)]
struct TokenState {
    balances: HashMap<AccountId, u64>,
    /// (holder, spender) → approved amount.
    allowances: HashMap<(AccountId, AccountId), u64>,
    total_supply: u64,
}

impl TokenState {
    fn debit(&mut self, from: &AccountId, amount: u64) -> Result<(), TokenError> {
        let have = self.balances.get(from).copied().unwrap_or(0);
        if have < amount {
            return Err(TokenError::InsufficientBalance { have, need: amount });
        }
        self.balances.insert(*from, have - amount);
        Ok(())
    }

    fn credit(&mut self, to: &AccountId, amount: u64) -> Result<(), TokenError> {
        let entry = self.balances.entry(*to).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(TokenError::ValueOverflow)?;
        Ok(())
    }
}

/// In-memory token ledger.
///
/// Holds balances and allowances in `HashMap`s behind an `RwLock`. No
/// persistence; suitable for tests and embedders that snapshot state
/// themselves.
#[derive(Default)]
pub struct MemoryToken {
    state: RwLock<TokenState>,
}

impl MemoryToken {
    /// Create an empty token ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create new units out of thin air and credit them to `account`.
    pub fn mint(&self, account: &AccountId, amount: u64) -> Result<(), TokenError> {
        let mut state = self.state.write();
        state.total_supply = state
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::ValueOverflow)?;
        state.credit(account, amount)
    }

    /// Approve `spender` to pull up to `amount` from `holder`.
    ///
    /// Overwrites any previous approval.
    pub fn approve(&self, holder: &AccountId, spender: &AccountId, amount: u64) {
        self.state
            .write()
            .allowances
            .insert((*holder, *spender), amount);
    }

    /// Remaining approval from `holder` to `spender`.
    pub fn allowance(&self, holder: &AccountId, spender: &AccountId) -> u64 {
        self.state
            .read()
            .allowances
            .get(&(*holder, *spender))
            .copied()
            .unwrap_or(0)
    }

    /// Total minted supply.
    pub fn total_supply(&self) -> u64 {
        self.state.read().total_supply
    }
}

impl TokenLedger for MemoryToken {
    fn transfer(&self, from: &AccountId, to: &AccountId, amount: u64) -> Result<(), TokenError> {
        let mut state = self.state.write();
        state.debit(from, amount)?;
        state.credit(to, amount)
    }

    fn transfer_from(
        &self,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), TokenError> {
        let mut state = self.state.write();
        let approved = state
            .allowances
            .get(&(*from, *spender))
            .copied()
            .unwrap_or(0);
        if approved < amount {
            return Err(TokenError::InsufficientAllowance {
                have: approved,
                need: amount,
            });
        }
        state.debit(from, amount)?;
        state.credit(to, amount)?;
        state.allowances.insert((*from, *spender), approved - amount);
        Ok(())
    }

    fn balance_of(&self, account: &AccountId) -> u64 {
        self.state
            .read()
            .balances
            .get(account)
            .copied()
            .unwrap_or(0)
    }
}
