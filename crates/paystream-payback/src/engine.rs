//! The fixed-APY payback ledger engine.
//!
//! Owner-administered custody pool paying simple interest on per-user
//! balances. Every operation runs to completion against the clock value
//! read at entry; a failed guard leaves no state change behind.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use paystream_core::error::PaybackError;
use paystream_core::events::PaybackEvent;
use paystream_core::ownership::Ownership;
use paystream_core::token::TokenLedger;
use paystream_core::types::AccountId;

use crate::interest::{required_coverage, simple_interest};

/// A user's stake entry.
///
/// Existence of an entry is membership in the ledger's map; a deleted entry
/// leaves no residue. `balance` holds principal plus interest compounded at
/// past checkpoints. `deposit_time` never changes after creation;
/// `last_update_time` resets on every accrual checkpoint.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct UserEntry {
    /// Principal plus interest settled at past checkpoints.
    pub balance: u64,
    /// Timestamp of the entry's first deposit.
    pub deposit_time: u64,
    /// Timestamp of the last accrual checkpoint.
    pub last_update_time: u64,
}

/// The fixed-APY payback ledger.
///
/// Holds custody of a pre-funded token pool. The owner deposits stake on
/// behalf of users out of that pool; users withdraw their balance plus
/// accrued interest themselves. Entries untouched for longer than the
/// inactivity window become reclaimable by the owner only.
pub struct PaybackLedger {
    ownership: Ownership,
    custody: AccountId,
    token: Arc<dyn TokenLedger>,
    clock: Box<dyn Fn() -> u64 + Send + Sync>,
    apy_percent: u64,
    /// Custodied amount not yet paid out. Deposits allocate from this pool
    /// without moving tokens; withdrawals debit it.
    token_pool: u64,
    /// Sum of live user principals, informational.
    total_staked: u64,
    /// Fixed at construction.
    inactivity_window: u64,
    entries: BTreeMap<AccountId, UserEntry>,
    events: Vec<PaybackEvent>,
}

impl fmt::Debug for PaybackLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaybackLedger")
            .field("apy_percent", &self.apy_percent)
            .field("token_pool", &self.token_pool)
            .field("total_staked", &self.total_staked)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl PaybackLedger {
    /// Create a new ledger with the system clock.
    ///
    /// `custody` is the ledger's own token account; `owner` is the initial
    /// privileged account. Rejects a zero `apy_percent`.
    pub fn new(
        apy_percent: u64,
        token: Arc<dyn TokenLedger>,
        custody: AccountId,
        owner: AccountId,
        inactivity_window: u64,
    ) -> Result<Self, PaybackError> {
        Self::with_clock(apy_percent, token, custody, owner, inactivity_window, || {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs()
        })
    }

    /// Create a new ledger with a custom clock for testing.
    pub fn with_clock(
        apy_percent: u64,
        token: Arc<dyn TokenLedger>,
        custody: AccountId,
        owner: AccountId,
        inactivity_window: u64,
        clock: impl Fn() -> u64 + Send + Sync + 'static,
    ) -> Result<Self, PaybackError> {
        if apy_percent == 0 {
            return Err(PaybackError::ZeroApy);
        }
        Ok(Self {
            ownership: Ownership::new(owner),
            custody,
            token,
            clock: Box::new(clock),
            apy_percent,
            token_pool: 0,
            total_staked: 0,
            inactivity_window,
            entries: BTreeMap::new(),
            events: Vec::new(),
        })
    }

    /// Pull `amount` from the owner's approved balance into custody.
    ///
    /// Owner only. Increases coverage only, so no solvency check applies.
    pub fn refill_pool(&mut self, caller: &AccountId, amount: u64) -> Result<(), PaybackError> {
        self.ownership.require(caller)?;
        if amount == 0 {
            return Err(PaybackError::ZeroAmount);
        }
        let pool_after = self
            .token_pool
            .checked_add(amount)
            .ok_or(PaybackError::ArithmeticOverflow)?;

        self.token
            .transfer_from(&self.custody, caller, &self.custody, amount)?;
        self.token_pool = pool_after;
        self.events.push(PaybackEvent::PoolRefilled { amount });
        info!(amount, pool = self.token_pool, "pool refilled");
        Ok(())
    }

    /// Deposit `amount` on behalf of `user`, allocated from the pool.
    ///
    /// Owner only. An expired entry for `user` is swept to the owner first;
    /// a live entry accrues interest before the principal is added; an
    /// absent entry is created. The deposit is admitted only while the pool
    /// covers the one-year worst-case obligation of all staked principal.
    ///
    /// # Errors
    ///
    /// - [`PaybackError::ZeroAmount`] for a zero deposit
    /// - [`PaybackError::InsufficientCoverage`] when the solvency check fails
    pub fn deposit_for(
        &mut self,
        caller: &AccountId,
        user: AccountId,
        amount: u64,
    ) -> Result<(), PaybackError> {
        self.ownership.require(caller)?;
        if amount == 0 {
            return Err(PaybackError::ZeroAmount);
        }
        let now = (self.clock)();

        // Plan the mutation without committing anything, so a failed
        // solvency check rejects the whole call, implicit sweep included.
        let existing = self.entries.get(&user).copied();
        let (reclaimed, new_balance, deposit_time) = match existing {
            Some(entry) if self.is_expired(&entry, now) => (Some(entry.balance), amount, now),
            Some(entry) => {
                let elapsed = now.saturating_sub(entry.last_update_time);
                let accrued = simple_interest(entry.balance, self.apy_percent, elapsed)?;
                let balance = entry
                    .balance
                    .checked_add(accrued)
                    .and_then(|b| b.checked_add(amount))
                    .ok_or(PaybackError::ArithmeticOverflow)?;
                (None, balance, entry.deposit_time)
            }
            None => (None, amount, now),
        };

        let staked_base = match reclaimed {
            Some(balance) => self.total_staked.saturating_sub(balance),
            None => self.total_staked,
        };
        let staked_after = staked_base
            .checked_add(amount)
            .ok_or(PaybackError::ArithmeticOverflow)?;
        let required = required_coverage(staked_after, self.apy_percent)?;
        if self.token_pool < required {
            return Err(PaybackError::InsufficientCoverage {
                required,
                available: self.token_pool,
            });
        }

        // Commit. The stale entry's funds go to the owner; the pool
        // accounting is untouched by the sweep.
        if let Some(balance) = reclaimed {
            self.token
                .transfer(&self.custody, &self.ownership.owner(), balance)?;
            self.events.push(PaybackEvent::Reclaimed {
                account: user,
                amount: balance,
            });
            debug!(account = %user, amount = balance, "swept expired entry on deposit");
        }
        self.total_staked = staked_after;
        self.entries.insert(
            user,
            UserEntry {
                balance: new_balance,
                deposit_time,
                last_update_time: now,
            },
        );
        self.events.push(PaybackEvent::Deposited {
            account: user,
            amount,
        });
        info!(account = %user, amount, total_staked = self.total_staked, "stake deposited");
        Ok(())
    }

    /// Withdraw the caller's balance plus accrued interest.
    ///
    /// Pays out of the pool and deletes the entry. Returns the payout.
    ///
    /// # Errors
    ///
    /// - [`PaybackError::UserNotFound`] if the caller has no entry
    /// - [`PaybackError::WithdrawalPeriodExpired`] once the inactivity
    ///   window has elapsed; expired funds are owner-reclaimable only
    pub fn withdraw(&mut self, caller: &AccountId) -> Result<u64, PaybackError> {
        let now = (self.clock)();
        let entry = self
            .entries
            .get(caller)
            .copied()
            .ok_or(PaybackError::UserNotFound)?;
        if self.is_expired(&entry, now) {
            return Err(PaybackError::WithdrawalPeriodExpired);
        }

        let elapsed = now.saturating_sub(entry.last_update_time);
        let accrued = simple_interest(entry.balance, self.apy_percent, elapsed)?;
        let payout = entry
            .balance
            .checked_add(accrued)
            .ok_or(PaybackError::ArithmeticOverflow)?;
        let pool_after = self
            .token_pool
            .checked_sub(payout)
            .ok_or(PaybackError::ArithmeticOverflow)?;

        self.token.transfer(&self.custody, caller, payout)?;
        self.token_pool = pool_after;
        self.total_staked = self.total_staked.saturating_sub(entry.balance);
        self.entries.remove(caller);
        self.events.push(PaybackEvent::Withdrawn {
            account: *caller,
            amount: payout,
        });
        info!(account = %caller, payout, pool = self.token_pool, "stake withdrawn");
        Ok(payout)
    }

    /// Reclaim a single expired entry to the owner. Owner only.
    ///
    /// Pays exactly the checkpointed balance; no interest accrues past the
    /// checkpoint that made the entry expire. The pool accounting is
    /// unchanged. Returns the reclaimed amount.
    pub fn reclaim_expired(
        &mut self,
        caller: &AccountId,
        user: &AccountId,
    ) -> Result<u64, PaybackError> {
        self.ownership.require(caller)?;
        let now = (self.clock)();
        let entry = self
            .entries
            .get(user)
            .copied()
            .ok_or(PaybackError::UserNotFound)?;
        if !self.is_expired(&entry, now) {
            return Err(PaybackError::NotExpired);
        }

        self.token
            .transfer(&self.custody, &self.ownership.owner(), entry.balance)?;
        self.total_staked = self.total_staked.saturating_sub(entry.balance);
        self.entries.remove(user);
        self.events.push(PaybackEvent::Reclaimed {
            account: *user,
            amount: entry.balance,
        });
        info!(account = %user, amount = entry.balance, "expired entry reclaimed");
        Ok(entry.balance)
    }

    /// Reclaim every expired entry to the owner. Owner only.
    ///
    /// Entries still live are left untouched; zero expired entries is a
    /// no-op. Returns the number of entries reclaimed.
    pub fn sweep_expired(&mut self, caller: &AccountId) -> Result<usize, PaybackError> {
        self.ownership.require(caller)?;
        let now = (self.clock)();

        let expired: Vec<(AccountId, u64)> = self
            .entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(account, entry)| (*account, entry.balance))
            .collect();
        if expired.is_empty() {
            return Ok(0);
        }

        // Pre-check custody so the sweep commits all-or-nothing.
        let total: u64 = expired
            .iter()
            .try_fold(0u64, |acc, (_, balance)| acc.checked_add(*balance))
            .ok_or(PaybackError::ArithmeticOverflow)?;
        let have = self.token.balance_of(&self.custody);
        if have < total {
            return Err(paystream_core::error::TokenError::InsufficientBalance {
                have,
                need: total,
            }
            .into());
        }

        let owner = self.ownership.owner();
        for (account, balance) in &expired {
            self.token.transfer(&self.custody, &owner, *balance)?;
            self.total_staked = self.total_staked.saturating_sub(*balance);
            self.entries.remove(account);
            self.events.push(PaybackEvent::Reclaimed {
                account: *account,
                amount: *balance,
            });
        }
        info!(count = expired.len(), total, "swept expired entries");
        Ok(expired.len())
    }

    /// Change the APY. Owner only; rejects zero.
    ///
    /// Takes effect for future accrual intervals only; interest already
    /// checkpointed into balances is never repriced.
    pub fn set_apy(&mut self, caller: &AccountId, new_apy: u64) -> Result<(), PaybackError> {
        self.ownership.require(caller)?;
        if new_apy == 0 {
            return Err(PaybackError::ZeroApy);
        }
        self.apy_percent = new_apy;
        self.events.push(PaybackEvent::ApyChanged {
            apy_percent: new_apy,
        });
        info!(apy_percent = new_apy, "APY changed");
        Ok(())
    }

    /// Transfer the privileged account. Owner only; rejects the zero account.
    pub fn transfer_ownership(
        &mut self,
        caller: &AccountId,
        new_owner: AccountId,
    ) -> Result<(), PaybackError> {
        let previous = self.ownership.transfer(caller, new_owner)?;
        self.events.push(PaybackEvent::OwnershipTransferred {
            previous,
            new: new_owner,
        });
        info!(previous = %previous, new = %new_owner, "ownership transferred");
        Ok(())
    }

    /// What `withdraw` would pay `account` right now.
    ///
    /// For an expired entry this is the checkpointed balance (which only an
    /// owner sweep can release).
    pub fn pending_payout(&self, account: &AccountId) -> Result<u64, PaybackError> {
        let now = (self.clock)();
        let entry = self
            .entries
            .get(account)
            .copied()
            .ok_or(PaybackError::UserNotFound)?;
        if self.is_expired(&entry, now) {
            return Ok(entry.balance);
        }
        let elapsed = now.saturating_sub(entry.last_update_time);
        let accrued = simple_interest(entry.balance, self.apy_percent, elapsed)?;
        entry
            .balance
            .checked_add(accrued)
            .ok_or(PaybackError::ArithmeticOverflow)
    }

    /// The current privileged account.
    pub fn owner(&self) -> AccountId {
        self.ownership.owner()
    }

    /// Current APY in percent.
    pub fn apy_percent(&self) -> u64 {
        self.apy_percent
    }

    /// Custodied amount not yet paid out.
    pub fn token_pool(&self) -> u64 {
        self.token_pool
    }

    /// Sum of live user principals.
    pub fn total_staked(&self) -> u64 {
        self.total_staked
    }

    /// Inactivity window in seconds, fixed at construction.
    pub fn inactivity_window(&self) -> u64 {
        self.inactivity_window
    }

    /// Number of live entries.
    pub fn user_count(&self) -> usize {
        self.entries.len()
    }

    /// The stake entry for `account`, if one exists.
    pub fn user_info(&self, account: &AccountId) -> Option<UserEntry> {
        self.entries.get(account).copied()
    }

    /// Hand over all events recorded since the last drain, in order.
    pub fn drain_events(&mut self) -> Vec<PaybackEvent> {
        std::mem::take(&mut self.events)
    }

    fn is_expired(&self, entry: &UserEntry, now: u64) -> bool {
        now.saturating_sub(entry.last_update_time) > self.inactivity_window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paystream_core::constants::SECONDS_PER_YEAR;
    use paystream_core::error::{OwnershipError, TokenError};
    use paystream_core::token::MemoryToken;
    use std::sync::atomic::{AtomicU64, Ordering};

    const START: u64 = 1_700_000_000;
    const WINDOW: u64 = 2 * SECONDS_PER_YEAR;

    fn account(seed: u8) -> AccountId {
        AccountId([seed; 32])
    }

    fn owner() -> AccountId {
        account(0x01)
    }

    fn custody() -> AccountId {
        account(0xFE)
    }

    struct Fixture {
        ledger: PaybackLedger,
        token: Arc<MemoryToken>,
        clock: Arc<AtomicU64>,
    }

    impl Fixture {
        /// Ledger at 10% APY with a funded owner and unlimited approval.
        fn new() -> Self {
            Self::with_apy_and_window(10, WINDOW)
        }

        fn with_apy_and_window(apy: u64, window: u64) -> Self {
            let token = Arc::new(MemoryToken::new());
            let clock = Arc::new(AtomicU64::new(START));
            let clock_handle = clock.clone();
            let ledger = PaybackLedger::with_clock(
                apy,
                token.clone() as Arc<dyn TokenLedger>,
                custody(),
                owner(),
                window,
                move || clock_handle.load(Ordering::Relaxed),
            )
            .unwrap();
            token.mint(&owner(), 10_000_000).unwrap();
            token.approve(&owner(), &custody(), u64::MAX);
            Self {
                ledger,
                token,
                clock,
            }
        }

        fn advance(&self, seconds: u64) {
            self.clock.fetch_add(seconds, Ordering::Relaxed);
        }
    }

    // --- construction ---

    #[test]
    fn new_ledger_initial_state() {
        let f = Fixture::new();
        assert_eq!(f.ledger.owner(), owner());
        assert_eq!(f.ledger.apy_percent(), 10);
        assert_eq!(f.ledger.token_pool(), 0);
        assert_eq!(f.ledger.total_staked(), 0);
        assert_eq!(f.ledger.inactivity_window(), WINDOW);
        assert_eq!(f.ledger.user_count(), 0);
    }

    #[test]
    fn zero_apy_construction_rejected() {
        let token = Arc::new(MemoryToken::new());
        let err = PaybackLedger::new(
            0,
            token as Arc<dyn TokenLedger>,
            custody(),
            owner(),
            WINDOW,
        )
        .unwrap_err();
        assert_eq!(err, PaybackError::ZeroApy);
    }

    // --- refill_pool ---

    #[test]
    fn refill_pool_moves_tokens_into_custody() {
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 1_000).unwrap();
        assert_eq!(f.ledger.token_pool(), 1_000);
        assert_eq!(f.token.balance_of(&custody()), 1_000);
        assert_eq!(
            f.ledger.drain_events(),
            vec![PaybackEvent::PoolRefilled { amount: 1_000 }]
        );
    }

    #[test]
    fn refill_pool_rejects_non_owner() {
        let mut f = Fixture::new();
        assert_eq!(
            f.ledger.refill_pool(&account(9), 100).unwrap_err(),
            PaybackError::Ownership(OwnershipError::NotOwner)
        );
    }

    #[test]
    fn refill_pool_rejects_zero() {
        let mut f = Fixture::new();
        assert_eq!(
            f.ledger.refill_pool(&owner(), 0).unwrap_err(),
            PaybackError::ZeroAmount
        );
    }

    #[test]
    fn refill_pool_requires_approval() {
        let mut f = Fixture::new();
        f.token.approve(&owner(), &custody(), 50);
        let err = f.ledger.refill_pool(&owner(), 100).unwrap_err();
        assert_eq!(
            err,
            PaybackError::Token(TokenError::InsufficientAllowance { have: 50, need: 100 })
        );
        assert_eq!(f.ledger.token_pool(), 0);
    }

    // --- deposit_for ---

    #[test]
    fn deposit_creates_entry() {
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 1_000).unwrap();
        f.ledger.deposit_for(&owner(), account(2), 100).unwrap();

        let entry = f.ledger.user_info(&account(2)).unwrap();
        assert_eq!(entry.balance, 100);
        assert_eq!(entry.deposit_time, START);
        assert_eq!(entry.last_update_time, START);
        assert_eq!(f.ledger.total_staked(), 100);
        // Deposits allocate from the pool without moving tokens.
        assert_eq!(f.ledger.token_pool(), 1_000);
        assert_eq!(f.token.balance_of(&custody()), 1_000);
    }

    #[test]
    fn deposit_rejects_non_owner() {
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 1_000).unwrap();
        assert_eq!(
            f.ledger.deposit_for(&account(2), account(2), 10).unwrap_err(),
            PaybackError::Ownership(OwnershipError::NotOwner)
        );
    }

    #[test]
    fn deposit_rejects_zero_amount() {
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 1_000).unwrap();
        assert_eq!(
            f.ledger.deposit_for(&owner(), account(2), 0).unwrap_err(),
            PaybackError::ZeroAmount
        );
    }

    #[test]
    fn deposit_rejects_insufficient_coverage() {
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 100).unwrap();
        // 100-unit pool at 10% covers at most 91 staked (truncated
        // obligation 100); 92 needs 101.
        let err = f.ledger.deposit_for(&owner(), account(2), 92).unwrap_err();
        assert_eq!(
            err,
            PaybackError::InsufficientCoverage {
                required: 101,
                available: 100
            }
        );
        assert_eq!(f.ledger.total_staked(), 0);
        assert!(f.ledger.user_info(&account(2)).is_none());
    }

    #[test]
    fn spec_example_five_depositors() {
        // 100-unit pool at 10% APY admits four 20-unit deposits
        // (obligation 88) and rejects the fifth (110 > 100).
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 100).unwrap();
        for seed in 2..6 {
            f.ledger.deposit_for(&owner(), account(seed), 20).unwrap();
        }
        assert_eq!(f.ledger.total_staked(), 80);
        let err = f.ledger.deposit_for(&owner(), account(6), 20).unwrap_err();
        assert_eq!(
            err,
            PaybackError::InsufficientCoverage {
                required: 110,
                available: 100
            }
        );
    }

    #[test]
    fn second_deposit_accrues_then_adds() {
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 10_000).unwrap();
        f.ledger.deposit_for(&owner(), account(2), 1_000).unwrap();

        f.advance(SECONDS_PER_YEAR);
        f.ledger.deposit_for(&owner(), account(2), 500).unwrap();

        let entry = f.ledger.user_info(&account(2)).unwrap();
        // 1000 + 100 interest + 500 new principal.
        assert_eq!(entry.balance, 1_600);
        assert_eq!(entry.deposit_time, START);
        assert_eq!(entry.last_update_time, START + SECONDS_PER_YEAR);
        // total_staked tracks principal only.
        assert_eq!(f.ledger.total_staked(), 1_500);
    }

    #[test]
    fn apy_change_applies_to_future_intervals_only() {
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 10_000).unwrap();
        f.ledger.deposit_for(&owner(), account(2), 1_000).unwrap();

        // One year at 10%, checkpointed by a second deposit.
        f.advance(SECONDS_PER_YEAR);
        f.ledger.deposit_for(&owner(), account(2), 100).unwrap();
        // Then one year at 20% on the checkpointed balance.
        f.ledger.set_apy(&owner(), 20).unwrap();
        f.advance(SECONDS_PER_YEAR);

        // Checkpointed balance 1200 = 1000 + 100 interest + 100 deposit.
        // Final payout 1200 * 1.2 = 1440; the first year is not repriced.
        let payout = f.ledger.withdraw(&account(2)).unwrap();
        assert_eq!(payout, 1_440);
    }

    #[test]
    fn solvency_holds_after_each_deposit() {
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 5_000).unwrap();
        for seed in 2..30 {
            match f.ledger.deposit_for(&owner(), account(seed), 170) {
                Ok(()) => {
                    let required =
                        required_coverage(f.ledger.total_staked(), f.ledger.apy_percent())
                            .unwrap();
                    assert!(f.ledger.token_pool() >= required);
                }
                Err(PaybackError::InsufficientCoverage { .. }) => break,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert!(f.ledger.total_staked() > 0);
    }

    // --- withdraw ---

    #[test]
    fn withdraw_pays_principal_plus_interest() {
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 10_000).unwrap();
        f.ledger.deposit_for(&owner(), account(2), 1_000).unwrap();

        f.advance(SECONDS_PER_YEAR / 2);
        let payout = f.ledger.withdraw(&account(2)).unwrap();
        assert_eq!(payout, 1_050);
        assert_eq!(f.token.balance_of(&account(2)), 1_050);
        assert_eq!(f.ledger.token_pool(), 10_000 - 1_050);
        assert_eq!(f.ledger.total_staked(), 0);
        assert!(f.ledger.user_info(&account(2)).is_none());
    }

    #[test]
    fn withdraw_immediately_pays_principal_only() {
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 10_000).unwrap();
        f.ledger.deposit_for(&owner(), account(2), 1_000).unwrap();
        assert_eq!(f.ledger.withdraw(&account(2)).unwrap(), 1_000);
    }

    #[test]
    fn withdraw_unknown_user_fails() {
        let mut f = Fixture::new();
        assert_eq!(
            f.ledger.withdraw(&account(2)).unwrap_err(),
            PaybackError::UserNotFound
        );
    }

    #[test]
    fn withdraw_after_window_fails() {
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 10_000).unwrap();
        f.ledger.deposit_for(&owner(), account(2), 1_000).unwrap();

        f.advance(WINDOW + 1);
        assert_eq!(
            f.ledger.withdraw(&account(2)).unwrap_err(),
            PaybackError::WithdrawalPeriodExpired
        );
        // The entry survives for the owner to reclaim.
        assert!(f.ledger.user_info(&account(2)).is_some());
    }

    #[test]
    fn withdraw_at_window_boundary_succeeds() {
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 10_000).unwrap();
        f.ledger.deposit_for(&owner(), account(2), 1_000).unwrap();

        // Expiry is strict: exactly at the boundary is still live.
        f.advance(WINDOW);
        assert!(f.ledger.withdraw(&account(2)).is_ok());
    }

    #[test]
    fn deposit_resets_expiry_clock() {
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 10_000).unwrap();
        f.ledger.deposit_for(&owner(), account(2), 1_000).unwrap();

        // A later deposit checkpoints the entry, restarting the window.
        f.advance(WINDOW / 2 + 1);
        f.ledger.deposit_for(&owner(), account(2), 1).unwrap();
        f.advance(WINDOW / 2 + 1);
        assert!(f.ledger.withdraw(&account(2)).is_ok());
    }

    // --- expiry and reclamation ---

    #[test]
    fn reclaim_expired_pays_checkpointed_balance_to_owner() {
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 10_000).unwrap();
        f.ledger.deposit_for(&owner(), account(2), 1_000).unwrap();
        let owner_before = f.token.balance_of(&owner());

        f.advance(WINDOW + 100);
        let reclaimed = f.ledger.reclaim_expired(&owner(), &account(2)).unwrap();
        // No interest past the checkpoint that made it expire.
        assert_eq!(reclaimed, 1_000);
        assert_eq!(f.token.balance_of(&owner()), owner_before + 1_000);
        // The pool accounting is untouched by a reclaim.
        assert_eq!(f.ledger.token_pool(), 10_000);
        assert_eq!(f.ledger.total_staked(), 0);
        assert!(f.ledger.user_info(&account(2)).is_none());
    }

    #[test]
    fn reclaim_live_entry_fails() {
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 10_000).unwrap();
        f.ledger.deposit_for(&owner(), account(2), 1_000).unwrap();
        assert_eq!(
            f.ledger.reclaim_expired(&owner(), &account(2)).unwrap_err(),
            PaybackError::NotExpired
        );
    }

    #[test]
    fn reclaim_rejects_non_owner() {
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 10_000).unwrap();
        f.ledger.deposit_for(&owner(), account(2), 1_000).unwrap();
        f.advance(WINDOW + 1);
        assert_eq!(
            f.ledger.reclaim_expired(&account(2), &account(2)).unwrap_err(),
            PaybackError::Ownership(OwnershipError::NotOwner)
        );
    }

    #[test]
    fn sweep_reclaims_only_expired_entries() {
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 10_000).unwrap();
        f.ledger.deposit_for(&owner(), account(2), 1_000).unwrap();
        f.ledger.deposit_for(&owner(), account(3), 2_000).unwrap();

        f.advance(WINDOW + 1);
        // A fresh deposit keeps account 4 live.
        f.ledger.deposit_for(&owner(), account(4), 500).unwrap();

        let swept = f.ledger.sweep_expired(&owner()).unwrap();
        assert_eq!(swept, 2);
        assert!(f.ledger.user_info(&account(2)).is_none());
        assert!(f.ledger.user_info(&account(3)).is_none());
        assert!(f.ledger.user_info(&account(4)).is_some());
        assert_eq!(f.ledger.total_staked(), 500);
    }

    #[test]
    fn sweep_with_no_expired_entries_is_noop() {
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 10_000).unwrap();
        f.ledger.deposit_for(&owner(), account(2), 1_000).unwrap();
        assert_eq!(f.ledger.sweep_expired(&owner()).unwrap(), 0);
        assert!(f.ledger.user_info(&account(2)).is_some());
    }

    #[test]
    fn deposit_sweeps_own_expired_entry_first() {
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 10_000).unwrap();
        f.ledger.deposit_for(&owner(), account(2), 1_000).unwrap();
        let owner_before = f.token.balance_of(&owner());

        f.advance(WINDOW + 1);
        f.ledger.deposit_for(&owner(), account(2), 300).unwrap();

        // The stale balance went to the owner; the new entry starts fresh.
        assert_eq!(f.token.balance_of(&owner()), owner_before + 1_000);
        let entry = f.ledger.user_info(&account(2)).unwrap();
        assert_eq!(entry.balance, 300);
        assert_eq!(entry.deposit_time, START + WINDOW + 1);
        assert_eq!(f.ledger.total_staked(), 300);

        let events = f.ledger.drain_events();
        assert!(events.contains(&PaybackEvent::Reclaimed {
            account: account(2),
            amount: 1_000
        }));
        assert!(events.contains(&PaybackEvent::Deposited {
            account: account(2),
            amount: 300
        }));
    }

    #[test]
    fn failed_coverage_check_rolls_back_implicit_sweep() {
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 1_200).unwrap();
        f.ledger.deposit_for(&owner(), account(2), 1_000).unwrap();
        let owner_before = f.token.balance_of(&owner());

        f.advance(WINDOW + 1);
        // Sweeping would free coverage, but the new deposit alone exceeds it.
        let err = f.ledger.deposit_for(&owner(), account(2), 1_200).unwrap_err();
        assert!(matches!(err, PaybackError::InsufficientCoverage { .. }));
        // Nothing committed: the expired entry is still there, untouched.
        assert_eq!(f.ledger.user_info(&account(2)).unwrap().balance, 1_000);
        assert_eq!(f.token.balance_of(&owner()), owner_before);
        assert_eq!(f.ledger.total_staked(), 1_000);
    }

    // --- set_apy / ownership ---

    #[test]
    fn set_apy_rejects_zero_and_non_owner() {
        let mut f = Fixture::new();
        assert_eq!(
            f.ledger.set_apy(&owner(), 0).unwrap_err(),
            PaybackError::ZeroApy
        );
        assert_eq!(
            f.ledger.set_apy(&account(9), 5).unwrap_err(),
            PaybackError::Ownership(OwnershipError::NotOwner)
        );
        f.ledger.set_apy(&owner(), 25).unwrap();
        assert_eq!(f.ledger.apy_percent(), 25);
    }

    #[test]
    fn ownership_transfer_moves_privileges() {
        let mut f = Fixture::new();
        f.ledger.transfer_ownership(&owner(), account(7)).unwrap();
        assert_eq!(f.ledger.owner(), account(7));
        assert_eq!(
            f.ledger.set_apy(&owner(), 5).unwrap_err(),
            PaybackError::Ownership(OwnershipError::NotOwner)
        );
        f.ledger.set_apy(&account(7), 5).unwrap();
    }

    #[test]
    fn ownership_transfer_rejects_zero_account() {
        let mut f = Fixture::new();
        assert_eq!(
            f.ledger.transfer_ownership(&owner(), AccountId::ZERO).unwrap_err(),
            PaybackError::Ownership(OwnershipError::ZeroOwnerAccount)
        );
    }

    // --- pending_payout ---

    #[test]
    fn pending_payout_projects_interest() {
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 10_000).unwrap();
        f.ledger.deposit_for(&owner(), account(2), 1_000).unwrap();

        assert_eq!(f.ledger.pending_payout(&account(2)).unwrap(), 1_000);
        f.advance(SECONDS_PER_YEAR);
        assert_eq!(f.ledger.pending_payout(&account(2)).unwrap(), 1_100);
        // Projection does not mutate the entry.
        assert_eq!(f.ledger.user_info(&account(2)).unwrap().balance, 1_000);
    }

    #[test]
    fn pending_payout_freezes_at_expiry_checkpoint() {
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 10_000).unwrap();
        f.ledger.deposit_for(&owner(), account(2), 1_000).unwrap();
        f.advance(WINDOW + SECONDS_PER_YEAR);
        assert_eq!(f.ledger.pending_payout(&account(2)).unwrap(), 1_000);
    }

    // --- events ---

    #[test]
    fn events_drain_in_order_and_once() {
        let mut f = Fixture::new();
        f.ledger.refill_pool(&owner(), 1_000).unwrap();
        f.ledger.deposit_for(&owner(), account(2), 100).unwrap();
        let events = f.ledger.drain_events();
        assert_eq!(
            events,
            vec![
                PaybackEvent::PoolRefilled { amount: 1_000 },
                PaybackEvent::Deposited {
                    account: account(2),
                    amount: 100
                },
            ]
        );
        assert!(f.ledger.drain_events().is_empty());
    }
}
