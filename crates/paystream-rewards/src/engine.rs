//! The streaming reward-rate ledger engine.
//!
//! Every state-mutating call refreshes the shared accumulator first, then
//! settles the touched staker against their checkpoint. The clock value is
//! read once at call entry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use paystream_core::constants::WITHDRAWAL_NOTICE_PERIOD;
use paystream_core::error::StreamError;
use paystream_core::events::StreamEvent;
use paystream_core::ownership::Ownership;
use paystream_core::token::TokenLedger;
use paystream_core::types::AccountId;

use crate::accumulator::{accumulator_delta, rollover_rate, settled_reward};

/// A staker's entry.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct StakerEntry {
    /// Staked amount excluding accrued reward.
    pub principal: u64,
    /// Accumulator value at the staker's last settlement.
    pub reward_per_token_checkpoint: u128,
    /// Reward earned but not yet paid.
    pub accrued_reward: u64,
    /// When the staker initiated a withdrawal; `None` if no request is pending.
    pub withdrawal_initiated_at: Option<u64>,
}

impl StakerEntry {
    fn new(checkpoint: u128) -> Self {
        Self {
            principal: 0,
            reward_per_token_checkpoint: checkpoint,
            accrued_reward: 0,
            withdrawal_initiated_at: None,
        }
    }
}

/// The streaming reward-rate ledger.
///
/// Staked principal earns a share of each funded epoch proportional to its
/// fraction of the total supply over time. `sum(principal) == total_supply`
/// holds across all operations, and the accumulator never decreases.
pub struct StreamLedger {
    ownership: Ownership,
    custody: AccountId,
    token: Arc<dyn TokenLedger>,
    clock: Box<dyn Fn() -> u64 + Send + Sync>,
    total_supply: u64,
    reward_rate: u64,
    epoch_end: u64,
    epoch_duration: u64,
    last_accrual_time: u64,
    reward_per_token_acc: u128,
    stake_limit_per_user: u64,
    pool_limit_total: u64,
    stakers: BTreeMap<AccountId, StakerEntry>,
    events: Vec<StreamEvent>,
}

impl fmt::Debug for StreamLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamLedger")
            .field("total_supply", &self.total_supply)
            .field("reward_rate", &self.reward_rate)
            .field("epoch_end", &self.epoch_end)
            .field("stakers", &self.stakers.len())
            .finish_non_exhaustive()
    }
}

impl StreamLedger {
    /// Create a new ledger with the system clock.
    pub fn new(
        token: Arc<dyn TokenLedger>,
        custody: AccountId,
        owner: AccountId,
        stake_limit_per_user: u64,
        pool_limit_total: u64,
    ) -> Self {
        Self::with_clock(
            token,
            custody,
            owner,
            stake_limit_per_user,
            pool_limit_total,
            || {
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs()
            },
        )
    }

    /// Create a new ledger with a custom clock for testing.
    pub fn with_clock(
        token: Arc<dyn TokenLedger>,
        custody: AccountId,
        owner: AccountId,
        stake_limit_per_user: u64,
        pool_limit_total: u64,
        clock: impl Fn() -> u64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            ownership: Ownership::new(owner),
            custody,
            token,
            clock: Box::new(clock),
            total_supply: 0,
            reward_rate: 0,
            epoch_end: 0,
            epoch_duration: 0,
            last_accrual_time: 0,
            reward_per_token_acc: 0,
            stake_limit_per_user,
            pool_limit_total,
            stakers: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    /// Fund a reward epoch of `duration` seconds with `amount`. Owner only.
    ///
    /// Pulls `amount` from the owner's approved balance into custody. If
    /// the current epoch has not ended, its unpaid remainder folds into the
    /// new rate; it is never discarded.
    pub fn notify_reward_amount(
        &mut self,
        caller: &AccountId,
        amount: u64,
        duration: u64,
    ) -> Result<(), StreamError> {
        self.ownership.require(caller)?;
        if amount == 0 {
            return Err(StreamError::ZeroAmount);
        }
        if duration == 0 {
            return Err(StreamError::ZeroDuration);
        }
        let now = (self.clock)();
        self.refresh(now)?;

        let rate = rollover_rate(self.reward_rate, self.epoch_end, now, amount, duration)?;
        let epoch_end = now
            .checked_add(duration)
            .ok_or(StreamError::ArithmeticOverflow)?;

        self.token
            .transfer_from(&self.custody, caller, &self.custody, amount)?;
        self.reward_rate = rate;
        self.epoch_duration = duration;
        self.epoch_end = epoch_end;
        // The refresh stopped at the old epoch's end; streaming under the
        // new rate starts now, not retroactively.
        self.last_accrual_time = now;
        self.events.push(StreamEvent::EpochFunded {
            amount,
            duration,
            reward_rate: rate,
        });
        info!(amount, duration, reward_rate = rate, "reward epoch funded");
        Ok(())
    }

    /// Stake `amount` of the caller's tokens.
    ///
    /// # Errors
    ///
    /// - [`StreamError::ZeroAmount`] for a zero stake
    /// - [`StreamError::StakeLimitExceeded`] if the caller's resulting
    ///   principal would exceed the per-user cap
    /// - [`StreamError::PoolLimitExceeded`] if the resulting supply would
    ///   exceed the pool-wide cap
    pub fn stake(&mut self, caller: &AccountId, amount: u64) -> Result<(), StreamError> {
        if amount == 0 {
            return Err(StreamError::ZeroAmount);
        }
        let now = (self.clock)();
        self.refresh(now)?;
        self.settle(caller)?;

        let principal = self
            .stakers
            .get(caller)
            .map(|entry| entry.principal)
            .unwrap_or(0);
        let principal_after = principal
            .checked_add(amount)
            .ok_or(StreamError::ArithmeticOverflow)?;
        if principal_after > self.stake_limit_per_user {
            return Err(StreamError::StakeLimitExceeded {
                limit: self.stake_limit_per_user,
            });
        }
        let supply_after = self
            .total_supply
            .checked_add(amount)
            .ok_or(StreamError::ArithmeticOverflow)?;
        if supply_after > self.pool_limit_total {
            return Err(StreamError::PoolLimitExceeded {
                limit: self.pool_limit_total,
            });
        }

        self.token
            .transfer_from(&self.custody, caller, &self.custody, amount)?;
        let checkpoint = self.reward_per_token_acc;
        let entry = self
            .stakers
            .entry(*caller)
            .or_insert_with(|| StakerEntry::new(checkpoint));
        entry.principal = principal_after;
        self.total_supply = supply_after;
        self.events.push(StreamEvent::Staked {
            account: *caller,
            amount,
        });
        info!(account = %caller, amount, total_supply = self.total_supply, "staked");
        Ok(())
    }

    /// Start the withdrawal notice period for the caller's principal.
    ///
    /// # Errors
    ///
    /// - [`StreamError::NothingToWithdraw`] with zero principal
    /// - [`StreamError::WithdrawalAlreadyPending`] if a request is open
    pub fn initialize_withdrawal(&mut self, caller: &AccountId) -> Result<(), StreamError> {
        let now = (self.clock)();
        self.refresh(now)?;
        self.settle(caller)?;

        let entry = self
            .stakers
            .get_mut(caller)
            .filter(|entry| entry.principal > 0)
            .ok_or(StreamError::NothingToWithdraw)?;
        if entry.withdrawal_initiated_at.is_some() {
            return Err(StreamError::WithdrawalAlreadyPending);
        }
        entry.withdrawal_initiated_at = Some(now);
        self.events
            .push(StreamEvent::WithdrawalInitiated { account: *caller });
        debug!(account = %caller, "withdrawal initiated");
        Ok(())
    }

    /// Claim `amount` of principal after the notice period. Clears the
    /// pending request.
    ///
    /// # Errors
    ///
    /// - [`StreamError::WithdrawalNotInitiated`] without a pending request
    /// - [`StreamError::NoticePeriodActive`] strictly before one week has
    ///   elapsed since initiation
    /// - [`StreamError::ExceedsPrincipal`] for more than the staked amount
    pub fn claim_withdrawal(&mut self, caller: &AccountId, amount: u64) -> Result<(), StreamError> {
        let now = (self.clock)();
        self.refresh(now)?;
        self.settle(caller)?;

        let entry = self
            .stakers
            .get_mut(caller)
            .ok_or(StreamError::WithdrawalNotInitiated)?;
        let initiated = entry
            .withdrawal_initiated_at
            .ok_or(StreamError::WithdrawalNotInitiated)?;
        let elapsed = now.saturating_sub(initiated);
        if elapsed < WITHDRAWAL_NOTICE_PERIOD {
            return Err(StreamError::NoticePeriodActive {
                remaining: WITHDRAWAL_NOTICE_PERIOD - elapsed,
            });
        }
        if amount == 0 {
            return Err(StreamError::ZeroAmount);
        }
        if amount > entry.principal {
            return Err(StreamError::ExceedsPrincipal {
                principal: entry.principal,
                requested: amount,
            });
        }

        self.token.transfer(&self.custody, caller, amount)?;
        entry.principal -= amount;
        entry.withdrawal_initiated_at = None;
        self.total_supply -= amount;
        self.events.push(StreamEvent::Withdrawn {
            account: *caller,
            amount,
        });
        info!(account = %caller, amount, total_supply = self.total_supply, "principal withdrawn");
        Ok(())
    }

    /// Pay out the caller's accrued reward. A zero reward is a successful
    /// no-op. Returns the amount paid.
    pub fn withdraw_reward(&mut self, caller: &AccountId) -> Result<u64, StreamError> {
        let now = (self.clock)();
        self.refresh(now)?;
        self.settle(caller)?;

        let Some(entry) = self.stakers.get_mut(caller) else {
            return Ok(0);
        };
        let reward = entry.accrued_reward;
        if reward == 0 {
            return Ok(0);
        }
        // Transfer before zeroing: a failed payout leaves the entitlement
        // on the books.
        self.token.transfer(&self.custody, caller, reward)?;
        entry.accrued_reward = 0;
        self.events.push(StreamEvent::RewardPaid {
            account: *caller,
            amount: reward,
        });
        info!(account = %caller, reward, "reward paid");
        Ok(reward)
    }

    /// Change the per-user stake cap. Owner only.
    pub fn change_stake_limit(&mut self, caller: &AccountId, limit: u64) -> Result<(), StreamError> {
        self.ownership.require(caller)?;
        self.stake_limit_per_user = limit;
        self.events.push(StreamEvent::StakeLimitChanged { limit });
        info!(limit, "stake limit changed");
        Ok(())
    }

    /// Change the pool-wide stake cap. Owner only.
    pub fn change_pool_limit(&mut self, caller: &AccountId, limit: u64) -> Result<(), StreamError> {
        self.ownership.require(caller)?;
        self.pool_limit_total = limit;
        self.events.push(StreamEvent::PoolLimitChanged { limit });
        info!(limit, "pool limit changed");
        Ok(())
    }

    /// Transfer the privileged account. Owner only; rejects the zero account.
    pub fn transfer_ownership(
        &mut self,
        caller: &AccountId,
        new_owner: AccountId,
    ) -> Result<(), StreamError> {
        let previous = self.ownership.transfer(caller, new_owner)?;
        self.events.push(StreamEvent::OwnershipTransferred {
            previous,
            new: new_owner,
        });
        info!(previous = %previous, new = %new_owner, "ownership transferred");
        Ok(())
    }

    /// Reward `account` has earned but not been paid, projected to now
    /// without mutating state.
    pub fn earned(&self, account: &AccountId) -> Result<u64, StreamError> {
        let Some(entry) = self.stakers.get(account) else {
            return Ok(0);
        };
        let projected = self.projected_accumulator()?;
        let pending = settled_reward(
            entry.principal,
            projected,
            entry.reward_per_token_checkpoint,
        )?;
        entry
            .accrued_reward
            .checked_add(pending)
            .ok_or(StreamError::ArithmeticOverflow)
    }

    /// The accumulator as it would stand after a refresh at now.
    pub fn reward_per_token(&self) -> Result<u128, StreamError> {
        self.projected_accumulator()
    }

    /// The current privileged account.
    pub fn owner(&self) -> AccountId {
        self.ownership.owner()
    }

    /// Sum of staked principal.
    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    /// Current per-second reward rate.
    pub fn reward_rate(&self) -> u64 {
        self.reward_rate
    }

    /// When the current funded epoch stops accruing.
    pub fn epoch_end(&self) -> u64 {
        self.epoch_end
    }

    /// Duration of the most recently funded epoch.
    pub fn epoch_duration(&self) -> u64 {
        self.epoch_duration
    }

    /// Per-user stake cap.
    pub fn stake_limit_per_user(&self) -> u64 {
        self.stake_limit_per_user
    }

    /// Pool-wide stake cap.
    pub fn pool_limit_total(&self) -> u64 {
        self.pool_limit_total
    }

    /// The entry for `account`, if the account has ever staked.
    pub fn staker_info(&self, account: &AccountId) -> Option<StakerEntry> {
        self.stakers.get(account).copied()
    }

    /// Hand over all events recorded since the last drain, in order.
    pub fn drain_events(&mut self) -> Vec<StreamEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advance the shared accumulator to `min(now, epoch_end)`.
    ///
    /// Run at the start of every state-mutating call; the accumulator is a
    /// pure function of time between mutations, so committing the refresh
    /// even when a later guard rejects the call changes no entitlement.
    fn refresh(&mut self, now: u64) -> Result<(), StreamError> {
        let applicable = now.min(self.epoch_end);
        if self.total_supply > 0 {
            let elapsed = applicable.saturating_sub(self.last_accrual_time);
            let delta = accumulator_delta(self.reward_rate, elapsed, self.total_supply)?;
            self.reward_per_token_acc = self
                .reward_per_token_acc
                .checked_add(delta)
                .ok_or(StreamError::ArithmeticOverflow)?;
        }
        self.last_accrual_time = applicable;
        Ok(())
    }

    /// Settle the staker's pending share against the freshly refreshed
    /// accumulator. No-op for accounts that never staked.
    fn settle(&mut self, account: &AccountId) -> Result<(), StreamError> {
        let accumulator = self.reward_per_token_acc;
        if let Some(entry) = self.stakers.get_mut(account) {
            let pending = settled_reward(
                entry.principal,
                accumulator,
                entry.reward_per_token_checkpoint,
            )?;
            entry.accrued_reward = entry
                .accrued_reward
                .checked_add(pending)
                .ok_or(StreamError::ArithmeticOverflow)?;
            entry.reward_per_token_checkpoint = accumulator;
        }
        Ok(())
    }

    fn projected_accumulator(&self) -> Result<u128, StreamError> {
        let now = (self.clock)();
        let applicable = now.min(self.epoch_end);
        if self.total_supply == 0 {
            return Ok(self.reward_per_token_acc);
        }
        let elapsed = applicable.saturating_sub(self.last_accrual_time);
        let delta = accumulator_delta(self.reward_rate, elapsed, self.total_supply)?;
        self.reward_per_token_acc
            .checked_add(delta)
            .ok_or(StreamError::ArithmeticOverflow)
    }
}
