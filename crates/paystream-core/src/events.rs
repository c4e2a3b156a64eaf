//! Observable ledger events.
//!
//! Engines record one event per state change for external consumers and
//! indexers. Events accumulate inside the engine and are handed over in
//! order via `drain_events()`; draining is the embedder's concern.

use serde::{Deserialize, Serialize};

use crate::types::AccountId;

/// Events emitted by the fixed-APY payback ledger.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum PaybackEvent {
    /// The owner refilled the custody pool.
    PoolRefilled { amount: u64 },
    /// The owner deposited stake on behalf of a user.
    Deposited { account: AccountId, amount: u64 },
    /// A user withdrew their balance plus accrued interest.
    Withdrawn { account: AccountId, amount: u64 },
    /// The owner reclaimed an expired entry.
    Reclaimed { account: AccountId, amount: u64 },
    /// The APY changed for future accrual intervals.
    ApyChanged { apy_percent: u64 },
    /// The privileged account changed.
    OwnershipTransferred { previous: AccountId, new: AccountId },
}

/// Events emitted by the streaming reward-rate ledger.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// The owner funded a reward epoch; `reward_rate` is the new per-second rate.
    EpochFunded { amount: u64, duration: u64, reward_rate: u64 },
    /// A user staked principal.
    Staked { account: AccountId, amount: u64 },
    /// A user started the withdrawal notice period.
    WithdrawalInitiated { account: AccountId },
    /// A user claimed principal after the notice period.
    Withdrawn { account: AccountId, amount: u64 },
    /// A user was paid their accrued reward.
    RewardPaid { account: AccountId, amount: u64 },
    /// The per-user stake cap changed.
    StakeLimitChanged { limit: u64 },
    /// The pool-wide stake cap changed.
    PoolLimitChanged { limit: u64 },
    /// The privileged account changed.
    OwnershipTransferred { previous: AccountId, new: AccountId },
}
