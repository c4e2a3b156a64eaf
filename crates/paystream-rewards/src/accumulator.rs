//! Reward-per-token accumulator arithmetic.
//!
//! The accumulator is a fixed-point counter scaled by
//! [`REWARD_PRECISION`]: each second, `reward_rate / total_supply` tokens
//! of reward accrue per staked token. Integer division truncates; the loss
//! is bounded and always favors the pool.

use paystream_core::constants::REWARD_PRECISION;
use paystream_core::error::StreamError;

/// Accumulator increase for `elapsed` seconds of streaming at
/// `reward_rate` over `total_supply` staked tokens.
///
/// `reward_rate * elapsed * REWARD_PRECISION / total_supply`. Zero when
/// nothing is staked: rewards for stakerless intervals are not distributed
/// retroactively.
pub fn accumulator_delta(
    reward_rate: u64,
    elapsed: u64,
    total_supply: u64,
) -> Result<u128, StreamError> {
    if reward_rate == 0 || elapsed == 0 || total_supply == 0 {
        return Ok(0);
    }
    let streamed = (reward_rate as u128)
        .checked_mul(elapsed as u128)
        .ok_or(StreamError::ArithmeticOverflow)?
        .checked_mul(REWARD_PRECISION)
        .ok_or(StreamError::ArithmeticOverflow)?;
    Ok(streamed / total_supply as u128)
}

/// Reward earned by `principal` between `checkpoint` and `accumulator`.
///
/// `principal * (accumulator - checkpoint) / REWARD_PRECISION`. The
/// accumulator is monotonically non-decreasing, so the difference never
/// underflows for a checkpoint taken from the same ledger.
pub fn settled_reward(
    principal: u64,
    accumulator: u128,
    checkpoint: u128,
) -> Result<u64, StreamError> {
    let delta = accumulator
        .checked_sub(checkpoint)
        .ok_or(StreamError::ArithmeticOverflow)?;
    let reward = (principal as u128)
        .checked_mul(delta)
        .ok_or(StreamError::ArithmeticOverflow)?
        / REWARD_PRECISION;
    u64::try_from(reward).map_err(|_| StreamError::ArithmeticOverflow)
}

/// New per-second rate when the owner funds an epoch of `duration` seconds
/// with `amount`, at `now`.
///
/// If the previous epoch already ended the rate is simply
/// `amount / duration`; otherwise the unpaid remainder of the previous
/// epoch's funding rolls forward into the new rate, never discarded.
pub fn rollover_rate(
    reward_rate: u64,
    epoch_end: u64,
    now: u64,
    amount: u64,
    duration: u64,
) -> Result<u64, StreamError> {
    if duration == 0 {
        return Err(StreamError::ZeroDuration);
    }
    let funding = if now >= epoch_end {
        amount as u128
    } else {
        let remaining = (epoch_end - now) as u128 * reward_rate as u128;
        remaining
            .checked_add(amount as u128)
            .ok_or(StreamError::ArithmeticOverflow)?
    };
    u64::try_from(funding / duration as u128).map_err(|_| StreamError::ArithmeticOverflow)
}
