//! Simple-interest and coverage arithmetic for the payback ledger.
//!
//! All computations are integer-only with u128 intermediates and truncating
//! division; rounding always favors the pool.

use paystream_core::constants::{PERCENT_DIVISOR, SECONDS_PER_YEAR};
use paystream_core::error::PaybackError;

/// Simple interest on `balance` at `apy_percent` over `elapsed` seconds.
///
/// `balance * apy_percent / 100 * elapsed / SECONDS_PER_YEAR`, computed as a
/// single u128 product to avoid intermediate truncation.
pub fn simple_interest(balance: u64, apy_percent: u64, elapsed: u64) -> Result<u64, PaybackError> {
    if balance == 0 || apy_percent == 0 || elapsed == 0 {
        return Ok(0);
    }

    let numerator = (balance as u128)
        .checked_mul(apy_percent as u128)
        .ok_or(PaybackError::ArithmeticOverflow)?
        .checked_mul(elapsed as u128)
        .ok_or(PaybackError::ArithmeticOverflow)?;
    let interest = numerator / (PERCENT_DIVISOR as u128 * SECONDS_PER_YEAR as u128);

    u64::try_from(interest).map_err(|_| PaybackError::ArithmeticOverflow)
}

/// Worst-case one-year obligation of `total_staked` at `apy_percent`.
///
/// `total_staked * (1 + apy_percent/100)`. The pool must retain at least
/// this much before a deposit is admitted. Coverage is priced for one year
/// only, even when the inactivity window is longer.
pub fn required_coverage(total_staked: u64, apy_percent: u64) -> Result<u64, PaybackError> {
    let factor = (PERCENT_DIVISOR as u128)
        .checked_add(apy_percent as u128)
        .ok_or(PaybackError::ArithmeticOverflow)?;
    let required = (total_staked as u128)
        .checked_mul(factor)
        .ok_or(PaybackError::ArithmeticOverflow)?
        / PERCENT_DIVISOR as u128;

    u64::try_from(required).map_err(|_| PaybackError::ArithmeticOverflow)
}
