//! Ledger constants. All monetary values are in the smallest unit of the
//! custodied token.

/// Seconds in a 365-day year, the accrual basis for APY computations.
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// APY values are whole-number percentages over this divisor.
pub const PERCENT_DIVISOR: u64 = 100;

/// Mandatory notice between initiating and claiming a principal withdrawal
/// on the streaming ledger (one week).
pub const WITHDRAWAL_NOTICE_PERIOD: u64 = 604_800;

/// Fixed-point scale of the streaming ledger's reward-per-token accumulator.
pub const REWARD_PRECISION: u128 = 1_000_000_000_000_000_000;

/// Initial APY of production payback deployments, in percent.
pub const DEFAULT_APY_PERCENT: u64 = 10;

/// Inactivity window of production payback deployments (two years).
pub const DEFAULT_INACTIVITY_WINDOW: u64 = 2 * 365 * 24 * 60 * 60;
