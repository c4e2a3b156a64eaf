//! Error types for the PayStream ledgers.
//!
//! Every failure is a synchronous, all-or-nothing rejection of the
//! triggering call; engines only mutate state after all guards have passed.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: u64, need: u64 },
    #[error("insufficient allowance: have {have}, need {need}")] InsufficientAllowance { have: u64, need: u64 },
    #[error("value overflow")] ValueOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OwnershipError {
    #[error("caller is not the owner")] NotOwner,
    #[error("new owner is the zero account")] ZeroOwnerAccount,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaybackError {
    #[error(transparent)] Ownership(#[from] OwnershipError),
    #[error("user does not exist")] UserNotFound,
    #[error("zero amount")] ZeroAmount,
    #[error("APY must be positive")] ZeroApy,
    #[error("insufficient pool coverage: required {required}, available {available}")]
    InsufficientCoverage { required: u64, available: u64 },
    #[error("withdrawal period expired")] WithdrawalPeriodExpired,
    #[error("entry has not expired")] NotExpired,
    #[error(transparent)] Token(#[from] TokenError),
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error(transparent)] Ownership(#[from] OwnershipError),
    #[error("zero amount")] ZeroAmount,
    #[error("zero epoch duration")] ZeroDuration,
    #[error("stake limit per user exceeded: {limit}")] StakeLimitExceeded { limit: u64 },
    #[error("pool limit exceeded: {limit}")] PoolLimitExceeded { limit: u64 },
    #[error("nothing to withdraw")] NothingToWithdraw,
    #[error("withdrawal already pending")] WithdrawalAlreadyPending,
    #[error("withdrawal not initiated")] WithdrawalNotInitiated,
    #[error("notice period active: {remaining}s remaining")] NoticePeriodActive { remaining: u64 },
    #[error("amount exceeds principal: principal {principal}, requested {requested}")]
    ExceedsPrincipal { principal: u64, requested: u64 },
    #[error(transparent)] Token(#[from] TokenError),
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error(transparent)] Token(#[from] TokenError),
    #[error(transparent)] Ownership(#[from] OwnershipError),
    #[error(transparent)] Payback(#[from] PaybackError),
    #[error(transparent)] Stream(#[from] StreamError),
}
