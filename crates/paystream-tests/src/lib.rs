//! Integration test suite for the paystream ledgers.
//!
//! This crate contains end-to-end lifecycle tests and adversarial tests
//! that attempt to break the money-handling invariants of both the
//! fixed-APY payback ledger and the streaming reward-rate ledger.

pub mod helpers;
