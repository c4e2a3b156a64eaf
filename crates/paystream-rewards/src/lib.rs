//! # paystream-rewards — Streaming reward-rate ledger.
//!
//! Users self-stake tokens up to per-user and pool-wide caps; the owner
//! funds discrete reward epochs; rewards stream per unit of stake-time via
//! a single global per-token accumulator, independent of when a user joins
//! or leaves. Principal withdrawal is gated by a mandatory one-week notice.
//!
//! The accumulator turns an otherwise O(stakers) update on every funding
//! event into an O(1) refresh per call: global state is one monotonic
//! fixed-point counter, and each staker settles lazily against their own
//! checkpoint. All arithmetic is integer-only with u128 intermediates;
//! truncation is an accepted, bounded rounding loss.

pub mod accumulator;
pub mod engine;

pub use engine::{StakerEntry, StreamLedger};
