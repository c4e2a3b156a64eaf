//! # paystream-payback — Fixed-APY payback ledger.
//!
//! One pool of custodied tokens; the owner deposits stake on behalf of
//! users, per-user balances accrue simple interest at a configurable annual
//! rate, and balances become owner-reclaimable after a configurable
//! inactivity window. All arithmetic is integer-only with u128
//! intermediates for overflow safety.
//!
//! - **Checkpointed accrual**: every deposit and withdrawal settles interest
//!   since the entry's own last checkpoint at the APY in force at the time;
//!   APY changes never reprice past intervals.
//! - **Solvency guarantee**: deposits are admitted only while the pool
//!   covers a one-year worst-case obligation of all staked principal.
//! - **Inactivity reclamation**: expired entries stop accruing and can only
//!   be swept back to the owner; a fresh deposit for the same account
//!   implicitly sweeps its own stale entry first.

pub mod engine;
pub mod interest;

pub use engine::{PaybackLedger, UserEntry};
