//! # paystream-core
//! Foundation types and interfaces shared by the PayStream ledger engines.

pub mod constants;
pub mod error;
pub mod events;
pub mod ownership;
pub mod token;
pub mod types;
