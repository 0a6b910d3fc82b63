//! Settlement Engine
//!
//! Computes, per group, a short list of transfers that zero every member's
//! balance, and keeps that list in step with the balance ledger.
//!
//! # Architecture
//!
//! Whenever the expenses of a group change, one unit runs under the group's
//! ledger lock:
//!
//! 1. **Deltas**: apply (or reverse) each participant's `paid - share`
//! 2. **Snapshot**: read the group's balances in canonical order
//! 3. **Minimize**: match debtors against creditors
//! 4. **Replace**: swap the group's settlement set for the new one
//!
//! If any step fails nothing is published.
//!
//! # Example
//!
//! ```
//! use ledger_core::{Expense, Ledger, MemoryStorage, Participant};
//! use rust_decimal::Decimal;
//! use settlement::{Config, SettlementEngine};
//! use std::sync::Arc;
//!
//! # fn main() -> settlement::Result<()> {
//! let ledger = Arc::new(Ledger::open(MemoryStorage::new())?);
//! let engine = SettlementEngine::new(ledger, Config::default());
//!
//! let hotel = Expense::new("hotel", "trip", vec![
//!     Participant::new("alice", Decimal::new(30, 0), Decimal::new(10, 0)),
//!     Participant::new("bob", Decimal::ZERO, Decimal::new(10, 0)),
//!     Participant::new("carol", Decimal::ZERO, Decimal::new(10, 0)),
//! ]);
//!
//! let plan = engine.record_expense(&hotel)?;
//! assert_eq!(plan.transfers.len(), 2);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod engine;
pub mod error;
pub mod minimizer;
pub mod types;

// Re-exports
pub use config::{Config, PaidSettlementPolicy};
pub use engine::SettlementEngine;
pub use error::{Error, ErrorKind, Result};
pub use minimizer::{check_snapshot, verify_plan, GreedyMinimizer, Minimizer};
pub use types::*;
