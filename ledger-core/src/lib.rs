//! Group balance ledger
//!
//! Keeps, per group, the signed net balance of every member together with the
//! group's current settlement set, and funnels every mutation through a single
//! accumulate-or-create operation.
//!
//! # Architecture
//!
//! - **Keyed store**: group → book (balances + settlements), no ambient state
//! - **Per-group serialization**: one lock per group, groups run in parallel
//! - **Atomic units**: a transaction stages a copy of the book and publishes it
//!   only after the storage backend accepted the commit
//!
//! # Invariants
//!
//! - Conservation: Σ(balances) == 0 within tolerance for every group
//! - Deltas accumulate, they never overwrite
//! - A settlement set is only ever published together with the balances it was
//!   computed from

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod balances;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod storage;
pub mod tolerance;
pub mod types;

// Re-exports
pub use balances::{GroupBalances, GroupBook};
pub use config::{Config, StorageBackend};
pub use error::{Error, Result};
pub use ledger::{GroupTransaction, Ledger};
pub use metrics::Metrics;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use tolerance::EPSILON;
pub use types::{
    Balance, Direction, Expense, ExpenseId, GroupId, Participant, Settlement, SettlementId,
    SettlementStatus, UserId,
};
