//! Main ledger orchestration layer
//!
//! Ties the per-group books, the storage backend and the metrics together
//! into the balance-ledger API.
//!
//! # Concurrency
//!
//! Every group has its own lock. A [`GroupTransaction`] holds that lock for
//! its whole lifetime, so "apply all deltas of one expense mutation, then
//! recompute the settlement set" runs as one serialized unit per group while
//! different groups proceed in parallel.
//!
//! The lock is not reentrant: a transaction closure must not call back into
//! the same [`Ledger`] for the same group.
//!
//! # Example
//!
//! ```
//! use ledger_core::{GroupId, Ledger, MemoryStorage, UserId};
//! use rust_decimal::Decimal;
//!
//! # fn main() -> ledger_core::Result<()> {
//! let ledger = Ledger::open(MemoryStorage::new())?;
//! let group = GroupId::new("trip");
//!
//! ledger.apply_participant(&group, &UserId::new("alice"), Decimal::new(15, 0))?;
//! ledger.apply_participant(&group, &UserId::new("bob"), Decimal::new(-15, 0))?;
//!
//! assert_eq!(ledger.conservation_drift(&group)?, Decimal::ZERO);
//! # Ok(())
//! # }
//! ```

use crate::{
    balances::{GroupBalances, GroupBook},
    metrics::Metrics,
    storage::Storage,
    types::{Balance, Direction, Expense, GroupId, Settlement, SettlementId, UserId},
    Config, Error, Result,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;

/// Committed book of a group, `None` until first loaded from storage
type GroupSlot = Arc<Mutex<Option<GroupBook>>>;

/// Keyed store group → book
pub struct Ledger<S: Storage = crate::storage::MemoryStorage> {
    /// Storage backend
    storage: S,

    /// Per-group committed state
    groups: DashMap<GroupId, GroupSlot>,

    /// Metrics
    metrics: Metrics,
}

impl Ledger<Arc<dyn Storage>> {
    /// Open ledger with the storage backend named in the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage = config.open_storage()?;
        tracing::info!(
            service = %config.service_name,
            backend = ?config.storage,
            "Opening ledger"
        );
        Self::open(storage)
    }
}

impl<S: Storage> Ledger<S> {
    /// Open ledger on top of a storage backend
    pub fn open(storage: S) -> Result<Self> {
        let metrics = Metrics::new()
            .map_err(|e| Error::Other(format!("Failed to create metrics: {}", e)))?;
        Ok(Self::with_metrics(storage, metrics))
    }

    /// Open ledger reporting into an existing metrics collector
    pub fn with_metrics(storage: S, metrics: Metrics) -> Self {
        Self {
            storage,
            groups: DashMap::new(),
            metrics,
        }
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Storage backend
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Accumulate `balance_change` into `(group, user)`, creating the row if missing.
    ///
    /// Runs as its own committed transaction and returns the new balance.
    pub fn apply_participant(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        balance_change: Decimal,
    ) -> Result<Decimal> {
        self.transaction(group_id, |tx| tx.apply_participant(user_id, balance_change))
    }

    /// Run `f` as one atomic unit over the group's book.
    ///
    /// `f` works on a staged copy. The copy is committed to storage and
    /// published only if `f` returns `Ok` and the commit succeeds; otherwise
    /// the committed state is left untouched.
    pub fn transaction<T, E, F>(&self, group_id: &GroupId, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut GroupTransaction) -> std::result::Result<T, E>,
        E: From<Error>,
    {
        let slot = self.slot(group_id);
        let mut guard = slot.lock();
        let committed = self.load_into(group_id, &mut guard)?;

        let mut tx = GroupTransaction::new(committed.clone());
        let value = match f(&mut tx) {
            Ok(value) => value,
            Err(e) => {
                self.metrics.record_rollback();
                tracing::warn!(group = %group_id, "Transaction rolled back");
                return Err(e);
            }
        };

        let GroupTransaction { mut book, deltas } = tx;
        book.version += 1;

        if let Err(e) = self.storage.commit(&book) {
            self.metrics.record_rollback();
            tracing::warn!(group = %group_id, error = %e, "Commit failed, transaction rolled back");
            return Err(e.into());
        }

        self.metrics.record_deltas(deltas);
        self.metrics.record_commit();
        tracing::info!(
            group = %group_id,
            version = book.version,
            deltas,
            settlements = book.settlements.len(),
            "Committed group transaction"
        );

        *guard = Some(book);
        Ok(value)
    }

    /// Copy of the committed book
    pub fn book(&self, group_id: &GroupId) -> Result<GroupBook> {
        let slot = self.slot(group_id);
        let mut guard = slot.lock();
        Ok(self.load_into(group_id, &mut guard)?.clone())
    }

    /// Committed balances in canonical order
    pub fn balances(&self, group_id: &GroupId) -> Result<Vec<Balance>> {
        Ok(self.book(group_id)?.balances.snapshot())
    }

    /// Committed settlement records
    pub fn settlements(&self, group_id: &GroupId) -> Result<Vec<Settlement>> {
        Ok(self.book(group_id)?.settlements)
    }

    /// Σ balances of the group; zero (within tolerance) when consistent
    pub fn conservation_drift(&self, group_id: &GroupId) -> Result<Decimal> {
        self.book(group_id)?.balances.total()
    }

    /// Groups touched by this ledger instance
    pub fn groups(&self) -> Vec<GroupId> {
        let mut groups: Vec<GroupId> = self.groups.iter().map(|e| e.key().clone()).collect();
        groups.sort();
        groups
    }

    fn slot(&self, group_id: &GroupId) -> GroupSlot {
        self.groups
            .entry(group_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    fn load_into<'a>(
        &self,
        group_id: &GroupId,
        slot: &'a mut Option<GroupBook>,
    ) -> Result<&'a GroupBook> {
        let book = match slot.take() {
            Some(book) => book,
            None => {
                let book = self.storage.load(group_id)?;
                tracing::debug!(group = %group_id, found = book.is_some(), "Loaded group book");
                book.unwrap_or_else(|| GroupBook::new(group_id.clone()))
            }
        };
        Ok(slot.insert(book))
    }
}

impl<S: Storage> fmt::Debug for Ledger<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("groups", &self.groups.len())
            .field("metrics", &self.metrics)
            .finish()
    }
}

/// Staged copy of a group's book inside [`Ledger::transaction`]
#[derive(Debug)]
pub struct GroupTransaction {
    book: GroupBook,
    deltas: usize,
}

impl GroupTransaction {
    fn new(book: GroupBook) -> Self {
        Self { book, deltas: 0 }
    }

    /// Group under transaction
    pub fn group_id(&self) -> &GroupId {
        &self.book.group_id
    }

    /// Version of the book this transaction started from
    pub fn base_version(&self) -> u64 {
        self.book.version
    }

    /// Accumulate-or-create upsert of one participant delta
    pub fn apply_participant(
        &mut self,
        user_id: &UserId,
        balance_change: Decimal,
    ) -> Result<Decimal> {
        let balance = self.book.balances.apply(user_id, balance_change)?;
        self.deltas += 1;
        tracing::debug!(
            group = %self.book.group_id,
            user = %user_id,
            %balance_change,
            %balance,
            "Applied balance delta"
        );
        Ok(balance)
    }

    /// Apply (or reverse) every participant delta of an expense
    pub fn apply_expense(&mut self, expense: &Expense, direction: Direction) -> Result<()> {
        if expense.group_id != self.book.group_id {
            return Err(Error::InvalidInput(format!(
                "expense {} belongs to group {}, not {}",
                expense.expense_id, expense.group_id, self.book.group_id
            )));
        }
        expense.validate()?;

        for (user_id, delta) in expense.deltas(direction) {
            self.apply_participant(&user_id, delta)?;
        }
        Ok(())
    }

    /// Staged balances
    pub fn balances(&self) -> &GroupBalances {
        &self.book.balances
    }

    /// Staged settlement records
    pub fn settlements(&self) -> &[Settlement] {
        &self.book.settlements
    }

    /// Replace the whole settlement set, returning the previous one
    pub fn replace_settlements(&mut self, settlements: Vec<Settlement>) -> Vec<Settlement> {
        std::mem::replace(&mut self.book.settlements, settlements)
    }

    /// Mutable access to one settlement record
    pub fn settlement_mut(&mut self, settlement_id: SettlementId) -> Result<&mut Settlement> {
        let group_id = &self.book.group_id;
        self.book
            .settlements
            .iter_mut()
            .find(|s| s.settlement_id == settlement_id)
            .ok_or_else(|| {
                Error::SettlementNotFound(format!("{} in group {}", settlement_id, group_id))
            })
    }
}
