//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `ledger_balance_deltas_total` - Participant deltas applied
//! - `ledger_transactions_committed_total` - Group transactions committed
//! - `ledger_transactions_rolled_back_total` - Group transactions discarded
//! - `ledger_recomputations_total` - Settlement set recomputations
//! - `ledger_settlements_per_recomputation` - Histogram of settlement set sizes

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
///
/// Every collector owns its registry, so several ledgers can live in one
/// process without name clashes.
#[derive(Clone)]
pub struct Metrics {
    /// Participant deltas applied
    pub deltas_total: IntCounter,

    /// Transactions committed
    pub commits_total: IntCounter,

    /// Transactions rolled back
    pub rollbacks_total: IntCounter,

    /// Settlement recomputations
    pub recomputations_total: IntCounter,

    /// Settlements emitted per recomputation
    pub settlements_per_recomputation: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let deltas_total = IntCounter::new(
            "ledger_balance_deltas_total",
            "Participant balance deltas applied",
        )?;
        registry.register(Box::new(deltas_total.clone()))?;

        let commits_total = IntCounter::new(
            "ledger_transactions_committed_total",
            "Group transactions committed",
        )?;
        registry.register(Box::new(commits_total.clone()))?;

        let rollbacks_total = IntCounter::new(
            "ledger_transactions_rolled_back_total",
            "Group transactions rolled back",
        )?;
        registry.register(Box::new(rollbacks_total.clone()))?;

        let recomputations_total = IntCounter::new(
            "ledger_recomputations_total",
            "Settlement set recomputations",
        )?;
        registry.register(Box::new(recomputations_total.clone()))?;

        let settlements_per_recomputation = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_settlements_per_recomputation",
                "Settlements emitted per recomputation",
            )
            .buckets(vec![0.0, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0]),
        )?;
        registry.register(Box::new(settlements_per_recomputation.clone()))?;

        Ok(Self {
            deltas_total,
            commits_total,
            rollbacks_total,
            recomputations_total,
            settlements_per_recomputation,
            registry,
        })
    }

    /// Record applied deltas
    pub fn record_deltas(&self, count: usize) {
        self.deltas_total.inc_by(count as u64);
    }

    /// Record a committed transaction
    pub fn record_commit(&self) {
        self.commits_total.inc();
    }

    /// Record a rolled back transaction
    pub fn record_rollback(&self) {
        self.rollbacks_total.inc();
    }

    /// Record a recomputation and the size of its output
    pub fn record_recomputation(&self, settlements: usize) {
        self.recomputations_total.inc();
        self.settlements_per_recomputation.observe(settlements as f64);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("deltas_total", &self.deltas_total.get())
            .field("commits_total", &self.commits_total.get())
            .field("rollbacks_total", &self.rollbacks_total.get())
            .field("recomputations_total", &self.recomputations_total.get())
            .finish()
    }
}
