//! Main settlement engine
//!
//! Composes the balance ledger and a [`Minimizer`] into the per-group unit
//! "apply deltas, drop the old settlement set, compute and store the new one".
//! Each unit runs inside one ledger transaction, so a settlement set is never
//! stored against balances it was not computed from.

use crate::{
    config::{Config, PaidSettlementPolicy},
    minimizer::{GreedyMinimizer, Minimizer},
    types::SettlementPlan,
    Error, Result,
};
use chrono::Utc;
use ledger_core::{
    Balance, Direction, Expense, GroupId, GroupTransaction, Ledger, MemoryStorage, Settlement,
    SettlementId, Storage,
};
use std::fmt;
use std::sync::Arc;

/// Settlement engine
pub struct SettlementEngine<S: Storage = MemoryStorage> {
    /// Balance ledger
    ledger: Arc<Ledger<S>>,

    /// Matching algorithm
    minimizer: Box<dyn Minimizer>,

    /// Configuration
    config: Config,
}

impl SettlementEngine<Arc<dyn Storage>> {
    /// Create engine with the ledger described by the configuration
    pub fn from_config(config: Config) -> Result<Self> {
        let ledger = Arc::new(Ledger::from_config(&config.ledger)?);
        Ok(Self::new(ledger, config))
    }
}

impl<S: Storage> SettlementEngine<S> {
    /// Create engine over a shared ledger, using the greedy minimizer
    pub fn new(ledger: Arc<Ledger<S>>, config: Config) -> Self {
        tracing::info!(
            service = %config.service_name,
            paid_policy = ?config.paid_policy,
            "Creating settlement engine"
        );
        Self {
            ledger,
            minimizer: Box::new(GreedyMinimizer::new()),
            config,
        }
    }

    /// Swap the matching algorithm
    pub fn with_minimizer(mut self, minimizer: impl Minimizer + 'static) -> Self {
        self.minimizer = Box::new(minimizer);
        self
    }

    /// Underlying ledger
    pub fn ledger(&self) -> &Arc<Ledger<S>> {
        &self.ledger
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Record a new expense and recompute its group's settlements
    pub fn record_expense(&self, expense: &Expense) -> Result<SettlementPlan> {
        self.run_unit(&expense.group_id, "record_expense", |tx| {
            tx.apply_expense(expense, Direction::Apply)?;
            Ok(())
        })
    }

    /// Reverse a deleted expense and recompute its group's settlements
    pub fn delete_expense(&self, expense: &Expense) -> Result<SettlementPlan> {
        self.run_unit(&expense.group_id, "delete_expense", |tx| {
            tx.apply_expense(expense, Direction::Reverse)?;
            Ok(())
        })
    }

    /// Replace an expense's participants: reverse `before`, apply `after`
    pub fn edit_expense(&self, before: &Expense, after: &Expense) -> Result<SettlementPlan> {
        if before.expense_id != after.expense_id || before.group_id != after.group_id {
            return Err(ledger_core::Error::InvalidInput(format!(
                "edit must keep expense and group: {}@{} vs {}@{}",
                before.expense_id, before.group_id, after.expense_id, after.group_id
            ))
            .into());
        }

        self.run_unit(&before.group_id, "edit_expense", |tx| {
            tx.apply_expense(before, Direction::Reverse)?;
            tx.apply_expense(after, Direction::Apply)?;
            Ok(())
        })
    }

    /// Recompute a group's settlements from its current balances
    pub fn recalculate(&self, group_id: &GroupId) -> Result<SettlementPlan> {
        self.run_unit(group_id, "recalculate", |_| Ok(()))
    }

    /// Mark a PENDING settlement as PAID
    pub fn mark_paid(&self, group_id: &GroupId, settlement_id: SettlementId) -> Result<Settlement> {
        let settlement = self.ledger.transaction(group_id, |tx| {
            let settlement = tx.settlement_mut(settlement_id)?;
            settlement.mark_paid(Utc::now())?;
            Ok::<_, Error>(settlement.clone())
        })?;

        tracing::info!(
            group = %group_id,
            settlement = %settlement_id,
            from = %settlement.from_user_id,
            to = %settlement.to_user_id,
            amount = %settlement.amount,
            "Settlement marked paid"
        );
        Ok(settlement)
    }

    /// Settlement records of a group, newest first
    pub fn settlements(&self, group_id: &GroupId) -> Result<Vec<Settlement>> {
        let mut settlements = self.ledger.settlements(group_id)?;
        // Stable sort: records created together keep emission order
        settlements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(settlements)
    }

    /// Current balances of a group, in canonical order
    pub fn balances(&self, group_id: &GroupId) -> Result<Vec<Balance>> {
        Ok(self.ledger.balances(group_id)?)
    }

    /// Balances the minimizer works from under the configured policy
    pub fn outstanding_balances(&self, group_id: &GroupId) -> Result<Vec<Balance>> {
        let book = self.ledger.book(group_id)?;
        outstanding(self.config.paid_policy, &book.balances, &book.settlements)
    }

    /// Plan an external balance snapshot with the configured minimizer.
    ///
    /// Nothing is stored.
    pub fn plan_snapshot(&self, group_id: &GroupId, balances: &[Balance]) -> Result<SettlementPlan> {
        self.minimizer.plan(group_id, balances)
    }

    /// Plan the group's outstanding balances without replacing its settlements
    pub fn preview(&self, group_id: &GroupId) -> Result<SettlementPlan> {
        let balances = self.outstanding_balances(group_id)?;
        self.plan_snapshot(group_id, &balances)
    }

    fn run_unit<F>(&self, group_id: &GroupId, operation: &str, mutate: F) -> Result<SettlementPlan>
    where
        F: FnOnce(&mut GroupTransaction) -> Result<()>,
    {
        let plan = self.ledger.transaction(group_id, |tx| {
            mutate(tx)?;
            self.recompute(tx)
        });

        match &plan {
            Ok(plan) => {
                self.ledger
                    .metrics()
                    .record_recomputation(plan.transfers.len());
                tracing::info!(
                    group = %group_id,
                    operation,
                    transfers = plan.stats.transfer_count,
                    volume = %plan.stats.total_volume,
                    "Settlement set recomputed"
                );
            }
            Err(e) => {
                tracing::warn!(
                    group = %group_id,
                    operation,
                    kind = ?e.kind(),
                    error = %e,
                    "Settlement unit failed"
                );
            }
        }

        plan
    }

    fn recompute(&self, tx: &mut GroupTransaction) -> Result<SettlementPlan> {
        let balances = outstanding(self.config.paid_policy, tx.balances(), tx.settlements())?;
        let plan = self.minimizer.plan(tx.group_id(), &balances)?;

        let kept: Vec<Settlement> = match self.config.paid_policy {
            PaidSettlementPolicy::NetOut => tx
                .settlements()
                .iter()
                .filter(|s| !s.is_pending())
                .cloned()
                .collect(),
            PaidSettlementPolicy::Discard => Vec::new(),
        };

        let mut settlements = kept;
        settlements.extend(plan.to_settlements(Utc::now()));
        let replaced = tx.replace_settlements(settlements);

        tracing::debug!(
            group = %tx.group_id(),
            replaced = replaced.len(),
            emitted = plan.transfers.len(),
            "Replaced settlement set"
        );

        Ok(plan)
    }
}

/// Raw balances, with PAID settlements netted out under [`PaidSettlementPolicy::NetOut`]
fn outstanding(
    policy: PaidSettlementPolicy,
    balances: &ledger_core::GroupBalances,
    settlements: &[Settlement],
) -> Result<Vec<Balance>> {
    match policy {
        PaidSettlementPolicy::Discard => Ok(balances.snapshot()),
        PaidSettlementPolicy::NetOut => {
            let mut balances = balances.clone();
            for paid in settlements.iter().filter(|s| !s.is_pending()) {
                balances.apply(&paid.from_user_id, paid.amount)?;
                balances.apply(&paid.to_user_id, -paid.amount)?;
            }
            Ok(balances.snapshot())
        }
    }
}

impl<S: Storage> fmt::Debug for SettlementEngine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettlementEngine")
            .field("ledger", &self.ledger)
            .field("minimizer", &self.minimizer)
            .field("config", &self.config)
            .finish()
    }
}
