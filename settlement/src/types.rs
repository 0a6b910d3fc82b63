//! Core types for settlement engine

use chrono::{DateTime, Utc};
use ledger_core::{GroupId, Settlement, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Re-exported ledger types
pub use ledger_core::{Balance, SettlementId, SettlementStatus};

/// Recommended transfer: `from` pays `to`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Debtor (pays)
    pub from: UserId,

    /// Creditor (receives)
    pub to: UserId,

    /// Amount to transfer, always above tolerance
    pub amount: Decimal,
}

impl Transfer {
    /// Create new transfer
    pub fn new(from: impl Into<UserId>, to: impl Into<UserId>, amount: Decimal) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
        }
    }
}

/// Statistics of one minimization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStats {
    /// Rows in the balance snapshot
    pub participants: usize,

    /// Users owed money
    pub creditors: usize,

    /// Users owing money
    pub debtors: usize,

    /// Transfers emitted
    pub transfer_count: usize,

    /// Σ transfer amounts
    pub total_volume: Decimal,
}

impl PlanStats {
    /// Upper bound on the transfer count: `creditors + debtors - 1`
    pub fn transfer_bound(&self) -> usize {
        (self.creditors + self.debtors).saturating_sub(1)
    }
}

/// Result of minimizing a group's balances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlan {
    /// Group
    pub group_id: GroupId,

    /// Transfers in emission order
    pub transfers: Vec<Transfer>,

    /// Statistics
    pub stats: PlanStats,
}

impl SettlementPlan {
    /// Nothing to settle
    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    /// PENDING settlement records for every transfer, in emission order
    pub fn to_settlements(&self, created_at: DateTime<Utc>) -> Vec<Settlement> {
        self.transfers
            .iter()
            .map(|t| {
                Settlement::pending(
                    self.group_id.clone(),
                    t.from.clone(),
                    t.to.clone(),
                    t.amount,
                    created_at,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_bound() {
        let stats = PlanStats {
            creditors: 2,
            debtors: 3,
            ..Default::default()
        };
        assert_eq!(stats.transfer_bound(), 4);
        assert_eq!(PlanStats::default().transfer_bound(), 0);
    }

    #[test]
    fn test_plan_to_pending_settlements() {
        let plan = SettlementPlan {
            group_id: GroupId::new("trip"),
            transfers: vec![
                Transfer::new("b", "a", Decimal::new(10, 0)),
                Transfer::new("c", "a", Decimal::new(20, 0)),
            ],
            stats: PlanStats::default(),
        };

        let now = Utc::now();
        let settlements = plan.to_settlements(now);
        assert_eq!(settlements.len(), 2);
        assert!(settlements.iter().all(|s| s.is_pending() && s.created_at == now));
        assert_eq!(settlements[1].from_user_id, UserId::new("c"));
        assert_eq!(settlements[1].amount, Decimal::new(20, 0));
        assert_ne!(settlements[0].settlement_id, settlements[1].settlement_id);
    }
}
