//! Settlement minimization
//!
//! Turns a group's balance snapshot into a short list of transfers that zero
//! every balance.
//!
//! # Algorithm
//!
//! 1. Partition users into creditors (balance > ε) and debtors (balance < -ε),
//!    keeping the order of the snapshot. Users within ε of zero are dropped.
//! 2. Walk both lists with one cursor each. Every step transfers
//!    `min(debt, credit)` from the current debtor to the current creditor.
//! 3. A cursor advances once its remaining magnitude drops below ε.
//!
//! Matching order is the input order, never a sort by magnitude.
//!
//! # Example
//!
//! ```text
//! Balances (input order):
//!   A: +15
//!   B: +5
//!   C: -20
//!
//! Transfers:
//!   C pays A: 15
//!   C pays B: 5
//! ```
//!
//! The output never exceeds `creditors + debtors - 1` transfers and the walk
//! is linear in the number of users. It is a heuristic: the minimum transfer
//! count over all matchings is a partition problem and is not attempted.

use crate::{
    types::{Balance, PlanStats, SettlementPlan, Transfer},
    Error, Result,
};
use ledger_core::{tolerance, GroupId, UserId, EPSILON};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Balance snapshot → transfers
///
/// Implementations must be deterministic: the same snapshot yields the same
/// transfers.
pub trait Minimizer: Send + Sync + fmt::Debug {
    /// Algorithm name, for logs
    fn name(&self) -> &'static str;

    /// Compute transfers for a balance snapshot
    fn minimize(&self, balances: &[Balance]) -> Result<Vec<Transfer>>;

    /// Minimize and wrap the result with statistics
    fn plan(&self, group_id: &GroupId, balances: &[Balance]) -> Result<SettlementPlan> {
        let transfers = self.minimize(balances)?;

        let stats = PlanStats {
            participants: balances.len(),
            creditors: balances
                .iter()
                .filter(|b| tolerance::is_positive(b.amount))
                .count(),
            debtors: balances
                .iter()
                .filter(|b| tolerance::is_negative(b.amount))
                .count(),
            transfer_count: transfers.len(),
            total_volume: transfers.iter().map(|t| t.amount).sum(),
        };

        tracing::debug!(
            group = %group_id,
            algorithm = self.name(),
            creditors = stats.creditors,
            debtors = stats.debtors,
            transfers = stats.transfer_count,
            "Minimized group balances"
        );

        Ok(SettlementPlan {
            group_id: group_id.clone(),
            transfers,
            stats,
        })
    }
}

/// Two-cursor greedy matcher
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyMinimizer;

impl GreedyMinimizer {
    /// Create new minimizer
    pub fn new() -> Self {
        Self
    }
}

/// Creditor or debtor with the magnitude still to be settled
struct Position<'a> {
    user_id: &'a UserId,
    remaining: Decimal,
}

impl Minimizer for GreedyMinimizer {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn minimize(&self, balances: &[Balance]) -> Result<Vec<Transfer>> {
        check_snapshot(balances)?;

        let mut creditors: Vec<Position<'_>> = Vec::new();
        let mut debtors: Vec<Position<'_>> = Vec::new();
        for balance in balances {
            if tolerance::is_positive(balance.amount) {
                creditors.push(Position {
                    user_id: &balance.user_id,
                    remaining: balance.amount,
                });
            } else if tolerance::is_negative(balance.amount) {
                debtors.push(Position {
                    user_id: &balance.user_id,
                    remaining: balance.amount.abs(),
                });
            }
        }

        let mut transfers = Vec::with_capacity((creditors.len() + debtors.len()).saturating_sub(1));
        let (mut i, mut j) = (0, 0);

        while i < debtors.len() && j < creditors.len() {
            let debtor = &mut debtors[i];
            let creditor = &mut creditors[j];

            let amount = debtor.remaining.min(creditor.remaining);
            let emitted = amount > EPSILON;
            if emitted {
                tracing::trace!(from = %debtor.user_id, to = %creditor.user_id, %amount, "Matched");
                transfers.push(Transfer {
                    from: debtor.user_id.clone(),
                    to: creditor.user_id.clone(),
                    amount,
                });
                debtor.remaining -= amount;
                creditor.remaining -= amount;
            }

            // Without a transfer at least one side is at or below ε; moving
            // past it keeps the walk finite.
            let debtor_done = cursor_done(debtor.remaining, emitted);
            let creditor_done = cursor_done(creditor.remaining, emitted);
            if debtor_done {
                i += 1;
            }
            if creditor_done {
                j += 1;
            }
        }

        Ok(transfers)
    }
}

fn cursor_done(remaining: Decimal, emitted: bool) -> bool {
    remaining < EPSILON || (!emitted && remaining <= EPSILON)
}

/// Reject snapshots the minimizer must not "fix": duplicate users and
/// creditor/debtor totals that disagree beyond tolerance.
pub fn check_snapshot(balances: &[Balance]) -> Result<()> {
    let mut seen = HashSet::with_capacity(balances.len());
    for balance in balances {
        if !seen.insert(&balance.user_id) {
            return Err(Error::InvalidBalance(format!(
                "user {} appears more than once",
                balance.user_id
            )));
        }
    }

    let overflow = || Error::InvalidBalance("balance total overflows".to_string());
    let creditors = tolerance::checked_sum(
        balances
            .iter()
            .filter(|b| b.amount > Decimal::ZERO)
            .map(|b| b.amount),
    )
    .ok_or_else(overflow)?;
    let debtors = tolerance::checked_sum(
        balances
            .iter()
            .filter(|b| b.amount < Decimal::ZERO)
            .map(|b| b.amount.abs()),
    )
    .ok_or_else(overflow)?;

    if (creditors - debtors).abs() > EPSILON {
        return Err(Error::ConservationViolation { creditors, debtors });
    }

    Ok(())
}

/// Check a set of transfers against the snapshot it was computed from.
///
/// Verifies that no transfer is a self-transfer or at/below tolerance, that
/// the count stays within `creditors + debtors - 1` and that the transfers
/// reproduce every balance within ε.
pub fn verify_plan(balances: &[Balance], transfers: &[Transfer]) -> Result<()> {
    let mut net: HashMap<&UserId, Decimal> = HashMap::new();
    for transfer in transfers {
        if transfer.from == transfer.to {
            return Err(Error::InvalidBalance(format!(
                "self-transfer for {}",
                transfer.from
            )));
        }
        if transfer.amount <= EPSILON {
            return Err(Error::InvalidBalance(format!(
                "transfer {} -> {} of {} is not above tolerance",
                transfer.from, transfer.to, transfer.amount
            )));
        }
        *net.entry(&transfer.from).or_insert(Decimal::ZERO) -= transfer.amount;
        *net.entry(&transfer.to).or_insert(Decimal::ZERO) += transfer.amount;
    }

    let creditors = balances
        .iter()
        .filter(|b| tolerance::is_positive(b.amount))
        .count();
    let debtors = balances
        .iter()
        .filter(|b| tolerance::is_negative(b.amount))
        .count();
    let bound = (creditors + debtors).saturating_sub(1);
    if transfers.len() > bound {
        return Err(Error::InvalidBalance(format!(
            "{} transfers exceed bound {}",
            transfers.len(),
            bound
        )));
    }

    for balance in balances {
        let settled = net.remove(&balance.user_id).unwrap_or(Decimal::ZERO);
        if (settled - balance.amount).abs() > EPSILON {
            return Err(Error::InvalidBalance(format!(
                "transfers give {} a net of {}, balance is {}",
                balance.user_id, settled, balance.amount
            )));
        }
    }

    if let Some(user) = net.keys().next() {
        return Err(Error::InvalidBalance(format!(
            "transfer touches {} who has no balance",
            user
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn balances(rows: &[(&str, i64)]) -> Vec<Balance> {
        rows.iter()
            .map(|(user, cents)| Balance::new(*user, Decimal::new(*cents, 2)))
            .collect()
    }

    fn transfers(rows: &[(&str, &str, i64)]) -> Vec<Transfer> {
        rows.iter()
            .map(|(from, to, cents)| Transfer::new(*from, *to, Decimal::new(*cents, 2)))
            .collect()
    }

    #[rstest]
    #[case::one_creditor_two_debtors(
        &[("A", 3000), ("B", -1000), ("C", -2000)],
        &[("B", "A", 1000), ("C", "A", 2000)]
    )]
    #[case::one_debtor_drawn_down_in_input_order(
        &[("A", 1500), ("B", 500), ("C", -2000)],
        &[("C", "A", 1500), ("C", "B", 500)]
    )]
    #[case::input_order_not_magnitude(
        &[("B", 500), ("A", 1500), ("C", -2000)],
        &[("C", "B", 500), ("C", "A", 1500)]
    )]
    #[case::chain(
        &[("A", 1000), ("B", -400), ("C", 200), ("D", -800)],
        &[("B", "A", 400), ("D", "A", 600), ("D", "C", 200)]
    )]
    #[case::already_settled(&[("A", 0), ("B", 0)], &[])]
    #[case::empty(&[], &[])]
    fn test_greedy_scenarios(#[case] input: &[(&str, i64)], #[case] expected: &[(&str, &str, i64)]) {
        let input = balances(input);
        let result = GreedyMinimizer.minimize(&input).unwrap();
        assert_eq!(result, transfers(expected));
        verify_plan(&input, &result).unwrap();
    }

    #[test]
    fn test_below_tolerance_user_is_ignored() {
        let input = vec![
            Balance::new("A", Decimal::new(10, 0)),
            Balance::new("dust", Decimal::new(5, 3)),
            Balance::new("B", Decimal::new(-10, 0)),
        ];

        let result = GreedyMinimizer.minimize(&input).unwrap();
        assert_eq!(result, vec![Transfer::new("B", "A", Decimal::new(10, 0))]);
        assert!(result
            .iter()
            .all(|t| t.from.as_str() != "dust" && t.to.as_str() != "dust"));
    }

    #[test]
    fn test_only_creditors_or_only_debtors_is_empty() {
        // Within tolerance on the conservation check, nothing to match
        let input = balances(&[("A", 1)]);
        assert!(GreedyMinimizer.minimize(&input).unwrap().is_empty());
    }

    #[test]
    fn test_remaining_exactly_epsilon_terminates() {
        // A keeps exactly 0.01 after B pays; C cannot be matched against it
        // and the walk has to move on to D
        let input = balances(&[("A", 501), ("D", 100), ("B", -500), ("C", -101)]);

        let result = GreedyMinimizer.minimize(&input).unwrap();
        assert_eq!(result, transfers(&[("B", "A", 500), ("C", "D", 100)]));
        verify_plan(&input, &result).unwrap();
    }

    #[test]
    fn test_conservation_violation() {
        let input = balances(&[("A", 3000), ("B", -1000)]);
        match GreedyMinimizer.minimize(&input) {
            Err(Error::ConservationViolation { creditors, debtors }) => {
                assert_eq!(creditors, Decimal::new(3000, 2));
                assert_eq!(debtors, Decimal::new(1000, 2));
            }
            other => panic!("expected conservation violation, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_user_rejected() {
        let input = balances(&[("A", 1000), ("A", -1000)]);
        assert!(matches!(
            GreedyMinimizer.minimize(&input),
            Err(Error::InvalidBalance(_))
        ));
    }

    #[test]
    fn test_overflowing_totals_rejected() {
        let input = vec![
            Balance::new("A", Decimal::MAX),
            Balance::new("B", Decimal::MAX),
            Balance::new("C", Decimal::MIN),
        ];
        let err = GreedyMinimizer.minimize(&input).unwrap_err();
        assert!(matches!(err, Error::InvalidBalance(_)));
        assert_eq!(err.kind(), crate::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_idempotent() {
        let input = balances(&[("A", 2500), ("B", -700), ("C", 300), ("D", -2100)]);
        let first = GreedyMinimizer.minimize(&input).unwrap();
        let second = GreedyMinimizer.minimize(&input).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_plan_stats() {
        let input = balances(&[("A", 3000), ("B", -1000), ("C", -2000), ("D", 0)]);
        let plan = GreedyMinimizer.plan(&GroupId::new("trip"), &input).unwrap();

        assert_eq!(plan.stats.participants, 4);
        assert_eq!(plan.stats.creditors, 1);
        assert_eq!(plan.stats.debtors, 2);
        assert_eq!(plan.stats.transfer_count, 2);
        assert_eq!(plan.stats.total_volume, Decimal::new(3000, 2));
        assert!(plan.stats.transfer_count <= plan.stats.transfer_bound());
    }

    #[test]
    fn test_verify_plan_rejects_bad_transfers() {
        let input = balances(&[("A", 1000), ("B", -1000)]);

        let self_transfer = transfers(&[("A", "A", 1000)]);
        assert!(verify_plan(&input, &self_transfer).is_err());

        let short = transfers(&[("B", "A", 400)]);
        assert!(verify_plan(&input, &short).is_err());

        let dust = transfers(&[("B", "A", 1)]);
        assert!(verify_plan(&input, &dust).is_err());
    }
}
