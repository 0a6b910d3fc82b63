//! Per-group balance map and the book it is paired with
//!
//! A [`GroupBook`] is the unit of shared state: a group's balances and the
//! settlement set computed from them always travel together.

use crate::{
    tolerance,
    types::{Balance, GroupId, Settlement, SettlementId, UserId},
    Error, Result,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Signed net balance per user, kept in ascending user order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupBalances(BTreeMap<UserId, Decimal>);

impl GroupBalances {
    /// Empty balance map
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate `delta` into the user's balance, creating the row if missing.
    ///
    /// A zero delta still materializes the row. Returns the new balance; a
    /// result outside the `Decimal` range leaves the row untouched.
    pub fn apply(&mut self, user_id: &UserId, delta: Decimal) -> Result<Decimal> {
        let balance = self.0.entry(user_id.clone()).or_insert(Decimal::ZERO);
        *balance = balance.checked_add(delta).ok_or_else(|| {
            Error::InvalidInput(format!(
                "balance of {} overflows applying {}",
                user_id, delta
            ))
        })?;
        Ok(*balance)
    }

    /// Balance of a user, if the row exists
    pub fn get(&self, user_id: &UserId) -> Option<Decimal> {
        self.0.get(user_id).copied()
    }

    /// Σ of all balances (zero for a consistent group)
    pub fn total(&self) -> Result<Decimal> {
        tolerance::checked_sum(self.0.values().copied())
            .ok_or_else(|| Error::InvalidInput("balance total overflows".to_string()))
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No rows
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate rows in canonical (ascending user) order
    pub fn iter(&self) -> impl Iterator<Item = (&UserId, &Decimal)> {
        self.0.iter()
    }

    /// Snapshot in canonical order
    pub fn snapshot(&self) -> Vec<Balance> {
        self.0
            .iter()
            .map(|(user_id, amount)| Balance::new(user_id.clone(), *amount))
            .collect()
    }
}

/// A group's balances and settlement set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBook {
    /// Group
    pub group_id: GroupId,

    /// Net balances
    pub balances: GroupBalances,

    /// Settlement records, in emission order
    pub settlements: Vec<Settlement>,

    /// Number of committed transactions
    pub version: u64,
}

impl GroupBook {
    /// Empty book for a group
    pub fn new(group_id: GroupId) -> Self {
        Self {
            group_id,
            balances: GroupBalances::new(),
            settlements: Vec::new(),
            version: 0,
        }
    }

    /// Look up a settlement by ID
    pub fn settlement(&self, settlement_id: SettlementId) -> Option<&Settlement> {
        self.settlements
            .iter()
            .find(|s| s.settlement_id == settlement_id)
    }
}
