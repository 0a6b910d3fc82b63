//! Core types for the ledger
//!
//! All types are designed for:
//! - Deterministic serialization (serde)
//! - Exact arithmetic (Decimal for money)

use crate::{tolerance, Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create new identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get as string
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Group identifier
    GroupId
);
string_id!(
    /// User identifier
    UserId
);
string_id!(
    /// Expense identifier (owned by the expense collaborator)
    ExpenseId
);

/// One user's part in an expense
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Participant
    pub user_id: UserId,

    /// Amount the user actually paid
    pub paid: Decimal,

    /// Amount the user was responsible for
    pub share: Decimal,
}

impl Participant {
    /// Create new participant record
    pub fn new(user_id: impl Into<UserId>, paid: Decimal, share: Decimal) -> Self {
        Self {
            user_id: user_id.into(),
            paid,
            share,
        }
    }

    /// `paid - share`
    pub fn balance_change(&self) -> Decimal {
        self.paid - self.share
    }

    /// Reject negative amounts
    pub fn validate(&self) -> Result<()> {
        if self.paid < Decimal::ZERO || self.share < Decimal::ZERO {
            return Err(Error::InvalidInput(format!(
                "participant {} has negative amount (paid {}, share {})",
                self.user_id, self.paid, self.share
            )));
        }
        Ok(())
    }
}

/// Whether an expense's deltas are being added or reversed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// New expense: `+balance_change`
    Apply,
    /// Deleted expense: `-balance_change`
    Reverse,
}

impl Direction {
    /// Multiplier for a participant's balance change
    pub fn sign(&self) -> Decimal {
        match self {
            Direction::Apply => Decimal::ONE,
            Direction::Reverse => Decimal::NEGATIVE_ONE,
        }
    }
}

/// Expense as seen by the ledger: who paid what and who owed what
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    /// Expense ID
    pub expense_id: ExpenseId,

    /// Group the expense belongs to
    pub group_id: GroupId,

    /// Participant records
    pub participants: Vec<Participant>,
}

impl Expense {
    /// Create new expense
    pub fn new(
        expense_id: impl Into<ExpenseId>,
        group_id: impl Into<GroupId>,
        participants: Vec<Participant>,
    ) -> Self {
        Self {
            expense_id: expense_id.into(),
            group_id: group_id.into(),
            participants,
        }
    }

    /// Total amount paid, `None` on overflow
    pub fn total_paid(&self) -> Option<Decimal> {
        tolerance::checked_sum(self.participants.iter().map(|p| p.paid))
    }

    /// Signed per-user deltas for the given direction
    pub fn deltas(&self, direction: Direction) -> Vec<(UserId, Decimal)> {
        self.participants
            .iter()
            .map(|p| (p.user_id.clone(), p.balance_change() * direction.sign()))
            .collect()
    }

    /// Check the expense distributes exactly what was paid.
    ///
    /// Shares must add up to the amount paid exactly; tolerance does not apply.
    pub fn validate(&self) -> Result<()> {
        if self.participants.is_empty() {
            return Err(Error::InvalidInput(format!(
                "expense {} has no participants",
                self.expense_id
            )));
        }

        for participant in &self.participants {
            participant.validate()?;
        }

        let drift = tolerance::checked_sum(self.participants.iter().map(|p| p.balance_change()))
            .ok_or_else(|| {
                Error::InvalidInput(format!("expense {} amounts overflow", self.expense_id))
            })?;
        if !drift.is_zero() {
            return Err(Error::InvariantViolation(format!(
                "expense {} does not conserve money: paid - shares = {}",
                self.expense_id, drift
            )));
        }

        Ok(())
    }
}

/// Balance row of a group snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// User
    pub user_id: UserId,

    /// Signed net balance (positive = is owed money)
    pub amount: Decimal,
}

impl Balance {
    /// Create new balance row
    pub fn new(user_id: impl Into<UserId>, amount: Decimal) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
        }
    }
}

/// Settlement identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettlementId(Uuid);

impl SettlementId {
    /// Generate a fresh ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SettlementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SettlementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Settlement status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementStatus {
    /// Recommended, not yet paid
    Pending,
    /// Marked as paid by an explicit action
    Paid,
}

/// Recommended (or recorded) transfer between two members of a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Settlement ID
    pub settlement_id: SettlementId,

    /// Group
    pub group_id: GroupId,

    /// Debtor (pays)
    pub from_user_id: UserId,

    /// Creditor (receives)
    pub to_user_id: UserId,

    /// Amount to transfer
    pub amount: Decimal,

    /// Status
    pub status: SettlementStatus,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// When the settlement was marked paid
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Settlement {
    /// New PENDING settlement
    pub fn pending(
        group_id: GroupId,
        from_user_id: UserId,
        to_user_id: UserId,
        amount: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            settlement_id: SettlementId::new(),
            group_id,
            from_user_id,
            to_user_id,
            amount,
            status: SettlementStatus::Pending,
            created_at,
            paid_at: None,
        }
    }

    /// Is still pending
    pub fn is_pending(&self) -> bool {
        self.status == SettlementStatus::Pending
    }

    /// PENDING → PAID
    pub fn mark_paid(&mut self, at: DateTime<Utc>) -> Result<()> {
        match self.status {
            SettlementStatus::Pending => {
                self.status = SettlementStatus::Paid;
                self.paid_at = Some(at);
                Ok(())
            }
            SettlementStatus::Paid => Err(Error::InvalidTransition(format!(
                "settlement {} is already paid",
                self.settlement_id
            ))),
        }
    }
}
