//! Error types for settlement engine

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Settlement errors
#[derive(Error, Debug)]
pub enum Error {
    /// Ledger error
    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger_core::Error),

    /// Creditor and debtor totals disagree beyond tolerance
    #[error("Conservation violation: creditors hold {creditors}, debtors owe {debtors}")]
    ConservationViolation {
        /// Σ positive balances
        creditors: Decimal,
        /// Σ |negative balances|
        debtors: Decimal,
    },

    /// Malformed balance snapshot
    #[error("Invalid balance: {0}")]
    InvalidBalance(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Coarse classification for callers deciding how to react
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The ledger fed to the engine is inconsistent; retrying will not help
    InconsistentState,
    /// The request itself is malformed
    InvalidInput,
    /// Referenced record does not exist
    NotFound,
    /// Persistence failed; the whole unit may be retried
    Transient,
    /// Anything else
    Other,
}

impl Error {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Ledger(e) => match e {
                ledger_core::Error::InvariantViolation(_) => ErrorKind::InconsistentState,
                ledger_core::Error::InvalidInput(_) | ledger_core::Error::InvalidTransition(_) => {
                    ErrorKind::InvalidInput
                }
                ledger_core::Error::SettlementNotFound(_) => ErrorKind::NotFound,
                e if e.is_transient() => ErrorKind::Transient,
                _ => ErrorKind::Other,
            },
            Error::ConservationViolation { .. } => ErrorKind::InconsistentState,
            Error::InvalidBalance(_) => ErrorKind::InvalidInput,
            Error::Io(_) => ErrorKind::Transient,
            Error::Config(_) | Error::Serialization(_) | Error::Other(_) => ErrorKind::Other,
        }
    }

    /// Whether the whole unit may be retried
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
