//! Configuration for settlement engine

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Settlement engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Ledger configuration
    pub ledger: ledger_core::Config,

    /// How PAID settlements take part in recomputation
    pub paid_policy: PaidSettlementPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "settlement-engine".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            ledger: ledger_core::Config::default(),
            paid_policy: PaidSettlementPolicy::default(),
        }
    }
}

/// Treatment of PAID settlements when a group's set is recomputed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaidSettlementPolicy {
    /// Keep PAID records and net their amounts out of the raw balances, so a
    /// debt that was already paid is not requested again. Only PENDING
    /// records are regenerated.
    #[default]
    NetOut,

    /// Wipe the whole set, PAID records included, and regenerate it from the
    /// raw balances.
    Discard,
}

impl std::str::FromStr for PaidSettlementPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "net_out" => Ok(PaidSettlementPolicy::NetOut),
            "discard" => Ok(PaidSettlementPolicy::Discard),
            other => Err(Error::Config(format!("unknown paid policy: {}", other))),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config {
            ledger: ledger_core::Config::from_env()?,
            ..Config::default()
        };

        if let Ok(policy) = std::env::var("SETTLEMENT_PAID_POLICY") {
            config.paid_policy = policy.parse()?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::StorageBackend;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "settlement-engine");
        assert_eq!(config.paid_policy, PaidSettlementPolicy::NetOut);
        assert_eq!(config.ledger.storage, StorageBackend::Memory);
    }

    #[test]
    fn test_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settlement.toml");
        std::fs::write(
            &path,
            r#"
paid_policy = "discard"

[ledger]
storage = "file"
data_dir = "/srv/books"
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.paid_policy, PaidSettlementPolicy::Discard);
        assert_eq!(config.ledger.storage, StorageBackend::File);
        assert_eq!(config.service_name, "settlement-engine");
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            "net-out".parse::<PaidSettlementPolicy>().unwrap(),
            PaidSettlementPolicy::NetOut
        );
        assert_eq!(
            "DISCARD".parse::<PaidSettlementPolicy>().unwrap(),
            PaidSettlementPolicy::Discard
        );
        assert!("keep".parse::<PaidSettlementPolicy>().is_err());
    }
}
