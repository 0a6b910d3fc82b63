//! Settlement planner binary
//!
//! Reads a balance snapshot as JSON and prints the transfers that settle it,
//! or previews the plan for a group held by the configured ledger.
//!
//! ```text
//! settle balances.json
//! echo '[{"user_id":"a","amount":"5"},{"user_id":"b","amount":"-5"}]' | settle -
//! LEDGER_STORAGE=file LEDGER_DATA_DIR=./data settle --group trip
//! ```

use anyhow::{bail, Context};
use ledger_core::{tolerance, Balance, GroupId};
use settlement::{Config, SettlementEngine};
use std::io::Read;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config = match std::env::var("SETTLEMENT_CONFIG") {
        Ok(path) => {
            tracing::info!("Loading config from: {}", path);
            Config::from_file(&path)?
        }
        Err(_) => Config::from_env()?,
    };
    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        storage = ?config.ledger.storage,
        paid_policy = ?config.paid_policy,
        "Starting"
    );
    let engine = SettlementEngine::from_config(config)?;

    let mut args = std::env::args().skip(1);
    let mut plan = match args.next().as_deref() {
        Some("--group") => {
            let Some(group) = args.next() else {
                bail!("usage: settle --group <group-id>");
            };
            engine.preview(&GroupId::new(group))?
        }
        Some(source) => {
            let content = if source == "-" {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("reading balances from stdin")?;
                buf
            } else {
                std::fs::read_to_string(source).with_context(|| format!("reading {}", source))?
            };

            let balances: Vec<Balance> =
                serde_json::from_str(&content).context("parsing balance snapshot")?;
            engine.plan_snapshot(&GroupId::new("cli"), &balances)?
        }
        None => bail!("usage: settle <balances.json | - | --group <group-id>>"),
    };
    for transfer in &mut plan.transfers {
        transfer.amount = tolerance::round_amount(transfer.amount);
    }

    tracing::info!(
        "{} balances → {} transfers (bound {})",
        plan.stats.participants,
        plan.stats.transfer_count,
        plan.stats.transfer_bound()
    );

    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
