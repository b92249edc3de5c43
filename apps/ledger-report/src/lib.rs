//! # RepairDesk Ledger Report
//!
//! Command-line front end for `repairdesk-core`: reads a snapshot file,
//! resolves the period and branch, and prints the figures as JSON.
//!
//! ## Module Structure
//! ```text
//! ledger_report/
//! ├── cli.rs     ─► clap arguments and flag overrides
//! ├── config.rs  ─► ReportConfig (TOML file + REPAIRDESK_* environment)
//! ├── error.rs   ─► ReportError and exit codes
//! └── report.rs  ─► build_report: snapshot ─► engine ─► Report
//! ```
//!
//! ## Run Sequence
//! 1. Initialize tracing (stderr, `RUST_LOG` aware)
//! 2. Load config and apply flags
//! 3. Read and normalize the snapshot
//! 4. Resolve the period against today in the shop's zone
//! 5. Aggregate, project stock, serialize

pub mod cli;
pub mod config;
pub mod error;
pub mod report;

use chrono::Utc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::ReportConfig;
use crate::error::ReportResult;
use crate::report::{build_report, ReportOptions};
use repairdesk_core::snapshot::RawSnapshot;

/// Runs one report and returns the JSON text to print.
pub fn run(cli: &Cli) -> ReportResult<String> {
    let mut config = ReportConfig::load(cli.config.clone())?;
    cli.apply_to(&mut config);
    config.validate()?;

    let zone = config.zone()?;
    let options = ReportOptions {
        scope: config.scope(),
        period: cli.period(&config)?,
        zone,
        daily: cli.daily,
        per_branch: cli.per_branch,
        warn_on_negative_stock: config.inventory.warn_on_negative_stock,
    };

    info!(path = ?cli.snapshot, "Reading snapshot");
    let contents = std::fs::read_to_string(&cli.snapshot)?;
    let raw: RawSnapshot = serde_json::from_str(&contents)?;

    let today = Utc::now().with_timezone(&zone).date_naive();
    let report = build_report(&raw, &options, today);

    let json = if cli.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    Ok(json)
}

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr so stdout carries only the report.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=repairdesk_core=trace` - Show trace for the engine only
/// - Default: INFO, DEBUG for the engine
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,repairdesk_core=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
