//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use crate::config::ReportConfig;
use crate::report::Period;

#[derive(Parser, Debug)]
#[command(name = "ledger-report", version)]
#[command(about = "Revenue, profit and stock figures from a RepairDesk snapshot")]
pub struct Cli {
    /// Snapshot JSON with sales, workOrders, cashTransactions, parts and
    /// inventoryTransactions arrays.
    #[arg(long, short = 's', env = "REPAIRDESK_SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Config file (defaults to the platform config directory).
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Branch id, or "all".
    #[arg(long, short = 'b')]
    pub branch: Option<String>,

    /// Period preset: today, last-3-days, last-7-days, this-week, last-week,
    /// this-month, month-N, quarter-N, year.
    #[arg(long, short = 'p', conflicts_with_all = ["start", "end"])]
    pub preset: Option<String>,

    /// Custom period start (YYYY-MM-DD or DD/MM/YYYY).
    #[arg(long, requires = "end")]
    pub start: Option<String>,

    /// Custom period end, inclusive.
    #[arg(long, requires = "start")]
    pub end: Option<String>,

    /// Add one point per day of the period.
    #[arg(long)]
    pub daily: bool,

    /// Add one result per branch.
    #[arg(long)]
    pub per_branch: bool,

    /// Single-line JSON instead of pretty-printed.
    #[arg(long)]
    pub compact: bool,
}

impl Cli {
    /// Flags win over file and environment.
    pub fn apply_to(&self, config: &mut ReportConfig) {
        if let Some(branch) = &self.branch {
            config.engine.branch_id = branch.clone();
        }
        if let Some(preset) = &self.preset {
            config.engine.default_preset = preset.clone();
        }
    }

    /// Custom bounds when both are given, otherwise the configured preset.
    pub fn period(&self, config: &ReportConfig) -> crate::error::ReportResult<Period> {
        match (&self.start, &self.end) {
            (Some(start), Some(end)) => Ok(Period::Custom {
                start: start.clone(),
                end: end.clone(),
            }),
            _ => Ok(Period::Preset(config.default_preset()?)),
        }
    }
}
