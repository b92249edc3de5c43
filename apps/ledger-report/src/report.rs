//! # Report Assembly
//!
//! Runs the engine over one snapshot and gathers everything the caller
//! prints.
//!
//! ```text
//! RawSnapshot ──► Snapshot::from_raw ──┬──► Aggregator ──► summary / daily / per_branch
//!                                      │
//! Period ──► resolver ──► DateRange ───┘
//!                                      └──► ledger::project ──► stock levels,
//!                                                               warnings, valuation
//! ```

use chrono::{FixedOffset, NaiveDate};
use repairdesk_core::aggregate::{
    Aggregation, Aggregator, BranchBreakdown, BranchScope, DailySeries,
};
use repairdesk_core::date_range::{
    resolve_custom_strs, resolve_for_day, DateRange, RangeDiagnostic, RangePreset,
};
use repairdesk_core::ledger::{project, StockLevel, StockValuation, StockWarning};
use repairdesk_core::snapshot::{NormalizeReport, RawSnapshot, Snapshot};
use repairdesk_core::{InventoryTransaction, Money};
use serde::Serialize;
use tracing::{info, warn};

/// The reporting period as requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Period {
    Preset(RangePreset),
    /// Bounds as typed by the user; parsed by the resolver.
    Custom { start: String, end: String },
}

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub scope: BranchScope,
    pub period: Period,
    pub zone: FixedOffset,
    pub daily: bool,
    pub per_branch: bool,
    pub warn_on_negative_stock: bool,
}

#[derive(Debug, Serialize)]
pub struct StockSection {
    pub levels: Vec<StockLevel>,
    pub warnings: Vec<StockWarning>,
    pub valuation: StockValuation,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub today: NaiveDate,
    pub scope: BranchScope,
    pub range: DateRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_fallback: Option<RangeDiagnostic>,
    pub normalize: NormalizeReport,
    pub summary: Aggregation,
    /// Sales plus work-order cost of goods for the summary period.
    pub cogs: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily: Option<DailySeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_branch: Option<BranchBreakdown>,
    pub stock: StockSection,
}

/// Builds the report for `today` (a local date in `options.zone`).
pub fn build_report(raw: &RawSnapshot, options: &ReportOptions, today: NaiveDate) -> Report {
    let (snapshot, normalize) = Snapshot::from_raw(raw, options.zone);

    let resolution = match &options.period {
        Period::Preset(preset) => resolve_for_day(preset, today),
        Period::Custom { start, end } => resolve_custom_strs(start, end, today),
    };
    let range = resolution.range;

    let costs = snapshot.cost_book();
    let aggregator = Aggregator::new(&costs, options.zone);
    let summary = aggregator.aggregate_snapshot(&snapshot, &options.scope, &range);
    let daily = options
        .daily
        .then(|| aggregator.aggregate_daily(&snapshot, &options.scope, &range));
    let per_branch = options
        .per_branch
        .then(|| aggregator.aggregate_per_branch(&snapshot, &range));

    let in_scope: Vec<InventoryTransaction> = snapshot
        .inventory
        .iter()
        .filter(|tx| options.scope.includes(&tx.branch_id))
        .cloned()
        .collect();
    let projection = project(&in_scope);
    let warnings = projection.warnings();
    if options.warn_on_negative_stock {
        for w in &warnings {
            warn!(
                part_id = %w.part_id,
                branch_id = %w.branch_id,
                quantity = w.quantity,
                "Negative projected stock"
            );
        }
    }

    let cogs = summary.result.cogs();
    info!(
        %range,
        revenue = %summary.result.revenue,
        %cogs,
        profit = %summary.result.profit,
        stock_rows = projection.len(),
        cost_parts = costs.len(),
        "Report built"
    );

    Report {
        today,
        scope: options.scope.clone(),
        range,
        range_fallback: resolution.diagnostic,
        normalize,
        summary,
        cogs,
        daily,
        per_branch,
        stock: StockSection {
            levels: projection.levels().cloned().collect(),
            warnings,
            valuation: projection.valuation(&costs),
        },
    }
}
