//! # repairdesk-core: Ledger Reconciliation & Inventory Projection Engine
//!
//! Turns raw business records of a multi-branch repair shop into revenue,
//! cost of goods sold, profit and stock figures. Pure functions only.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      RepairDesk Ledger Architecture                     │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │           Fetch layer / ledger-report (snapshot JSON)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ RawSnapshot                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            ★ repairdesk-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   normalize ──► Snapshot ──┬──► aggregate ──► AggregateResult   │   │
//! │  │                            │       ▲   ▲                        │   │
//! │  │                            │    cost   category                 │   │
//! │  │                            │       ▲                            │   │
//! │  │   date_range ──► DateRange ┘       │                            │   │
//! │  │                                    │                            │   │
//! │  │                            └──► ledger ──► StockProjection      │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO GLOBAL STATE • INPUTS NEVER MUTATED               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          Presentation (cards, charts, tables) - elsewhere       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`normalize`] - Alias tables and the raw → canonical record mapping
//! - [`date_range`] - Presets resolved into local calendar dates
//! - [`cost`] - Historical → master-by-id → master-by-sku cost fallback
//! - [`category`] - Cash categories that duplicate other streams
//! - [`aggregate`] - Revenue / COGS / profit folds
//! - [`ledger`] - Stock replay, append, valuation, store cross-check
//! - [`snapshot`] - The bundled input of every entry point
//! - [`money`], [`types`], [`validation`], [`error`] - Supporting pieces
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same snapshot, same answer
//! 2. **Local Days**: records are bucketed by their calendar date in the shop's zone
//! 3. **Integer Money**: đồng as i64, rounded once at the boundary
//! 4. **Diagnostics, Not Panics**: bad data degrades a figure and is counted
//!
//! ## Example Usage
//!
//! ```rust
//! use repairdesk_core::aggregate::{Aggregator, BranchScope};
//! use repairdesk_core::date_range::{resolve_for_day, RangePreset};
//! use repairdesk_core::snapshot::{RawSnapshot, Snapshot};
//!
//! let raw: RawSnapshot = serde_json::from_str(r#"{
//!     "sales": [{ "id": "s1", "date": "2024-06-01T10:00:00+07:00",
//!                 "total": 500000, "branchId": "b1" }],
//!     "cashTransactions": [{ "id": "c1", "date": "2024-06-01T10:05:00+07:00",
//!                 "type": "income", "category": "Bán hàng",
//!                 "amount": 500000, "branchId": "b1" }]
//! }"#).unwrap();
//!
//! let zone = repairdesk_core::default_zone();
//! let (snapshot, _) = Snapshot::from_raw(&raw, zone);
//! let costs = snapshot.cost_book();
//! let today = chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
//! let range = resolve_for_day(&RangePreset::Today, today).range;
//!
//! let agg = Aggregator::new(&costs, zone)
//!     .aggregate_snapshot(&snapshot, &BranchScope::branch("b1"), &range);
//! assert_eq!(agg.result.revenue.minor(), 500_000); // not 1.000.000
//! ```

use chrono::{FixedOffset, Offset, Utc};

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregate;
pub mod category;
pub mod cost;
pub mod date_range;
pub mod error;
pub mod ledger;
pub mod money;
pub mod normalize;
pub mod snapshot;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use aggregate::{AggregateDiagnostics, AggregateResult, Aggregation, Aggregator, BranchScope};
pub use cost::CostBook;
pub use date_range::{DateRange, RangePreset, Resolution};
pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::{InventoryLedger, StockProjection};
pub use money::Money;
pub use snapshot::{NormalizeReport, RawSnapshot, Snapshot};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default shop zone offset: UTC+07:00.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 7 * 60;

/// Largest offset any real zone uses, in minutes.
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// The zone for `offset_minutes` east of UTC, if it is a real offset.
pub fn zone_from_minutes(offset_minutes: i32) -> Option<FixedOffset> {
    if offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
        return None;
    }
    FixedOffset::east_opt(offset_minutes * 60)
}

/// UTC+07:00.
pub fn default_zone() -> FixedOffset {
    zone_from_minutes(DEFAULT_UTC_OFFSET_MINUTES).unwrap_or_else(|| Utc.fix())
}
