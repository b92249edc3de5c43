//! # Snapshot
//!
//! The materialized input of every engine entry point.
//!
//! ```text
//! ┌──────────────────┐   Snapshot::from_raw   ┌──────────────────────────┐
//! │   RawSnapshot    │ ─────────────────────► │        Snapshot          │
//! │  Vec<Value> × 5  │      (Normalizer)      │  canonical records × 5   │
//! └──────────────────┘                        └────────────┬─────────────┘
//!                                                          │ + NormalizeReport
//!                                                          ▼
//!                                        Aggregator / ledger::project
//! ```
//!
//! The fetch layer owns consistency of the snapshot. The engine never holds
//! on to one between calls: callers re-fetch and re-run.

use std::collections::BTreeSet;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use ts_rs::TS;

use crate::aggregate::branch_ids;
use crate::cost::CostBook;
use crate::normalize::{Normalizer, RawRecord};
use crate::types::{
    CashTransactionRecord, InventoryTransaction, PartCostEntry, SaleRecord, WorkOrderRecord,
};

/// Raw collections as exported by the upstream store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSnapshot {
    #[serde(default)]
    pub sales: Vec<Value>,
    #[serde(default, alias = "workOrders")]
    pub work_orders: Vec<Value>,
    #[serde(default, alias = "cashTransactions")]
    pub cash_transactions: Vec<Value>,
    #[serde(default, alias = "partsMaster")]
    pub parts: Vec<Value>,
    #[serde(default, alias = "inventoryTransactions", alias = "inventory_transactions")]
    pub inventory: Vec<Value>,
}

/// Counts from one normalization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NormalizeReport {
    pub sales: usize,
    pub work_orders: usize,
    pub cash_transactions: usize,
    pub parts: usize,
    pub inventory: usize,
    /// Records kept whose date did not parse; date-bounded reports skip them.
    pub undated_records: usize,
    /// Entries that could not become a record at all (not an object, or an
    /// inventory row of unknown type).
    pub rejected_records: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub sales: Vec<SaleRecord>,
    pub work_orders: Vec<WorkOrderRecord>,
    pub cash_transactions: Vec<CashTransactionRecord>,
    pub parts: Vec<PartCostEntry>,
    pub inventory: Vec<InventoryTransaction>,
}

impl Snapshot {
    /// Normalizes every collection of `raw` with timestamps placed in `zone`.
    pub fn from_raw(raw: &RawSnapshot, zone: FixedOffset) -> (Snapshot, NormalizeReport) {
        let normalizer = Normalizer::new(zone);
        let mut report = NormalizeReport::default();

        let sales: Vec<SaleRecord> = objects(&raw.sales, &mut report)
            .map(|r| normalizer.sale(r))
            .collect();
        let work_orders: Vec<WorkOrderRecord> = objects(&raw.work_orders, &mut report)
            .map(|r| normalizer.work_order(r))
            .collect();
        let cash_transactions: Vec<CashTransactionRecord> =
            objects(&raw.cash_transactions, &mut report)
                .map(|r| normalizer.cash_transaction(r))
                .collect();
        let parts: Vec<PartCostEntry> = objects(&raw.parts, &mut report)
            .map(|r| normalizer.part(r))
            .collect();

        let inventory_rows: Vec<&RawRecord> = objects(&raw.inventory, &mut report).collect();
        let inventory: Vec<InventoryTransaction> = inventory_rows
            .iter()
            .filter_map(|r| normalizer.inventory_transaction(r))
            .collect();
        report.rejected_records += inventory_rows.len() - inventory.len();

        report.sales = sales.len();
        report.work_orders = work_orders.len();
        report.cash_transactions = cash_transactions.len();
        report.parts = parts.len();
        report.inventory = inventory.len();
        report.undated_records = sales.iter().filter(|s| s.timestamp.is_none()).count()
            + work_orders
                .iter()
                .filter(|w| w.revenue_timestamp().is_none())
                .count()
            + cash_transactions
                .iter()
                .filter(|c| c.timestamp.is_none())
                .count()
            + inventory.iter().filter(|t| t.timestamp.is_none()).count();

        info!(
            sales = report.sales,
            work_orders = report.work_orders,
            cash = report.cash_transactions,
            parts = report.parts,
            inventory = report.inventory,
            undated = report.undated_records,
            rejected = report.rejected_records,
            "Snapshot normalized"
        );

        let snapshot = Snapshot {
            sales,
            work_orders,
            cash_transactions,
            parts,
            inventory,
        };
        (snapshot, report)
    }

    /// Cost index over the part master.
    pub fn cost_book(&self) -> CostBook {
        CostBook::new(&self.parts)
    }

    /// Every non-blank branch id mentioned by any collection.
    pub fn branches(&self) -> BTreeSet<String> {
        let mut ids: BTreeSet<String> =
            branch_ids(&self.sales, &self.work_orders, &self.cash_transactions)
                .into_iter()
                .map(str::to_string)
                .collect();
        ids.extend(
            self.inventory
                .iter()
                .map(|t| t.branch_id.as_str())
                .chain(self.parts.iter().flat_map(|p| p.cost_by_branch.keys().map(String::as_str)))
                .filter(|b| !b.is_empty())
                .map(str::to_string),
        );
        ids
    }
}

/// Object entries of a raw collection; anything else is counted as rejected.
fn objects<'v>(
    values: &'v [Value],
    report: &mut NormalizeReport,
) -> impl Iterator<Item = &'v RawRecord> {
    let (records, rejected): (Vec<_>, Vec<_>) = values.iter().partition(|v| v.is_object());
    if !rejected.is_empty() {
        debug!(count = rejected.len(), "Non-object entries rejected");
        report.rejected_records += rejected.len();
    }
    records.into_iter().filter_map(Value::as_object)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn zone() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn raw() -> RawSnapshot {
        serde_json::from_value(json!({
            "sales": [
                { "id": "s1", "date": "2024-06-01T10:00:00+07:00", "total": 500000, "branchId": "b1" },
                { "id": "s2", "date": "not a date", "total": 1, "branchId": "b1" },
                42
            ],
            "workOrders": [
                { "id": "w1", "creationDate": "2024-06-01", "paymentStatus": "paid", "total": 300000, "branchId": "b2" }
            ],
            "cashTransactions": [],
            "parts": [
                { "id": "P", "costByBranch": { "b3": 1000 } }
            ],
            "inventoryTransactions": [
                { "id": "t1", "type": "receipt", "partId": "P", "quantity": 10, "branchId": "b1" },
                { "id": "t2", "type": "teleport", "partId": "P", "quantity": 1, "branchId": "b1" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_from_raw_counts() {
        let (snapshot, report) = Snapshot::from_raw(&raw(), zone());
        assert_eq!(report.sales, 2);
        assert_eq!(report.work_orders, 1);
        assert_eq!(report.parts, 1);
        assert_eq!(report.inventory, 1);
        assert_eq!(report.undated_records, 2); // s2 and the inventory row
        assert_eq!(report.rejected_records, 2); // 42 and "teleport"
        assert_eq!(snapshot.sales[0].total.minor(), 500_000);
    }

    #[test]
    fn test_branches_cover_all_collections() {
        let (snapshot, _) = Snapshot::from_raw(&raw(), zone());
        let branches: Vec<String> = snapshot.branches().into_iter().collect();
        assert_eq!(branches, vec!["b1", "b2", "b3"]);
    }

    #[test]
    fn test_missing_collections_default_to_empty() {
        let raw: RawSnapshot = serde_json::from_value(json!({})).unwrap();
        let (snapshot, report) = Snapshot::from_raw(&raw, zone());
        assert_eq!(snapshot, Snapshot::default());
        assert_eq!(report, NormalizeReport::default());
        assert!(snapshot.cost_book().is_empty());
    }
}
