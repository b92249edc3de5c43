//! # Inventory Ledger Projector
//!
//! Current stock is never stored here; it is derived by replaying the
//! append-only sequence of inventory transactions.
//!
//! ## Replay
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ledger (any order)                         projection                  │
//! │                                                                         │
//! │  receipt  P @ b1  +10  ─┐                                               │
//! │  issue    P @ b1   -3  ─┼──► group by (part, branch) ──► (P, b1) =  7   │
//! │  receipt  Q @ b2   +5  ─┘    Σ signed quantity           (Q, b2) =  5   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//! 1. Replay is a sum, so the order of transactions never matters
//! 2. `append` refuses a transaction whose id is already present
//! 3. Negative stock is allowed (returns, corrections) and reported as a
//!    [`StockWarning`], never an error
//! 4. The upstream store may adjust stock on its own; [`StockProjection::cross_check`]
//!    compares its figures with the replay instead of trusting either side

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ts_rs::TS;

use crate::cost::{CostBook, CostSource};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::InventoryTransaction;
use crate::validation::validate_inventory_transaction;

// =============================================================================
// Keys & Rows
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockKey {
    pub part_id: String,
    pub branch_id: String,
}

impl StockKey {
    pub fn new(part_id: &str, branch_id: &str) -> Self {
        StockKey {
            part_id: part_id.to_string(),
            branch_id: branch_id.to_string(),
        }
    }
}

/// Replayed stock of one part at one branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockLevel {
    pub part_id: String,
    pub branch_id: String,
    /// First non-blank name seen in the ledger.
    pub part_name: String,
    pub quantity: i64,
}

/// Projected stock below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockWarning {
    pub part_id: String,
    pub branch_id: String,
    pub quantity: i64,
}

/// A (part, branch) where the store's stock disagrees with the replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockDiscrepancy {
    pub part_id: String,
    pub branch_id: String,
    pub replayed: i64,
    pub external: i64,
}

impl StockDiscrepancy {
    /// `external − replayed`.
    pub fn difference(&self) -> i64 {
        self.external.saturating_sub(self.replayed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ValuationLine {
    pub part_id: String,
    pub branch_id: String,
    pub quantity: i64,
    pub unit_cost: Money,
    pub cost_source: CostSource,
    /// `max(quantity, 0) × unit_cost`.
    pub value: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockValuation {
    pub lines: Vec<ValuationLine>,
    pub total: Money,
}

// =============================================================================
// Projection
// =============================================================================

/// Stock per (part, branch), derived from a ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockProjection {
    levels: BTreeMap<StockKey, StockLevel>,
}

impl StockProjection {
    /// Replayed quantity, 0 when the part never moved at that branch.
    pub fn stock(&self, part_id: &str, branch_id: &str) -> i64 {
        self.levels
            .get(&StockKey::new(part_id, branch_id))
            .map_or(0, |level| level.quantity)
    }

    /// Levels ordered by part id, then branch id.
    pub fn levels(&self) -> impl Iterator<Item = &StockLevel> {
        self.levels.values()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn warnings(&self) -> Vec<StockWarning> {
        self.levels
            .values()
            .filter(|level| level.quantity < 0)
            .map(|level| StockWarning {
                part_id: level.part_id.clone(),
                branch_id: level.branch_id.clone(),
                quantity: level.quantity,
            })
            .collect()
    }

    /// Values on-hand stock at current master cost of each branch.
    pub fn valuation(&self, costs: &CostBook) -> StockValuation {
        let lines: Vec<ValuationLine> = self
            .levels
            .values()
            .map(|level| {
                let cost = costs.resolve(&level.part_id, "", &level.branch_id, None);
                ValuationLine {
                    part_id: level.part_id.clone(),
                    branch_id: level.branch_id.clone(),
                    quantity: level.quantity,
                    unit_cost: cost.unit_cost,
                    cost_source: cost.source,
                    value: cost.line_cost(level.quantity.max(0)),
                }
            })
            .collect();
        let total = lines.iter().map(|l| l.value).sum();
        StockValuation { lines, total }
    }

    /// Compares the replay with stock figures held by the external store.
    ///
    /// A key missing on either side counts as 0 there.
    pub fn cross_check(&self, external: &[StockLevel]) -> Vec<StockDiscrepancy> {
        let mut theirs: BTreeMap<StockKey, i64> = BTreeMap::new();
        for level in external {
            let total = theirs
                .entry(StockKey::new(&level.part_id, &level.branch_id))
                .or_default();
            *total = total.saturating_add(level.quantity);
        }

        let mut keys: Vec<&StockKey> = self.levels.keys().chain(theirs.keys()).collect();
        keys.sort();
        keys.dedup();

        let discrepancies: Vec<StockDiscrepancy> = keys
            .into_iter()
            .filter_map(|key| {
                let replayed = self.levels.get(key).map_or(0, |l| l.quantity);
                let external = theirs.get(key).copied().unwrap_or(0);
                (replayed != external).then(|| StockDiscrepancy {
                    part_id: key.part_id.clone(),
                    branch_id: key.branch_id.clone(),
                    replayed,
                    external,
                })
            })
            .collect();

        if !discrepancies.is_empty() {
            info!(count = discrepancies.len(), "Store stock differs from ledger replay");
        }
        discrepancies
    }
}

/// Replays `transactions` into stock per (part, branch).
///
/// ```rust
/// use repairdesk_core::ledger::project;
/// use repairdesk_core::money::Money;
/// use repairdesk_core::types::InventoryTransaction;
///
/// let ledger = vec![
///     InventoryTransaction::receipt("P", "LCD", "b1", 10, Money::from_minor(100_000)),
///     InventoryTransaction::issue("P", "LCD", "b1", 3),
/// ];
/// assert_eq!(project(&ledger).stock("P", "b1"), 7);
/// assert_eq!(project(&ledger).stock("P", "b2"), 0);
/// ```
pub fn project(transactions: &[InventoryTransaction]) -> StockProjection {
    let mut levels: BTreeMap<StockKey, StockLevel> = BTreeMap::new();
    for tx in transactions {
        let level = levels
            .entry(StockKey::new(&tx.part_id, &tx.branch_id))
            .or_insert_with(|| StockLevel {
                part_id: tx.part_id.clone(),
                branch_id: tx.branch_id.clone(),
                part_name: String::new(),
                quantity: 0,
            });
        level.quantity = level.quantity.saturating_add(tx.signed_quantity());
        if level.part_name.is_empty() {
            level.part_name = tx.part_name.trim().to_string();
        }
    }

    let projection = StockProjection { levels };
    for warning in projection.warnings() {
        debug!(
            part_id = %warning.part_id,
            branch_id = %warning.branch_id,
            quantity = warning.quantity,
            "Negative projected stock"
        );
    }
    projection
}

/// Returns `transactions` with `tx` appended.
///
/// ## Errors
/// - [`CoreError::Validation`] when `tx` breaks an inventory rule
/// - [`CoreError::DuplicateTransactionId`] when its id is already present;
///   the caller must not apply the append
pub fn append(
    transactions: &[InventoryTransaction],
    tx: InventoryTransaction,
) -> CoreResult<Vec<InventoryTransaction>> {
    validate_inventory_transaction(&tx)?;
    if transactions.iter().any(|existing| existing.id == tx.id) {
        warn!(id = %tx.id, "Duplicate inventory transaction rejected");
        return Err(CoreError::DuplicateTransactionId { id: tx.id });
    }

    let mut next = Vec::with_capacity(transactions.len() + 1);
    next.extend_from_slice(transactions);
    next.push(tx);
    Ok(next)
}

// =============================================================================
// Ledger
// =============================================================================

/// Immutable ledger value. Appending yields a new ledger.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryLedger {
    transactions: Vec<InventoryTransaction>,
    ids: HashSet<String>,
}

impl InventoryLedger {
    pub fn new() -> Self {
        InventoryLedger::default()
    }

    /// Wraps transactions loaded from the store as-is. Loaded history is not
    /// re-validated; only new appends are.
    pub fn from_transactions(transactions: Vec<InventoryTransaction>) -> Self {
        let ids = transactions.iter().map(|t| t.id.clone()).collect();
        InventoryLedger { transactions, ids }
    }

    pub fn transactions(&self) -> &[InventoryTransaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn append(&self, tx: InventoryTransaction) -> CoreResult<InventoryLedger> {
        validate_inventory_transaction(&tx)?;
        if self.contains(&tx.id) {
            warn!(id = %tx.id, "Duplicate inventory transaction rejected");
            return Err(CoreError::DuplicateTransactionId { id: tx.id });
        }

        let mut next = self.clone();
        next.ids.insert(tx.id.clone());
        next.transactions.push(tx);
        Ok(next)
    }

    pub fn project(&self) -> StockProjection {
        project(&self.transactions)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InventoryTxKind, PartCostEntry};

    fn receipt(id: &str, part: &str, branch: &str, qty: i64) -> InventoryTransaction {
        let mut tx =
            InventoryTransaction::receipt(part, part, branch, qty, Money::from_minor(100_000));
        tx.id = id.to_string();
        tx
    }

    fn issue(id: &str, part: &str, branch: &str, qty: i64) -> InventoryTransaction {
        let mut tx = InventoryTransaction::issue(part, part, branch, qty);
        tx.id = id.to_string();
        tx
    }

    #[test]
    fn test_receive_then_issue() {
        let ledger = append(&[], receipt("t1", "P", "b1", 10)).unwrap();
        assert_eq!(ledger[0].kind, InventoryTxKind::Receipt);
        assert_eq!(ledger[0].total_price.minor(), 1_000_000);
        assert_eq!(project(&ledger).stock("P", "b1"), 10);

        let ledger = append(&ledger, issue("t2", "P", "b1", 3)).unwrap();
        assert_eq!(project(&ledger).stock("P", "b1"), 7);
    }

    #[test]
    fn test_replay_is_order_independent() {
        let txs = vec![
            receipt("t1", "P", "b1", 10),
            issue("t2", "P", "b1", 3),
            receipt("t3", "P", "b2", 4),
            issue("t4", "P", "b1", 8),
            receipt("t5", "Q", "b1", 1),
        ];
        let forward = project(&txs);
        let mut reversed = txs.clone();
        reversed.reverse();
        let mut rotated = txs.clone();
        rotated.rotate_left(2);

        assert_eq!(forward, project(&reversed));
        assert_eq!(forward, project(&rotated));
        assert_eq!(forward.stock("P", "b1"), -1);
        assert_eq!(forward.stock("P", "b2"), 4);
        assert_eq!(forward.len(), 3);
    }

    #[test]
    fn test_replay_saturates_at_i64_bounds() {
        let txs = vec![
            receipt("t1", "P", "b1", i64::MAX),
            receipt("t2", "P", "b1", i64::MAX),
            issue("t3", "Q", "b1", i64::MAX),
            issue("t4", "Q", "b1", i64::MAX),
        ];
        assert_eq!(txs[0].total_price.minor(), i64::MAX);

        let projection = project(&txs);
        assert_eq!(projection.stock("P", "b1"), i64::MAX);
        assert_eq!(projection.stock("Q", "b1"), i64::MIN);
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let ledger = vec![receipt("t1", "P", "b1", 10)];
        let err = append(&ledger, issue("t1", "P", "b1", 1)).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateTransactionId { ref id } if id == "t1"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_invalid_transaction_is_rejected() {
        let err = append(&[], issue("t1", "P", "b1", 0)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_negative_stock_is_a_warning() {
        let projection = project(&[issue("t1", "P", "b1", 2)]);
        assert_eq!(projection.stock("P", "b1"), -2);
        assert_eq!(
            projection.warnings(),
            vec![StockWarning {
                part_id: "P".to_string(),
                branch_id: "b1".to_string(),
                quantity: -2,
            }]
        );
    }

    #[test]
    fn test_valuation_uses_branch_cost() {
        let costs = CostBook::new(&[PartCostEntry {
            part_id: "P".to_string(),
            sku: String::new(),
            cost_by_branch: [
                ("b1".to_string(), Money::from_minor(100)),
                ("b2".to_string(), Money::from_minor(120)),
            ]
            .into(),
        }]);
        let projection = project(&[
            receipt("t1", "P", "b1", 10),
            receipt("t2", "P", "b2", 5),
            issue("t3", "Q", "b1", 1),
        ]);
        let valuation = projection.valuation(&costs);
        assert_eq!(valuation.total.minor(), 10 * 100 + 5 * 120);
        let negative = valuation.lines.iter().find(|l| l.part_id == "Q").unwrap();
        assert_eq!(negative.value, Money::zero());
        assert_eq!(negative.cost_source, CostSource::Missing);
    }

    #[test]
    fn test_cross_check_against_store() {
        let projection = project(&[receipt("t1", "P", "b1", 10), issue("t2", "P", "b1", 3)]);
        let store = vec![
            StockLevel {
                part_id: "P".to_string(),
                branch_id: "b1".to_string(),
                part_name: "P".to_string(),
                quantity: 4,
            },
            StockLevel {
                part_id: "Q".to_string(),
                branch_id: "b1".to_string(),
                part_name: "Q".to_string(),
                quantity: 0,
            },
        ];
        let diffs = projection.cross_check(&store);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].replayed, 7);
        assert_eq!(diffs[0].external, 4);
        assert_eq!(diffs[0].difference(), -3);
    }

    #[test]
    fn test_ledger_value_is_immutable() {
        let empty = InventoryLedger::new();
        let one = empty.append(receipt("t1", "P", "b1", 10)).unwrap();
        let two = one.append(issue("t2", "P", "b1", 3)).unwrap();

        assert!(empty.is_empty());
        assert_eq!(one.len(), 1);
        assert_eq!(two.project().stock("P", "b1"), 7);
        assert!(two.contains("t1"));
        assert!(matches!(
            two.append(receipt("t2", "P", "b1", 1)),
            Err(CoreError::DuplicateTransactionId { .. })
        ));
    }
}
