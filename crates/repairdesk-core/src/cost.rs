//! # Cost Resolver
//!
//! Picks the unit cost used for COGS of a line item.
//!
//! ## Fallback Chain (first non-zero wins)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. historical_cost on the line item  ── frozen at transaction time     │
//! │              │ zero / absent                                            │
//! │              ▼                                                          │
//! │  2. master cost of part_id @ branch   ── current part master            │
//! │              │ zero / absent                                            │
//! │              ▼                                                          │
//! │  3. master cost of sku @ branch       ── records that only kept a SKU   │
//! │              │ zero / absent                                            │
//! │              ▼                                                          │
//! │  4. 0                                 ── MissingCostData (diagnostic)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Step 1 comes first so that re-running last quarter's report after a
//! supplier price change still yields last quarter's profit.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{LineItem, PartCostEntry};

/// Which step of the chain produced the cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CostSource {
    Historical,
    MasterById,
    MasterBySku,
    /// Nothing found; cost is zero and profit is overstated.
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ResolvedCost {
    pub unit_cost: Money,
    pub source: CostSource,
}

impl ResolvedCost {
    #[inline]
    pub fn is_missing(&self) -> bool {
        self.source == CostSource::Missing
    }

    /// `unit_cost × quantity`.
    #[inline]
    pub fn line_cost(&self, quantity: i64) -> Money {
        self.unit_cost.multiply_quantity(quantity)
    }
}

// =============================================================================
// Cost Book
// =============================================================================

/// Branch-scoped index over the part master.
///
/// Built once per snapshot; lookups are by part id or by SKU. When the
/// master lists the same part twice for a branch, the first entry wins.
#[derive(Debug, Clone, Default)]
pub struct CostBook {
    by_part: HashMap<String, BTreeMap<String, Money>>,
    by_sku: HashMap<String, BTreeMap<String, Money>>,
}

impl CostBook {
    pub fn new(entries: &[PartCostEntry]) -> Self {
        let mut book = CostBook::default();
        for entry in entries {
            let part_id = entry.part_id.trim();
            let sku = entry.sku.trim();
            for (branch, cost) in &entry.cost_by_branch {
                if !part_id.is_empty() {
                    book.by_part
                        .entry(part_id.to_string())
                        .or_default()
                        .entry(branch.clone())
                        .or_insert(*cost);
                }
                if !sku.is_empty() {
                    book.by_sku
                        .entry(sku.to_string())
                        .or_default()
                        .entry(branch.clone())
                        .or_insert(*cost);
                }
            }
        }
        book
    }

    /// Number of distinct part ids in the master.
    pub fn len(&self) -> usize {
        self.by_part.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_part.is_empty() && self.by_sku.is_empty()
    }

    /// Current master cost of `part_id` at `branch_id`.
    pub fn master_cost(&self, part_id: &str, branch_id: &str) -> Option<Money> {
        self.by_part
            .get(part_id.trim())
            .and_then(|branches| branches.get(branch_id))
            .copied()
    }

    /// Current master cost of `sku` at `branch_id`.
    pub fn master_cost_by_sku(&self, sku: &str, branch_id: &str) -> Option<Money> {
        self.by_sku
            .get(sku.trim())
            .and_then(|branches| branches.get(branch_id))
            .copied()
    }

    /// Runs the fallback chain.
    ///
    /// ```rust
    /// use std::collections::BTreeMap;
    /// use repairdesk_core::cost::{CostBook, CostSource};
    /// use repairdesk_core::money::Money;
    /// use repairdesk_core::types::PartCostEntry;
    ///
    /// let book = CostBook::new(&[PartCostEntry {
    ///     part_id: "P-1".into(),
    ///     sku: "LCD-IP11".into(),
    ///     cost_by_branch: BTreeMap::from([("b1".to_string(), Money::from_minor(120_000))]),
    /// }]);
    ///
    /// // Historical cost wins even though the master changed since.
    /// let r = book.resolve("P-1", "LCD-IP11", "b1", Some(Money::from_minor(100_000)));
    /// assert_eq!((r.unit_cost.minor(), r.source), (100_000, CostSource::Historical));
    ///
    /// // Another branch has no entry: falls through to zero.
    /// let r = book.resolve("P-1", "LCD-IP11", "b2", None);
    /// assert_eq!((r.unit_cost.minor(), r.source), (0, CostSource::Missing));
    /// ```
    pub fn resolve(
        &self,
        part_id: &str,
        sku: &str,
        branch_id: &str,
        historical_cost: Option<Money>,
    ) -> ResolvedCost {
        let found = historical_cost
            .and_then(Money::non_zero)
            .map(|c| (c, CostSource::Historical))
            .or_else(|| {
                self.master_cost(part_id, branch_id)
                    .and_then(Money::non_zero)
                    .map(|c| (c, CostSource::MasterById))
            })
            .or_else(|| {
                self.master_cost_by_sku(sku, branch_id)
                    .and_then(Money::non_zero)
                    .map(|c| (c, CostSource::MasterBySku))
            });

        match found {
            Some((unit_cost, source)) => ResolvedCost { unit_cost, source },
            None => {
                debug!(part_id, sku, branch_id, "No cost data, resolving to zero");
                ResolvedCost {
                    unit_cost: Money::zero(),
                    source: CostSource::Missing,
                }
            }
        }
    }

    /// Resolves the cost of a line item recorded at `branch_id`.
    pub fn resolve_line(&self, item: &LineItem, branch_id: &str) -> ResolvedCost {
        self.resolve(&item.part_id, &item.sku, branch_id, item.historical_cost)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(part_id: &str, sku: &str, costs: &[(&str, i64)]) -> PartCostEntry {
        PartCostEntry {
            part_id: part_id.to_string(),
            sku: sku.to_string(),
            cost_by_branch: costs
                .iter()
                .map(|(b, c)| (b.to_string(), Money::from_minor(*c)))
                .collect(),
        }
    }

    fn book() -> CostBook {
        CostBook::new(&[
            entry("P-1", "LCD-IP11", &[("b1", 120_000), ("b2", 125_000)]),
            entry("", "BAT-IP11", &[("b1", 80_000)]),
            entry("P-3", "CASE", &[("b1", 0)]),
        ])
    }

    #[test]
    fn test_historical_cost_first() {
        let r = book().resolve("P-1", "LCD-IP11", "b1", Some(Money::from_minor(90_000)));
        assert_eq!(r.source, CostSource::Historical);
        assert_eq!(r.unit_cost.minor(), 90_000);
    }

    #[test]
    fn test_zero_historical_cost_falls_through() {
        let r = book().resolve("P-1", "LCD-IP11", "b2", Some(Money::zero()));
        assert_eq!(r.source, CostSource::MasterById);
        assert_eq!(r.unit_cost.minor(), 125_000);
    }

    #[test]
    fn test_sku_fallback_is_never_zero() {
        // historical 0, no master entry by id, master entry by sku
        let r = book().resolve("P-unknown", "BAT-IP11", "b1", Some(Money::zero()));
        assert_eq!(r.source, CostSource::MasterBySku);
        assert_eq!(r.unit_cost.minor(), 80_000);
    }

    #[test]
    fn test_zero_master_cost_is_skipped() {
        let r = book().resolve("P-3", "CASE", "b1", None);
        assert!(r.is_missing());
        assert_eq!(r.line_cost(5), Money::zero());
    }

    #[test]
    fn test_lookups_are_branch_scoped() {
        let b = book();
        assert_eq!(b.master_cost("P-1", "b1"), Some(Money::from_minor(120_000)));
        assert_eq!(b.master_cost("P-1", "b9"), None);
        assert!(b.resolve("P-1", "LCD-IP11", "b9", None).is_missing());
    }

    #[test]
    fn test_first_entry_wins() {
        let b = CostBook::new(&[
            entry("P-1", "", &[("b1", 100)]),
            entry("P-1", "", &[("b1", 200)]),
        ]);
        assert_eq!(b.master_cost("P-1", "b1"), Some(Money::from_minor(100)));
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_len_counts_parts_with_an_id() {
        // the sku-only entry is reachable by sku but is not a part id
        assert_eq!(book().len(), 2);
        assert!(!book().is_empty());
        assert!(CostBook::default().is_empty());
        assert_eq!(CostBook::default().len(), 0);
    }
}
