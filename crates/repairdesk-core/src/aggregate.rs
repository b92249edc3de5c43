//! # Aggregation Engine
//!
//! Folds sales, work orders and cash transactions into revenue, COGS and
//! profit for a branch scope and a local date range.
//!
//! ## Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sales        revenue  = Σ sale.total                                   │
//! │               cogs     = Σ_lines resolved_cost × quantity               │
//! │                                                                         │
//! │  work orders  (admitted only: partial / paid / total_paid > 0)          │
//! │               revenue  = Σ (total_paid ?? total)                        │
//! │               cogs     = Σ parts cost + Σ service cost                  │
//! │                                                                         │
//! │  cash         other_income  = income  NOT in excluded-income set        │
//! │               other_expense = expense NOT in excluded-expense set       │
//! │                                                                         │
//! │  revenue      = sales + work orders + other_income                      │
//! │  gross_profit = (sales − cogs) + (work orders − cogs)                   │
//! │  profit       = gross_profit + other_income − other_expense             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entry point takes its inputs by reference and returns fresh values.
//! Records whose date did not parse are skipped and counted in
//! [`AggregateDiagnostics`]; nothing here returns an error.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::cost::CostBook;
use crate::date_range::{local_day, DateRange};
use crate::money::Money;
use crate::snapshot::Snapshot;
use crate::types::{
    CashDirection, CashTransactionRecord, CustomerRef, SaleRecord, WorkOrderRecord,
};

// =============================================================================
// Scope & Results
// =============================================================================

/// Which branches a report covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "branch_id", rename_all = "snake_case")]
pub enum BranchScope {
    /// Multi-branch overview.
    All,
    Branch(String),
}

impl BranchScope {
    pub fn branch(id: impl Into<String>) -> Self {
        BranchScope::Branch(id.into())
    }

    #[inline]
    pub fn includes(&self, branch_id: &str) -> bool {
        match self {
            BranchScope::All => true,
            BranchScope::Branch(id) => id == branch_id,
        }
    }
}

/// Totals for one scope and period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AggregateResult {
    pub revenue: Money,
    pub gross_profit: Money,
    pub profit: Money,
    pub other_income: Money,
    pub other_expense: Money,
    pub customer_count: usize,
    pub order_count: usize,

    pub sales_revenue: Money,
    pub sales_cogs: Money,
    pub work_order_revenue: Money,
    pub work_order_cogs: Money,
}

impl AggregateResult {
    pub fn cogs(&self) -> Money {
        self.sales_cogs + self.work_order_cogs
    }
}

/// Recoverable conditions met while folding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AggregateDiagnostics {
    /// In-scope records without a usable date.
    pub skipped_unparseable_dates: usize,
    /// Line items whose cost resolved to zero.
    pub missing_cost_lines: usize,
    /// Cash transactions left out because their category is counted elsewhere.
    pub excluded_cash_transactions: usize,
}

impl AggregateDiagnostics {
    pub fn is_clean(&self) -> bool {
        *self == AggregateDiagnostics::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Aggregation {
    pub result: AggregateResult,
    pub diagnostics: AggregateDiagnostics,
}

/// One day of a rolling chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailyPoint {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub result: AggregateResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailySeries {
    pub points: Vec<DailyPoint>,
    pub diagnostics: AggregateDiagnostics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BranchBreakdown {
    pub branches: BTreeMap<String, AggregateResult>,
    pub diagnostics: AggregateDiagnostics,
}

// =============================================================================
// Accumulator
// =============================================================================

/// Running sums for one bucket. Customer keys borrow from the records.
#[derive(Debug, Default)]
struct Accumulator<'r> {
    sales_revenue: Money,
    sales_cogs: Money,
    work_order_revenue: Money,
    work_order_cogs: Money,
    other_income: Money,
    other_expense: Money,
    customers: HashSet<&'r str>,
    order_count: usize,
}

impl<'r> Accumulator<'r> {
    fn add_customer(&mut self, customer: &'r CustomerRef) {
        if let Some(key) = customer.dedup_key() {
            self.customers.insert(key);
        }
    }

    fn finish(self) -> AggregateResult {
        let sales_profit = self.sales_revenue - self.sales_cogs;
        let work_order_profit = self.work_order_revenue - self.work_order_cogs;
        let gross_profit = sales_profit + work_order_profit;

        AggregateResult {
            revenue: self.sales_revenue + self.work_order_revenue + self.other_income,
            gross_profit,
            profit: gross_profit + self.other_income - self.other_expense,
            other_income: self.other_income,
            other_expense: self.other_expense,
            customer_count: self.customers.len(),
            order_count: self.order_count,
            sales_revenue: self.sales_revenue,
            sales_cogs: self.sales_cogs,
            work_order_revenue: self.work_order_revenue,
            work_order_cogs: self.work_order_cogs,
        }
    }
}

// =============================================================================
// Aggregator
// =============================================================================

/// Aggregation context: the cost master and the zone that defines local days.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'a> {
    costs: &'a CostBook,
    zone: FixedOffset,
}

impl<'a> Aggregator<'a> {
    pub fn new(costs: &'a CostBook, zone: FixedOffset) -> Self {
        Aggregator { costs, zone }
    }

    /// Totals for `scope` over `range`.
    pub fn aggregate(
        &self,
        sales: &[SaleRecord],
        work_orders: &[WorkOrderRecord],
        cash: &[CashTransactionRecord],
        scope: &BranchScope,
        range: &DateRange,
    ) -> Aggregation {
        let (mut buckets, diagnostics) =
            self.fold(sales, work_orders, cash, scope, range, |_, _| ());
        let result = buckets
            .remove(&())
            .map(Accumulator::finish)
            .unwrap_or_default();

        debug!(
            %range,
            ?scope,
            revenue = %result.revenue,
            profit = %result.profit,
            skipped = diagnostics.skipped_unparseable_dates,
            missing_costs = diagnostics.missing_cost_lines,
            "Aggregated period"
        );
        Aggregation { result, diagnostics }
    }

    /// [`aggregate`](Self::aggregate) over a whole snapshot.
    pub fn aggregate_snapshot(
        &self,
        snapshot: &Snapshot,
        scope: &BranchScope,
        range: &DateRange,
    ) -> Aggregation {
        self.aggregate(
            &snapshot.sales,
            &snapshot.work_orders,
            &snapshot.cash_transactions,
            scope,
            range,
        )
    }

    /// One point per day of `range`, empty days included as zeros.
    pub fn aggregate_daily(
        &self,
        snapshot: &Snapshot,
        scope: &BranchScope,
        range: &DateRange,
    ) -> DailySeries {
        let (mut buckets, diagnostics) = self.fold(
            &snapshot.sales,
            &snapshot.work_orders,
            &snapshot.cash_transactions,
            scope,
            range,
            |day, _| day,
        );
        let points = range
            .days()
            .map(|date| DailyPoint {
                date,
                result: buckets
                    .remove(&date)
                    .map(Accumulator::finish)
                    .unwrap_or_default(),
            })
            .collect();
        DailySeries {
            points,
            diagnostics,
        }
    }

    /// One result per branch seen anywhere in the snapshot, active or not.
    pub fn aggregate_per_branch(&self, snapshot: &Snapshot, range: &DateRange) -> BranchBreakdown {
        let (buckets, diagnostics) = self.fold(
            &snapshot.sales,
            &snapshot.work_orders,
            &snapshot.cash_transactions,
            &BranchScope::All,
            range,
            |_, branch| branch,
        );

        let mut branches: BTreeMap<String, AggregateResult> = snapshot
            .branches()
            .into_iter()
            .map(|b| (b, AggregateResult::default()))
            .collect();
        for (branch, acc) in buckets {
            branches.insert(branch.to_string(), acc.finish());
        }
        BranchBreakdown {
            branches,
            diagnostics,
        }
    }

    /// Shared fold. `key` picks the bucket from the local day and the branch.
    fn fold<'r, K, F>(
        &self,
        sales: &'r [SaleRecord],
        work_orders: &'r [WorkOrderRecord],
        cash: &'r [CashTransactionRecord],
        scope: &BranchScope,
        range: &DateRange,
        key: F,
    ) -> (BTreeMap<K, Accumulator<'r>>, AggregateDiagnostics)
    where
        K: Ord,
        F: Fn(NaiveDate, &'r str) -> K,
    {
        let mut buckets: BTreeMap<K, Accumulator<'r>> = BTreeMap::new();
        let mut diagnostics = AggregateDiagnostics::default();

        for sale in sales.iter().filter(|s| scope.includes(&s.branch_id)) {
            let Some(day) = self.day_in_range(
                sale.timestamp.as_ref(),
                range,
                &mut diagnostics,
                "sale",
                &sale.id,
            ) else {
                continue;
            };
            let acc = buckets.entry(key(day, &sale.branch_id)).or_default();

            acc.sales_revenue += sale.total;
            for item in &sale.items {
                let cost = self.costs.resolve_line(item, &sale.branch_id);
                if cost.is_missing() {
                    diagnostics.missing_cost_lines += 1;
                }
                acc.sales_cogs += cost.line_cost(item.quantity);
            }
            acc.add_customer(&sale.customer);
            acc.order_count += 1;
        }

        let admitted = work_orders
            .iter()
            .filter(|wo| scope.includes(&wo.branch_id) && wo.counts_toward_revenue());
        for wo in admitted {
            let timestamp = wo.revenue_timestamp();
            let Some(day) = self.day_in_range(
                timestamp.as_ref(),
                range,
                &mut diagnostics,
                "work_order",
                &wo.id,
            ) else {
                continue;
            };
            let acc = buckets.entry(key(day, &wo.branch_id)).or_default();

            acc.work_order_revenue += wo.recognised_revenue();
            for part in &wo.parts {
                let cost = self.costs.resolve_line(part, &wo.branch_id);
                if cost.is_missing() {
                    diagnostics.missing_cost_lines += 1;
                }
                acc.work_order_cogs += cost.line_cost(part.quantity);
            }
            acc.work_order_cogs += wo.services_cost();
            acc.add_customer(&wo.customer);
            acc.order_count += 1;
        }

        for tx in cash.iter().filter(|t| scope.includes(&t.branch_id)) {
            let Some(day) = self.day_in_range(
                tx.timestamp.as_ref(),
                range,
                &mut diagnostics,
                "cash",
                &tx.id,
            ) else {
                continue;
            };
            let excluded = match tx.direction {
                CashDirection::Income => tx.category.is_excluded_income(),
                CashDirection::Expense => tx.category.is_excluded_expense(),
            };
            if excluded {
                diagnostics.excluded_cash_transactions += 1;
                continue;
            }
            let acc = buckets.entry(key(day, &tx.branch_id)).or_default();
            match tx.direction {
                CashDirection::Income => acc.other_income += tx.amount,
                CashDirection::Expense => acc.other_expense += tx.amount,
            }
        }

        (buckets, diagnostics)
    }

    /// Local day of `timestamp` if it falls inside `range`.
    fn day_in_range(
        &self,
        timestamp: Option<&DateTime<FixedOffset>>,
        range: &DateRange,
        diagnostics: &mut AggregateDiagnostics,
        kind: &str,
        id: &str,
    ) -> Option<NaiveDate> {
        match timestamp {
            Some(ts) => {
                let day = local_day(ts, &self.zone);
                range.contains(day).then_some(day)
            }
            None => {
                debug!(kind, id, "Record without a usable date, skipped");
                diagnostics.skipped_unparseable_dates += 1;
                None
            }
        }
    }
}

/// The set of branch ids that appear in any stream.
pub(crate) fn branch_ids<'r>(
    sales: &'r [SaleRecord],
    work_orders: &'r [WorkOrderRecord],
    cash: &'r [CashTransactionRecord],
) -> BTreeSet<&'r str> {
    sales
        .iter()
        .map(|s| s.branch_id.as_str())
        .chain(work_orders.iter().map(|w| w.branch_id.as_str()))
        .chain(cash.iter().map(|c| c.branch_id.as_str()))
        .filter(|b| !b.is_empty())
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CashCategory;
    use crate::types::{LineItem, PartCostEntry, PaymentStatus, ServiceLine, WorkOrderStatus};

    fn zone() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn at(rfc3339: &str) -> Option<DateTime<FixedOffset>> {
        Some(DateTime::parse_from_rfc3339(rfc3339).unwrap())
    }

    fn june(day: u32) -> DateRange {
        DateRange::day(NaiveDate::from_ymd_opt(2024, 6, day).unwrap())
    }

    fn item(part_id: &str, qty: i64, price: i64, cost: Option<i64>) -> LineItem {
        LineItem {
            part_id: part_id.to_string(),
            sku: String::new(),
            name: part_id.to_string(),
            quantity: qty,
            unit_price: Money::from_minor(price),
            discount: Money::zero(),
            historical_cost: cost.map(Money::from_minor),
        }
    }

    fn sale(
        id: &str,
        branch: &str,
        ts: &str,
        items: Vec<LineItem>,
        phone: Option<&str>,
    ) -> SaleRecord {
        let total = items.iter().map(LineItem::gross).sum();
        SaleRecord {
            id: id.to_string(),
            timestamp: at(ts),
            items,
            discount: Money::zero(),
            total,
            customer: CustomerRef {
                phone: phone.map(str::to_string),
                ..CustomerRef::default()
            },
            branch_id: branch.to_string(),
        }
    }

    fn work_order(
        id: &str,
        payment_status: PaymentStatus,
        total: i64,
        total_paid: Option<i64>,
    ) -> WorkOrderRecord {
        WorkOrderRecord {
            id: id.to_string(),
            created_at: at("2024-06-01T09:00:00+07:00"),
            paid_at: None,
            status: WorkOrderStatus::Done,
            payment_status,
            refunded: false,
            parts: vec![item("P-1", 1, 0, Some(200_000))],
            services: vec![ServiceLine {
                description: "Ép kính".to_string(),
                quantity: 1,
                unit_price: Money::from_minor(300_000),
                unit_cost: Money::from_minor(100_000),
            }],
            labor_cost: Money::zero(),
            total: Money::from_minor(total),
            total_paid: total_paid.map(Money::from_minor),
            customer: CustomerRef {
                name: Some("An".to_string()),
                ..CustomerRef::default()
            },
            branch_id: "b1".to_string(),
        }
    }

    fn cash(
        id: &str,
        direction: CashDirection,
        category: &str,
        amount: i64,
    ) -> CashTransactionRecord {
        CashTransactionRecord {
            id: id.to_string(),
            timestamp: at("2024-06-01T12:00:00+07:00"),
            direction,
            category: CashCategory::decode(Some(category)),
            amount: Money::from_minor(amount),
            branch_id: "b1".to_string(),
            link: None,
        }
    }

    fn costs() -> CostBook {
        CostBook::new(&[PartCostEntry {
            part_id: "P-2".to_string(),
            sku: String::new(),
            cost_by_branch: [("b1".to_string(), Money::from_minor(50_000))].into(),
        }])
    }

    #[test]
    fn test_empty_period_is_all_zero() {
        let book = CostBook::default();
        let agg = Aggregator::new(&book, zone())
            .aggregate(&[], &[], &[], &BranchScope::All, &june(1));
        assert_eq!(agg.result, AggregateResult::default());
        assert!(agg.diagnostics.is_clean());
    }

    #[test]
    fn test_sales_revenue_and_cogs() {
        let book = costs();
        let sales = vec![sale(
            "s1",
            "b1",
            "2024-06-01T10:00:00+07:00",
            vec![item("P-1", 2, 150_000, Some(100_000)), item("P-2", 1, 80_000, None)],
            Some("0901"),
        )];
        let agg = Aggregator::new(&book, zone())
            .aggregate(&sales, &[], &[], &BranchScope::branch("b1"), &june(1));
        assert_eq!(agg.result.sales_revenue.minor(), 380_000);
        assert_eq!(agg.result.sales_cogs.minor(), 250_000);
        assert_eq!(agg.result.cogs(), agg.result.sales_cogs);
        assert_eq!(agg.result.gross_profit.minor(), 130_000);
        assert_eq!(agg.result.order_count, 1);
        assert_eq!(agg.result.customer_count, 1);
    }

    #[test]
    fn test_partial_work_order_counts_paid_amount() {
        let book = CostBook::default();
        let wos = vec![work_order("w1", PaymentStatus::Partial, 1_000_000, Some(400_000))];
        let agg = Aggregator::new(&book, zone())
            .aggregate(&[], &wos, &[], &BranchScope::All, &june(1));
        assert_eq!(agg.result.work_order_revenue.minor(), 400_000);
        assert_eq!(agg.result.work_order_cogs.minor(), 300_000);
        assert_eq!(agg.result.cogs().minor(), 300_000);
        assert_eq!(agg.result.revenue.minor(), 400_000);
    }

    #[test]
    fn test_unpaid_work_order_is_not_revenue() {
        let book = CostBook::default();
        let wos = vec![work_order("w1", PaymentStatus::Unpaid, 1_000_000, None)];
        let agg = Aggregator::new(&book, zone())
            .aggregate(&[], &wos, &[], &BranchScope::All, &june(1));
        assert_eq!(agg.result, AggregateResult::default());
    }

    #[test]
    fn test_excluded_cash_is_not_double_counted() {
        let book = CostBook::default();
        let txs = vec![
            cash("c1", CashDirection::Income, "Bán hàng", 500_000),
            cash("c2", CashDirection::Income, "Thu khác", 20_000),
            cash("c3", CashDirection::Expense, "Nhập hàng", 300_000),
            cash("c4", CashDirection::Expense, "Tiền điện", 70_000),
        ];
        let agg = Aggregator::new(&book, zone())
            .aggregate(&[], &[], &txs, &BranchScope::All, &june(1));
        assert_eq!(agg.result.other_income.minor(), 20_000);
        assert_eq!(agg.result.other_expense.minor(), 70_000);
        assert_eq!(agg.result.profit.minor(), -50_000);
        assert_eq!(agg.diagnostics.excluded_cash_transactions, 2);
    }

    #[test]
    fn test_local_day_boundaries() {
        let book = CostBook::default();
        // 23:30Z on 05-31 is 06:30 local on 06-01.
        let items = vec![item("X", 1, 10_000, Some(1))];
        let sales = vec![sale("s1", "b1", "2024-05-31T23:30:00Z", items, None)];
        let aggregator = Aggregator::new(&book, zone());
        let june_1 = aggregator.aggregate(&sales, &[], &[], &BranchScope::All, &june(1));
        assert_eq!(june_1.result.order_count, 1);
        let may_31 = DateRange::day(NaiveDate::from_ymd_opt(2024, 5, 31).unwrap());
        let may_31 = aggregator.aggregate(&sales, &[], &[], &BranchScope::All, &may_31);
        assert_eq!(may_31.result.order_count, 0);
    }

    #[test]
    fn test_undated_records_are_skipped_and_counted() {
        let book = CostBook::default();
        let mut undated = sale("s1", "b1", "2024-06-01T10:00:00+07:00", vec![], None);
        undated.timestamp = None;
        let agg = Aggregator::new(&book, zone())
            .aggregate(&[undated], &[], &[], &BranchScope::All, &june(1));
        assert_eq!(agg.result.order_count, 0);
        assert_eq!(agg.diagnostics.skipped_unparseable_dates, 1);
    }

    #[test]
    fn test_branch_scope_filters() {
        let book = CostBook::default();
        let ts = "2024-06-01T10:00:00+07:00";
        let sales = vec![
            sale("s1", "b1", ts, vec![item("X", 1, 10_000, Some(1))], None),
            sale("s2", "b2", ts, vec![item("X", 1, 20_000, Some(1))], None),
        ];
        let aggregator = Aggregator::new(&book, zone());
        let b2 = aggregator.aggregate(&sales, &[], &[], &BranchScope::branch("b2"), &june(1));
        assert_eq!(b2.result.sales_revenue.minor(), 20_000);
        let all = aggregator.aggregate(&sales, &[], &[], &BranchScope::All, &june(1));
        assert_eq!(all.result.sales_revenue.minor(), 30_000);
    }

    #[test]
    fn test_customers_dedup_across_streams() {
        let book = CostBook::default();
        let mut s = sale("s1", "b1", "2024-06-01T10:00:00+07:00", vec![], None);
        s.customer.name = Some("An".to_string());
        let wos = vec![work_order("w1", PaymentStatus::Paid, 100_000, None)];
        let anonymous = sale("s2", "b1", "2024-06-01T11:00:00+07:00", vec![], None);
        let agg = Aggregator::new(&book, zone())
            .aggregate(&[s, anonymous], &wos, &[], &BranchScope::All, &june(1));
        assert_eq!(agg.result.customer_count, 1);
        assert_eq!(agg.result.order_count, 3);
    }

    #[test]
    fn test_missing_cost_is_reported() {
        let book = CostBook::default();
        let items = vec![item("Z", 3, 10_000, None)];
        let sales = vec![sale("s1", "b1", "2024-06-01T10:00:00+07:00", items, None)];
        let agg = Aggregator::new(&book, zone())
            .aggregate(&sales, &[], &[], &BranchScope::All, &june(1));
        assert_eq!(agg.result.sales_cogs, Money::zero());
        assert_eq!(agg.result.gross_profit.minor(), 30_000);
        assert_eq!(agg.diagnostics.missing_cost_lines, 1);
    }

    #[test]
    fn test_branch_ids_skip_blank() {
        let sales = vec![
            sale("s1", "b2", "2024-06-01T10:00:00+07:00", vec![], None),
            sale("s2", "", "2024-06-01T10:00:00+07:00", vec![], None),
        ];
        let ids: Vec<&str> = branch_ids(&sales, &[], &[]).into_iter().collect();
        assert_eq!(ids, vec!["b2"]);
    }
}
