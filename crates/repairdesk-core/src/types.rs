//! # Domain Types
//!
//! Canonical record shapes produced by the [`normalize`](crate::normalize)
//! module and consumed by every engine component.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │   SaleRecord    │   │ WorkOrderRecord │   │CashTransactionRecord│   │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────────  │   │
//! │  │  items[]        │   │  parts[]        │   │  direction          │   │
//! │  │  discount       │   │  services[]     │   │  category (enum)    │   │
//! │  │  total          │   │  total_paid     │   │  amount             │   │
//! │  │  customer       │   │  status         │   │  link ──► sale/WO   │   │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────────┐                        │
//! │  │  PartCostEntry  │   │ InventoryTransaction │  append-only ledger    │
//! │  │  cost per branch│   │ receipt (+) / issue (-)                       │
//! │  └─────────────────┘   └──────────────────────┘                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Line items carry `historical_cost`: the cost price frozen at the time of
//! the transaction. Later edits to the part master never rewrite it.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::category::CashCategory;
use crate::money::Money;

// =============================================================================
// Shared Pieces
// =============================================================================

/// Who bought or brought the device in.
///
/// `phone` and `name` are a dedup key for customer counts, not a foreign key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerRef {
    pub id: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
}

impl CustomerRef {
    /// Returns `phone`, falling back to `name`. Blank values count as absent.
    pub fn dedup_key(&self) -> Option<&str> {
        fn present(v: &Option<String>) -> Option<&str> {
            v.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }
        present(&self.phone).or_else(|| present(&self.name))
    }
}

/// Back-reference from a cash or inventory transaction to the order that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RecordLink {
    Sale(String),
    WorkOrder(String),
}

/// A part sold at the counter or consumed by a repair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub part_id: String,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    /// Selling price per unit at the time of the transaction.
    pub unit_price: Money,
    /// Discount applied to this line only.
    pub discount: Money,
    /// Cost price per unit frozen at transaction time, when it was recorded.
    pub historical_cost: Option<Money>,
}

impl LineItem {
    /// `quantity × unit_price`, before any discount.
    pub fn gross(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A point-of-sale sale.
///
/// ## Invariant
/// `total == Σ(quantity × unit_price) − Σ line discounts − discount`.
/// Aggregation trusts `total` and does not recompute it; see
/// [`check_sale_total`](crate::validation::check_sale_total).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleRecord {
    pub id: String,
    /// `None` when the upstream date could not be parsed.
    #[ts(as = "Option<String>")]
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub items: Vec<LineItem>,
    /// Order-level discount.
    pub discount: Money,
    pub total: Money,
    pub customer: CustomerRef,
    pub branch_id: String,
}

impl SaleRecord {
    /// Sum of line discounts plus the order discount.
    pub fn total_discount(&self) -> Money {
        self.items.iter().map(|i| i.discount).sum::<Money>() + self.discount
    }
}

// =============================================================================
// Work Order
// =============================================================================

/// Repair ticket lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    /// Device checked in, not started.
    #[default]
    Received,
    InProgress,
    Done,
    /// Returned unrepaired or cancelled; never counts as revenue.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Partial,
    Paid,
}

/// Outsourced or additional service attached to a work order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ServiceLine {
    pub description: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// What the shop pays per unit; zero when not recorded.
    pub unit_cost: Money,
}

impl ServiceLine {
    /// `unit_cost × quantity`.
    pub fn cost(&self) -> Money {
        self.unit_cost.multiply_quantity(self.quantity)
    }
}

/// A service ticket (repair job).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WorkOrderRecord {
    pub id: String,
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<FixedOffset>>,
    pub status: WorkOrderStatus,
    pub payment_status: PaymentStatus,
    /// Set when the customer was refunded after payment.
    pub refunded: bool,
    pub parts: Vec<LineItem>,
    pub services: Vec<ServiceLine>,
    pub labor_cost: Money,
    pub total: Money,
    /// Amount actually collected. `None` when the source never recorded it.
    pub total_paid: Option<Money>,
    pub customer: CustomerRef,
    pub branch_id: String,
}

impl WorkOrderRecord {
    /// Whether this ticket contributes to revenue at all.
    ///
    /// ## Rule
    /// ```text
    /// cancelled / refunded ────────────────────────────► NO
    /// payment_status ∈ {partial, paid} ────────────────► YES
    /// total_paid > 0 (status not updated yet) ─────────► YES
    /// otherwise ───────────────────────────────────────► NO
    /// ```
    pub fn counts_toward_revenue(&self) -> bool {
        if self.refunded || self.status == WorkOrderStatus::Cancelled {
            return false;
        }
        matches!(
            self.payment_status,
            PaymentStatus::Partial | PaymentStatus::Paid
        ) || self.total_paid.is_some_and(|paid| paid.is_positive())
    }

    /// Revenue recognised for this ticket: `total_paid`, or `total` when no
    /// paid amount was recorded.
    pub fn recognised_revenue(&self) -> Money {
        self.total_paid.unwrap_or(self.total)
    }

    /// Payment date, falling back to the creation date.
    pub fn revenue_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        self.paid_at.or(self.created_at)
    }

    /// `Σ service.unit_cost × service.quantity`.
    pub fn services_cost(&self) -> Money {
        self.services.iter().map(ServiceLine::cost).sum()
    }
}

// =============================================================================
// Cash Transaction
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CashDirection {
    Income,
    Expense,
}

/// A manual (or flow-generated) cash movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashTransactionRecord {
    pub id: String,
    #[ts(as = "Option<String>")]
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub direction: CashDirection,
    pub category: CashCategory,
    /// Non-negative magnitude; the direction carries the sign.
    pub amount: Money,
    pub branch_id: String,
    pub link: Option<RecordLink>,
}

// =============================================================================
// Part Master
// =============================================================================

/// Current cost prices of one part, keyed by branch id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PartCostEntry {
    pub part_id: String,
    pub sku: String,
    pub cost_by_branch: BTreeMap<String, Money>,
}

// =============================================================================
// Inventory Transaction
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InventoryTxKind {
    /// Inbound stock (goods received).
    Receipt,
    /// Outbound stock (sold, consumed by a repair, written off).
    Issue,
}

impl InventoryTxKind {
    /// `+1` for receipts, `-1` for issues.
    #[inline]
    pub const fn sign(&self) -> i64 {
        match self {
            InventoryTxKind::Receipt => 1,
            InventoryTxKind::Issue => -1,
        }
    }
}

/// One immutable row of the inventory ledger.
///
/// ## Persisted Shape
/// id, type ∈ {receipt, issue}, partId, partName, quantity, date,
/// unitPrice (receipts only), totalPrice, branchId, notes, optional link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryTransaction {
    pub id: String,
    pub kind: InventoryTxKind,
    pub part_id: String,
    /// Denormalized name at the time of the movement.
    pub part_name: String,
    /// Positive magnitude; `kind` carries the sign.
    pub quantity: i64,
    #[ts(as = "Option<String>")]
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub unit_price: Option<Money>,
    pub total_price: Money,
    pub branch_id: String,
    pub notes: String,
    pub link: Option<RecordLink>,
}

impl InventoryTransaction {
    /// Mints a goods receipt with a fresh id.
    ///
    /// ```rust
    /// use repairdesk_core::money::Money;
    /// use repairdesk_core::types::{InventoryTransaction, InventoryTxKind};
    ///
    /// let tx = InventoryTransaction::receipt("P", "LCD", "b1", 10, Money::from_minor(100_000));
    /// assert_eq!(tx.kind, InventoryTxKind::Receipt);
    /// assert_eq!(tx.total_price.minor(), 1_000_000);
    /// ```
    pub fn receipt(
        part_id: &str,
        part_name: &str,
        branch_id: &str,
        quantity: i64,
        unit_price: Money,
    ) -> Self {
        InventoryTransaction {
            id: Uuid::new_v4().to_string(),
            kind: InventoryTxKind::Receipt,
            part_id: part_id.to_string(),
            part_name: part_name.to_string(),
            quantity,
            timestamp: Some(Utc::now().fixed_offset()),
            unit_price: Some(unit_price),
            total_price: unit_price.multiply_quantity(quantity),
            branch_id: branch_id.to_string(),
            notes: String::new(),
            link: None,
        }
    }

    /// Mints a stock issue with a fresh id. Issues carry no unit price.
    pub fn issue(part_id: &str, part_name: &str, branch_id: &str, quantity: i64) -> Self {
        InventoryTransaction {
            id: Uuid::new_v4().to_string(),
            kind: InventoryTxKind::Issue,
            part_id: part_id.to_string(),
            part_name: part_name.to_string(),
            quantity,
            timestamp: Some(Utc::now().fixed_offset()),
            unit_price: None,
            total_price: Money::zero(),
            branch_id: branch_id.to_string(),
            notes: String::new(),
            link: None,
        }
    }

    /// Attaches the originating sale or work order.
    pub fn with_link(mut self, link: RecordLink) -> Self {
        self.link = Some(link);
        self
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = notes.to_string();
        self
    }

    /// Signed effect on stock: `+quantity` or `-quantity`.
    #[inline]
    pub fn signed_quantity(&self) -> i64 {
        self.quantity.saturating_mul(self.kind.sign())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
