//! # Record Normalizer
//!
//! Maps raw records with mixed field-name conventions into the canonical
//! shapes of [`types`](crate::types).
//!
//! ## Alias Tables
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  raw JSON (any source)                 canonical                        │
//! │                                                                         │
//! │  { "branchId": "b1" }        ─┐                                         │
//! │  { "branch_id": "b1" }       ─┼─► SALE_FIELDS["branch_id"] ─► "b1"      │
//! │  { "branchid": "b1" }        ─┘   (first present alias wins)            │
//! │                                                                         │
//! │  { "costPrice": null }       ───► absent ─► 0                           │
//! │  { "date": "2024-06-01" }    ───► 2024-06-01T00:00 local                │
//! │  { "date": "soon" }          ───► None (record skipped by date filters) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//! 1. Aliases are tried in table order; `null` counts as absent
//! 2. Missing values never panic: numbers → 0, text → "", lists → empty
//! 3. Same input, same output (the only context is the configured zone)
//!
//! Business logic downstream never looks at raw keys again.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::category::CashCategory;
use crate::money::{clamp_raw, Money};
use crate::types::{
    CashDirection, CashTransactionRecord, CustomerRef, InventoryTransaction, InventoryTxKind,
    LineItem, PartCostEntry, PaymentStatus, RecordLink, SaleRecord, ServiceLine,
    WorkOrderRecord, WorkOrderStatus,
};

/// A raw record as handed over by the fetch layer.
pub type RawRecord = serde_json::Map<String, Value>;

/// Canonical field → accepted aliases, in priority order.
pub type AliasTable = &'static [(&'static str, &'static [&'static str])];

// =============================================================================
// Alias Tables
// =============================================================================

pub const SALE_FIELDS: AliasTable = &[
    ("id", &["id", "_id", "saleId", "sale_id", "orderId", "order_id"]),
    ("timestamp", &["date", "createdAt", "created_at", "saleDate", "sale_date", "timestamp"]),
    ("items", &["items", "lineItems", "line_items", "products"]),
    (
        "discount",
        &["discount", "orderDiscount", "order_discount", "discountAmount", "discount_amount"],
    ),
    ("total", &["total", "totalAmount", "total_amount", "grandTotal", "grand_total"]),
    ("branch_id", &["branchId", "branch_id", "branchid", "storeId", "store_id"]),
    ("customer", &["customer"]),
    ("customer_id", &["customerId", "customer_id", "customerid"]),
    ("customer_phone", &["customerPhone", "customer_phone", "customerphone", "phone"]),
    ("customer_name", &["customerName", "customer_name", "customername"]),
];

pub const LINE_ITEM_FIELDS: AliasTable = &[
    ("part_id", &["partId", "part_id", "partid", "productId", "product_id", "id"]),
    ("sku", &["sku", "SKU", "partSku", "part_sku"]),
    ("name", &["name", "partName", "part_name", "productName", "product_name"]),
    ("quantity", &["quantity", "qty", "Quantity"]),
    ("unit_price", &["sellingPrice", "selling_price", "unitPrice", "unit_price", "price"]),
    ("discount", &["discount", "lineDiscount", "line_discount"]),
    (
        "historical_cost",
        &["costPrice", "cost_price", "costprice", "historicalCost", "unitCost", "unit_cost"],
    ),
];

pub const WORK_ORDER_FIELDS: AliasTable = &[
    ("id", &["id", "_id", "workOrderId", "work_order_id", "ticketId"]),
    ("created_at", &["creationDate", "createdAt", "created_at", "creationdate", "date"]),
    ("paid_at", &["paymentDate", "payment_date", "paymentdate", "paidAt", "paid_at"]),
    ("status", &["status", "Status"]),
    ("payment_status", &["paymentStatus", "payment_status", "paymentstatus"]),
    ("refunded", &["refunded", "isRefunded", "is_refunded"]),
    ("parts", &["partsUsed", "parts_used", "partsused", "parts"]),
    ("services", &["additionalServices", "additional_services", "outsourcedServices", "services"]),
    ("labor_cost", &["laborCost", "labor_cost", "laborcost", "labourCost"]),
    ("total", &["total", "totalAmount", "total_amount"]),
    ("total_paid", &["totalPaid", "total_paid", "totalpaid", "paidAmount", "amountPaid"]),
    ("branch_id", &["branchId", "branch_id", "branchid", "storeId", "store_id"]),
    ("customer", &["customer"]),
    ("customer_id", &["customerId", "customer_id", "customerid"]),
    ("customer_phone", &["customerPhone", "customer_phone", "customerphone", "phone"]),
    ("customer_name", &["customerName", "customer_name", "customername"]),
];

pub const SERVICE_FIELDS: AliasTable = &[
    ("description", &["description", "name", "serviceName", "service_name"]),
    ("quantity", &["quantity", "qty"]),
    ("unit_price", &["price", "unitPrice", "unit_price", "sellingPrice"]),
    ("unit_cost", &["costPrice", "cost_price", "costprice", "cost", "unitCost"]),
];

pub const CUSTOMER_FIELDS: AliasTable = &[
    ("id", &["id", "_id", "customerId", "customer_id"]),
    ("phone", &["phone", "phoneNumber", "phone_number", "mobile"]),
    ("name", &["name", "fullName", "full_name"]),
];

pub const CASH_FIELDS: AliasTable = &[
    ("id", &["id", "_id", "transactionId", "transaction_id"]),
    ("timestamp", &["date", "createdAt", "created_at", "timestamp"]),
    ("direction", &["type", "transactionType", "transaction_type", "direction"]),
    ("category", &["category", "Category"]),
    ("amount", &["amount", "Amount", "value"]),
    ("branch_id", &["branchId", "branch_id", "branchid", "storeId", "store_id"]),
    ("sale_id", &["saleId", "sale_id", "saleid", "orderId", "order_id"]),
    ("work_order_id", &["workOrderId", "work_order_id", "workorderid", "ticketId"]),
];

pub const INVENTORY_FIELDS: AliasTable = &[
    ("id", &["id", "_id", "transactionId", "transaction_id"]),
    ("kind", &["type", "transactionType", "transaction_type", "kind"]),
    ("part_id", &["partId", "part_id", "partid"]),
    ("part_name", &["partName", "part_name", "partname", "name"]),
    ("quantity", &["quantity", "qty"]),
    ("timestamp", &["date", "createdAt", "created_at", "timestamp"]),
    ("unit_price", &["unitPrice", "unit_price", "unitprice", "price"]),
    ("total_price", &["totalPrice", "total_price", "totalprice", "total"]),
    ("branch_id", &["branchId", "branch_id", "branchid", "storeId", "store_id"]),
    ("notes", &["notes", "note", "description"]),
    ("sale_id", &["saleId", "sale_id", "saleid"]),
    ("work_order_id", &["workOrderId", "work_order_id", "workorderid", "ticketId"]),
];

pub const PART_FIELDS: AliasTable = &[
    ("part_id", &["id", "_id", "partId", "part_id"]),
    ("sku", &["sku", "SKU"]),
    (
        "cost_by_branch",
        &["costByBranch", "cost_by_branch", "branchCosts", "costPrice", "cost_price"],
    ),
    ("branch_id", &["branchId", "branch_id", "branchid"]),
];

// =============================================================================
// Label Tables
// =============================================================================

const WORK_ORDER_STATUS_LABELS: &[(&str, WorkOrderStatus)] = &[
    ("received", WorkOrderStatus::Received),
    ("new", WorkOrderStatus::Received),
    ("tiếp nhận", WorkOrderStatus::Received),
    ("in-progress", WorkOrderStatus::InProgress),
    ("in_progress", WorkOrderStatus::InProgress),
    ("repairing", WorkOrderStatus::InProgress),
    ("đang sửa", WorkOrderStatus::InProgress),
    ("done", WorkOrderStatus::Done),
    ("completed", WorkOrderStatus::Done),
    ("delivered", WorkOrderStatus::Done),
    ("đã sửa xong", WorkOrderStatus::Done),
    ("đã trả máy", WorkOrderStatus::Done),
    ("returned", WorkOrderStatus::Cancelled),
    ("cancelled", WorkOrderStatus::Cancelled),
    ("canceled", WorkOrderStatus::Cancelled),
    ("đã hủy", WorkOrderStatus::Cancelled),
    ("trả lại", WorkOrderStatus::Cancelled),
];

const PAYMENT_STATUS_LABELS: &[(&str, PaymentStatus)] = &[
    ("unpaid", PaymentStatus::Unpaid),
    ("chưa thanh toán", PaymentStatus::Unpaid),
    ("partial", PaymentStatus::Partial),
    ("partially_paid", PaymentStatus::Partial),
    ("partially-paid", PaymentStatus::Partial),
    ("thanh toán một phần", PaymentStatus::Partial),
    ("paid", PaymentStatus::Paid),
    ("đã thanh toán", PaymentStatus::Paid),
];

/// Payment-status labels that mean "money went back to the customer".
const REFUNDED_LABELS: &[&str] = &["refunded", "đã hoàn tiền"];

const DIRECTION_LABELS: &[(&str, CashDirection)] = &[
    ("income", CashDirection::Income),
    ("thu", CashDirection::Income),
    ("revenue", CashDirection::Income),
    ("expense", CashDirection::Expense),
    ("chi", CashDirection::Expense),
    ("cost", CashDirection::Expense),
];

const INVENTORY_KIND_LABELS: &[(&str, InventoryTxKind)] = &[
    ("receipt", InventoryTxKind::Receipt),
    ("import", InventoryTxKind::Receipt),
    ("inbound", InventoryTxKind::Receipt),
    ("in", InventoryTxKind::Receipt),
    ("nhập", InventoryTxKind::Receipt),
    ("nhập kho", InventoryTxKind::Receipt),
    ("issue", InventoryTxKind::Issue),
    ("export", InventoryTxKind::Issue),
    ("outbound", InventoryTxKind::Issue),
    ("out", InventoryTxKind::Issue),
    ("xuất", InventoryTxKind::Issue),
    ("xuất kho", InventoryTxKind::Issue),
];

fn decode_label<T: Copy>(table: &[(&str, T)], raw: &str) -> Option<T> {
    let key = raw.trim().to_lowercase();
    table.iter().find(|(label, _)| *label == key).map(|(_, v)| *v)
}

// =============================================================================
// Field Access
// =============================================================================

/// A raw record viewed through one alias table.
struct Fields<'a> {
    raw: &'a RawRecord,
    table: AliasTable,
}

impl<'a> Fields<'a> {
    fn new(raw: &'a RawRecord, table: AliasTable) -> Self {
        Fields { raw, table }
    }

    /// First present, non-null alias of `canonical`.
    fn get(&self, canonical: &str) -> Option<&'a Value> {
        let aliases = self
            .table
            .iter()
            .find(|(name, _)| *name == canonical)
            .map(|(_, aliases)| *aliases)?;
        aliases
            .iter()
            .filter_map(|alias| self.raw.get(*alias))
            .find(|v| !v.is_null())
    }

    fn opt_text(&self, canonical: &str) -> Option<String> {
        let text = match self.get(canonical)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }

    fn text(&self, canonical: &str) -> String {
        self.opt_text(canonical).unwrap_or_default()
    }

    fn opt_number(&self, canonical: &str) -> Option<f64> {
        match self.get(canonical)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    fn opt_money(&self, canonical: &str) -> Option<Money> {
        self.opt_number(canonical).map(Money::from_raw_amount)
    }

    fn money(&self, canonical: &str) -> Money {
        self.opt_money(canonical).unwrap_or_default()
    }

    fn quantity(&self, canonical: &str, default: i64) -> i64 {
        self.opt_number(canonical)
            .filter(|n| n.is_finite())
            .map(clamp_raw)
            .unwrap_or(default)
    }

    fn flag(&self, canonical: &str) -> bool {
        match self.get(canonical) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            Some(Value::String(s)) => {
                matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes")
            }
            _ => false,
        }
    }

    fn list(&self, canonical: &str) -> &'a [Value] {
        match self.get(canonical) {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        }
    }

    fn object(&self, canonical: &str) -> Option<&'a RawRecord> {
        self.get(canonical).and_then(Value::as_object)
    }

    fn timestamp(&self, canonical: &str, zone: &FixedOffset) -> Option<DateTime<FixedOffset>> {
        let value = self.get(canonical)?;
        let parsed = parse_timestamp(value, zone);
        if parsed.is_none() {
            debug!(field = canonical, ?value, "Unparseable record date");
        }
        parsed
    }

    fn link(&self) -> Option<RecordLink> {
        self.opt_text("sale_id")
            .map(RecordLink::Sale)
            .or_else(|| self.opt_text("work_order_id").map(RecordLink::WorkOrder))
    }
}

// =============================================================================
// Timestamp Parsing
// =============================================================================

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Parses a raw date value into a timestamp in `zone`.
///
/// ## Accepted Shapes
/// - RFC 3339 with offset (`2024-06-01T10:00:00Z`) → converted into `zone`
/// - naive date-time / date strings → taken as local time in `zone`
/// - integer epoch milliseconds
/// - `{ "seconds": n }` / `{ "_seconds": n }` store timestamps
pub fn parse_timestamp(value: &Value, zone: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    match value {
        Value::String(s) => parse_timestamp_str(s, zone),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|utc| utc.with_timezone(zone)),
        Value::Object(obj) => obj
            .get("seconds")
            .or_else(|| obj.get("_seconds"))
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .map(|utc| utc.with_timezone(zone)),
        _ => None,
    }
}

fn parse_timestamp_str(raw: &str, zone: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(zone));
    }
    let naive = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NAIVE_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    naive.and_local_timezone(*zone).single()
}

// =============================================================================
// Normalizer
// =============================================================================

/// Converts raw records into canonical ones for a given local zone.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    zone: FixedOffset,
}

impl Normalizer {
    pub fn new(zone: FixedOffset) -> Self {
        Normalizer { zone }
    }

    pub fn zone(&self) -> FixedOffset {
        self.zone
    }

    pub fn sale(&self, raw: &RawRecord) -> SaleRecord {
        let f = Fields::new(raw, SALE_FIELDS);
        SaleRecord {
            id: f.text("id"),
            timestamp: f.timestamp("timestamp", &self.zone),
            items: f
                .list("items")
                .iter()
                .filter_map(Value::as_object)
                .map(line_item)
                .collect(),
            discount: f.money("discount"),
            total: f.money("total"),
            customer: customer(&f),
            branch_id: f.text("branch_id"),
        }
    }

    pub fn work_order(&self, raw: &RawRecord) -> WorkOrderRecord {
        let f = Fields::new(raw, WORK_ORDER_FIELDS);

        let status = f
            .opt_text("status")
            .map(|s| {
                decode_label(WORK_ORDER_STATUS_LABELS, &s).unwrap_or_else(|| {
                    debug!(status = %s, "Unknown work order status, treating as received");
                    WorkOrderStatus::Received
                })
            })
            .unwrap_or_default();

        let raw_payment = f.opt_text("payment_status").unwrap_or_default();
        let refunded_by_status = REFUNDED_LABELS.contains(&raw_payment.to_lowercase().as_str());
        let payment_status = if refunded_by_status {
            PaymentStatus::Paid
        } else {
            decode_label(PAYMENT_STATUS_LABELS, &raw_payment).unwrap_or_default()
        };

        WorkOrderRecord {
            id: f.text("id"),
            created_at: f.timestamp("created_at", &self.zone),
            paid_at: f.timestamp("paid_at", &self.zone),
            status,
            payment_status,
            refunded: refunded_by_status || f.flag("refunded"),
            parts: f
                .list("parts")
                .iter()
                .filter_map(Value::as_object)
                .map(line_item)
                .collect(),
            services: f
                .list("services")
                .iter()
                .filter_map(Value::as_object)
                .map(service_line)
                .collect(),
            labor_cost: f.money("labor_cost"),
            total: f.money("total"),
            total_paid: f.opt_money("total_paid"),
            customer: customer(&f),
            branch_id: f.text("branch_id"),
        }
    }

    pub fn cash_transaction(&self, raw: &RawRecord) -> CashTransactionRecord {
        let f = Fields::new(raw, CASH_FIELDS);
        let signed = f.money("amount");

        let direction = f
            .opt_text("direction")
            .and_then(|d| decode_label(DIRECTION_LABELS, &d))
            .unwrap_or_else(|| {
                // No usable type: the sign of the amount is all we have.
                if signed.is_negative() {
                    CashDirection::Expense
                } else {
                    CashDirection::Income
                }
            });

        CashTransactionRecord {
            id: f.text("id"),
            timestamp: f.timestamp("timestamp", &self.zone),
            direction,
            category: CashCategory::decode(f.opt_text("category").as_deref()),
            amount: signed.abs(),
            branch_id: f.text("branch_id"),
            link: f.link(),
        }
    }

    /// Returns `None` when the movement type is unrecognisable; such a row
    /// cannot be replayed.
    pub fn inventory_transaction(&self, raw: &RawRecord) -> Option<InventoryTransaction> {
        let f = Fields::new(raw, INVENTORY_FIELDS);
        let id = f.text("id");

        let kind = match f.opt_text("kind").and_then(|k| decode_label(INVENTORY_KIND_LABELS, &k)) {
            Some(kind) => kind,
            None => {
                warn!(id = %id, "Inventory transaction without a recognisable type, rejected");
                return None;
            }
        };

        let quantity = f.quantity("quantity", 0).abs();
        let unit_price = f.opt_money("unit_price");
        let total_price = f.opt_money("total_price").unwrap_or_else(|| {
            unit_price
                .map(|p| p.multiply_quantity(quantity))
                .unwrap_or_default()
        });

        Some(InventoryTransaction {
            id,
            kind,
            part_id: f.text("part_id"),
            part_name: f.text("part_name"),
            quantity,
            timestamp: f.timestamp("timestamp", &self.zone),
            unit_price,
            total_price,
            branch_id: f.text("branch_id"),
            notes: f.text("notes"),
            link: f.link(),
        })
    }

    /// Accepts either a per-branch cost object or a flat cost with a branch.
    pub fn part(&self, raw: &RawRecord) -> PartCostEntry {
        let f = Fields::new(raw, PART_FIELDS);
        let part_id = f.text("part_id");

        let mut cost_by_branch = BTreeMap::new();
        match f.get("cost_by_branch") {
            Some(Value::Object(per_branch)) => {
                for (branch, cost) in per_branch {
                    let cost = match cost {
                        Value::Number(n) => n.as_f64(),
                        Value::String(s) => s.trim().parse::<f64>().ok(),
                        _ => None,
                    };
                    if let Some(cost) = cost {
                        cost_by_branch
                            .insert(branch.trim().to_string(), Money::from_raw_amount(cost));
                    }
                }
            }
            Some(_) => match (f.opt_money("cost_by_branch"), f.opt_text("branch_id")) {
                (Some(cost), Some(branch)) => {
                    cost_by_branch.insert(branch, cost);
                }
                (Some(_), None) => {
                    debug!(part_id = %part_id, "Flat cost price without a branch, ignored");
                }
                _ => {}
            },
            None => {}
        }

        PartCostEntry {
            part_id,
            sku: f.text("sku"),
            cost_by_branch,
        }
    }
}

fn line_item(raw: &RawRecord) -> LineItem {
    let f = Fields::new(raw, LINE_ITEM_FIELDS);
    LineItem {
        part_id: f.text("part_id"),
        sku: f.text("sku"),
        name: f.text("name"),
        // a listed line is at least one unit
        quantity: f.quantity("quantity", 1),
        unit_price: f.money("unit_price"),
        discount: f.money("discount"),
        historical_cost: f.opt_money("historical_cost"),
    }
}

fn service_line(raw: &RawRecord) -> ServiceLine {
    let f = Fields::new(raw, SERVICE_FIELDS);
    ServiceLine {
        description: f.text("description"),
        quantity: f.quantity("quantity", 1),
        unit_price: f.money("unit_price"),
        unit_cost: f.money("unit_cost"),
    }
}

/// Flattened customer fields win over a nested `customer` object. A bare
/// string `customer` is taken as the name.
fn customer(f: &Fields<'_>) -> CustomerRef {
    let nested = f.object("customer").map(|c| Fields::new(c, CUSTOMER_FIELDS));
    let from_nested = |key: &str| nested.as_ref().and_then(|n| n.opt_text(key));
    let bare_name = match f.get("customer") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    };

    CustomerRef {
        id: f.opt_text("customer_id").or_else(|| from_nested("id")),
        phone: f.opt_text("customer_phone").or_else(|| from_nested("phone")),
        name: f
            .opt_text("customer_name")
            .or_else(|| from_nested("name"))
            .or(bare_name),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::KnownCategory;
    use serde_json::json;

    fn zone() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn raw(value: Value) -> RawRecord {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_first_present_alias_wins() {
        let n = Normalizer::new(zone());
        let sale = n.sale(&raw(json!({
            "id": "s1",
            "branchId": null,
            "branch_id": "b1",
            "branchid": "b2",
            "total": 500000
        })));
        assert_eq!(sale.branch_id, "b1");
        assert_eq!(sale.total.minor(), 500_000);
    }

    #[test]
    fn test_missing_fields_default() {
        let n = Normalizer::new(zone());
        let sale = n.sale(&raw(json!({})));
        assert_eq!(sale.id, "");
        assert_eq!(sale.total, Money::zero());
        assert!(sale.items.is_empty());
        assert!(sale.timestamp.is_none());
        assert_eq!(sale.customer, CustomerRef::default());

        let wo = n.work_order(&raw(json!({ "id": "w1" })));
        assert_eq!(wo.total_paid, None);
        assert_eq!(wo.status, WorkOrderStatus::Received);
        assert_eq!(wo.payment_status, PaymentStatus::Unpaid);
    }

    #[test]
    fn test_line_items_and_historical_cost() {
        let n = Normalizer::new(zone());
        let sale = n.sale(&raw(json!({
            "id": "s1",
            "items": [
                { "partId": "P", "sku": "LCD", "quantity": 2, "sellingPrice": "250000", "costPrice": 100000 },
                { "part_id": "Q", "price": 50000 },
                "not an object"
            ]
        })));
        assert_eq!(sale.items.len(), 2);
        assert_eq!(sale.items[0].unit_price.minor(), 250_000);
        assert_eq!(sale.items[0].historical_cost, Some(Money::from_minor(100_000)));
        assert_eq!(sale.items[1].quantity, 1);
        assert_eq!(sale.items[1].historical_cost, None);
    }

    #[test]
    fn test_timestamps_are_local() {
        let n = Normalizer::new(zone());
        let naive = n.sale(&raw(json!({ "date": "2024-05-31 23:30:00" })));
        assert_eq!(naive.timestamp.unwrap().to_rfc3339(), "2024-05-31T23:30:00+07:00");

        let utc = n.sale(&raw(json!({ "createdAt": "2024-05-31T23:30:00Z" })));
        assert_eq!(utc.timestamp.unwrap().to_rfc3339(), "2024-06-01T06:30:00+07:00");

        let date_only = n.sale(&raw(json!({ "date": "01/06/2024" })));
        assert_eq!(date_only.timestamp.unwrap().to_rfc3339(), "2024-06-01T00:00:00+07:00");

        let epoch = n.sale(&raw(json!({ "date": 0 })));
        assert_eq!(epoch.timestamp.unwrap().to_rfc3339(), "1970-01-01T07:00:00+07:00");

        let garbage = n.sale(&raw(json!({ "date": "next tuesday" })));
        assert!(garbage.timestamp.is_none());
    }

    #[test]
    fn test_customer_flattened_and_nested() {
        let n = Normalizer::new(zone());
        let flat = n.sale(&raw(json!({ "customerPhone": "0901", "customer": { "name": "An" } })));
        assert_eq!(flat.customer.phone.as_deref(), Some("0901"));
        assert_eq!(flat.customer.name.as_deref(), Some("An"));

        let bare = n.sale(&raw(json!({ "customer": "Bình" })));
        assert_eq!(bare.customer.dedup_key(), Some("Bình"));
    }

    #[test]
    fn test_work_order_labels() {
        let n = Normalizer::new(zone());
        let wo = n.work_order(&raw(json!({
            "status": "Đã hủy",
            "paymentStatus": "partial",
            "totalPaid": 400000,
            "partsUsed": [{ "partId": "P", "quantity": 1 }],
            "additionalServices": [{ "description": "Ép kính", "price": 300000, "costPrice": 150000 }]
        })));
        assert_eq!(wo.status, WorkOrderStatus::Cancelled);
        assert_eq!(wo.payment_status, PaymentStatus::Partial);
        assert_eq!(wo.parts.len(), 1);
        assert_eq!(wo.services_cost().minor(), 150_000);

        let refunded = n.work_order(&raw(json!({ "payment_status": "refunded" })));
        assert!(refunded.refunded);
        assert!(!refunded.counts_toward_revenue());
    }

    #[test]
    fn test_cash_transaction() {
        let n = Normalizer::new(zone());
        let tx = n.cash_transaction(&raw(json!({
            "id": "c1",
            "type": "income",
            "category": " BÁN HÀNG ",
            "amount": 500000,
            "saleId": "s1"
        })));
        assert_eq!(tx.direction, CashDirection::Income);
        assert_eq!(tx.category, CashCategory::Known(KnownCategory::SalesRevenue));
        assert_eq!(tx.link, Some(RecordLink::Sale("s1".to_string())));

        let untyped = n.cash_transaction(&raw(json!({ "amount": -20000 })));
        assert_eq!(untyped.direction, CashDirection::Expense);
        assert_eq!(untyped.amount.minor(), 20_000);
        assert_eq!(untyped.category, CashCategory::Uncategorized);
    }

    #[test]
    fn test_inventory_transaction() {
        let n = Normalizer::new(zone());
        let tx = n
            .inventory_transaction(&raw(json!({
                "id": "t1", "type": "receipt", "partId": "P", "partName": "LCD",
                "quantity": 10, "unitPrice": 100000, "branchId": "b1"
            })))
            .unwrap();
        assert_eq!(tx.kind, InventoryTxKind::Receipt);
        assert_eq!(tx.total_price.minor(), 1_000_000);

        let issue = n
            .inventory_transaction(&raw(json!({ "id": "t2", "type": "Xuất kho", "quantity": -3 })))
            .unwrap();
        assert_eq!(issue.signed_quantity(), -3);

        assert!(n.inventory_transaction(&raw(json!({ "id": "t3", "type": "??" }))).is_none());
    }

    #[test]
    fn test_out_of_range_numbers_clamp() {
        let n = Normalizer::new(zone());

        let refund = n.cash_transaction(&raw(json!({ "id": "c1", "amount": -1e30 })));
        assert_eq!(refund.direction, CashDirection::Expense);
        assert_eq!(refund.amount.minor(), i64::MAX);

        let dumped = n
            .inventory_transaction(&raw(json!({
                "id": "t1", "type": "receipt", "partId": "P", "branchId": "b1",
                "quantity": -1e30, "unitPrice": 1e30
            })))
            .unwrap();
        assert_eq!(dumped.quantity, i64::MAX);
        assert_eq!(dumped.total_price.minor(), i64::MAX);

        let sale = n.sale(&raw(json!({
            "id": "s1", "total": 1e30,
            "items": [ { "partId": "P", "quantity": 1e30, "sellingPrice": 2 } ]
        })));
        assert_eq!(sale.total.minor(), i64::MAX);
        assert_eq!(sale.items[0].gross().minor(), i64::MAX);
    }

    #[test]
    fn test_part_costs() {
        let n = Normalizer::new(zone());
        let per_branch = n.part(&raw(json!({
            "id": "P", "sku": "LCD", "costByBranch": { "b1": 100000, "b2": "110000" }
        })));
        assert_eq!(per_branch.cost_by_branch.len(), 2);

        let flat = n.part(&raw(json!({ "id": "P", "costPrice": 90000, "branchId": "b3" })));
        assert_eq!(flat.cost_by_branch.get("b3"), Some(&Money::from_minor(90_000)));

        let no_branch = n.part(&raw(json!({ "id": "P", "costPrice": 90000 })));
        assert!(no_branch.cost_by_branch.is_empty());
    }

    #[test]
    fn test_deterministic() {
        let n = Normalizer::new(zone());
        let input = raw(json!({ "id": "w", "totalPaid": 1, "date": "2024-01-01" }));
        assert_eq!(n.work_order(&input), n.work_order(&input));
    }
}
