//! # Category Classifier
//!
//! Decides whether a cash transaction duplicates revenue or cost that the
//! sales and work-order streams already carry.
//!
//! ## Why This Exists
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Sale #123 total 500.000 ₫ ───────────────► sales revenue  500.000      │
//! │                                                                         │
//! │  Cashier ALSO types a cash income:                                      │
//! │    category "Bán hàng", amount 500.000 ───► excluded-income  → skipped  │
//! │                                                                         │
//! │  Revenue for the day: 500.000 ₫ (not 1.000.000 ₫)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Upstream stores categories as free text. They are decoded once, at the
//! normalization boundary, into the closed [`CashCategory`] enum through
//! [`CATEGORY_LABELS`]. Matching is exact after trimming and lowercasing, so
//! `"Bán hàng"`, `" bán hàng "` and `"BÁN HÀNG"` decode identically.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Known Categories
// =============================================================================

/// Categories with a fixed meaning for reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum KnownCategory {
    /// Counter sales, already in the sales stream.
    SalesRevenue,
    /// Repair income, already in the work-order stream.
    ServiceRevenue,
    /// Deposit taken on a repair ticket.
    ServiceDeposit,
    /// Generic "service" income.
    Service,
    /// Stock received into inventory; cost flows through COGS.
    StockReceipt,
    /// Goods bought for resale; cost flows through COGS.
    GoodsPurchase,
    /// Outsourced repair work; cost flows through work-order COGS.
    OutsourcedService,
    /// Money handed back to a customer; not an operating expense.
    Refund,
}

/// Compatibility decode table: lowercase trimmed label → category.
///
/// The first entry for each category is its canonical label.
pub const CATEGORY_LABELS: &[(&str, KnownCategory)] = &[
    ("bán hàng", KnownCategory::SalesRevenue),
    ("doanh thu bán hàng", KnownCategory::SalesRevenue),
    ("sales", KnownCategory::SalesRevenue),
    ("sales revenue", KnownCategory::SalesRevenue),
    ("doanh thu dịch vụ", KnownCategory::ServiceRevenue),
    ("sửa chữa", KnownCategory::ServiceRevenue),
    ("service revenue", KnownCategory::ServiceRevenue),
    ("đặt cọc dịch vụ", KnownCategory::ServiceDeposit),
    ("tiền cọc sửa chữa", KnownCategory::ServiceDeposit),
    ("service deposit", KnownCategory::ServiceDeposit),
    ("dịch vụ", KnownCategory::Service),
    ("service", KnownCategory::Service),
    ("nhập hàng", KnownCategory::StockReceipt),
    ("nhập kho", KnownCategory::StockReceipt),
    ("stock receipt", KnownCategory::StockReceipt),
    ("mua hàng", KnownCategory::GoodsPurchase),
    ("goods purchase", KnownCategory::GoodsPurchase),
    ("dịch vụ thuê ngoài", KnownCategory::OutsourcedService),
    ("gia công ngoài", KnownCategory::OutsourcedService),
    ("outsourced service", KnownCategory::OutsourcedService),
    ("hoàn tiền", KnownCategory::Refund),
    ("trả hàng", KnownCategory::Refund),
    ("refund", KnownCategory::Refund),
];

impl KnownCategory {
    /// Income already counted by the sales or work-order stream.
    pub const fn is_excluded_income(&self) -> bool {
        matches!(
            self,
            KnownCategory::SalesRevenue
                | KnownCategory::ServiceRevenue
                | KnownCategory::ServiceDeposit
                | KnownCategory::Service
        )
    }

    /// Cost already counted by COGS, or not an operating expense at all.
    pub const fn is_excluded_expense(&self) -> bool {
        matches!(
            self,
            KnownCategory::StockReceipt
                | KnownCategory::GoodsPurchase
                | KnownCategory::OutsourcedService
                | KnownCategory::Refund
        )
    }

    /// Canonical label (first row of [`CATEGORY_LABELS`]).
    pub fn label(&self) -> &'static str {
        CATEGORY_LABELS
            .iter()
            .find(|(_, category)| category == self)
            .map(|(label, _)| *label)
            .unwrap_or_default()
    }
}

// =============================================================================
// Cash Category
// =============================================================================

/// Category of a cash transaction after decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CashCategory {
    Known(KnownCategory),
    /// Genuine other income/expense, label kept as entered.
    Other(String),
    /// Null or blank category.
    #[default]
    Uncategorized,
}

impl CashCategory {
    /// Decodes a free-text label.
    ///
    /// ```rust
    /// use repairdesk_core::category::{CashCategory, KnownCategory};
    ///
    /// assert_eq!(
    ///     CashCategory::decode(Some("  BÁN HÀNG ")),
    ///     CashCategory::Known(KnownCategory::SalesRevenue)
    /// );
    /// assert_eq!(CashCategory::decode(Some("")), CashCategory::Uncategorized);
    /// assert_eq!(
    ///     CashCategory::decode(Some("Tiền điện")),
    ///     CashCategory::Other("Tiền điện".to_string())
    /// );
    /// ```
    pub fn decode(raw: Option<&str>) -> Self {
        let trimmed = match raw.map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => return CashCategory::Uncategorized,
        };
        match lookup(trimmed) {
            Some(known) => CashCategory::Known(known),
            None => CashCategory::Other(trimmed.to_string()),
        }
    }

    pub fn is_excluded_income(&self) -> bool {
        matches!(self, CashCategory::Known(k) if k.is_excluded_income())
    }

    pub fn is_excluded_expense(&self) -> bool {
        matches!(self, CashCategory::Known(k) if k.is_excluded_expense())
    }

    /// Display label: canonical for known categories, as entered otherwise.
    pub fn label(&self) -> &str {
        match self {
            CashCategory::Known(k) => k.label(),
            CashCategory::Other(label) => label,
            CashCategory::Uncategorized => "",
        }
    }
}

fn lookup(trimmed: &str) -> Option<KnownCategory> {
    let key = trimmed.to_lowercase();
    CATEGORY_LABELS
        .iter()
        .find(|(label, _)| *label == key)
        .map(|(_, category)| *category)
}

// =============================================================================
// String Contract
// =============================================================================

/// `true` when a raw income category is already counted elsewhere.
pub fn is_excluded_income(category: &str) -> bool {
    CashCategory::decode(Some(category)).is_excluded_income()
}

/// `true` when a raw expense category is already counted elsewhere.
pub fn is_excluded_expense(category: &str) -> bool {
    CashCategory::decode(Some(category)).is_excluded_expense()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_whitespace_insensitive() {
        for raw in ["Bán hàng", " bán hàng ", "BÁN HÀNG", "\tBán Hàng\n"] {
            assert!(is_excluded_income(raw), "{raw:?} should be excluded");
            assert!(!is_excluded_expense(raw));
        }
    }

    #[test]
    fn test_exact_match_only() {
        assert!(!is_excluded_income("bán hàng online"));
        assert!(!is_excluded_income("bán"));
        assert!(!is_excluded_expense("nhập hàng tháng 5"));
    }

    #[test]
    fn test_blank_is_never_excluded() {
        assert!(!is_excluded_income(""));
        assert!(!is_excluded_income("   "));
        assert!(!CashCategory::decode(None).is_excluded_expense());
    }

    #[test]
    fn test_expense_taxonomy() {
        assert!(is_excluded_expense("Nhập hàng"));
        assert!(is_excluded_expense("mua hàng"));
        assert!(is_excluded_expense("Dịch vụ thuê ngoài"));
        assert!(is_excluded_expense("HOÀN TIỀN"));
        assert!(!is_excluded_expense("Tiền thuê mặt bằng"));
        // income labels do not exclude expenses and vice versa
        assert!(!is_excluded_expense("dịch vụ"));
        assert!(!is_excluded_income("nhập hàng"));
    }

    #[test]
    fn test_every_known_category_has_a_label() {
        let all = [
            KnownCategory::SalesRevenue,
            KnownCategory::ServiceRevenue,
            KnownCategory::ServiceDeposit,
            KnownCategory::Service,
            KnownCategory::StockReceipt,
            KnownCategory::GoodsPurchase,
            KnownCategory::OutsourcedService,
            KnownCategory::Refund,
        ];
        for category in all {
            assert!(!category.label().is_empty());
            assert_ne!(category.is_excluded_income(), category.is_excluded_expense());
            assert_eq!(CashCategory::decode(Some(category.label())), CashCategory::Known(category));
        }
    }

    #[test]
    fn test_labels_are_stored_normalized() {
        for (label, _) in CATEGORY_LABELS {
            assert_eq!(*label, label.trim().to_lowercase());
        }
    }
}
