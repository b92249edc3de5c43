//! # Validation Module
//!
//! Rule checks for records entering or leaving the engine.
//!
//! ## Where Checks Run
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Points                                  │
//! │                                                                         │
//! │  New inventory movement                                                 │
//! │  └── validate_inventory_transaction ← runs inside ledger::append        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Fixtures / upstream tests                                              │
//! │  ├── check_sale_total   total == lines − discounts                      │
//! │  └── check_cash_link    linked cash uses an excluded category           │
//! │                                                                         │
//! │  Aggregation NEVER calls these: it trusts `total` and classifies        │
//! │  categories on its own.                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use repairdesk_core::validation::{validate_branch_id, validate_quantity};
//!
//! assert!(validate_branch_id("b1").is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{
    CashDirection, CashTransactionRecord, InventoryTransaction, InventoryTxKind, LineItem,
    SaleRecord,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

fn required(value: &str, field: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

pub fn validate_branch_id(branch_id: &str) -> ValidationResult<()> {
    required(branch_id, "branch_id")
}

/// Movement quantities are positive magnitudes; the kind carries the sign.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Inventory
// =============================================================================

/// Checks a new inventory movement before it is appended.
///
/// ## Rules
/// - `id`, `part_id` and `branch_id` are non-blank
/// - `quantity > 0`
/// - receipts carry a unit price, and it is not negative
pub fn validate_inventory_transaction(tx: &InventoryTransaction) -> ValidationResult<()> {
    required(&tx.id, "id")?;
    required(&tx.part_id, "part_id")?;
    validate_branch_id(&tx.branch_id)?;
    validate_quantity(tx.quantity)?;

    if tx.kind == InventoryTxKind::Receipt {
        match tx.unit_price {
            None => {
                return Err(ValidationError::Required {
                    field: "unit_price".to_string(),
                })
            }
            Some(price) if price.is_negative() => {
                return Err(ValidationError::MustNotBeNegative {
                    field: "unit_price".to_string(),
                })
            }
            Some(_) => {}
        }
    }

    Ok(())
}

// =============================================================================
// Sale Total
// =============================================================================

/// Verifies `total == Σ(quantity × unit_price) − Σ line discounts − discount`.
///
/// ## Example
/// ```rust
/// use repairdesk_core::money::Money;
/// use repairdesk_core::types::{CustomerRef, LineItem, SaleRecord};
/// use repairdesk_core::validation::check_sale_total;
///
/// let sale = SaleRecord {
///     id: "s1".into(),
///     timestamp: None,
///     items: vec![LineItem {
///         part_id: "P".into(),
///         sku: String::new(),
///         name: "Ốp lưng".into(),
///         quantity: 2,
///         unit_price: Money::from_minor(150_000),
///         discount: Money::from_minor(20_000),
///         historical_cost: None,
///     }],
///     discount: Money::from_minor(30_000),
///     total: Money::from_minor(250_000),
///     customer: CustomerRef::default(),
///     branch_id: "b1".into(),
/// };
/// assert!(check_sale_total(&sale).is_ok());
/// ```
pub fn check_sale_total(sale: &SaleRecord) -> ValidationResult<()> {
    let gross: Money = sale.items.iter().map(LineItem::gross).sum();
    let expected = gross - sale.total_discount();
    if expected != sale.total {
        return Err(ValidationError::SaleTotalMismatch {
            sale_id: sale.id.clone(),
            expected,
            actual: sale.total,
        });
    }
    Ok(())
}

// =============================================================================
// Linked Cash Transactions
// =============================================================================

/// A cash row generated from a sale or work order must use a category that
/// aggregation leaves out, or the same money is counted twice.
///
/// Unlinked rows always pass.
pub fn check_cash_link(tx: &CashTransactionRecord) -> ValidationResult<()> {
    if tx.link.is_none() {
        return Ok(());
    }
    let excluded = match tx.direction {
        CashDirection::Income => tx.category.is_excluded_income(),
        CashDirection::Expense => tx.category.is_excluded_expense(),
    };
    if !excluded {
        return Err(ValidationError::LinkedCategoryNotExcluded {
            id: tx.id.clone(),
            category: tx.category.label().to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
