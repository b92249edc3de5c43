//! # Error Types
//!
//! Domain-specific error types for repairdesk-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  repairdesk-core errors (this file)                                     │
//! │  ├── CoreError        - Rejected operations (duplicate append, ...)     │
//! │  └── ValidationError  - Input rule failures                             │
//! │                                                                         │
//! │  ledger-report errors (app crate)                                       │
//! │  └── ReportError      - Snapshot/config loading, wraps CoreError        │
//! │                                                                         │
//! │  NOT errors (returned as diagnostics next to the value):                │
//! │  missing cost data, range fallback, unparseable record date,            │
//! │  negative projected stock                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (transaction id, field, ...)
//! 3. Nothing in the engine is fatal; errors only reject a single operation

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Operations the engine refuses to perform.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An inventory transaction with this id is already in the ledger.
    ///
    /// ## When This Occurs
    /// - The upstream flow retried a receipt after a timeout
    /// - Two devices minted the same id
    ///
    /// The caller must not apply the append.
    #[error("Inventory transaction {id} already exists in the ledger")]
    DuplicateTransactionId { id: String },

    /// Custom bounds are reversed or unreadable.
    ///
    /// The resolver itself never returns this; it falls back to "this month"
    /// and reports a diagnostic. Callers that want strict bounds use
    /// [`Resolution::into_strict`](crate::date_range::Resolution::into_strict).
    #[error("Invalid date range: {reason}")]
    InvalidDateRange { reason: String },

    /// Preset name not recognised.
    #[error("Unknown date range preset: '{0}'")]
    UnknownPreset(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Sale total disagrees with its lines and discounts.
    #[error("Sale {sale_id}: total {actual} does not match lines minus discounts ({expected})")]
    SaleTotalMismatch {
        sale_id: String,
        expected: Money,
        actual: Money,
    },

    /// A cash transaction linked to a sale/work order uses a category that
    /// would be counted a second time.
    #[error("Cash transaction {id} is linked to an order but category '{category}' is not excluded")]
    LinkedCategoryNotExcluded { id: String, category: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
