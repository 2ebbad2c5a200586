//! # Error Types
//!
//! Domain-specific error types for teranga-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  teranga-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  teranga-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  teranga-engine errors                                                 │
//! │  └── EngineError      - What callers see (with an ErrorKind code)      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → EngineError → Caller    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (line id, product, warehouse)
//! 3. Errors are enum variants, never String
//! 4. A failed precondition never leaves partial side effects behind

use thiserror::Error;

use crate::types::{DocumentKind, DocumentStatus};

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The document's current status does not allow the operation.
    ///
    /// ## When This Occurs
    /// - Editing a document that has left `draft`
    /// - Converting a quote that is not `accepted`
    /// - Losing a race: another request changed the status first
    #[error("Document {document_id} is {status}: {reason}")]
    InvalidState {
        document_id: String,
        status: DocumentStatus,
        reason: String,
    },

    /// The requested status is not a legal successor of the current one.
    #[error("{kind} cannot move from {from} to {to}")]
    InvalidTransition {
        kind: DocumentKind,
        from: DocumentStatus,
        to: DocumentStatus,
    },

    /// A delivery asks for more than what remains to deliver on an order line.
    ///
    /// ## User Workflow
    /// ```text
    /// Order line: ordered 10, delivered 10
    ///      │
    ///      ▼
    /// generate_delivery_note(line, 1)
    ///      │
    ///      ▼
    /// QuantityExceeded { line_id, requested: 1, remaining: 0 }
    /// ```
    #[error("Line {line_id}: requested {requested}, only {remaining} left to deliver")]
    QuantityExceeded {
        line_id: String,
        requested: i64,
        remaining: i64,
    },

    /// A credit note line exceeds what is still creditable on the invoice line.
    #[error("Line {line_id}: cannot credit {requested}, {creditable} creditable")]
    InvalidCreditQuantity {
        line_id: String,
        requested: i64,
        creditable: i64,
    },

    /// Not enough stock on hand in a warehouse.
    #[error(
        "Insufficient stock for product {product_id} in warehouse {warehouse_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: String,
        warehouse_id: String,
        available: i64,
        requested: i64,
    },

    /// Numbering row or account code missing, or a closed fiscal year.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A journal entry whose debits and credits differ.
    #[error("Unbalanced journal entry: debit {debit}, credit {credit}")]
    UnbalancedEntry { debit: i64, credit: i64 },

    /// Payment amount is invalid.
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },
}

impl CoreError {
    /// Shorthand for [`CoreError::InvalidState`].
    pub fn invalid_state(
        document_id: impl Into<String>,
        status: DocumentStatus,
        reason: impl Into<String>,
    ) -> Self {
        CoreError::InvalidState {
            document_id: document_id.into(),
            status,
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid prefix, invalid account code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., the same prefix on two sequences).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// A reference to something that is not part of the document.
    #[error("{field} '{value}' does not exist")]
    UnknownReference { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "RIZ-25KG".to_string(),
            warehouse_id: "DKR".to_string(),
            available: 5,
            requested: 7,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product RIZ-25KG in warehouse DKR: available 5, requested 7"
        );

        let err = CoreError::InvalidTransition {
            kind: DocumentKind::Quote,
            from: DocumentStatus::Draft,
            to: DocumentStatus::Accepted,
        };
        assert_eq!(err.to_string(), "quote cannot move from draft to accepted");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "display_name".to_string(),
        };
        assert_eq!(err.to_string(), "display_name is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "lines".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_invalid_state_shorthand() {
        let err = CoreError::invalid_state("doc-1", DocumentStatus::Validated, "document is locked");
        assert_eq!(err.to_string(), "Document doc-1 is validated: document is locked");
    }
}
