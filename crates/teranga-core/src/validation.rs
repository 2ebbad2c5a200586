//! # Validation Module
//!
//! Input validation utilities for Teranga ERP.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CRUD layer (outside this workspace)                          │
//! │  ├── Form checks, deserialization                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: teranga-core                                                 │
//! │  └── THIS MODULE: line, header, numbering and account rules            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints (stock value, debit XOR credit)                 │
//! │  ├── UNIQUE (document number per kind)                                 │
//! │  └── Triggers (movements and journal rows are immutable)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use teranga_core::validation::{validate_quantity, validate_prefix};
//!
//! assert!(validate_quantity(5).is_ok());
//! assert!(validate_prefix("FA").is_ok());
//! assert!(validate_prefix("fa").is_err());
//! ```

use crate::document::{CounterpartySnapshot, LineInput};
use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Percentage, TaxRate};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest designation accepted on a line.
pub const MAX_DESIGNATION_LEN: usize = 500;

/// Longest free-text search accepted by document listings.
pub const MAX_SEARCH_LEN: usize = 100;

// =============================================================================
// String Validators
// =============================================================================

fn require_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a line designation.
pub fn validate_designation(designation: &str) -> ValidationResult<()> {
    require_text("designation", designation, MAX_DESIGNATION_LEN)
}

/// Validates a counterparty snapshot.
///
/// ## Rules
/// - `display_name` is required (max 200 characters)
/// - `tax_id` (NINEA), when present, must not be blank
pub fn validate_counterparty(counterparty: &CounterpartySnapshot) -> ValidationResult<()> {
    require_text("display_name", &counterparty.display_name, 200)?;

    if let Some(tax_id) = &counterparty.tax_id {
        if tax_id.trim().is_empty() {
            return Err(ValidationError::InvalidFormat {
                field: "tax_id".to_string(),
                reason: "must not be blank when provided".to_string(),
            });
        }
    }

    Ok(())
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (no filtering)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > MAX_SEARCH_LEN {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: MAX_SEARCH_LEN,
        });
    }

    Ok(query.to_string())
}

/// Validates a numbering prefix.
///
/// ## Rules
/// - 1 to 5 characters
/// - Uppercase ASCII letters only (`FA`, `AV`, `BCF`)
///
/// ## Example
/// ```rust
/// use teranga_core::validation::validate_prefix;
///
/// assert!(validate_prefix("BCF").is_ok());
/// assert!(validate_prefix("").is_err());
/// assert!(validate_prefix("FA-").is_err());
/// ```
pub fn validate_prefix(prefix: &str) -> ValidationResult<()> {
    if prefix.is_empty() {
        return Err(ValidationError::Required {
            field: "prefix".to_string(),
        });
    }

    if prefix.len() > 5 {
        return Err(ValidationError::TooLong {
            field: "prefix".to_string(),
            max: 5,
        });
    }

    if !prefix.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::InvalidFormat {
            field: "prefix".to_string(),
            reason: "must contain only uppercase letters".to_string(),
        });
    }

    Ok(())
}

/// Validates a SYSCOHADA account code (2 to 8 digits, e.g. `411`, `4431`).
pub fn validate_account_code(field: &str, code: &str) -> ValidationResult<()> {
    if code.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if !(2..=8).contains(&code.len()) || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be 2 to 8 digits".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a unit price.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items, samples)
pub fn validate_unit_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "unit_price".to_string(),
        });
    }

    Ok(())
}

/// Validates a discount: 0 % to 100 % inclusive.
pub fn validate_discount(discount: Percentage) -> ValidationResult<()> {
    if discount.bps() > Percentage::MAX_BPS {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: Percentage::MAX_BPS as i64,
        });
    }

    Ok(())
}

/// Validates a TVA rate: only 0 % and 18 % are accepted.
pub fn validate_tax_rate(rate: TaxRate) -> ValidationResult<()> {
    if !rate.is_allowed() {
        return Err(ValidationError::NotAllowed {
            field: "tax_rate".to_string(),
            allowed: vec!["0".to_string(), "1800".to_string()],
        });
    }

    Ok(())
}

/// Validates a payment amount against what remains due.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed `remaining`
pub fn validate_payment_amount(amount: Money, remaining: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    if amount > remaining {
        return Err(ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: 1,
            max: remaining.minor(),
        });
    }

    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates every caller-provided field of a line.
pub fn validate_line_input(line: &LineInput) -> ValidationResult<()> {
    if line.product_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "product_id".to_string(),
        });
    }
    validate_designation(&line.designation)?;
    validate_quantity(line.quantity)?;
    validate_unit_price(line.unit_price)?;
    validate_discount(line.discount)?;
    validate_tax_rate(line.tax_rate)
}

/// A document needs at least one line.
pub fn validate_lines_present(lines: &[LineInput]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
