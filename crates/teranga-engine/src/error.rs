//! # Engine Error Type
//!
//! What callers of the engine see when an operation fails.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Teranga ERP                            │
//! │                                                                         │
//! │  CRUD layer                     Engine                                  │
//! │  ──────────                     ──────                                  │
//! │                                                                         │
//! │  invoices.validate(id)                                                  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Service method → EngineResult<T>                                │  │
//! │  │         │                                                        │  │
//! │  │  CoreError::InvalidState ─────────────┐                         │  │
//! │  │  DbError::Domain(CoreError) ──────────┤                         │  │
//! │  │  DbError::QueryFailed ────────────────┼──► EngineError          │  │
//! │  │  DbError::NotFound ───────────────────┘      .kind()            │  │
//! │  │                                              .is_user_error()   │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  match err.kind() {                                                     │
//! │    ErrorKind::InvalidState   => 409,                                    │
//! │    ErrorKind::StorageError   => 500,                                    │
//! │    ...                                                                  │
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every transition runs in one transaction: when any of these errors is
//! returned nothing has been written.

use serde::Serialize;
use teranga_core::CoreError;
use teranga_db::DbError;
use thiserror::Error;

/// Machine-readable error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ValidationError,
    InvalidState,
    InvalidTransition,
    QuantityExceeded,
    InvalidCreditQuantity,
    InsufficientStock,
    ConfigurationError,
    NotFound,
    StorageError,
}

impl ErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::InvalidState => "INVALID_STATE",
            ErrorKind::InvalidTransition => "INVALID_TRANSITION",
            ErrorKind::QuantityExceeded => "QUANTITY_EXCEEDED",
            ErrorKind::InvalidCreditQuantity => "INVALID_CREDIT_QUANTITY",
            ErrorKind::InsufficientStock => "INSUFFICIENT_STOCK",
            ErrorKind::ConfigurationError => "CONFIGURATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::StorageError => "STORAGE_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine error type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A business rule refused the operation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Unknown document (or a document of another kind).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The database failed. Never caused by caller input.
    #[error("Storage error: {0}")]
    Storage(DbError),

    /// The configuration file could not be read or is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Domain(err) => match err {
                CoreError::Validation(_) | CoreError::InvalidPaymentAmount { .. } => ErrorKind::ValidationError,
                CoreError::InvalidState { .. } => ErrorKind::InvalidState,
                CoreError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
                CoreError::QuantityExceeded { .. } => ErrorKind::QuantityExceeded,
                CoreError::InvalidCreditQuantity { .. } => ErrorKind::InvalidCreditQuantity,
                CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
                CoreError::Configuration(_) => ErrorKind::ConfigurationError,
                // an unbalanced entry is a posting bug, not a caller fault
                CoreError::UnbalancedEntry { .. } => ErrorKind::StorageError,
            },
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::Storage(_) => ErrorKind::StorageError,
            EngineError::Config(_) => ErrorKind::ConfigurationError,
        }
    }

    /// Errors the caller can fix by changing the request.
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::StorageError | ErrorKind::ConfigurationError
        )
    }

    /// Errors an administrator has to fix (missing counter, account code,
    /// closed fiscal year, bad configuration file).
    pub fn is_configuration_error(&self) -> bool {
        self.kind() == ErrorKind::ConfigurationError
    }
}

/// Converts database errors, unwrapping domain failures raised inside a
/// repository.
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => EngineError::Domain(core),
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            other => {
                tracing::error!(error = %other, "Storage failure");
                EngineError::Storage(other)
            }
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::from(DbError::from(err))
    }
}

impl From<teranga_core::ValidationError> for EngineError {
    fn from(err: teranga_core::ValidationError) -> Self {
        EngineError::Domain(CoreError::Validation(err))
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teranga_core::{DocumentKind, DocumentStatus, ValidationError};

    #[test]
    fn test_kinds() {
        let transition = EngineError::from(CoreError::InvalidTransition {
            kind: DocumentKind::Quote,
            from: DocumentStatus::Draft,
            to: DocumentStatus::Converted,
        });
        assert_eq!(transition.kind(), ErrorKind::InvalidTransition);
        assert!(transition.is_user_error());

        let config = EngineError::from(DbError::configuration("no numbering row"));
        assert_eq!(config.kind(), ErrorKind::ConfigurationError);
        assert!(config.is_configuration_error());
        assert!(!config.is_user_error());

        let storage = EngineError::from(DbError::QueryFailed("disk I/O error".to_string()));
        assert_eq!(storage.kind(), ErrorKind::StorageError);
        assert!(!storage.is_user_error());

        let missing = EngineError::from(DbError::not_found("Document", "abc"));
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let validation = EngineError::from(ValidationError::Required {
            field: "display_name".to_string(),
        });
        assert_eq!(validation.kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn test_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorKind::InvalidCreditQuantity).unwrap();
        assert_eq!(json, "\"INVALID_CREDIT_QUANTITY\"");
        assert_eq!(ErrorKind::InsufficientStock.to_string(), "INSUFFICIENT_STOCK");
    }
}
