//! # teranga-engine: Document Validation & Ledger Posting
//!
//! Orchestrates every document transition of the Teranga ERP on top of
//! [`teranga_core`] (rules) and [`teranga_db`] (storage).
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Teranga Engine                                   │
//! │                                                                         │
//! │  CRUD / HTTP layer (outside this workspace)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                          Engine                                 │   │
//! │  │                                                                 │   │
//! │  │  quotes()     ── convert_to_order, expire_overdue               │   │
//! │  │  orders()     ── generate_delivery_note                         │   │
//! │  │  deliveries() ── validate (stock out, optional invoice)         │   │
//! │  │  invoices()   ── validate (number + SALES entry),               │   │
//! │  │                  create_credit_note, record_payment             │   │
//! │  │  credit_notes()                                                 │   │
//! │  │  stock()      ── apply_movement, current_state, history         │   │
//! │  │                                                                 │   │
//! │  │  every typed service also derefs to DocumentService:            │   │
//! │  │  create / update / delete / change_status / get / list          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  teranga-db (SQLite, one transaction per transition)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use teranga_engine::{Engine, EngineConfig};
//!
//! let engine = Engine::open(EngineConfig::load(None)?).await?;
//! let invoice = engine.invoices().create(new_invoice).await?;
//! let posted = engine.invoices().validate(&invoice.id).await?;
//! println!("{}", posted.document.reference());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod deliveries;
pub mod documents;
pub mod error;
pub mod invoices;
pub mod orders;
pub mod quotes;
pub mod stock;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::EngineConfig;
pub use deliveries::{DeliveryService, DeliveryValidation};
pub use documents::DocumentService;
pub use error::{EngineError, EngineResult, ErrorKind};
pub use invoices::{CreditLine, CreditNoteScope, InvoiceService, PaymentReceipt, PostedDocument};
pub use orders::{DeliveryLine, OrderService};
pub use quotes::QuoteService;
pub use stock::StockService;

use chrono::Utc;
use teranga_core::numbering::fiscal_year_of;
use teranga_core::DocumentKind;
use teranga_db::Database;
use tracing::info;

// =============================================================================
// Engine
// =============================================================================

/// Entry point: one database, one configuration, a service per document kind.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Engine {
    db: Database,
    config: EngineConfig,
}

impl Engine {
    /// Opens the configured database (running migrations) and starts the
    /// engine on it.
    pub async fn open(config: EngineConfig) -> EngineResult<Self> {
        let db = Database::new(config.database.db_config()).await?;
        Self::new(db, config).await
    }

    /// Starts the engine on an open database.
    ///
    /// Numbering prefixes and account codes from `config` are written into
    /// the settings store first.
    pub async fn new(db: Database, config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;

        let fiscal_year = fiscal_year_of(Utc::now().date_naive());
        db.sequences()
            .sync_prefixes(&config.numbering.prefixes(), fiscal_year)
            .await?;
        db.settings().sync_accounts(&config.accounts).await?;

        info!(company = %config.company.name, fiscal_year, "Engine started");
        Ok(Engine { db, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Generic operations for any kind.
    pub fn documents(&self, kind: DocumentKind) -> DocumentService {
        DocumentService::new(self.db.clone(), kind)
    }

    pub fn quotes(&self) -> QuoteService {
        QuoteService::new(self.db.clone())
    }

    pub fn orders(&self) -> OrderService {
        OrderService::new(self.db.clone())
    }

    pub fn deliveries(&self) -> DeliveryService {
        DeliveryService::new(self.db.clone())
    }

    pub fn invoices(&self) -> InvoiceService {
        InvoiceService::invoices(self.db.clone())
    }

    pub fn credit_notes(&self) -> InvoiceService {
        InvoiceService::credit_notes(self.db.clone())
    }

    pub fn stock(&self) -> StockService {
        StockService::new(self.db.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teranga_core::SequenceType;
    use teranga_db::DbConfig;

    #[tokio::test]
    async fn test_start_syncs_configuration() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut config = EngineConfig::default();
        config.numbering.invoice = "FAC".to_string();
        config.accounts.bank = "5211".to_string();

        let engine = Engine::new(db, config).await.unwrap();

        let invoice_counter = engine.db().sequences().get(SequenceType::Invoice).await.unwrap().unwrap();
        assert_eq!(invoice_counter.prefix, "FAC");
        assert_eq!(invoice_counter.current_value, 0);

        let chart = engine.db().settings().chart_of_accounts().await.unwrap();
        assert_eq!(chart.bank, "5211");
        assert_eq!(chart.receivables, "411");
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_configuration() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut config = EngineConfig::default();
        config.numbering.quote = "D1".to_string();

        let err = Engine::new(db, config).await.unwrap_err();
        assert!(err.is_configuration_error());
    }
}
