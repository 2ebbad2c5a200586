//! # teranga-db: Database Layer for Teranga ERP
//!
//! This crate provides database access for the Teranga ERP engine.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Teranga ERP Data Flow                            │
//! │                                                                         │
//! │  teranga-engine (InvoiceService::validate)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     teranga-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ SequenceRepo  │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │    │ DocumentRepo  │    │ 002_stock    │  │   │
//! │  │   │ Transactions  │◄───│ StockRepo     │    │ 003_journal  │  │   │
//! │  │   │ WAL + busy    │    │ JournalRepo   │    │ 004_seed     │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/.local/share/teranga/teranga.db  (per ProjectDirs)         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (sequence, document, stock, ...)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use teranga_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/teranga.db")).await?;
//!
//! let counters = db.sequences().list().await?;
//! let record = db.stock().current_state("RIZ-25", "DKR-01").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::document::{DocumentFilter, DocumentRepository};
pub use repository::journal::{JournalRepository, UnbalancedEntry};
pub use repository::payment::PaymentRepository;
pub use repository::sequence::SequenceRepository;
pub use repository::settings::SettingsRepository;
pub use repository::stock::StockRepository;
