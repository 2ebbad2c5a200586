//! # Repository Module
//!
//! Database repository implementations for Teranga ERP.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two ways into a repository                           │
//! │                                                                         │
//! │  Reads (pool)                       Writes (caller's transaction)      │
//! │  ─────────────                      ─────────────────────────────      │
//! │  db.documents().list(&filter)       let mut tx = db.begin().await?;    │
//! │  db.stock().current_state(p, w)     DocumentRepository::claim(&mut tx) │
//! │  db.sequences().list()              SequenceRepository::allocate(..)   │
//! │  db.journal().unbalanced_entries()  StockRepository::apply_movement(..)│
//! │                                     JournalRepository::insert(..)      │
//! │                                     tx.commit().await?;                │
//! │                                                                         │
//! │  Write functions take `&mut SqliteConnection` so one transition can    │
//! │  span several repositories and roll back as a whole.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`SequenceRepository`](sequence::SequenceRepository) - Gapless numbering
//! - [`SettingsRepository`](settings::SettingsRepository) - Chart of accounts and settings
//! - [`DocumentRepository`](document::DocumentRepository) - Sales documents
//! - [`StockRepository`](stock::StockRepository) - Stock records and movements
//! - [`JournalRepository`](journal::JournalRepository) - Journal entries
//! - [`PaymentRepository`](payment::PaymentRepository) - Payments

pub mod document;
pub mod journal;
pub mod payment;
pub mod sequence;
pub mod settings;
pub mod stock;
