//! # teranga-core: Pure Business Logic for Teranga ERP
//!
//! This crate holds every decision the document engine makes that does not
//! need storage: amounts, lifecycles, number formats, CUMP arithmetic and
//! journal postings.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Teranga ERP Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                CRUD / HTTP layer (outside)                      │   │
//! │  │    routes, auth, PDF rendering, notifications                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    teranga-engine                               │   │
//! │  │    quotes, orders, deliveries, invoices, stock services        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ teranga-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ calculator│  │ lifecycle │  │   stock   │  │  posting  │  │   │
//! │  │   │ HT/TVA/TTC│  │  status   │  │   CUMP    │  │ SYSCOHADA │  │   │
//! │  │   │  rounding │  │  tables   │  │ movements │  │  entries  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  teranga-db (Database Layer)                    │   │
//! │  │     SQLite, sequence allocator, stock ledger, journal           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Value types and enums (TaxRate, DocumentKind, DocumentStatus, ...)
//! - [`money`] - Money type with integer arithmetic and half-up rounding
//! - [`document`] - Sales documents, lines, totals and links
//! - [`calculator`] - Line and document totals
//! - [`lifecycle`] - Status transitions per document kind
//! - [`numbering`] - Document number format
//! - [`stock`] - Stock records, CUMP and movement planning
//! - [`posting`] - Journal entries and the chart of accounts
//! - [`payment`] - Payment records
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input, same output (ids and timestamps aside)
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: whole francs CFA in i64, intermediates in i128
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use teranga_core::calculator::compute_line;
//! use teranga_core::money::Money;
//! use teranga_core::types::{Percentage, TaxRate};
//!
//! let line = compute_line(10, Money::from_minor(1_000), Percentage::zero(), TaxRate::STANDARD).unwrap();
//! assert_eq!(line.ht.minor(), 10_000);
//! assert_eq!(line.tax.minor(), 1_800);
//! assert_eq!(line.ttc.minor(), 11_800);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod calculator;
pub mod document;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod numbering;
pub mod payment;
pub mod posting;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use teranga_core::Money` instead of
// `use teranga_core::money::Money`

pub use document::{
    CounterpartySnapshot, DocumentLine, DocumentLinks, DocumentPatch, DocumentRef, DocumentTotals,
    LineAmounts, LineInput, NewDocument, SalesDocument,
};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use numbering::{AllocatedNumber, SequenceState};
pub use payment::{Payment, PaymentRequest};
pub use posting::{ChartOfAccounts, JournalEntry, JournalLine, SourceDocumentRef};
pub use stock::{MovementRequest, StockMovement, StockRecord};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// ISO 4217 code of the only currency handled.
pub const CURRENCY_CODE: &str = "XOF";
