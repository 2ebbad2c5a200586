//! # Domain Types
//!
//! Small value types and enumerations shared by every layer of Teranga ERP.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │   Percentage    │   │  DocumentKind   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  bps (u32)      │   │  Quote      DV  │       │
//! │  │  0 or 1800      │   │  0..=10000      │   │  Order      BC  │       │
//! │  │  (TVA 18 %)     │   │  250 = 2.5 %    │   │  DeliveryNote BL│       │
//! │  └─────────────────┘   └─────────────────┘   │  Invoice    FA  │       │
//! │                                              │  CreditNote AV  │       │
//! │  ┌─────────────────┐   ┌─────────────────┐   └─────────────────┘       │
//! │  │ DocumentStatus  │   │ PaymentMethod   │                              │
//! │  │  draft, sent,   │   │  cash           │   ┌─────────────────┐       │
//! │  │  confirmed, ... │   │  bank_transfer  │   │  JournalCode    │       │
//! │  │  (one enum for  │   │  mobile_money   │   │  SALES, BANK,   │       │
//! │  │   every kind)   │   │  cheque         │   │  CASH, ...      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All enums serialize as the lowercase strings stored in SQLite, so the same
//! value crosses the database, JSON and TypeScript boundaries unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Tax Rate
// =============================================================================

/// TVA rate represented in basis points (bps).
///
/// ## Allowed Rates
/// Senegal applies a single standard TVA rate of 18 %. Exempt lines carry 0 %.
/// Any other value is rejected by [`crate::validation::validate_tax_rate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// TVA standard rate (18 %).
    pub const STANDARD: TaxRate = TaxRate(1_800);

    /// Exempt (0 %).
    pub const EXEMPT: TaxRate = TaxRate(0);

    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Whether this is one of the rates the engine accepts.
    pub const fn is_allowed(&self) -> bool {
        self.0 == 0 || self.0 == 1_800
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::STANDARD
    }
}

// =============================================================================
// Percentage
// =============================================================================

/// A discount percentage in basis points (`10000` = 100 %).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percentage(u32);

impl Percentage {
    /// 100 % in basis points.
    pub const MAX_BPS: u32 = 10_000;

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percentage(bps)
    }

    /// Whole-percent convenience constructor.
    #[inline]
    pub const fn from_percent(percent: u32) -> Self {
        Percentage(percent * 100)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Percentage(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// Enum String Helpers
// =============================================================================

/// Implements `as_str`, `Display` and `FromStr` for a unit enum from a table
/// of (variant, stored string) pairs.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The string stored in SQLite and sent over JSON.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ValidationError::NotAllowed {
                        field: stringify!($name).to_string(),
                        allowed: vec![$($text.to_string()),+],
                    }),
                }
            }
        }
    };
}

// =============================================================================
// Document Kind
// =============================================================================

/// The five commercial document kinds handled by the engine.
///
/// ## Document Flow
/// ```text
///   Quote ──convert──► Order ──generate──► DeliveryNote ──validate──► Invoice
///    (DV)               (BC)                  (BL)                    (FA)
///                                                                       │
///                                                         credit note   ▼
///                                                                  CreditNote (AV)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Quote,
    Order,
    DeliveryNote,
    Invoice,
    CreditNote,
}

string_enum!(DocumentKind {
    Quote => "quote",
    Order => "order",
    DeliveryNote => "delivery_note",
    Invoice => "invoice",
    CreditNote => "credit_note",
});

impl DocumentKind {
    /// Short code used in internal references (`FA-BR-1A2B3C4D`).
    pub const fn code(&self) -> &'static str {
        match self {
            DocumentKind::Quote => "DV",
            DocumentKind::Order => "BC",
            DocumentKind::DeliveryNote => "BL",
            DocumentKind::Invoice => "FA",
            DocumentKind::CreditNote => "AV",
        }
    }

    /// French title printed in journal labels.
    pub const fn title(&self) -> &'static str {
        match self {
            DocumentKind::Quote => "Devis",
            DocumentKind::Order => "Commande",
            DocumentKind::DeliveryNote => "Bon de livraison",
            DocumentKind::Invoice => "Facture",
            DocumentKind::CreditNote => "Avoir",
        }
    }

    /// The numbering sequence this kind draws from.
    pub const fn sequence_type(&self) -> SequenceType {
        match self {
            DocumentKind::Quote => SequenceType::Quote,
            DocumentKind::Order => SequenceType::Order,
            DocumentKind::DeliveryNote => SequenceType::DeliveryNote,
            DocumentKind::Invoice => SequenceType::Invoice,
            DocumentKind::CreditNote => SequenceType::CreditNote,
        }
    }

    /// Invoices and credit notes carry payments and journal postings.
    pub const fn is_financial(&self) -> bool {
        matches!(self, DocumentKind::Invoice | DocumentKind::CreditNote)
    }
}

// =============================================================================
// Document Status
// =============================================================================

/// Status of a sales document.
///
/// One enum covers every kind; which statuses a kind may use is decided by
/// [`crate::lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Sent,
    Accepted,
    Refused,
    Expired,
    Converted,
    Confirmed,
    InProgress,
    PartiallyDelivered,
    Delivered,
    Validated,
    PartiallyPaid,
    Paid,
    Cancelled,
}

string_enum!(DocumentStatus {
    Draft => "draft",
    Sent => "sent",
    Accepted => "accepted",
    Refused => "refused",
    Expired => "expired",
    Converted => "converted",
    Confirmed => "confirmed",
    InProgress => "in_progress",
    PartiallyDelivered => "partially_delivered",
    Delivered => "delivered",
    Validated => "validated",
    PartiallyPaid => "partially_paid",
    Paid => "paid",
    Cancelled => "cancelled",
});

impl Default for DocumentStatus {
    fn default() -> Self {
        DocumentStatus::Draft
    }
}

// =============================================================================
// Sequence Type
// =============================================================================

/// A numbering counter. One row per type lives in `document_sequences`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SequenceType {
    Invoice,
    CreditNote,
    Quote,
    Order,
    DeliveryNote,
    PurchaseOrder,
    Payment,
}

string_enum!(SequenceType {
    Invoice => "invoice",
    CreditNote => "credit_note",
    Quote => "quote",
    Order => "order",
    DeliveryNote => "delivery_note",
    PurchaseOrder => "purchase_order",
    Payment => "payment",
});

impl SequenceType {
    /// Prefix seeded by the initial migration.
    pub const fn default_prefix(&self) -> &'static str {
        match self {
            SequenceType::Invoice => "FA",
            SequenceType::CreditNote => "AV",
            SequenceType::Quote => "DV",
            SequenceType::Order => "BC",
            SequenceType::DeliveryNote => "BL",
            SequenceType::PurchaseOrder => "BCF",
            SequenceType::Payment => "RG",
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Espèces.
    Cash,
    /// Virement bancaire.
    BankTransfer,
    /// Wave, Orange Money, Free Money.
    MobileMoney,
    /// Chèque.
    Cheque,
}

string_enum!(PaymentMethod {
    Cash => "cash",
    BankTransfer => "bank_transfer",
    MobileMoney => "mobile_money",
    Cheque => "cheque",
});

// =============================================================================
// Journal Code
// =============================================================================

/// SYSCOHADA journals the engine posts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JournalCode {
    Sales,
    Purchases,
    Bank,
    Cash,
    Misc,
}

string_enum!(JournalCode {
    Sales => "SALES",
    Purchases => "PURCHASES",
    Bank => "BANK",
    Cash => "CASH",
    Misc => "MISC",
});

// =============================================================================
// Movement Kind
// =============================================================================

/// Kind of stock movement.
///
/// ```text
///   In / Return   ──► destination warehouse     (CUMP re-averaged)
///   Out           ◄── source warehouse          (CUMP unchanged)
///   Transfer      source ──► destination        (carries source CUMP)
///   Adjustment    destination = gain, source = loss (CUMP unchanged)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    In,
    Out,
    Transfer,
    Adjustment,
    Return,
}

string_enum!(MovementKind {
    In => "in",
    Out => "out",
    Transfer => "transfer",
    Adjustment => "adjustment",
    Return => "return",
});

// =============================================================================
// Unit Tests
// =============================================================================
