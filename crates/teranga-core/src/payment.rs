//! # Payments
//!
//! A payment settles part or all of a validated invoice (or refunds a credit
//! note). Each payment gets its own `RG` number and journal entry.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::PaymentMethod;

/// What a caller provides to record a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentRequest {
    pub method: PaymentMethod,
    pub amount: Money,
    #[ts(as = "String")]
    pub paid_on: NaiveDate,
    /// Cheque number, transfer or mobile-money transaction id.
    #[serde(default)]
    pub reference: Option<String>,
}

/// A recorded payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Payment {
    pub id: String,
    /// `RG2026-00001`.
    pub payment_number: String,
    pub document_id: String,
    /// Number of the settled invoice or credit note.
    pub document_number: String,
    pub method: PaymentMethod,
    pub amount: Money,
    #[ts(as = "String")]
    pub paid_on: NaiveDate,
    pub reference: Option<String>,
    pub journal_entry_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}
