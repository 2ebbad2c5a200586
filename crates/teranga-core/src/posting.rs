//! # Journal Posting Builder
//!
//! Pure construction of balanced SYSCOHADA journal entries.
//!
//! ## Sales Postings
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  INVOICE FA2026-00001 (HT 10 000, TVA 1 800, TTC 11 800)                │
//! │                                                                         │
//! │    Account                         Debit       Credit                   │
//! │    411   Clients                   11 800                               │
//! │    701   Ventes de marchandises                10 000                   │
//! │    4431  TVA facturée                           1 800                   │
//! │                                                                         │
//! │  CREDIT NOTE: same accounts, polarity reversed                         │
//! │    701                             10 000                               │
//! │    4431                             1 800                               │
//! │    411                                         11 800                   │
//! │                                                                         │
//! │  Zero TVA → the 4431 line is omitted.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Payment Postings
//! ```text
//!   cash           CASH journal   D 571 / C 411
//!   other methods  BANK journal   D 521 / C 411
//!   credit note refund            D 411 / C 571 or 521
//! ```
//!
//! Every builder runs [`JournalEntry::ensure_balanced`] before returning.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::document::SalesDocument;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::payment::Payment;
use crate::types::{DocumentKind, JournalCode, PaymentMethod, SequenceType};
use crate::validation::validate_account_code;

// =============================================================================
// Chart of Accounts
// =============================================================================

/// Account codes the engine posts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChartOfAccounts {
    /// 411 Clients.
    pub receivables: String,
    /// 701 Ventes de marchandises.
    pub revenue: String,
    /// 4431 TVA facturée sur ventes.
    pub output_tax: String,
    /// 521 Banques.
    pub bank: String,
    /// 571 Caisse.
    pub cash: String,
}

impl Default for ChartOfAccounts {
    fn default() -> Self {
        ChartOfAccounts {
            receivables: "411".to_string(),
            revenue: "701".to_string(),
            output_tax: "4431".to_string(),
            bank: "521".to_string(),
            cash: "571".to_string(),
        }
    }
}

impl ChartOfAccounts {
    /// (settings key, code) pairs.
    pub fn codes(&self) -> [(&'static str, &str); 5] {
        [
            ("receivables", self.receivables.as_str()),
            ("revenue", self.revenue.as_str()),
            ("output_tax", self.output_tax.as_str()),
            ("bank", self.bank.as_str()),
            ("cash", self.cash.as_str()),
        ]
    }

    /// Builds the chart from stored settings.
    ///
    /// A missing key is a [`CoreError::Configuration`]: posting without an
    /// account would silently drop a line.
    pub fn from_settings<F>(mut lookup: F) -> CoreResult<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut fetch = |key: &str| {
            lookup(key)
                .filter(|code| !code.trim().is_empty())
                .ok_or_else(|| CoreError::Configuration(format!("account code '{}' is not configured", key)))
        };

        let chart = ChartOfAccounts {
            receivables: fetch("receivables")?,
            revenue: fetch("revenue")?,
            output_tax: fetch("output_tax")?,
            bank: fetch("bank")?,
            cash: fetch("cash")?,
        };
        chart
            .validate()
            .map_err(|e| CoreError::Configuration(e.to_string()))?;
        Ok(chart)
    }

    /// Every code must be 2 to 8 digits.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (key, code) in self.codes() {
            validate_account_code(key, code)?;
        }
        Ok(())
    }

    /// Treasury account matching a payment method.
    pub fn treasury_account(&self, method: PaymentMethod) -> &str {
        match method {
            PaymentMethod::Cash => &self.cash,
            _ => &self.bank,
        }
    }
}

// =============================================================================
// Journal Entry
// =============================================================================

/// One debit or credit line of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct JournalLine {
    pub account: String,
    pub label: String,
    pub debit: Money,
    pub credit: Money,
}

impl JournalLine {
    pub fn debit(account: &str, label: impl Into<String>, amount: Money) -> Self {
        JournalLine {
            account: account.to_string(),
            label: label.into(),
            debit: amount,
            credit: Money::zero(),
        }
    }

    pub fn credit(account: &str, label: impl Into<String>, amount: Money) -> Self {
        JournalLine {
            account: account.to_string(),
            label: label.into(),
            debit: Money::zero(),
            credit: amount,
        }
    }

    /// Exactly one side is non-zero and neither is negative.
    pub fn is_well_formed(&self) -> bool {
        !self.debit.is_negative()
            && !self.credit.is_negative()
            && (self.debit.is_zero() != self.credit.is_zero())
    }
}

/// What a journal entry was posted from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SourceDocumentRef {
    pub document_type: SequenceType,
    pub document_id: String,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct JournalEntry {
    pub id: String,
    pub journal_code: JournalCode,
    #[ts(as = "String")]
    pub entry_date: NaiveDate,
    pub label: String,
    pub lines: Vec<JournalLine>,
    pub source: SourceDocumentRef,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl JournalEntry {
    pub fn total_debit(&self) -> Money {
        self.lines.iter().map(|l| l.debit).sum()
    }

    pub fn total_credit(&self) -> Money {
        self.lines.iter().map(|l| l.credit).sum()
    }

    pub fn is_balanced(&self) -> bool {
        self.total_debit() == self.total_credit()
    }

    /// Fails with [`CoreError::UnbalancedEntry`] unless debits equal credits,
    /// there are at least two lines and every line has exactly one side set.
    pub fn ensure_balanced(&self) -> CoreResult<()> {
        if self.lines.len() < 2
            || !self.is_balanced()
            || !self.lines.iter().all(JournalLine::is_well_formed)
        {
            return Err(CoreError::UnbalancedEntry {
                debit: self.total_debit().minor(),
                credit: self.total_credit().minor(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Builders
// =============================================================================

fn entry_label(doc: &SalesDocument) -> String {
    format!(
        "{} {} - {}",
        doc.kind.title(),
        doc.reference(),
        doc.counterparty.display_name
    )
}

/// Builds the SALES journal entry of a validated invoice or credit note.
///
/// Call this after the document number has been assigned so the label
/// carries it.
pub fn build_sales_entry(
    doc: &SalesDocument,
    chart: &ChartOfAccounts,
    entry_date: NaiveDate,
) -> CoreResult<JournalEntry> {
    if !doc.kind.is_financial() {
        return Err(CoreError::invalid_state(
            &doc.id,
            doc.status,
            format!("a {} is not posted to the journal", doc.kind),
        ));
    }

    let totals = doc.totals;
    if !totals.total_ttc.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "total_ttc".to_string(),
        }
        .into());
    }

    let label = entry_label(doc);
    let counterparty = doc.counterparty.display_name.clone();
    let tax_label = "TVA facturée 18%";
    let revenue_label = "Ventes de marchandises";

    let mut lines = Vec::with_capacity(3);
    match doc.kind {
        DocumentKind::CreditNote => {
            lines.push(JournalLine::debit(&chart.revenue, revenue_label, totals.total_ht));
            if totals.total_tax.is_positive() {
                lines.push(JournalLine::debit(&chart.output_tax, tax_label, totals.total_tax));
            }
            lines.push(JournalLine::credit(&chart.receivables, counterparty, totals.total_ttc));
        }
        _ => {
            lines.push(JournalLine::debit(&chart.receivables, counterparty, totals.total_ttc));
            lines.push(JournalLine::credit(&chart.revenue, revenue_label, totals.total_ht));
            if totals.total_tax.is_positive() {
                lines.push(JournalLine::credit(&chart.output_tax, tax_label, totals.total_tax));
            }
        }
    }
    // A 100 % global discount leaves only tax: drop the empty revenue side.
    lines.retain(|l| !(l.debit.is_zero() && l.credit.is_zero()));

    let entry = JournalEntry {
        id: Uuid::new_v4().to_string(),
        journal_code: JournalCode::Sales,
        entry_date,
        label,
        lines,
        source: SourceDocumentRef {
            document_type: doc.kind.sequence_type(),
            document_id: doc.id.clone(),
            reference: doc.reference().to_string(),
        },
        created_at: Utc::now(),
    };
    entry.ensure_balanced()?;
    Ok(entry)
}

/// Builds the BANK or CASH entry for a payment on `doc`.
pub fn build_payment_entry(
    payment: &Payment,
    doc: &SalesDocument,
    chart: &ChartOfAccounts,
) -> CoreResult<JournalEntry> {
    if !payment.amount.is_positive() {
        return Err(CoreError::InvalidPaymentAmount {
            reason: "amount must be positive".to_string(),
        });
    }

    let journal_code = match payment.method {
        PaymentMethod::Cash => JournalCode::Cash,
        _ => JournalCode::Bank,
    };
    let treasury = chart.treasury_account(payment.method);
    let label = format!(
        "Règlement {} - {} - {}",
        payment.payment_number,
        doc.reference(),
        doc.counterparty.display_name
    );

    let lines = match doc.kind {
        DocumentKind::CreditNote => vec![
            JournalLine::debit(&chart.receivables, doc.counterparty.display_name.clone(), payment.amount),
            JournalLine::credit(treasury, label.clone(), payment.amount),
        ],
        _ => vec![
            JournalLine::debit(treasury, label.clone(), payment.amount),
            JournalLine::credit(&chart.receivables, doc.counterparty.display_name.clone(), payment.amount),
        ],
    };

    let entry = JournalEntry {
        id: Uuid::new_v4().to_string(),
        journal_code,
        entry_date: payment.paid_on,
        label,
        lines,
        source: SourceDocumentRef {
            document_type: SequenceType::Payment,
            document_id: payment.id.clone(),
            reference: payment.payment_number.clone(),
        },
        created_at: Utc::now(),
    };
    entry.ensure_balanced()?;
    Ok(entry)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{CounterpartySnapshot, LineInput, NewDocument};
    use crate::types::{DocumentStatus, Percentage, TaxRate};
    use proptest::prelude::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 10).unwrap()
    }

    fn document(kind: DocumentKind, lines: Vec<(i64, i64, TaxRate)>) -> SalesDocument {
        let inputs = lines
            .into_iter()
            .map(|(q, p, rate)| LineInput {
                product_id: "P".to_string(),
                designation: "Ciment 50 kg".to_string(),
                quantity: q,
                unit_price: Money::from_minor(p),
                discount: Percentage::zero(),
                tax_rate: rate,
                source_line_id: None,
            })
            .collect();
        let new = NewDocument::new(kind, CounterpartySnapshot::named("Sococim Client"), date(), inputs);
        let mut doc = SalesDocument::draft(new, Utc::now()).unwrap();
        doc.status = DocumentStatus::Validated;
        doc.document_number = Some(match kind {
            DocumentKind::CreditNote => "AV2026-00001".to_string(),
            _ => "FA2026-00001".to_string(),
        });
        doc
    }

    fn amounts(entry: &JournalEntry) -> Vec<(String, i64, i64)> {
        entry
            .lines
            .iter()
            .map(|l| (l.account.clone(), l.debit.minor(), l.credit.minor()))
            .collect()
    }

    #[test]
    fn test_invoice_entry() {
        let doc = document(DocumentKind::Invoice, vec![(1, 10_000, TaxRate::STANDARD)]);
        let entry = build_sales_entry(&doc, &ChartOfAccounts::default(), date()).unwrap();

        assert_eq!(entry.journal_code, JournalCode::Sales);
        assert_eq!(
            amounts(&entry),
            vec![
                ("411".to_string(), 11_800, 0),
                ("701".to_string(), 0, 10_000),
                ("4431".to_string(), 0, 1_800),
            ]
        );
        assert_eq!(entry.label, "Facture FA2026-00001 - Sococim Client");
        assert_eq!(entry.source.document_type, SequenceType::Invoice);
    }

    #[test]
    fn test_credit_note_entry_reverses_polarity() {
        let doc = document(DocumentKind::CreditNote, vec![(1, 10_000, TaxRate::STANDARD)]);
        let entry = build_sales_entry(&doc, &ChartOfAccounts::default(), date()).unwrap();

        assert_eq!(
            amounts(&entry),
            vec![
                ("701".to_string(), 10_000, 0),
                ("4431".to_string(), 1_800, 0),
                ("411".to_string(), 0, 11_800),
            ]
        );
        assert!(entry.label.starts_with("Avoir AV2026-00001"));
    }

    #[test]
    fn test_zero_tax_omits_tax_line() {
        let doc = document(DocumentKind::Invoice, vec![(2, 5_000, TaxRate::EXEMPT)]);
        let entry = build_sales_entry(&doc, &ChartOfAccounts::default(), date()).unwrap();
        assert_eq!(entry.lines.len(), 2);
        assert!(entry.lines.iter().all(|l| l.account != "4431"));
    }

    #[test]
    fn test_orders_are_not_posted() {
        let doc = document(DocumentKind::Order, vec![(1, 100, TaxRate::STANDARD)]);
        let result = build_sales_entry(&doc, &ChartOfAccounts::default(), date());
        assert!(matches!(result, Err(CoreError::InvalidState { .. })));
    }

    #[test]
    fn test_unbalanced_entry_rejected() {
        let doc = document(DocumentKind::Invoice, vec![(1, 10_000, TaxRate::STANDARD)]);
        let mut entry = build_sales_entry(&doc, &ChartOfAccounts::default(), date()).unwrap();
        entry.lines[0].debit = Money::from_minor(11_799);
        assert!(matches!(
            entry.ensure_balanced(),
            Err(CoreError::UnbalancedEntry { debit: 11_799, credit: 11_800 })
        ));
    }

    #[test]
    fn test_payment_entries() {
        let doc = document(DocumentKind::Invoice, vec![(1, 10_000, TaxRate::STANDARD)]);
        let mut payment = Payment {
            id: "pay-1".to_string(),
            payment_number: "RG2026-00001".to_string(),
            document_id: doc.id.clone(),
            document_number: "FA2026-00001".to_string(),
            method: PaymentMethod::Cash,
            amount: Money::from_minor(5_000),
            paid_on: date(),
            reference: None,
            journal_entry_id: String::new(),
            created_at: Utc::now(),
        };
        let chart = ChartOfAccounts::default();

        let cash = build_payment_entry(&payment, &doc, &chart).unwrap();
        assert_eq!(cash.journal_code, JournalCode::Cash);
        assert_eq!(
            amounts(&cash),
            vec![("571".to_string(), 5_000, 0), ("411".to_string(), 0, 5_000)]
        );

        payment.method = PaymentMethod::MobileMoney;
        let bank = build_payment_entry(&payment, &doc, &chart).unwrap();
        assert_eq!(bank.journal_code, JournalCode::Bank);
        assert_eq!(bank.lines[0].account, "521");
        assert_eq!(bank.source.document_type, SequenceType::Payment);
    }

    #[test]
    fn test_chart_validation() {
        assert!(ChartOfAccounts::default().validate().is_ok());

        let broken = ChartOfAccounts {
            revenue: "70x".to_string(),
            ..Default::default()
        };
        assert!(broken.validate().is_err());
    }

    #[test]
    fn test_chart_from_settings() {
        let defaults = ChartOfAccounts::default();
        let chart = ChartOfAccounts::from_settings(|key| {
            defaults
                .codes()
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, code)| code.to_string())
        })
        .unwrap();
        assert_eq!(chart, defaults);

        let missing = ChartOfAccounts::from_settings(|key| {
            (key != "output_tax").then(|| "411".to_string())
        });
        assert!(matches!(missing, Err(CoreError::Configuration(_))));
    }

    proptest! {
        #[test]
        fn prop_sales_entries_balance(
            lines in prop::collection::vec((1i64..50, 1i64..500_000, any::<bool>()), 1..6),
            credit_note in any::<bool>(),
        ) {
            let lines = lines
                .into_iter()
                .map(|(q, p, exempt)| (q, p, if exempt { TaxRate::EXEMPT } else { TaxRate::STANDARD }))
                .collect();
            let kind = if credit_note { DocumentKind::CreditNote } else { DocumentKind::Invoice };
            let doc = document(kind, lines);
            let entry = build_sales_entry(&doc, &ChartOfAccounts::default(), date()).unwrap();
            prop_assert!(entry.is_balanced());
            prop_assert_eq!(entry.total_debit(), doc.totals.total_ttc);
        }
    }
}
