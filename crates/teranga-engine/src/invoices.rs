//! # Invoice & Credit Note Service
//!
//! Financial documents: the only kinds that reach the journal.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   draft ──validate──► validated ──► sent                                │
//! │     │                    │  │         │                                 │
//! │     │                    │  └─record_payment─┐                          │
//! │     │                    │            │      ▼                          │
//! │     │                    │            └► partially_paid ──► paid        │
//! │     ▼                    ▼                                              │
//! │  cancelled ◄──────── cancelled (only while nothing is paid;             │
//! │                                 the number stays consumed)              │
//! │                                                                         │
//! │  validate = number FA{year}-NNNNN + SALES entry, in one transaction    │
//! │  record_payment = number RG{year}-NNNNN + BANK/CASH entry              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A credit note is created from a validated invoice as a draft and goes
//! through the same lifecycle with reversed postings.

use std::collections::{BTreeMap, HashMap};
use std::ops::Deref;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use teranga_core::lifecycle::{status_after_payment, CREDITABLE_INVOICE_STATUSES, PAYABLE_STATUSES};
use teranga_core::numbering::fiscal_year_of;
use teranga_core::posting::{build_payment_entry, build_sales_entry};
use teranga_core::validation::validate_payment_amount;
use teranga_core::{
    CoreError, DocumentKind, DocumentStatus, JournalEntry, NewDocument, Payment, PaymentRequest,
    SalesDocument, SequenceType, ValidationError,
};
use teranga_db::{Database, DocumentRepository, JournalRepository, PaymentRepository, SequenceRepository, SettingsRepository};

use crate::documents::{assign_number, insert_successor, refuse, DocumentService};
use crate::error::{EngineError, EngineResult};

/// Quantity of one invoice line to credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditLine {
    pub line_id: String,
    pub quantity: i64,
}

/// Which part of an invoice a credit note covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "lines", rename_all = "snake_case")]
pub enum CreditNoteScope {
    /// Every line, limited to what is still creditable.
    Full,
    /// Selected lines and quantities.
    Partial(Vec<CreditLine>),
}

/// A validated document and the journal entry it posted.
#[derive(Debug, Clone, Serialize)]
pub struct PostedDocument {
    pub document: SalesDocument,
    pub journal_entry: JournalEntry,
}

/// A recorded payment and the document it settled.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub document: SalesDocument,
    pub journal_entry: JournalEntry,
}

/// Service for invoices or credit notes (one kind per instance).
#[derive(Debug, Clone)]
pub struct InvoiceService {
    documents: DocumentService,
}

impl Deref for InvoiceService {
    type Target = DocumentService;

    fn deref(&self) -> &DocumentService {
        &self.documents
    }
}

impl InvoiceService {
    pub fn invoices(db: Database) -> Self {
        InvoiceService {
            documents: DocumentService::new(db, DocumentKind::Invoice),
        }
    }

    pub fn credit_notes(db: Database) -> Self {
        InvoiceService {
            documents: DocumentService::new(db, DocumentKind::CreditNote),
        }
    }

    /// Validates a draft: assigns its number and posts its SALES entry.
    ///
    /// This is the only point where an invoice or credit note is numbered.
    /// The number and the entry are written in the same transaction, so a
    /// failure anywhere leaves the counter untouched.
    pub async fn validate(&self, id: &str) -> EngineResult<PostedDocument> {
        let now = Utc::now();
        let today = now.date_naive();
        let kind = self.kind();
        let allowed = &[DocumentStatus::Draft];
        let mut tx = self.db.begin().await?;

        if !DocumentRepository::claim(&mut tx, id, kind, allowed, now).await? {
            return Err(refuse(&mut tx, id, kind, allowed, "validate").await);
        }
        let mut doc = DocumentRepository::fetch(&mut tx, id).await?;
        doc.recompute_totals()?;
        if !doc.totals.total_ttc.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "total_ttc".to_string(),
            }
            .into());
        }

        if kind == DocumentKind::CreditNote {
            ensure_creditable(&mut tx, &doc).await?;
        }

        let chart = SettingsRepository::load_chart(&mut tx).await?;
        assign_number(&mut tx, &mut doc, today).await?;
        doc.status = DocumentStatus::Validated;
        doc.validated_at = Some(now);
        doc.updated_at = now;

        let journal_entry = build_sales_entry(&doc, &chart, today)?;
        JournalRepository::insert(&mut tx, &journal_entry).await?;
        doc.journal_entry_id = Some(journal_entry.id.clone());

        DocumentRepository::update(&mut tx, &doc).await?;
        tx.commit().await?;

        info!(
            id = %doc.id,
            kind = %kind,
            number = doc.reference(),
            total_ttc = doc.totals.total_ttc.minor(),
            entry = %journal_entry.id,
            "Document validated and posted"
        );
        Ok(PostedDocument {
            document: doc,
            journal_entry,
        })
    }

    /// Creates a draft credit note against a validated invoice.
    ///
    /// Draft credit notes already reserve their quantities; cancelled ones
    /// do not.
    ///
    /// ## Errors
    /// - `InvalidCreditQuantity` when a line asks for nothing or for more
    ///   than `invoiced - already credited`
    /// - `InvalidState` when the invoice is not validated, sent, partially
    ///   paid or paid, or nothing is left to credit
    pub async fn create_credit_note(
        &self,
        invoice_id: &str,
        scope: CreditNoteScope,
    ) -> EngineResult<SalesDocument> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        if !DocumentRepository::claim(&mut tx, invoice_id, DocumentKind::Invoice, CREDITABLE_INVOICE_STATUSES, now)
            .await?
        {
            return Err(refuse(&mut tx, invoice_id, DocumentKind::Invoice, CREDITABLE_INVOICE_STATUSES, "credit").await);
        }
        let mut invoice = DocumentRepository::fetch(&mut tx, invoice_id).await?;
        let credited = credited_quantities(&mut tx, invoice_id, None).await?;
        let creditable = |line_id: &str, quantity: i64| quantity - credited.get(line_id).copied().unwrap_or(0);

        let inputs = match scope {
            CreditNoteScope::Full => {
                let inputs: Vec<_> = invoice
                    .lines
                    .iter()
                    .filter_map(|line| {
                        let left = creditable(&line.id, line.quantity);
                        (left > 0).then(|| line.derive_input(left, true))
                    })
                    .collect();
                if inputs.is_empty() {
                    return Err(CoreError::invalid_state(invoice_id, invoice.status, "nothing left to credit").into());
                }
                inputs
            }
            CreditNoteScope::Partial(lines) => {
                if lines.is_empty() {
                    return Err(ValidationError::Required {
                        field: "lines".to_string(),
                    }
                    .into());
                }
                let mut requested: BTreeMap<String, i64> = BTreeMap::new();
                for line in lines {
                    *requested.entry(line.line_id).or_default() += line.quantity;
                }

                let mut inputs = Vec::with_capacity(requested.len());
                for (line_id, quantity) in requested {
                    let line = invoice.line(&line_id).ok_or_else(|| ValidationError::UnknownReference {
                        field: "line_id".to_string(),
                        value: line_id.clone(),
                    })?;
                    let left = creditable(&line.id, line.quantity);
                    if quantity <= 0 || quantity > left {
                        return Err(CoreError::InvalidCreditQuantity {
                            line_id,
                            requested: quantity,
                            creditable: left,
                        }
                        .into());
                    }
                    inputs.push(line.derive_input(quantity, true));
                }
                inputs
            }
        };

        let mut new = NewDocument::new(
            DocumentKind::CreditNote,
            invoice.counterparty.clone(),
            now.date_naive(),
            inputs,
        );
        new.global_discount = invoice.global_discount;
        new.terms = invoice.terms.clone();
        new.links.quote_id = invoice.links.quote_id.clone();
        new.links.order_id = invoice.links.order_id.clone();
        new.links.invoice_id = Some(invoice.id.clone());

        let credit_note = insert_successor(&mut tx, &mut invoice, new, now).await?;
        invoice.updated_at = now;
        DocumentRepository::update(&mut tx, &invoice).await?;
        tx.commit().await?;

        info!(invoice = %invoice.reference(), credit_note = %credit_note.id, "Credit note drafted");
        Ok(credit_note)
    }

    /// Records a payment (or a refund on a credit note).
    ///
    /// Allocates an `RG` number, posts a BANK or CASH entry and moves the
    /// document to `partially_paid` or `paid`.
    pub async fn record_payment(&self, id: &str, request: PaymentRequest) -> EngineResult<PaymentReceipt> {
        let now = Utc::now();
        let kind = self.kind();
        let mut tx = self.db.begin().await?;

        if !DocumentRepository::claim(&mut tx, id, kind, PAYABLE_STATUSES, now).await? {
            return Err(refuse(&mut tx, id, kind, PAYABLE_STATUSES, "record a payment on").await);
        }
        let mut doc = DocumentRepository::fetch(&mut tx, id).await?;
        validate_payment_amount(request.amount, doc.remaining_due()).map_err(|e| CoreError::InvalidPaymentAmount {
            reason: e.to_string(),
        })?;

        let chart = SettingsRepository::load_chart(&mut tx).await?;
        let number = SequenceRepository::allocate(&mut tx, SequenceType::Payment, fiscal_year_of(now.date_naive())).await?;

        let mut payment = Payment {
            id: Uuid::new_v4().to_string(),
            payment_number: number.formatted,
            document_id: doc.id.clone(),
            document_number: doc.reference().to_string(),
            method: request.method,
            amount: request.amount,
            paid_on: request.paid_on,
            reference: request
                .reference
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
            journal_entry_id: String::new(),
            created_at: now,
        };
        let journal_entry = build_payment_entry(&payment, &doc, &chart)?;
        JournalRepository::insert(&mut tx, &journal_entry).await?;
        payment.journal_entry_id = journal_entry.id.clone();
        PaymentRepository::insert(&mut tx, &payment).await?;

        doc.amount_paid += payment.amount;
        doc.status = status_after_payment(&doc);
        doc.updated_at = now;
        DocumentRepository::update(&mut tx, &doc).await?;
        tx.commit().await?;

        info!(
            document = doc.reference(),
            payment = %payment.payment_number,
            method = %payment.method,
            amount = payment.amount.minor(),
            status = %doc.status,
            "Payment recorded"
        );
        Ok(PaymentReceipt {
            payment,
            document: doc,
            journal_entry,
        })
    }

    /// Payments recorded against a document, oldest first.
    pub async fn payments(&self, id: &str) -> EngineResult<Vec<Payment>> {
        Ok(self.db.payments().for_document(id).await?)
    }

    /// The SALES entry of a validated document.
    pub async fn journal_entry(&self, id: &str) -> EngineResult<Option<JournalEntry>> {
        let entries = self
            .db
            .journal()
            .for_source(self.kind().sequence_type(), id)
            .await?;
        Ok(entries.into_iter().next())
    }
}

/// Quantities already credited per invoice line, over non-cancelled credit
/// notes other than `exclude`.
async fn credited_quantities(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    exclude: Option<&str>,
) -> EngineResult<HashMap<String, i64>> {
    let mut credited = HashMap::new();
    for credit_note in DocumentRepository::credit_notes_for_invoice(conn, invoice_id).await? {
        if Some(credit_note.id.as_str()) == exclude {
            continue;
        }
        for line in credit_note.lines {
            if let Some(source) = line.source_line_id {
                *credited.entry(source).or_insert(0) += line.quantity;
            }
        }
    }
    Ok(credited)
}

/// Re-checks a credit note against its invoice at validation time; other
/// credit notes may have been drafted since it was created.
///
/// Every line must point at a line of the linked invoice. Lines pointing at
/// the same invoice line are summed before the comparison.
async fn ensure_creditable(conn: &mut SqliteConnection, credit_note: &SalesDocument) -> EngineResult<()> {
    let invoice_id = credit_note.links.invoice_id.as_deref().ok_or_else(|| {
        CoreError::invalid_state(&credit_note.id, credit_note.status, "credit note is not linked to an invoice")
    })?;
    let invoice = DocumentRepository::find(conn, invoice_id)
        .await?
        .filter(|doc| doc.kind == DocumentKind::Invoice)
        .ok_or_else(|| EngineError::not_found(DocumentKind::Invoice.to_string(), invoice_id))?;
    invoice.ensure_status(CREDITABLE_INVOICE_STATUSES, "credit")?;

    let mut requested: BTreeMap<&str, i64> = BTreeMap::new();
    for line in &credit_note.lines {
        let source = line.source_line_id.as_deref().ok_or_else(|| ValidationError::Required {
            field: "source_line_id".to_string(),
        })?;
        *requested.entry(source).or_default() += line.quantity;
    }

    let credited = credited_quantities(conn, invoice_id, Some(&credit_note.id)).await?;
    for (source, quantity) in requested {
        let invoice_line = invoice.line(source).ok_or_else(|| ValidationError::UnknownReference {
            field: "source_line_id".to_string(),
            value: source.to_string(),
        })?;
        let creditable = invoice_line.quantity - credited.get(source).copied().unwrap_or(0);
        if quantity > creditable {
            return Err(CoreError::InvalidCreditQuantity {
                line_id: source.to_string(),
                requested: quantity,
                creditable,
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use teranga_core::{CounterpartySnapshot, DocumentLine, LineInput, Money, Percentage, TaxRate};
    use teranga_db::DbConfig;

    fn line(quantity: i64) -> LineInput {
        LineInput {
            product_id: "RIZ-25".to_string(),
            designation: "Riz parfumé 25 kg".to_string(),
            quantity,
            unit_price: Money::from_minor(1_000),
            discount: Percentage::zero(),
            tax_rate: TaxRate::STANDARD,
            source_line_id: None,
        }
    }

    async fn validated_invoice() -> (Database, SalesDocument) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let invoices = InvoiceService::invoices(db.clone());
        let new = NewDocument::new(
            DocumentKind::Invoice,
            CounterpartySnapshot::named("Boutique Ndiaye"),
            Utc::now().date_naive(),
            vec![line(10)],
        );
        let invoice = invoices.create(new).await.unwrap();
        let posted = invoices.validate(&invoice.id).await.unwrap();
        (db, posted.document)
    }

    async fn partial_credit_note(db: &Database, invoice: &SalesDocument, quantity: i64) -> SalesDocument {
        let scope = CreditNoteScope::Partial(vec![CreditLine {
            line_id: invoice.lines[0].id.clone(),
            quantity,
        }]);
        InvoiceService::invoices(db.clone())
            .create_credit_note(&invoice.id, scope)
            .await
            .unwrap()
    }

    /// Writes a draft straight to storage, skipping the service checks.
    async fn store(db: &Database, doc: &SalesDocument, new_row: bool) {
        let mut conn = db.pool().acquire().await.unwrap();
        if new_row {
            DocumentRepository::insert(&mut conn, doc).await.unwrap();
        } else {
            DocumentRepository::update(&mut conn, doc).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_validate_sums_lines_crediting_the_same_invoice_line() {
        let (db, invoice) = validated_invoice().await;
        let mut credit_note = partial_credit_note(&db, &invoice, 1).await;

        credit_note.lines = vec![
            DocumentLine::from_input(invoice.lines[0].derive_input(10, true)).unwrap(),
            DocumentLine::from_input(invoice.lines[0].derive_input(10, true)).unwrap(),
        ];
        credit_note.recompute_totals().unwrap();
        store(&db, &credit_note, false).await;

        let credit_notes = InvoiceService::credit_notes(db.clone());
        let err = credit_notes.validate(&credit_note.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCreditQuantity);
        assert!(err.to_string().contains("cannot credit 20, 10 creditable"));
        assert_eq!(credit_notes.get(&credit_note.id).await.unwrap().status, DocumentStatus::Draft);
    }

    #[tokio::test]
    async fn test_validate_requires_invoice_link() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let new = NewDocument::new(
            DocumentKind::CreditNote,
            CounterpartySnapshot::named("Boutique Ndiaye"),
            Utc::now().date_naive(),
            vec![line(2)],
        );
        let orphan = SalesDocument::draft(new, Utc::now()).unwrap();
        store(&db, &orphan, true).await;

        let err = InvoiceService::credit_notes(db.clone())
            .validate(&orphan.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(err.to_string().contains("not linked to an invoice"));

        let counter = db.sequences().get(SequenceType::CreditNote).await.unwrap().unwrap();
        assert_eq!(counter.current_value, 0);
        assert_eq!(db.journal().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_validate_requires_source_lines() {
        let (db, invoice) = validated_invoice().await;
        let mut credit_note = partial_credit_note(&db, &invoice, 2).await;

        credit_note.lines[0].source_line_id = None;
        store(&db, &credit_note, false).await;

        let err = InvoiceService::credit_notes(db.clone())
            .validate(&credit_note.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[tokio::test]
    async fn test_validate_rejects_foreign_source_line() {
        let (db, invoice) = validated_invoice().await;
        let mut credit_note = partial_credit_note(&db, &invoice, 2).await;

        credit_note.lines[0].source_line_id = Some("line-of-another-invoice".to_string());
        store(&db, &credit_note, false).await;

        let err = InvoiceService::credit_notes(db.clone())
            .validate(&credit_note.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert!(err.to_string().contains("line-of-another-invoice"));
    }
}
