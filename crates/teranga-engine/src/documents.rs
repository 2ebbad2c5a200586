//! # Document Service
//!
//! Operations shared by every document kind: `create`, `update`, `delete`,
//! `change_status`, `get`, `list`.
//!
//! ## Transition Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One transition = one transaction                     │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    │                                                                    │
//! │    ├── claim(id, kind, allowed predecessors)   ◄── first statement,    │
//! │    │        │                                      takes write lock     │
//! │    │        └── no row ──► classify: NotFound / InvalidTransition /     │
//! │    │                       InvalidState                                 │
//! │    ├── fetch (fresh copy, never cached)                                 │
//! │    ├── rules (teranga-core)                                             │
//! │    ├── number / post / move stock (only where the kind needs it)       │
//! │    └── update                                                           │
//! │  COMMIT  ── any error before this point rolls everything back           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::{info, warn};

use teranga_core::lifecycle::{
    check_transition, numbering_status, requestable_sources, EDITABLE_STATUSES,
};
use teranga_core::numbering::fiscal_year_of;
use teranga_core::{
    AllocatedNumber, CoreError, DocumentKind, DocumentPatch, DocumentStatus, NewDocument,
    SalesDocument, ValidationError,
};
use teranga_db::{Database, DocumentFilter, DocumentRepository, SequenceRepository};

use crate::deliveries::release_order_quantities;
use crate::error::{EngineError, EngineResult};

/// Generic operations for one document kind.
#[derive(Debug, Clone)]
pub struct DocumentService {
    pub(crate) db: Database,
    kind: DocumentKind,
}

impl DocumentService {
    pub fn new(db: Database, kind: DocumentKind) -> Self {
        DocumentService { db, kind }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Creates a draft. Totals are computed here, never taken from the caller.
    ///
    /// Credit notes are refused: they only come from
    /// [`InvoiceService::create_credit_note`](crate::invoices::InvoiceService::create_credit_note).
    pub async fn create(&self, new: NewDocument) -> EngineResult<SalesDocument> {
        if new.kind != self.kind || new.kind == DocumentKind::CreditNote {
            return Err(ValidationError::NotAllowed {
                field: "kind".to_string(),
                allowed: DocumentKind::ALL
                    .iter()
                    .filter(|kind| **kind != DocumentKind::CreditNote)
                    .map(|kind| kind.to_string())
                    .collect(),
            }
            .into());
        }

        let doc = SalesDocument::draft(new, Utc::now())?;

        let mut conn = self.db.pool().acquire().await?;
        DocumentRepository::insert(&mut conn, &doc).await?;

        info!(id = %doc.id, kind = %doc.kind, reference = %doc.internal_reference, "Draft created");
        Ok(doc)
    }

    /// Edits a draft.
    pub async fn update(&self, id: &str, patch: DocumentPatch) -> EngineResult<SalesDocument> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        if !DocumentRepository::claim(&mut tx, id, self.kind, EDITABLE_STATUSES, now).await? {
            return Err(refuse(&mut tx, id, self.kind, EDITABLE_STATUSES, "modify").await);
        }
        let mut doc = DocumentRepository::fetch(&mut tx, id).await?;
        doc.apply_patch(patch, now)?;

        DocumentRepository::update(&mut tx, &doc).await?;
        tx.commit().await?;

        info!(id = %doc.id, kind = %doc.kind, "Draft updated");
        Ok(doc)
    }

    /// Deletes a draft and removes it from its predecessors' links.
    pub async fn delete(&self, id: &str) -> EngineResult<()> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        if !DocumentRepository::claim(&mut tx, id, self.kind, EDITABLE_STATUSES, now).await? {
            return Err(refuse(&mut tx, id, self.kind, EDITABLE_STATUSES, "delete").await);
        }
        let doc = DocumentRepository::fetch(&mut tx, id).await?;

        if doc.kind == DocumentKind::DeliveryNote {
            release_order_quantities(&mut tx, &doc, now).await?;
        }
        unlink_predecessors(&mut tx, &doc, now).await?;

        if !DocumentRepository::delete_draft(&mut tx, id).await? {
            return Err(CoreError::invalid_state(id, doc.status, "only draft documents can be deleted").into());
        }
        tx.commit().await?;

        info!(id = %id, kind = %self.kind, "Draft deleted");
        Ok(())
    }

    /// Requests a status change.
    ///
    /// Only caller-requestable targets are accepted here; validation,
    /// conversion, delivery progress and payment statuses have dedicated
    /// operations. Entering the numbering status of a quote (`sent`) or an
    /// order (`confirmed`) assigns its number.
    pub async fn change_status(&self, id: &str, to: DocumentStatus) -> EngineResult<SalesDocument> {
        let now = Utc::now();
        let sources = requestable_sources(self.kind, to);
        let mut tx = self.db.begin().await?;

        if !DocumentRepository::claim(&mut tx, id, self.kind, &sources, now).await? {
            return Err(refuse_transition(&mut tx, id, self.kind, to).await);
        }
        let mut doc = DocumentRepository::fetch(&mut tx, id).await?;
        check_transition(&doc, to)?;

        let from = doc.status;
        if to == numbering_status(doc.kind) && doc.document_number.is_none() {
            assign_number(&mut tx, &mut doc, now.date_naive()).await?;
        }
        if doc.kind == DocumentKind::DeliveryNote && to == DocumentStatus::Cancelled {
            release_order_quantities(&mut tx, &doc, now).await?;
            unlink_predecessors(&mut tx, &doc, now).await?;
        }

        doc.status = to;
        doc.updated_at = now;
        DocumentRepository::update(&mut tx, &doc).await?;
        tx.commit().await?;

        info!(
            id = %doc.id,
            kind = %doc.kind,
            number = doc.document_number.as_deref().unwrap_or("-"),
            from = %from,
            to = %to,
            "Status changed"
        );
        Ok(doc)
    }

    pub async fn get(&self, id: &str) -> EngineResult<SalesDocument> {
        self.db
            .documents()
            .get(id)
            .await?
            .filter(|doc| doc.kind == self.kind)
            .ok_or_else(|| EngineError::not_found(self.kind.to_string(), id))
    }

    /// Lists documents of this kind. The filter's own `kind` is ignored.
    pub async fn list(&self, filter: &DocumentFilter) -> EngineResult<Vec<SalesDocument>> {
        let filter = DocumentFilter {
            kind: Some(self.kind),
            ..filter.clone()
        };
        Ok(self.db.documents().list(&filter).await?)
    }
}

// =============================================================================
// Shared transition steps
// =============================================================================

/// Explains why a claim matched no row.
///
/// Runs on the transaction that attempted the claim; the caller drops it
/// afterwards, rolling back.
pub(crate) async fn refuse(
    conn: &mut SqliteConnection,
    id: &str,
    kind: DocumentKind,
    allowed: &[DocumentStatus],
    operation: &str,
) -> EngineError {
    match DocumentRepository::find(conn, id).await {
        Ok(Some(doc)) if doc.kind == kind => match doc.ensure_status(allowed, operation) {
            Err(err) => err.into(),
            Ok(()) => lost_race(&doc),
        },
        Ok(_) => EngineError::not_found(kind.to_string(), id),
        Err(err) => err.into(),
    }
}

async fn refuse_transition(
    conn: &mut SqliteConnection,
    id: &str,
    kind: DocumentKind,
    to: DocumentStatus,
) -> EngineError {
    match DocumentRepository::find(conn, id).await {
        Ok(Some(doc)) if doc.kind == kind => match check_transition(&doc, to) {
            Err(err) => err.into(),
            Ok(()) => lost_race(&doc),
        },
        Ok(_) => EngineError::not_found(kind.to_string(), id),
        Err(err) => err.into(),
    }
}

fn lost_race(doc: &SalesDocument) -> EngineError {
    warn!(id = %doc.id, status = %doc.status, "Claim lost to a concurrent transition");
    CoreError::invalid_state(&doc.id, doc.status, "document changed concurrently").into()
}

/// Allocates the next number of the document's type for the fiscal year of
/// `today` and stamps it on `doc`.
pub(crate) async fn assign_number(
    conn: &mut SqliteConnection,
    doc: &mut SalesDocument,
    today: NaiveDate,
) -> EngineResult<AllocatedNumber> {
    let number = SequenceRepository::allocate(conn, doc.kind.sequence_type(), fiscal_year_of(today)).await?;
    doc.document_number = Some(number.formatted.clone());
    doc.fiscal_year = Some(number.fiscal_year);
    doc.sequence = Some(number.sequence);
    Ok(number)
}

/// Inserts a derived draft and records it as a successor of `parent`.
pub(crate) async fn insert_successor(
    conn: &mut SqliteConnection,
    parent: &mut SalesDocument,
    new: NewDocument,
    now: DateTime<Utc>,
) -> EngineResult<SalesDocument> {
    let child = SalesDocument::draft(new, now)?;
    DocumentRepository::insert(conn, &child).await?;
    parent.add_successor(child.kind, child.id.clone());
    Ok(child)
}

/// Removes `doc` from the successor lists of the documents it links to.
async fn unlink_predecessors(
    conn: &mut SqliteConnection,
    doc: &SalesDocument,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    let parents = [
        doc.links.quote_id.as_deref(),
        doc.links.order_id.as_deref(),
        doc.links.delivery_note_id.as_deref(),
        doc.links.invoice_id.as_deref(),
    ];

    for parent_id in parents.into_iter().flatten() {
        let Some(mut parent) = DocumentRepository::find(conn, parent_id).await? else {
            continue;
        };
        let before = parent.links.successors.len();
        parent.links.successors.retain(|s| s.id != doc.id);
        if parent.links.successors.len() != before {
            parent.updated_at = now;
            DocumentRepository::update(conn, &parent).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use teranga_core::{CounterpartySnapshot, LineInput, Money, Percentage, TaxRate};
    use teranga_db::DbConfig;

    async fn service(kind: DocumentKind) -> DocumentService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        DocumentService::new(db, kind)
    }

    fn new_document(kind: DocumentKind) -> NewDocument {
        let line = LineInput {
            product_id: "FER-12".to_string(),
            designation: "Fer à béton 12 mm".to_string(),
            quantity: 20,
            unit_price: Money::from_minor(3_250),
            discount: Percentage::zero(),
            tax_rate: TaxRate::STANDARD,
            source_line_id: None,
        };
        NewDocument::new(
            kind,
            CounterpartySnapshot::named("BTP Sow & Fils"),
            Utc::now().date_naive(),
            vec![line],
        )
    }

    #[tokio::test]
    async fn test_create_rejects_other_kind() {
        let quotes = service(DocumentKind::Quote).await;
        let err = quotes.create(new_document(DocumentKind::Invoice)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[tokio::test]
    async fn test_update_and_delete_draft() {
        let quotes = service(DocumentKind::Quote).await;
        let quote = quotes.create(new_document(DocumentKind::Quote)).await.unwrap();
        assert_eq!(quote.totals.total_ttc.minor(), 76_700);

        let patch = DocumentPatch {
            notes: Some("Livraison sur chantier".to_string()),
            ..Default::default()
        };
        let updated = quotes.update(&quote.id, patch).await.unwrap();
        assert_eq!(updated.notes.as_deref(), Some("Livraison sur chantier"));
        assert_eq!(updated.version, quote.version + 1);

        quotes.delete(&quote.id).await.unwrap();
        let err = quotes.get(&quote.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_sending_quote_assigns_number() {
        let quotes = service(DocumentKind::Quote).await;
        let quote = quotes.create(new_document(DocumentKind::Quote)).await.unwrap();
        assert!(quote.document_number.is_none());

        let sent = quotes.change_status(&quote.id, DocumentStatus::Sent).await.unwrap();
        let year = fiscal_year_of(Utc::now().date_naive());
        assert_eq!(sent.document_number, Some(format!("DV{}-00001", year)));
        assert_eq!(sent.status, DocumentStatus::Sent);

        // numbered documents are locked
        let err = quotes.update(&quote.id, DocumentPatch::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        let err = quotes.delete(&quote.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_change_status_classification() {
        let quotes = service(DocumentKind::Quote).await;
        let quote = quotes.create(new_document(DocumentKind::Quote)).await.unwrap();

        let err = quotes
            .change_status(&quote.id, DocumentStatus::Accepted)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);

        // system-managed target
        let err = quotes
            .change_status(&quote.id, DocumentStatus::Converted)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);

        let err = quotes
            .change_status("missing-id", DocumentStatus::Sent)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_get_checks_kind() {
        let quotes = service(DocumentKind::Quote).await;
        let quote = quotes.create(new_document(DocumentKind::Quote)).await.unwrap();

        let orders = DocumentService::new(quotes.db.clone(), DocumentKind::Order);
        assert_eq!(orders.get(&quote.id).await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(quotes.get(&quote.id).await.unwrap().id, quote.id);
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_kind() {
        let quotes = service(DocumentKind::Quote).await;
        let orders = DocumentService::new(quotes.db.clone(), DocumentKind::Order);
        quotes.create(new_document(DocumentKind::Quote)).await.unwrap();
        orders.create(new_document(DocumentKind::Order)).await.unwrap();

        let filter = DocumentFilter::kind(DocumentKind::Order);
        let listed = quotes.list(&filter).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].kind, DocumentKind::Quote);
    }
}
