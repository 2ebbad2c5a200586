//! # Sales Document Repository
//!
//! Storage for quotes, orders, delivery notes, invoices and credit notes.
//!
//! ## Claim Before Read
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    A transition on one transaction                      │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    claim(id, kind, allowed statuses)                                    │
//! │      UPDATE sales_documents SET version = version + 1                   │
//! │       WHERE id = ? AND kind = ? AND status IN (...)                     │
//! │        │                                                                │
//! │        ├── 0 rows → someone else moved it (or wrong id/kind)            │
//! │        │            rollback, classify the failure                      │
//! │        ▼                                                                │
//! │    find(id)          ← re-read under the write lock                     │
//! │    ... pure checks, sequence, stock, journal ...                        │
//! │    update(doc)                                                          │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lines, the counterparty snapshot and successor links are JSON columns;
//! the counterparty name is duplicated into a plain column for searching.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use teranga_core::validation::validate_search_query;
use teranga_core::{
    CoreError, CounterpartySnapshot, DocumentKind, DocumentLine, DocumentLinks, DocumentRef,
    DocumentStatus, DocumentTotals, Money, Percentage, SalesDocument,
};

const SELECT_COLUMNS: &str = r#"
    SELECT id, kind, document_number, fiscal_year, sequence, internal_reference,
           counterparty_json, issue_date, due_date, status, lines_json,
           global_discount_bps, total_ht, total_tax, total_ttc, global_discount_amount,
           quote_id, order_id, delivery_note_id, invoice_id, successors_json,
           terms, notes, warehouse_id, amount_paid, journal_entry_id, version,
           created_at, updated_at, validated_at
    FROM sales_documents
"#;

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: String,
    kind: DocumentKind,
    document_number: Option<String>,
    fiscal_year: Option<i32>,
    sequence: Option<i64>,
    internal_reference: String,
    counterparty_json: String,
    issue_date: NaiveDate,
    due_date: Option<NaiveDate>,
    status: DocumentStatus,
    lines_json: String,
    global_discount_bps: i64,
    total_ht: i64,
    total_tax: i64,
    total_ttc: i64,
    global_discount_amount: i64,
    quote_id: Option<String>,
    order_id: Option<String>,
    delivery_note_id: Option<String>,
    invoice_id: Option<String>,
    successors_json: String,
    terms: Option<String>,
    notes: Option<String>,
    warehouse_id: Option<String>,
    amount_paid: i64,
    journal_entry_id: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    validated_at: Option<DateTime<Utc>>,
}

impl TryFrom<DocumentRow> for SalesDocument {
    type Error = DbError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let counterparty: CounterpartySnapshot = serde_json::from_str(&row.counterparty_json)?;
        let lines: Vec<DocumentLine> = serde_json::from_str(&row.lines_json)?;
        let successors: Vec<DocumentRef> = serde_json::from_str(&row.successors_json)?;
        let discount_bps = u32::try_from(row.global_discount_bps).map_err(|_| {
            DbError::Serialization(format!("global discount out of range: {}", row.global_discount_bps))
        })?;

        Ok(SalesDocument {
            id: row.id,
            kind: row.kind,
            document_number: row.document_number,
            fiscal_year: row.fiscal_year,
            sequence: row.sequence,
            internal_reference: row.internal_reference,
            counterparty,
            issue_date: row.issue_date,
            due_date: row.due_date,
            status: row.status,
            lines,
            global_discount: Percentage::from_bps(discount_bps),
            totals: DocumentTotals {
                total_ht: Money::from_minor(row.total_ht),
                total_tax: Money::from_minor(row.total_tax),
                total_ttc: Money::from_minor(row.total_ttc),
                global_discount_amount: Money::from_minor(row.global_discount_amount),
            },
            links: DocumentLinks {
                quote_id: row.quote_id,
                order_id: row.order_id,
                delivery_note_id: row.delivery_note_id,
                invoice_id: row.invoice_id,
                successors,
            },
            terms: row.terms,
            notes: row.notes,
            warehouse_id: row.warehouse_id,
            amount_paid: Money::from_minor(row.amount_paid),
            journal_entry_id: row.journal_entry_id,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
            validated_at: row.validated_at,
        })
    }
}

fn rows_to_documents(rows: Vec<DocumentRow>) -> DbResult<Vec<SalesDocument>> {
    rows.into_iter().map(SalesDocument::try_from).collect()
}

// =============================================================================
// Filter
// =============================================================================

/// Listing filter. Every field is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocumentFilter {
    pub kind: Option<DocumentKind>,
    pub status: Option<DocumentStatus>,
    /// Inclusive lower bound on the issue date.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on the issue date.
    pub to: Option<NaiveDate>,
    /// Matched against internal reference, number and counterparty name.
    pub search: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for DocumentFilter {
    fn default() -> Self {
        DocumentFilter {
            kind: None,
            status: None,
            from: None,
            to: None,
            search: None,
            limit: 50,
            offset: 0,
        }
    }
}

impl DocumentFilter {
    pub fn kind(kind: DocumentKind) -> Self {
        DocumentFilter {
            kind: Some(kind),
            ..Default::default()
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sales documents.
///
/// Write operations are associated functions taking the caller's
/// connection so they compose inside one transaction; listing goes
/// through the pool.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    pool: SqlitePool,
}

impl DocumentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DocumentRepository { pool }
    }

    /// Inserts a new document.
    pub async fn insert(conn: &mut SqliteConnection, doc: &SalesDocument) -> DbResult<()> {
        debug!(id = %doc.id, kind = %doc.kind, reference = %doc.internal_reference, "Inserting document");

        let counterparty_json = serde_json::to_string(&doc.counterparty)?;
        let lines_json = serde_json::to_string(&doc.lines)?;
        let successors_json = serde_json::to_string(&doc.links.successors)?;

        sqlx::query(
            r#"
            INSERT INTO sales_documents (
                id, kind, document_number, fiscal_year, sequence, internal_reference,
                counterparty_name, counterparty_json, issue_date, due_date, status, lines_json,
                global_discount_bps, total_ht, total_tax, total_ttc, global_discount_amount,
                quote_id, order_id, delivery_note_id, invoice_id, successors_json,
                terms, notes, warehouse_id, amount_paid, journal_entry_id, version,
                created_at, updated_at, validated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16, ?17,
                ?18, ?19, ?20, ?21, ?22,
                ?23, ?24, ?25, ?26, ?27, ?28,
                ?29, ?30, ?31
            )
            "#,
        )
        .bind(&doc.id)
        .bind(doc.kind)
        .bind(&doc.document_number)
        .bind(doc.fiscal_year)
        .bind(doc.sequence)
        .bind(&doc.internal_reference)
        .bind(&doc.counterparty.display_name)
        .bind(counterparty_json)
        .bind(doc.issue_date)
        .bind(doc.due_date)
        .bind(doc.status)
        .bind(lines_json)
        .bind(i64::from(doc.global_discount.bps()))
        .bind(doc.totals.total_ht.minor())
        .bind(doc.totals.total_tax.minor())
        .bind(doc.totals.total_ttc.minor())
        .bind(doc.totals.global_discount_amount.minor())
        .bind(&doc.links.quote_id)
        .bind(&doc.links.order_id)
        .bind(&doc.links.delivery_note_id)
        .bind(&doc.links.invoice_id)
        .bind(successors_json)
        .bind(&doc.terms)
        .bind(&doc.notes)
        .bind(&doc.warehouse_id)
        .bind(doc.amount_paid.minor())
        .bind(&doc.journal_entry_id)
        .bind(doc.version)
        .bind(doc.created_at)
        .bind(doc.updated_at)
        .bind(doc.validated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Writes every mutable column of `doc`.
    ///
    /// `kind`, `internal_reference` and `created_at` never change.
    pub async fn update(conn: &mut SqliteConnection, doc: &SalesDocument) -> DbResult<()> {
        debug!(id = %doc.id, status = %doc.status, version = doc.version, "Updating document");

        let counterparty_json = serde_json::to_string(&doc.counterparty)?;
        let lines_json = serde_json::to_string(&doc.lines)?;
        let successors_json = serde_json::to_string(&doc.links.successors)?;

        let result = sqlx::query(
            r#"
            UPDATE sales_documents SET
                document_number = ?2, fiscal_year = ?3, sequence = ?4,
                counterparty_name = ?5, counterparty_json = ?6,
                issue_date = ?7, due_date = ?8, status = ?9, lines_json = ?10,
                global_discount_bps = ?11, total_ht = ?12, total_tax = ?13, total_ttc = ?14,
                global_discount_amount = ?15,
                quote_id = ?16, order_id = ?17, delivery_note_id = ?18, invoice_id = ?19,
                successors_json = ?20, terms = ?21, notes = ?22, warehouse_id = ?23,
                amount_paid = ?24, journal_entry_id = ?25, version = ?26,
                updated_at = ?27, validated_at = ?28
            WHERE id = ?1
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.document_number)
        .bind(doc.fiscal_year)
        .bind(doc.sequence)
        .bind(&doc.counterparty.display_name)
        .bind(counterparty_json)
        .bind(doc.issue_date)
        .bind(doc.due_date)
        .bind(doc.status)
        .bind(lines_json)
        .bind(i64::from(doc.global_discount.bps()))
        .bind(doc.totals.total_ht.minor())
        .bind(doc.totals.total_tax.minor())
        .bind(doc.totals.total_ttc.minor())
        .bind(doc.totals.global_discount_amount.minor())
        .bind(&doc.links.quote_id)
        .bind(&doc.links.order_id)
        .bind(&doc.links.delivery_note_id)
        .bind(&doc.links.invoice_id)
        .bind(successors_json)
        .bind(&doc.terms)
        .bind(&doc.notes)
        .bind(&doc.warehouse_id)
        .bind(doc.amount_paid.minor())
        .bind(&doc.journal_entry_id)
        .bind(doc.version)
        .bind(doc.updated_at)
        .bind(doc.validated_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Document", &doc.id));
        }
        Ok(())
    }

    /// Bumps the version of `id` if it is a `kind` in one of `allowed`.
    ///
    /// Returns `false` when no row matched. Run it as the first statement of
    /// a transaction: it takes the write lock before anything is read.
    pub async fn claim(
        conn: &mut SqliteConnection,
        id: &str,
        kind: DocumentKind,
        allowed: &[DocumentStatus],
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        if allowed.is_empty() {
            return Ok(false);
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("UPDATE sales_documents SET version = version + 1, updated_at = ");
        builder.push_bind(now);
        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" AND kind = ");
        builder.push_bind(kind);
        builder.push(" AND status IN (");
        let mut separated = builder.separated(", ");
        for status in allowed {
            separated.push_bind(*status);
        }
        separated.push_unseparated(")");

        let result = builder.build().execute(&mut *conn).await?;
        let claimed = result.rows_affected() == 1;
        debug!(id = %id, kind = %kind, claimed, "Document claim");
        Ok(claimed)
    }

    pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<SalesDocument>> {
        let row: Option<DocumentRow> = sqlx::query_as(&format!("{} WHERE id = ?1", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        row.map(SalesDocument::try_from).transpose()
    }

    /// Like [`find`](Self::find) but a missing document is an error.
    pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<SalesDocument> {
        Self::find(conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Document", id))
    }

    /// Deletes a draft. Returns `false` if no draft with that id exists.
    pub async fn delete_draft(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        debug!(id = %id, "Deleting draft document");

        let result = sqlx::query("DELETE FROM sales_documents WHERE id = ?1 AND status = 'draft'")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Credit notes referencing `invoice_id`, drafts included, cancelled excluded.
    pub async fn credit_notes_for_invoice(
        conn: &mut SqliteConnection,
        invoice_id: &str,
    ) -> DbResult<Vec<SalesDocument>> {
        let rows: Vec<DocumentRow> = sqlx::query_as(&format!(
            "{} WHERE kind = 'credit_note' AND invoice_id = ?1 AND status <> 'cancelled' ORDER BY created_at",
            SELECT_COLUMNS
        ))
        .bind(invoice_id)
        .fetch_all(&mut *conn)
        .await?;

        rows_to_documents(rows)
    }

    /// Delivery notes generated from `order_id`, every status.
    pub async fn delivery_notes_for_order(&self, order_id: &str) -> DbResult<Vec<SalesDocument>> {
        let rows: Vec<DocumentRow> = sqlx::query_as(&format!(
            "{} WHERE kind = 'delivery_note' AND order_id = ?1 ORDER BY created_at",
            SELECT_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows_to_documents(rows)
    }

    /// Moves every `sent` quote whose validity date is before `today` to
    /// `expired`, returning their ids.
    pub async fn expire_overdue(
        conn: &mut SqliteConnection,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            UPDATE sales_documents
            SET status = 'expired', version = version + 1, updated_at = ?2
            WHERE kind = 'quote' AND status = 'sent'
              AND due_date IS NOT NULL AND due_date < ?1
            RETURNING id
            "#,
        )
        .bind(today)
        .bind(now)
        .fetch_all(&mut *conn)
        .await?;

        debug!(count = ids.len(), "Overdue quotes expired");
        Ok(ids)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<SalesDocument>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, id).await
    }

    /// Lists documents, newest issue date first.
    pub async fn list(&self, filter: &DocumentFilter) -> DbResult<Vec<SalesDocument>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
        builder.push(" WHERE 1 = 1");

        if let Some(kind) = filter.kind {
            builder.push(" AND kind = ").push_bind(kind);
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(from) = filter.from {
            builder.push(" AND issue_date >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            builder.push(" AND issue_date <= ").push_bind(to);
        }
        if let Some(search) = filter.search.as_deref() {
            let query = validate_search_query(search).map_err(CoreError::from)?;
            if !query.is_empty() {
                let pattern = format!("%{}%", query);
                builder
                    .push(" AND (internal_reference LIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR document_number LIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR counterparty_name LIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
        }

        builder
            .push(" ORDER BY issue_date DESC, created_at DESC LIMIT ")
            .push_bind(i64::from(filter.limit.clamp(1, 500)))
            .push(" OFFSET ")
            .push_bind(i64::from(filter.offset));

        let rows: Vec<DocumentRow> = builder.build_query_as::<DocumentRow>().fetch_all(&self.pool).await?;
        rows_to_documents(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use teranga_core::{LineInput, NewDocument, TaxRate};

    fn new_doc(kind: DocumentKind, client: &str, issue: NaiveDate) -> SalesDocument {
        let line = LineInput {
            product_id: "CIM-50".to_string(),
            designation: "Ciment 50 kg".to_string(),
            quantity: 4,
            unit_price: Money::from_minor(4_500),
            discount: Percentage::zero(),
            tax_rate: TaxRate::STANDARD,
            source_line_id: None,
        };
        let mut new = NewDocument::new(kind, CounterpartySnapshot::named(client), issue, vec![line]);
        if kind == DocumentKind::DeliveryNote {
            new.warehouse_id = Some("DKR-01".to_string());
        }
        SalesDocument::draft(new, Utc::now()).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    async fn insert(db: &Database, doc: &SalesDocument) {
        let mut conn = db.pool().acquire().await.unwrap();
        DocumentRepository::insert(&mut conn, doc).await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_get_roundtrip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let doc = new_doc(DocumentKind::Invoice, "Boutique Ndiaye", date(2));
        insert(&db, &doc).await;

        let loaded = db.documents().get(&doc.id).await.unwrap().unwrap();
        assert_eq!(loaded.internal_reference, doc.internal_reference);
        assert_eq!(loaded.lines, doc.lines);
        assert_eq!(loaded.totals, doc.totals);
        assert_eq!(loaded.counterparty, doc.counterparty);
        assert!(loaded.totals_are_consistent());
    }

    #[tokio::test]
    async fn test_claim_respects_status_and_kind() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let doc = new_doc(DocumentKind::Invoice, "Client", date(2));
        insert(&db, &doc).await;

        let mut conn = db.pool().acquire().await.unwrap();
        let wrong_kind =
            DocumentRepository::claim(&mut conn, &doc.id, DocumentKind::Quote, &[DocumentStatus::Draft], Utc::now())
                .await
                .unwrap();
        assert!(!wrong_kind);

        let wrong_status = DocumentRepository::claim(
            &mut conn,
            &doc.id,
            DocumentKind::Invoice,
            &[DocumentStatus::Validated],
            Utc::now(),
        )
        .await
        .unwrap();
        assert!(!wrong_status);

        let claimed =
            DocumentRepository::claim(&mut conn, &doc.id, DocumentKind::Invoice, &[DocumentStatus::Draft], Utc::now())
                .await
                .unwrap();
        assert!(claimed);

        let loaded = DocumentRepository::fetch(&mut conn, &doc.id).await.unwrap();
        assert_eq!(loaded.version, doc.version + 1);
    }

    #[tokio::test]
    async fn test_number_must_be_unique_per_kind() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut a = new_doc(DocumentKind::Invoice, "A", date(2));
        let mut b = new_doc(DocumentKind::Invoice, "B", date(2));
        for doc in [&mut a, &mut b] {
            doc.document_number = Some("FA2026-00001".to_string());
            doc.fiscal_year = Some(2026);
            doc.sequence = Some(1);
        }

        let mut conn = db.pool().acquire().await.unwrap();
        DocumentRepository::insert(&mut conn, &a).await.unwrap();
        let result = DocumentRepository::insert(&mut conn, &b).await;
        assert!(matches!(result, Err(DbError::UniqueViolation { .. })));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert(&db, &new_doc(DocumentKind::Invoice, "Quincaillerie Diop", date(1))).await;
        insert(&db, &new_doc(DocumentKind::Invoice, "Boulangerie Fall", date(10))).await;
        insert(&db, &new_doc(DocumentKind::Quote, "Quincaillerie Diop", date(5))).await;

        let repo = db.documents();
        let invoices = repo.list(&DocumentFilter::kind(DocumentKind::Invoice)).await.unwrap();
        assert_eq!(invoices.len(), 2);
        assert_eq!(invoices[0].counterparty.display_name, "Boulangerie Fall");

        let diop = repo
            .list(&DocumentFilter {
                search: Some("diop".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(diop.len(), 2);

        let early = repo
            .list(&DocumentFilter {
                from: Some(date(1)),
                to: Some(date(5)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(early.len(), 2);

        let paged = repo
            .list(&DocumentFilter {
                limit: 1,
                offset: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].issue_date, date(5));
    }

    #[tokio::test]
    async fn test_expire_overdue_only_touches_sent_quotes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut overdue = new_doc(DocumentKind::Quote, "A", date(1));
        overdue.status = DocumentStatus::Sent;
        overdue.due_date = Some(date(10));
        let mut draft = new_doc(DocumentKind::Quote, "B", date(1));
        draft.due_date = Some(date(10));
        let mut valid = new_doc(DocumentKind::Quote, "C", date(1));
        valid.status = DocumentStatus::Sent;
        valid.due_date = Some(date(20));
        for doc in [&overdue, &draft, &valid] {
            insert(&db, doc).await;
        }

        let expired = {
            let mut conn = db.pool().acquire().await.unwrap();
            DocumentRepository::expire_overdue(&mut conn, date(15), Utc::now())
                .await
                .unwrap()
        };
        assert_eq!(expired, vec![overdue.id.clone()]);

        let loaded = db.documents().get(&overdue.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, DocumentStatus::Expired);
        let untouched = db.documents().get(&draft.id).await.unwrap().unwrap();
        assert_eq!(untouched.status, DocumentStatus::Draft);
    }

    #[tokio::test]
    async fn test_delete_only_drafts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let draft = new_doc(DocumentKind::Order, "A", date(1));
        let mut confirmed = new_doc(DocumentKind::Order, "B", date(1));
        confirmed.status = DocumentStatus::Confirmed;
        confirmed.document_number = Some("BC2026-00001".to_string());
        confirmed.fiscal_year = Some(2026);
        confirmed.sequence = Some(1);
        insert(&db, &draft).await;
        insert(&db, &confirmed).await;

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(DocumentRepository::delete_draft(&mut conn, &draft.id).await.unwrap());
        assert!(!DocumentRepository::delete_draft(&mut conn, &confirmed.id).await.unwrap());
        assert!(DocumentRepository::find(&mut conn, &draft.id).await.unwrap().is_none());
    }
}
