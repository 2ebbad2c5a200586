//! # Payment Repository
//!
//! Payments recorded against invoices and credit notes.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use teranga_core::{Money, Payment, PaymentMethod};

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: String,
    payment_number: String,
    document_id: String,
    document_number: String,
    method: PaymentMethod,
    amount: i64,
    paid_on: NaiveDate,
    reference: Option<String>,
    journal_entry_id: String,
    created_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Payment {
            id: row.id,
            payment_number: row.payment_number,
            document_id: row.document_id,
            document_number: row.document_number,
            method: row.method,
            amount: Money::from_minor(row.amount),
            paid_on: row.paid_on,
            reference: row.reference,
            journal_entry_id: row.journal_entry_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Inserts a payment. Its journal entry must already be stored.
    pub async fn insert(conn: &mut SqliteConnection, payment: &Payment) -> DbResult<()> {
        debug!(
            id = %payment.id,
            number = %payment.payment_number,
            document = %payment.document_number,
            amount = payment.amount.minor(),
            "Inserting payment"
        );

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, payment_number, document_id, document_number, method, amount,
                paid_on, reference, journal_entry_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.payment_number)
        .bind(&payment.document_id)
        .bind(&payment.document_number)
        .bind(payment.method)
        .bind(payment.amount.minor())
        .bind(payment.paid_on)
        .bind(&payment.reference)
        .bind(&payment.journal_entry_id)
        .bind(payment.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Payments of a document, oldest first.
    pub async fn for_document(&self, document_id: &str) -> DbResult<Vec<Payment>> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, payment_number, document_id, document_number, method, amount,
                   paid_on, reference, journal_entry_id, created_at
            FROM payments
            WHERE document_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Payment::from).collect())
    }

    /// Sum of the payments of a document.
    pub async fn total_paid(&self, document_id: &str) -> DbResult<Money> {
        let total: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0) FROM payments WHERE document_id = ?1")
            .bind(document_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(Money::from_minor(total))
    }
}
