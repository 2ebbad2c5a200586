//! # Journal Repository
//!
//! Stores SYSCOHADA journal entries. Entries are written once, inside the
//! transition that produced them, and never updated (triggers refuse it).

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use teranga_core::{JournalCode, JournalEntry, JournalLine, Money, SequenceType, SourceDocumentRef};

#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    id: String,
    journal_code: JournalCode,
    entry_date: NaiveDate,
    label: String,
    source_type: SequenceType,
    source_id: String,
    source_reference: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    account: String,
    label: String,
    debit: i64,
    credit: i64,
}

impl From<LineRow> for JournalLine {
    fn from(row: LineRow) -> Self {
        JournalLine {
            account: row.account,
            label: row.label,
            debit: Money::from_minor(row.debit),
            credit: Money::from_minor(row.credit),
        }
    }
}

/// An entry whose stored lines do not balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnbalancedEntry {
    pub entry_id: String,
    pub debit: i64,
    pub credit: i64,
}

#[derive(Debug, Clone)]
pub struct JournalRepository {
    pool: SqlitePool,
}

impl JournalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        JournalRepository { pool }
    }

    /// Inserts an entry and its lines. Refuses an unbalanced entry before
    /// touching the database.
    pub async fn insert(conn: &mut SqliteConnection, entry: &JournalEntry) -> DbResult<()> {
        entry.ensure_balanced()?;

        debug!(
            id = %entry.id,
            journal = %entry.journal_code,
            source = %entry.source.reference,
            "Inserting journal entry"
        );

        sqlx::query(
            r#"
            INSERT INTO journal_entries (
                id, journal_code, entry_date, label, source_type, source_id,
                source_reference, total_debit, total_credit, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&entry.id)
        .bind(entry.journal_code)
        .bind(entry.entry_date)
        .bind(&entry.label)
        .bind(entry.source.document_type)
        .bind(&entry.source.document_id)
        .bind(&entry.source.reference)
        .bind(entry.total_debit().minor())
        .bind(entry.total_credit().minor())
        .bind(entry.created_at)
        .execute(&mut *conn)
        .await?;

        for (line_no, line) in entry.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO journal_lines (entry_id, line_no, account, label, debit, credit)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&entry.id)
            .bind(line_no as i64 + 1)
            .bind(&line.account)
            .bind(&line.label)
            .bind(line.debit.minor())
            .bind(line.credit.minor())
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    async fn load(conn: &mut SqliteConnection, row: EntryRow) -> DbResult<JournalEntry> {
        let lines: Vec<LineRow> = sqlx::query_as(
            "SELECT account, label, debit, credit FROM journal_lines WHERE entry_id = ?1 ORDER BY line_no",
        )
        .bind(&row.id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(JournalEntry {
            id: row.id,
            journal_code: row.journal_code,
            entry_date: row.entry_date,
            label: row.label,
            lines: lines.into_iter().map(JournalLine::from).collect(),
            source: SourceDocumentRef {
                document_type: row.source_type,
                document_id: row.source_id,
                reference: row.source_reference,
            },
            created_at: row.created_at,
        })
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<JournalEntry>> {
        let mut conn = self.pool.acquire().await?;
        let row: Option<EntryRow> = sqlx::query_as(
            r#"
            SELECT id, journal_code, entry_date, label, source_type, source_id,
                   source_reference, created_at
            FROM journal_entries WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::load(&mut conn, row).await?)),
            None => Ok(None),
        }
    }

    /// Entries posted from one source document (an invoice or a payment).
    pub async fn for_source(&self, source_type: SequenceType, source_id: &str) -> DbResult<Vec<JournalEntry>> {
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<EntryRow> = sqlx::query_as(
            r#"
            SELECT id, journal_code, entry_date, label, source_type, source_id,
                   source_reference, created_at
            FROM journal_entries
            WHERE source_type = ?1 AND source_id = ?2
            ORDER BY created_at
            "#,
        )
        .bind(source_type)
        .bind(source_id)
        .fetch_all(&mut *conn)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(Self::load(&mut conn, row).await?);
        }
        Ok(entries)
    }

    /// Entries whose stored lines do not sum to equal debit and credit, or
    /// whose lines disagree with the header totals.
    pub async fn unbalanced_entries(&self) -> DbResult<Vec<UnbalancedEntry>> {
        let rows: Vec<(String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT e.id, COALESCE(SUM(l.debit), 0), COALESCE(SUM(l.credit), 0)
            FROM journal_entries e
            LEFT JOIN journal_lines l ON l.entry_id = e.id
            GROUP BY e.id, e.total_debit, e.total_credit
            HAVING COALESCE(SUM(l.debit), 0) <> COALESCE(SUM(l.credit), 0)
                OR COALESCE(SUM(l.debit), 0) <> e.total_debit
                OR COUNT(l.entry_id) < 2
            ORDER BY e.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(entry_id, debit, credit)| UnbalancedEntry { entry_id, debit, credit })
            .collect())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM journal_entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Fetches an entry that must exist.
    pub async fn fetch(&self, id: &str) -> DbResult<JournalEntry> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("JournalEntry", id))
    }
}
