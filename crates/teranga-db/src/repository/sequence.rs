//! # Sequence Repository
//!
//! Gapless document numbering.
//!
//! ## Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One statement, one write lock                        │
//! │                                                                         │
//! │  UPDATE document_sequences                                              │
//! │     SET current_value = CASE WHEN fiscal_year = :year                  │
//! │                              THEN current_value + 1 ELSE 1 END,        │
//! │         fiscal_year   = :year                                           │
//! │   WHERE document_type = :type AND fiscal_year <= :year                  │
//! │  RETURNING current_value, prefix                                        │
//! │                                                                         │
//! │  row returned      → FA2026-00042                                       │
//! │  no row returned   → missing counter or closed fiscal year              │
//! │                                                                         │
//! │  The statement runs on the caller's transaction: a rollback gives the   │
//! │  number back, so the sequence never has holes.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use teranga_core::validation::validate_prefix;
use teranga_core::{AllocatedNumber, SequenceState, SequenceType};

#[derive(Debug, sqlx::FromRow)]
struct SequenceRow {
    document_type: SequenceType,
    prefix: String,
    fiscal_year: i32,
    current_value: i64,
}

impl From<SequenceRow> for SequenceState {
    fn from(row: SequenceRow) -> Self {
        SequenceState {
            sequence_type: row.document_type,
            prefix: row.prefix,
            fiscal_year: row.fiscal_year,
            current_value: row.current_value,
        }
    }
}

/// Repository for numbering counters.
///
/// ## Usage
/// ```rust,ignore
/// // inside a transition
/// let number = SequenceRepository::allocate(&mut *tx, SequenceType::Invoice, 2026).await?;
///
/// // standalone (commits immediately)
/// let number = db.sequences().next_number(SequenceType::Payment, 2026).await?;
/// ```
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Allocates the next number of `sequence_type` in `fiscal_year`.
    ///
    /// ## Errors
    /// - `Configuration` when the counter row is missing
    /// - `Configuration` when `fiscal_year` is older than the counter's year
    pub async fn allocate(
        conn: &mut SqliteConnection,
        sequence_type: SequenceType,
        fiscal_year: i32,
    ) -> DbResult<AllocatedNumber> {
        let row: Option<(i64, String)> = sqlx::query_as(
            r#"
            UPDATE document_sequences
            SET current_value = CASE WHEN fiscal_year = ?2 THEN current_value + 1 ELSE 1 END,
                fiscal_year = ?2,
                updated_at = ?3
            WHERE document_type = ?1 AND fiscal_year <= ?2
            RETURNING current_value, prefix
            "#,
        )
        .bind(sequence_type)
        .bind(fiscal_year)
        .bind(Utc::now())
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some((sequence, prefix)) => {
                let number = AllocatedNumber::new(sequence_type, &prefix, fiscal_year, sequence);
                debug!(number = %number.formatted, "Sequence allocated");
                Ok(number)
            }
            None => {
                let current: Option<i32> = sqlx::query_scalar(
                    "SELECT fiscal_year FROM document_sequences WHERE document_type = ?1",
                )
                .bind(sequence_type)
                .fetch_optional(&mut *conn)
                .await?;

                Err(match current {
                    None => DbError::configuration(format!(
                        "no numbering row for document type '{}'",
                        sequence_type
                    )),
                    Some(year) => DbError::configuration(format!(
                        "fiscal year {} is closed for '{}' (counter is at {})",
                        fiscal_year, sequence_type, year
                    )),
                })
            }
        }
    }

    /// Allocates a number on its own transaction.
    pub async fn next_number(
        &self,
        sequence_type: SequenceType,
        fiscal_year: i32,
    ) -> DbResult<AllocatedNumber> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        let number = Self::allocate(&mut tx, sequence_type, fiscal_year).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok(number)
    }

    /// Current state of every counter.
    pub async fn list(&self) -> DbResult<Vec<SequenceState>> {
        let rows: Vec<SequenceRow> = sqlx::query_as(
            r#"
            SELECT document_type, prefix, fiscal_year, current_value
            FROM document_sequences
            ORDER BY document_type
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SequenceState::from).collect())
    }

    /// Current state of one counter.
    pub async fn get(&self, sequence_type: SequenceType) -> DbResult<Option<SequenceState>> {
        let row: Option<SequenceRow> = sqlx::query_as(
            r#"
            SELECT document_type, prefix, fiscal_year, current_value
            FROM document_sequences
            WHERE document_type = ?1
            "#,
        )
        .bind(sequence_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SequenceState::from))
    }

    /// Writes configured prefixes. Counters and years are left alone; a
    /// missing row is created at zero for `fiscal_year`.
    pub async fn sync_prefixes(
        &self,
        prefixes: &[(SequenceType, String)],
        fiscal_year: i32,
    ) -> DbResult<()> {
        for (_, prefix) in prefixes {
            validate_prefix(prefix).map_err(teranga_core::CoreError::from)?;
        }

        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        for (sequence_type, prefix) in prefixes {
            sqlx::query(
                r#"
                INSERT INTO document_sequences (document_type, prefix, fiscal_year, current_value, updated_at)
                VALUES (?1, ?2, ?3, 0, ?4)
                ON CONFLICT(document_type) DO UPDATE SET
                    prefix = excluded.prefix,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(*sequence_type)
            .bind(prefix)
            .bind(fiscal_year)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(count = prefixes.len(), "Sequence prefixes synced");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use teranga_core::CoreError;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn set_year(db: &Database, sequence_type: SequenceType, year: i32, value: i64) {
        sqlx::query("UPDATE document_sequences SET fiscal_year = ?1, current_value = ?2 WHERE document_type = ?3")
            .bind(year)
            .bind(value)
            .bind(sequence_type)
            .execute(db.pool())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_allocations_are_consecutive() {
        let db = db().await;
        set_year(&db, SequenceType::Invoice, 2026, 0).await;
        let repo = db.sequences();

        let first = repo.next_number(SequenceType::Invoice, 2026).await.unwrap();
        let second = repo.next_number(SequenceType::Invoice, 2026).await.unwrap();

        assert_eq!(first.formatted, "FA2026-00001");
        assert_eq!(second.formatted, "FA2026-00002");
        assert_eq!(second.sequence, first.sequence + 1);
    }

    #[tokio::test]
    async fn test_counters_are_independent_per_type() {
        let db = db().await;
        set_year(&db, SequenceType::Invoice, 2026, 7).await;
        set_year(&db, SequenceType::CreditNote, 2026, 0).await;
        let repo = db.sequences();

        let credit = repo.next_number(SequenceType::CreditNote, 2026).await.unwrap();
        assert_eq!(credit.formatted, "AV2026-00001");
        let invoice = repo.next_number(SequenceType::Invoice, 2026).await.unwrap();
        assert_eq!(invoice.formatted, "FA2026-00008");
    }

    #[tokio::test]
    async fn test_new_fiscal_year_restarts_at_one() {
        let db = db().await;
        set_year(&db, SequenceType::Quote, 2026, 41).await;
        let repo = db.sequences();

        let number = repo.next_number(SequenceType::Quote, 2027).await.unwrap();
        assert_eq!(number.formatted, "DV2027-00001");

        let state = repo.get(SequenceType::Quote).await.unwrap().unwrap();
        assert_eq!(state.fiscal_year, 2027);
        assert_eq!(state.current_value, 1);
    }

    #[tokio::test]
    async fn test_closed_fiscal_year_is_refused() {
        let db = db().await;
        set_year(&db, SequenceType::Invoice, 2027, 3).await;

        let result = db.sequences().next_number(SequenceType::Invoice, 2026).await;
        assert!(matches!(result, Err(DbError::Domain(CoreError::Configuration(_)))));

        let state = db.sequences().get(SequenceType::Invoice).await.unwrap().unwrap();
        assert_eq!(state.current_value, 3);
    }

    #[tokio::test]
    async fn test_missing_row_is_configuration_error() {
        let db = db().await;
        sqlx::query("DELETE FROM document_sequences WHERE document_type = 'payment'")
            .execute(db.pool())
            .await
            .unwrap();

        let result = db.sequences().next_number(SequenceType::Payment, 2026).await;
        match result {
            Err(DbError::Domain(CoreError::Configuration(message))) => {
                assert!(message.contains("no numbering row"));
            }
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rollback_returns_the_number() {
        let db = db().await;
        set_year(&db, SequenceType::Order, 2026, 0).await;

        {
            let mut tx = db.begin().await.unwrap();
            let number = SequenceRepository::allocate(&mut tx, SequenceType::Order, 2026)
                .await
                .unwrap();
            assert_eq!(number.sequence, 1);
            tx.rollback().await.unwrap();
        }

        let number = db.sequences().next_number(SequenceType::Order, 2026).await.unwrap();
        assert_eq!(number.formatted, "BC2026-00001");
    }

    #[tokio::test]
    async fn test_sync_prefixes_keeps_counter() {
        let db = db().await;
        set_year(&db, SequenceType::Invoice, 2026, 12).await;
        let repo = db.sequences();

        repo.sync_prefixes(&[(SequenceType::Invoice, "FAC".to_string())], 2026)
            .await
            .unwrap();

        let number = repo.next_number(SequenceType::Invoice, 2026).await.unwrap();
        assert_eq!(number.formatted, "FAC2026-00013");

        let bad = repo
            .sync_prefixes(&[(SequenceType::Invoice, "fa-1".to_string())], 2026)
            .await;
        assert!(bad.is_err());
    }

    #[tokio::test]
    async fn test_list_returns_seeded_counters() {
        let db = db().await;
        let states = db.sequences().list().await.unwrap();
        assert_eq!(states.len(), 7);
        assert!(states
            .iter()
            .any(|s| s.sequence_type == SequenceType::PurchaseOrder && s.prefix == "BCF"));
    }
}
