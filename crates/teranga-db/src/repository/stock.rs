//! # Stock Ledger Repository
//!
//! Stock records (quantity + CUMP per product and warehouse) and the
//! append-only movement log.
//!
//! ## Applying a Movement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  lock(product, [warehouses])   ← first write of the transaction         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  find_record(source) / find_record(destination)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  teranga_core::stock::plan_movement   (pure CUMP arithmetic)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  existing record → UPDATE ... WHERE quantity_on_hand = <before>         │
//! │  new record      → INSERT                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT stock_movements (one row per warehouse touched)                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The guarded UPDATE never lets two writers both decrement from the same
//! starting quantity; the CHECK constraints refuse a negative quantity or a
//! stock value that is not `quantity × CUMP`.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use teranga_core::stock::plan_movement;
use teranga_core::{Money, MovementKind, MovementRequest, StockMovement, StockRecord};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct StockRecordRow {
    product_id: String,
    warehouse_id: String,
    quantity_on_hand: i64,
    weighted_average_cost: i64,
    stock_value: i64,
    updated_at: DateTime<Utc>,
}

impl From<StockRecordRow> for StockRecord {
    fn from(row: StockRecordRow) -> Self {
        StockRecord {
            product_id: row.product_id,
            warehouse_id: row.warehouse_id,
            quantity_on_hand: row.quantity_on_hand,
            weighted_average_cost: Money::from_minor(row.weighted_average_cost),
            stock_value: Money::from_minor(row.stock_value),
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MovementRow {
    id: String,
    kind: MovementKind,
    product_id: String,
    warehouse_id: String,
    source_warehouse_id: Option<String>,
    destination_warehouse_id: Option<String>,
    quantity: i64,
    unit_cost: i64,
    quantity_before: i64,
    quantity_after: i64,
    document_type: Option<String>,
    document_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<MovementRow> for StockMovement {
    fn from(row: MovementRow) -> Self {
        StockMovement {
            id: row.id,
            kind: row.kind,
            product_id: row.product_id,
            warehouse_id: row.warehouse_id,
            source_warehouse_id: row.source_warehouse_id,
            destination_warehouse_id: row.destination_warehouse_id,
            quantity: row.quantity,
            unit_cost: Money::from_minor(row.unit_cost),
            quantity_before: row.quantity_before,
            quantity_after: row.quantity_after,
            document_type: row.document_type,
            document_id: row.document_id,
            created_at: row.created_at,
        }
    }
}

const MOVEMENT_COLUMNS: &str = r#"
    SELECT id, kind, product_id, warehouse_id, source_warehouse_id, destination_warehouse_id,
           quantity, unit_cost, quantity_before, quantity_after, document_type, document_id,
           created_at
    FROM stock_movements
"#;

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Takes the write lock on the transaction by touching the records of
    /// `product_id` in `warehouses` (a no-op write when none exist).
    pub async fn lock(
        conn: &mut SqliteConnection,
        product_id: &str,
        warehouses: &[&str],
    ) -> DbResult<()> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("UPDATE stock_records SET updated_at = updated_at WHERE product_id = ");
        builder.push_bind(product_id);
        builder.push(" AND warehouse_id IN (");
        let mut separated = builder.separated(", ");
        for warehouse in warehouses {
            separated.push_bind(*warehouse);
        }
        if warehouses.is_empty() {
            separated.push("NULL");
        }
        separated.push_unseparated(")");

        builder.build().execute(&mut *conn).await?;
        Ok(())
    }

    pub async fn find_record(
        conn: &mut SqliteConnection,
        product_id: &str,
        warehouse_id: &str,
    ) -> DbResult<Option<StockRecord>> {
        let row: Option<StockRecordRow> = sqlx::query_as(
            r#"
            SELECT product_id, warehouse_id, quantity_on_hand, weighted_average_cost,
                   stock_value, updated_at
            FROM stock_records
            WHERE product_id = ?1 AND warehouse_id = ?2
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(StockRecord::from))
    }

    /// Applies one movement and appends its log rows.
    ///
    /// ## Returns
    /// The movement rows written, one per warehouse touched (two for a
    /// transfer).
    pub async fn apply_movement(
        conn: &mut SqliteConnection,
        request: &MovementRequest,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<StockMovement>> {
        request.validate()?;

        let source = match request.source_warehouse_id.as_deref() {
            Some(warehouse) => Self::find_record(conn, &request.product_id, warehouse).await?,
            None => None,
        };
        let destination = match request.destination_warehouse_id.as_deref() {
            Some(warehouse) => Self::find_record(conn, &request.product_id, warehouse).await?,
            None => None,
        };

        let plan = plan_movement(request, source.as_ref(), destination.as_ref(), now)?;

        for after in &plan.records {
            let before = [source.as_ref(), destination.as_ref()]
                .into_iter()
                .flatten()
                .find(|record| record.warehouse_id == after.warehouse_id);
            Self::write_record(conn, before, after).await?;
        }

        for movement in &plan.movements {
            Self::insert_movement(conn, movement).await?;
        }

        debug!(
            kind = %request.kind,
            product_id = %request.product_id,
            quantity = request.quantity,
            rows = plan.movements.len(),
            "Stock movement applied"
        );
        Ok(plan.movements)
    }

    async fn write_record(
        conn: &mut SqliteConnection,
        before: Option<&StockRecord>,
        after: &StockRecord,
    ) -> DbResult<()> {
        match before {
            Some(before) => {
                let result = sqlx::query(
                    r#"
                    UPDATE stock_records
                    SET quantity_on_hand = ?3, weighted_average_cost = ?4,
                        stock_value = ?5, updated_at = ?6
                    WHERE product_id = ?1 AND warehouse_id = ?2 AND quantity_on_hand = ?7
                    "#,
                )
                .bind(&after.product_id)
                .bind(&after.warehouse_id)
                .bind(after.quantity_on_hand)
                .bind(after.weighted_average_cost.minor())
                .bind(after.stock_value.minor())
                .bind(after.updated_at)
                .bind(before.quantity_on_hand)
                .execute(&mut *conn)
                .await?;

                if result.rows_affected() != 1 {
                    return Err(DbError::TransactionFailed(format!(
                        "stock record {}/{} changed concurrently",
                        after.product_id, after.warehouse_id
                    )));
                }
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO stock_records (
                        product_id, warehouse_id, quantity_on_hand,
                        weighted_average_cost, stock_value, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    "#,
                )
                .bind(&after.product_id)
                .bind(&after.warehouse_id)
                .bind(after.quantity_on_hand)
                .bind(after.weighted_average_cost.minor())
                .bind(after.stock_value.minor())
                .bind(after.updated_at)
                .execute(&mut *conn)
                .await?;
            }
        }
        Ok(())
    }

    async fn insert_movement(conn: &mut SqliteConnection, movement: &StockMovement) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, kind, product_id, warehouse_id, source_warehouse_id, destination_warehouse_id,
                quantity, unit_cost, quantity_before, quantity_after,
                document_type, document_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&movement.id)
        .bind(movement.kind)
        .bind(&movement.product_id)
        .bind(&movement.warehouse_id)
        .bind(&movement.source_warehouse_id)
        .bind(&movement.destination_warehouse_id)
        .bind(movement.quantity)
        .bind(movement.unit_cost.minor())
        .bind(movement.quantity_before)
        .bind(movement.quantity_after)
        .bind(&movement.document_type)
        .bind(&movement.document_id)
        .bind(movement.created_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Current record, or an empty one when nothing was ever moved.
    pub async fn current_state(&self, product_id: &str, warehouse_id: &str) -> DbResult<StockRecord> {
        let mut conn = self.pool.acquire().await?;
        let record = Self::find_record(&mut conn, product_id, warehouse_id).await?;
        Ok(record.unwrap_or_else(|| StockRecord::empty(product_id, warehouse_id, Utc::now())))
    }

    pub async fn list_by_warehouse(&self, warehouse_id: &str) -> DbResult<Vec<StockRecord>> {
        let rows: Vec<StockRecordRow> = sqlx::query_as(
            r#"
            SELECT product_id, warehouse_id, quantity_on_hand, weighted_average_cost,
                   stock_value, updated_at
            FROM stock_records
            WHERE warehouse_id = ?1
            ORDER BY product_id
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StockRecord::from).collect())
    }

    /// Movement history of a product in a warehouse, most recent first.
    pub async fn movements(
        &self,
        product_id: &str,
        warehouse_id: &str,
        limit: u32,
    ) -> DbResult<Vec<StockMovement>> {
        let rows: Vec<MovementRow> = sqlx::query_as(&format!(
            "{} WHERE product_id = ?1 AND warehouse_id = ?2 ORDER BY rowid DESC LIMIT ?3",
            MOVEMENT_COLUMNS
        ))
        .bind(product_id)
        .bind(warehouse_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StockMovement::from).collect())
    }

    /// Movements caused by one document, in the order they were written.
    pub async fn movements_for_document(
        &self,
        document_type: &str,
        document_id: &str,
    ) -> DbResult<Vec<StockMovement>> {
        let rows: Vec<MovementRow> = sqlx::query_as(&format!(
            "{} WHERE document_type = ?1 AND document_id = ?2 ORDER BY rowid",
            MOVEMENT_COLUMNS
        ))
        .bind(document_type)
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StockMovement::from).collect())
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

    async fn apply(db: &Database, request: MovementRequest) -> DbResult<Vec<StockMovement>> {
        let mut tx = db.begin().await?;
        let warehouses: Vec<&str> = [
            request.source_warehouse_id.as_deref(),
            request.destination_warehouse_id.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();
        StockRepository::lock(&mut tx, &request.product_id, &warehouses).await?;
        let movements = StockRepository::apply_movement(&mut tx, &request, Utc::now()).await?;
        tx.commit().await.map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok(movements)
    }

    #[tokio::test]
    async fn test_inbound_creates_record_and_averages() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        apply(&db, MovementRequest::inbound("HUILE-5L", "DKR", 10, Money::from_minor(100)))
            .await
            .unwrap();
        apply(&db, MovementRequest::inbound("HUILE-5L", "DKR", 10, Money::from_minor(200)))
            .await
            .unwrap();

        let record = db.stock().current_state("HUILE-5L", "DKR").await.unwrap();
        assert_eq!(record.quantity_on_hand, 20);
        assert_eq!(record.weighted_average_cost.minor(), 150);
        assert_eq!(record.stock_value.minor(), 3_000);
    }

    #[tokio::test]
    async fn test_outbound_refused_leaves_stock_untouched() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        apply(&db, MovementRequest::inbound("P", "W", 5, Money::from_minor(1_000)))
            .await
            .unwrap();

        let result = apply(&db, MovementRequest::outbound("P", "W", 7)).await;
        assert!(matches!(
            result,
            Err(DbError::Domain(CoreError::InsufficientStock { available: 5, requested: 7, .. }))
        ));

        let record = db.stock().current_state("P", "W").await.unwrap();
        assert_eq!(record.quantity_on_hand, 5);
        assert_eq!(db.stock().movements("P", "W", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transfer_writes_two_rows() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        apply(&db, MovementRequest::inbound("P", "DKR", 10, Money::from_minor(250)))
            .await
            .unwrap();

        let request = MovementRequest::transfer("P", "DKR", "THS", 4).for_document("transfer_order", "TR-1");
        let movements = apply(&db, request).await.unwrap();
        assert_eq!(movements.len(), 2);

        let source = db.stock().current_state("P", "DKR").await.unwrap();
        let destination = db.stock().current_state("P", "THS").await.unwrap();
        assert_eq!(source.quantity_on_hand, 6);
        assert_eq!(destination.quantity_on_hand, 4);
        assert_eq!(destination.weighted_average_cost.minor(), 250);

        let logged = db.stock().movements_for_document("transfer_order", "TR-1").await.unwrap();
        assert_eq!(logged.len(), 2);
        assert!(logged.iter().all(|m| m.kind == MovementKind::Transfer));
        assert_eq!(logged[0].warehouse_id, "DKR");
        assert_eq!(logged[1].warehouse_id, "THS");
    }

    #[tokio::test]
    async fn test_movements_are_immutable() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        apply(&db, MovementRequest::inbound("P", "W", 1, Money::from_minor(10)))
            .await
            .unwrap();

        let update = sqlx::query("UPDATE stock_movements SET quantity = 99")
            .execute(db.pool())
            .await
            .map_err(DbError::from);
        assert!(matches!(update, Err(DbError::ConstraintViolation(_))));

        let delete = sqlx::query("DELETE FROM stock_movements")
            .execute(db.pool())
            .await
            .map_err(DbError::from);
        assert!(matches!(delete, Err(DbError::ConstraintViolation(_))));
    }

    #[tokio::test]
    async fn test_stock_value_check_constraint() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let result = sqlx::query(
            "INSERT INTO stock_records VALUES ('P', 'W', 2, 100, 150, '2026-01-01T00:00:00Z')",
        )
        .execute(db.pool())
        .await
        .map_err(DbError::from);
        assert!(matches!(result, Err(DbError::ConstraintViolation(_))));
    }

    #[tokio::test]
    async fn test_list_by_warehouse_and_empty_state() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        apply(&db, MovementRequest::inbound("B", "W", 1, Money::from_minor(10)))
            .await
            .unwrap();
        apply(&db, MovementRequest::inbound("A", "W", 2, Money::from_minor(10)))
            .await
            .unwrap();

        let records = db.stock().list_by_warehouse("W").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].product_id, "A");

        let empty = db.stock().current_state("Z", "W").await.unwrap();
        assert_eq!(empty.quantity_on_hand, 0);
        assert!(empty.stock_value.is_zero());
    }
}
