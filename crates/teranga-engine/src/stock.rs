//! # Stock Service
//!
//! Direct stock movements (receptions, transfers, adjustments, returns) and
//! stock queries. Deliveries go through [`DeliveryService`](crate::deliveries::DeliveryService).

use chrono::Utc;
use tracing::info;

use teranga_core::{MovementRequest, StockMovement, StockRecord};
use teranga_db::{Database, StockRepository};

use crate::error::EngineResult;

/// Default number of movements returned by [`StockService::movements`].
pub const DEFAULT_HISTORY_LIMIT: u32 = 20;

#[derive(Debug, Clone)]
pub struct StockService {
    db: Database,
}

impl StockService {
    pub fn new(db: Database) -> Self {
        StockService { db }
    }

    /// Applies one movement on its own transaction.
    ///
    /// Returns the movement rows written (two for a transfer).
    pub async fn apply_movement(&self, request: &MovementRequest) -> EngineResult<Vec<StockMovement>> {
        request.validate()?;

        let warehouses: Vec<&str> = [
            request.source_warehouse_id.as_deref(),
            request.destination_warehouse_id.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();

        let mut tx = self.db.begin().await?;
        StockRepository::lock(&mut tx, &request.product_id, &warehouses).await?;
        let movements = StockRepository::apply_movement(&mut tx, request, Utc::now()).await?;
        tx.commit().await?;

        info!(
            kind = %request.kind,
            product_id = %request.product_id,
            quantity = request.quantity,
            warehouses = ?warehouses,
            "Stock movement recorded"
        );
        Ok(movements)
    }

    /// Current record; an empty one when the product never moved there.
    pub async fn current_state(&self, product_id: &str, warehouse_id: &str) -> EngineResult<StockRecord> {
        Ok(self.db.stock().current_state(product_id, warehouse_id).await?)
    }

    /// Most recent movements first.
    pub async fn movements(
        &self,
        product_id: &str,
        warehouse_id: &str,
        limit: u32,
    ) -> EngineResult<Vec<StockMovement>> {
        Ok(self.db.stock().movements(product_id, warehouse_id, limit).await?)
    }

    pub async fn list_by_warehouse(&self, warehouse_id: &str) -> EngineResult<Vec<StockRecord>> {
        Ok(self.db.stock().list_by_warehouse(warehouse_id).await?)
    }

    /// Movements caused by a document, in the order they were written.
    pub async fn movements_for_document(
        &self,
        document_type: &str,
        document_id: &str,
    ) -> EngineResult<Vec<StockMovement>> {
        Ok(self
            .db
            .stock()
            .movements_for_document(document_type, document_id)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use teranga_core::{MovementKind, Money};
    use teranga_db::DbConfig;

    async fn service() -> StockService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        StockService::new(db)
    }

    #[tokio::test]
    async fn test_reception_then_transfer() {
        let stock = service().await;
        stock
            .apply_movement(&MovementRequest::inbound("HUILE-5L", "DKR-01", 12, Money::from_minor(6_000)))
            .await
            .unwrap();

        let rows = stock
            .apply_movement(&MovementRequest::transfer("HUILE-5L", "DKR-01", "THS-02", 5))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|m| m.kind == MovementKind::Transfer));

        let dakar = stock.current_state("HUILE-5L", "DKR-01").await.unwrap();
        let thies = stock.current_state("HUILE-5L", "THS-02").await.unwrap();
        assert_eq!(dakar.quantity_on_hand, 7);
        assert_eq!(thies.quantity_on_hand, 5);
        assert_eq!(thies.weighted_average_cost.minor(), 6_000);

        let history = stock.movements("HUILE-5L", "DKR-01", DEFAULT_HISTORY_LIMIT).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].quantity_after, 7);
    }

    #[tokio::test]
    async fn test_refused_movement_writes_nothing() {
        let stock = service().await;
        stock
            .apply_movement(&MovementRequest::inbound("SUCRE-1KG", "DKR-01", 3, Money::from_minor(700)))
            .await
            .unwrap();

        let err = stock
            .apply_movement(&MovementRequest::outbound("SUCRE-1KG", "DKR-01", 4))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        let record = stock.current_state("SUCRE-1KG", "DKR-01").await.unwrap();
        assert_eq!(record.quantity_on_hand, 3);
        assert_eq!(stock.movements("SUCRE-1KG", "DKR-01", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_request_is_validation_error() {
        let stock = service().await;
        let err = stock
            .apply_movement(&MovementRequest::transfer("SUCRE-1KG", "DKR-01", "DKR-01", 1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }
}
