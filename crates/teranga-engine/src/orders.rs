//! # Order Service
//!
//! Orders track, per line, how much has been put on delivery notes.
//!
//! ```text
//!   draft ──► confirmed ──► in_progress ──► cancelled
//!                │               │
//!                └──────┬────────┘
//!                       ▼   generate_delivery_note (some lines)
//!             partially_delivered ──► delivered   (every line complete)
//! ```

use std::collections::BTreeMap;
use std::ops::Deref;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use teranga_core::lifecycle::{order_delivery_status, DELIVERABLE_ORDER_STATUSES};
use teranga_core::validation::validate_quantity;
use teranga_core::{CoreError, DocumentKind, DocumentStatus, NewDocument, SalesDocument, ValidationError};
use teranga_db::{Database, DocumentRepository};

use crate::documents::{insert_successor, refuse, DocumentService};
use crate::error::EngineResult;

/// Quantity of one order line to put on a delivery note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryLine {
    pub line_id: String,
    pub quantity: i64,
}

impl DeliveryLine {
    pub fn new(line_id: impl Into<String>, quantity: i64) -> Self {
        DeliveryLine {
            line_id: line_id.into(),
            quantity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderService {
    documents: DocumentService,
}

impl Deref for OrderService {
    type Target = DocumentService;

    fn deref(&self) -> &DocumentService {
        &self.documents
    }
}

impl OrderService {
    pub fn new(db: Database) -> Self {
        OrderService {
            documents: DocumentService::new(db, DocumentKind::Order),
        }
    }

    /// Generates a draft delivery note for some quantities of the order.
    ///
    /// Requested quantities are recorded on the order lines right away, so
    /// two delivery notes can never promise the same units. Cancelling or
    /// deleting the draft gives them back.
    ///
    /// ## Errors
    /// - `QuantityExceeded` naming the first line asking for more than
    ///   `ordered - delivered`
    /// - `InvalidState` when the order is not confirmed, in progress or
    ///   partially delivered
    pub async fn generate_delivery_note(
        &self,
        order_id: &str,
        lines: &[DeliveryLine],
        warehouse_id: &str,
    ) -> EngineResult<SalesDocument> {
        if lines.is_empty() {
            return Err(ValidationError::Required {
                field: "lines".to_string(),
            }
            .into());
        }
        for line in lines {
            validate_quantity(line.quantity)?;
        }

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        // a fully delivered order is claimed too, so asking for more reports
        // the exhausted line rather than the order status
        let claimable: Vec<DocumentStatus> = DELIVERABLE_ORDER_STATUSES
            .iter()
            .copied()
            .chain([DocumentStatus::Delivered])
            .collect();
        if !DocumentRepository::claim(&mut tx, order_id, DocumentKind::Order, &claimable, now).await? {
            return Err(refuse(&mut tx, order_id, DocumentKind::Order, DELIVERABLE_ORDER_STATUSES, "deliver").await);
        }
        let mut order = DocumentRepository::fetch(&mut tx, order_id).await?;

        let mut requested: BTreeMap<&str, i64> = BTreeMap::new();
        for line in lines {
            *requested.entry(line.line_id.as_str()).or_default() += line.quantity;
        }

        let mut inputs = Vec::with_capacity(requested.len());
        for (line_id, quantity) in &requested {
            let line = order.line_mut(line_id).ok_or_else(|| ValidationError::UnknownReference {
                field: "line_id".to_string(),
                value: line_id.to_string(),
            })?;
            let remaining = line.remaining_to_deliver();
            if *quantity > remaining {
                return Err(CoreError::QuantityExceeded {
                    line_id: line_id.to_string(),
                    requested: *quantity,
                    remaining,
                }
                .into());
            }
            line.delivered_quantity += quantity;
            inputs.push(line.derive_input(*quantity, true));
        }
        order.ensure_status(DELIVERABLE_ORDER_STATUSES, "deliver")?;

        let mut new = NewDocument::new(
            DocumentKind::DeliveryNote,
            order.counterparty.clone(),
            now.date_naive(),
            inputs,
        );
        new.global_discount = order.global_discount;
        new.terms = order.terms.clone();
        new.warehouse_id = Some(warehouse_id.to_string());
        new.links.quote_id = order.links.quote_id.clone();
        new.links.order_id = Some(order.id.clone());

        let delivery_note = insert_successor(&mut tx, &mut order, new, now).await?;

        order.status = order_delivery_status(order.status, &order.lines);
        order.updated_at = now;
        DocumentRepository::update(&mut tx, &order).await?;
        tx.commit().await?;

        info!(
            order = %order.reference(),
            delivery_note = %delivery_note.id,
            status = %order.status,
            "Delivery note generated"
        );
        Ok(delivery_note)
    }

    /// Delivery notes generated from an order, every status.
    pub async fn delivery_notes(&self, order_id: &str) -> EngineResult<Vec<SalesDocument>> {
        Ok(self.db.documents().delivery_notes_for_order(order_id).await?)
    }
}
