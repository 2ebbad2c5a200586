//! # Delivery Note Service
//!
//! Validating a delivery note is the only transition that moves stock.
//!
//! ## Validation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate(BL)                               one transaction             │
//! │                                                                         │
//! │  1. claim BL (draft)                                                    │
//! │  2. CHECK  lines still match the quantities recorded on the order       │
//! │            every product: on hand >= Σ line quantities                  │
//! │            └── first shortage ──► InsufficientStock, nothing written    │
//! │  3. APPLY  one `out` movement per line (guarded decrement)              │
//! │  4. number BL{year}-NNNNN, status validated                             │
//! │  5. refresh the order's delivery status                                 │
//! │  6. optional: draft invoice from the order's lines                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use teranga_core::lifecycle::order_delivery_status;
use teranga_core::{
    CoreError, CoreResult, DocumentKind, DocumentStatus, MovementRequest, NewDocument, SalesDocument,
    SequenceType, StockMovement, ValidationError,
};
use teranga_db::{Database, DocumentRepository, StockRepository};

use crate::documents::{assign_number, insert_successor, refuse, DocumentService};
use crate::error::EngineResult;

/// Order statuses whose delivery progress follows their lines.
const TRACKED_ORDER_STATUSES: &[DocumentStatus] = &[
    DocumentStatus::Confirmed,
    DocumentStatus::InProgress,
    DocumentStatus::PartiallyDelivered,
    DocumentStatus::Delivered,
];

/// Outcome of a delivery note validation.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryValidation {
    pub delivery_note: SalesDocument,
    pub movements: Vec<StockMovement>,
    pub invoice: Option<SalesDocument>,
}

#[derive(Debug, Clone)]
pub struct DeliveryService {
    documents: DocumentService,
}

impl Deref for DeliveryService {
    type Target = DocumentService;

    fn deref(&self) -> &DocumentService {
        &self.documents
    }
}

impl DeliveryService {
    pub fn new(db: Database) -> Self {
        DeliveryService {
            documents: DocumentService::new(db, DocumentKind::DeliveryNote),
        }
    }

    /// Validates a draft delivery note: takes its goods out of stock and
    /// numbers it.
    ///
    /// With `generate_invoice`, a draft invoice is created in the same
    /// transaction from the order's lines (the delivery note's own lines when
    /// it has no order).
    pub async fn validate(&self, id: &str, generate_invoice: bool) -> EngineResult<DeliveryValidation> {
        let now = Utc::now();
        let allowed = &[DocumentStatus::Draft];
        let mut tx = self.db.begin().await?;

        if !DocumentRepository::claim(&mut tx, id, DocumentKind::DeliveryNote, allowed, now).await? {
            return Err(refuse(&mut tx, id, DocumentKind::DeliveryNote, allowed, "validate").await);
        }
        let mut delivery_note = DocumentRepository::fetch(&mut tx, id).await?;
        let warehouse = delivery_note.warehouse_id.clone().ok_or_else(|| {
            CoreError::invalid_state(id, delivery_note.status, "no warehouse to deliver from")
        })?;

        let mut order = match delivery_note.links.order_id.as_deref() {
            Some(order_id) => DocumentRepository::find(&mut tx, order_id).await?,
            None => None,
        };
        if let Some(order) = order.as_ref() {
            ensure_reserved(&delivery_note, order)?;
        }
        ensure_available(&mut tx, &delivery_note, &warehouse).await?;

        let mut movements = Vec::with_capacity(delivery_note.lines.len());
        for line in &delivery_note.lines {
            let request = MovementRequest::outbound(&line.product_id, &warehouse, line.quantity)
                .for_document(SequenceType::DeliveryNote.as_str(), &delivery_note.id);
            movements.extend(StockRepository::apply_movement(&mut tx, &request, now).await?);
        }

        assign_number(&mut tx, &mut delivery_note, now.date_naive()).await?;
        delivery_note.status = DocumentStatus::Validated;
        delivery_note.validated_at = Some(now);
        delivery_note.updated_at = now;

        if let Some(order) = order.as_mut() {
            if TRACKED_ORDER_STATUSES.contains(&order.status) {
                order.status = order_delivery_status(order.status, &order.lines);
            }
        }

        let invoice = if generate_invoice {
            let source = order.as_ref().unwrap_or(&delivery_note);
            let lines = source
                .lines
                .iter()
                .map(|line| line.derive_input(line.quantity, true))
                .collect();
            let mut new = NewDocument::new(
                DocumentKind::Invoice,
                delivery_note.counterparty.clone(),
                now.date_naive(),
                lines,
            );
            new.global_discount = source.global_discount;
            new.terms = source.terms.clone();
            new.links.quote_id = delivery_note.links.quote_id.clone();
            new.links.order_id = delivery_note.links.order_id.clone();
            new.links.delivery_note_id = Some(delivery_note.id.clone());

            let invoice = insert_successor(&mut tx, &mut delivery_note, new, now).await?;
            if let Some(order) = order.as_mut() {
                order.add_successor(DocumentKind::Invoice, invoice.id.clone());
            }
            Some(invoice)
        } else {
            None
        };

        if let Some(order) = order.as_mut() {
            order.updated_at = now;
            DocumentRepository::update(&mut tx, order).await?;
        }
        DocumentRepository::update(&mut tx, &delivery_note).await?;
        tx.commit().await?;

        info!(
            id = %delivery_note.id,
            number = delivery_note.reference(),
            warehouse = %warehouse,
            movements = movements.len(),
            invoice = invoice.as_ref().map(|i| i.id.as_str()).unwrap_or("-"),
            "Delivery note validated"
        );
        Ok(DeliveryValidation {
            delivery_note,
            movements,
            invoice,
        })
    }
}

/// Checks the lines of a delivery note against the quantities recorded on
/// its order when it was generated.
fn ensure_reserved(delivery_note: &SalesDocument, order: &SalesDocument) -> CoreResult<()> {
    let mut requested: BTreeMap<&str, i64> = BTreeMap::new();
    for line in &delivery_note.lines {
        let source = line.source_line_id.as_deref().ok_or_else(|| ValidationError::Required {
            field: "source_line_id".to_string(),
        })?;
        *requested.entry(source).or_default() += line.quantity;
    }

    for (source, quantity) in requested {
        let order_line = order.line(source).ok_or_else(|| ValidationError::UnknownReference {
            field: "source_line_id".to_string(),
            value: source.to_string(),
        })?;
        if quantity > order_line.delivered_quantity {
            return Err(CoreError::QuantityExceeded {
                line_id: source.to_string(),
                requested: quantity,
                remaining: order_line.delivered_quantity,
            });
        }
    }
    Ok(())
}

/// Checks every product of `delivery_note` before anything is moved.
///
/// Quantities of the same product on several lines are summed.
async fn ensure_available(
    conn: &mut SqliteConnection,
    delivery_note: &SalesDocument,
    warehouse: &str,
) -> EngineResult<()> {
    let mut needed: BTreeMap<&str, i64> = BTreeMap::new();
    for line in &delivery_note.lines {
        *needed.entry(line.product_id.as_str()).or_default() += line.quantity;
    }

    for (product_id, quantity) in needed {
        match StockRepository::find_record(conn, product_id, warehouse).await? {
            Some(record) if record.quantity_on_hand >= quantity => {}
            Some(record) => return Err(record.insufficient(quantity).into()),
            None => {
                return Err(CoreError::InsufficientStock {
                    product_id: product_id.to_string(),
                    warehouse_id: warehouse.to_string(),
                    available: 0,
                    requested: quantity,
                }
                .into())
            }
        }
    }
    Ok(())
}

/// Gives the quantities of a draft delivery note back to its order and
/// recomputes the order's delivery status.
pub(crate) async fn release_order_quantities(
    conn: &mut SqliteConnection,
    delivery_note: &SalesDocument,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    let Some(order_id) = delivery_note.links.order_id.as_deref() else {
        return Ok(());
    };
    let Some(mut order) = DocumentRepository::find(conn, order_id).await? else {
        return Ok(());
    };

    let mut released = 0;
    for line in &delivery_note.lines {
        let Some(source) = line.source_line_id.as_deref() else {
            continue;
        };
        if let Some(order_line) = order.line_mut(source) {
            order_line.delivered_quantity = (order_line.delivered_quantity - line.quantity).max(0);
            released += line.quantity;
        }
    }
    if released == 0 {
        return Ok(());
    }

    if TRACKED_ORDER_STATUSES.contains(&order.status) {
        order.status = order_delivery_status(order.status, &order.lines);
    }
    order.updated_at = now;
    DocumentRepository::update(conn, &order).await?;

    debug!(order = %order.id, delivery_note = %delivery_note.id, released, "Order quantities released");
    Ok(())
}
