//! # Stock Arithmetic
//!
//! Quantities and weighted-average unit cost (CUMP, *coût unitaire moyen
//! pondéré*) per (product, warehouse).
//!
//! ## Movement Effects
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  in / return      qty  = old qty + in qty                               │
//! │                   CUMP = round((old qty × old CUMP + in qty × cost)     │
//! │                                / new qty)                              │
//! │                                                                         │
//! │  out              qty  = old qty - out qty      (never below zero)      │
//! │                   CUMP unchanged                                        │
//! │                                                                         │
//! │  transfer         out at source, in at destination at the source CUMP   │
//! │                                                                         │
//! │  adjustment       destination = gain, source = loss, CUMP unchanged     │
//! │                                                                         │
//! │  always           stock value = qty × CUMP                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use chrono::Utc;
//! use teranga_core::money::Money;
//! use teranga_core::stock::StockRecord;
//!
//! let now = Utc::now();
//! let record = StockRecord::empty("P1", "W1", now)
//!     .receive(10, Money::from_minor(100), now).unwrap()
//!     .receive(10, Money::from_minor(200), now).unwrap();
//!
//! assert_eq!(record.quantity_on_hand, 20);
//! assert_eq!(record.weighted_average_cost.minor(), 150);
//! assert_eq!(record.stock_value.minor(), 3_000);
//! ```
//!
//! Everything here is pure. teranga-db loads the records, calls
//! [`plan_movement`] and writes the result inside one transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{round_div, Money};
use crate::types::MovementKind;
use crate::validation::validate_quantity;

// =============================================================================
// Stock Record
// =============================================================================

/// On-hand quantity and CUMP for one product in one warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockRecord {
    pub product_id: String,
    pub warehouse_id: String,
    pub quantity_on_hand: i64,
    pub weighted_average_cost: Money,
    /// Always `quantity_on_hand × weighted_average_cost`.
    pub stock_value: Money,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

fn value_of(quantity: i64, cost: Money) -> CoreResult<Money> {
    quantity
        .checked_mul(cost.minor())
        .map(Money::from_minor)
        .ok_or_else(|| {
            ValidationError::OutOfRange {
                field: "stock_value".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into()
        })
}

impl StockRecord {
    /// A record with nothing on hand. Records are created lazily on the first
    /// inbound movement.
    pub fn empty(product_id: &str, warehouse_id: &str, now: DateTime<Utc>) -> Self {
        StockRecord {
            product_id: product_id.to_string(),
            warehouse_id: warehouse_id.to_string(),
            quantity_on_hand: 0,
            weighted_average_cost: Money::zero(),
            stock_value: Money::zero(),
            updated_at: now,
        }
    }

    fn with(&self, quantity: i64, cost: Money, now: DateTime<Utc>) -> CoreResult<Self> {
        Ok(StockRecord {
            product_id: self.product_id.clone(),
            warehouse_id: self.warehouse_id.clone(),
            quantity_on_hand: quantity,
            weighted_average_cost: cost,
            stock_value: value_of(quantity, cost)?,
            updated_at: now,
        })
    }

    /// Receives `quantity` at `unit_cost` and re-averages the CUMP.
    pub fn receive(&self, quantity: i64, unit_cost: Money, now: DateTime<Utc>) -> CoreResult<Self> {
        validate_quantity(quantity)?;
        if unit_cost.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "unit_cost".to_string(),
            }
            .into());
        }

        let new_quantity = self
            .quantity_on_hand
            .checked_add(quantity)
            .ok_or_else(|| CoreError::from(ValidationError::OutOfRange {
                field: "quantity_on_hand".to_string(),
                min: 0,
                max: i64::MAX,
            }))?;
        let new_value = self.quantity_on_hand as i128 * self.weighted_average_cost.minor() as i128
            + quantity as i128 * unit_cost.minor() as i128;
        let new_cost = if new_quantity > 0 {
            round_div(new_value, new_quantity as i128)
        } else {
            0
        };

        self.with(new_quantity, Money::from_minor(new_cost as i64), now)
    }

    /// Removes `quantity` at the current CUMP.
    pub fn issue(&self, quantity: i64, now: DateTime<Utc>) -> CoreResult<Self> {
        validate_quantity(quantity)?;
        if quantity > self.quantity_on_hand {
            return Err(self.insufficient(quantity));
        }
        self.with(self.quantity_on_hand - quantity, self.weighted_average_cost, now)
    }

    /// Adds `quantity` without changing the CUMP (inventory gain).
    pub fn gain(&self, quantity: i64, now: DateTime<Utc>) -> CoreResult<Self> {
        validate_quantity(quantity)?;
        self.with(self.quantity_on_hand + quantity, self.weighted_average_cost, now)
    }

    /// Error describing a request for more than what is on hand.
    pub fn insufficient(&self, requested: i64) -> CoreError {
        CoreError::InsufficientStock {
            product_id: self.product_id.clone(),
            warehouse_id: self.warehouse_id.clone(),
            available: self.quantity_on_hand,
            requested,
        }
    }

    pub fn value_is_consistent(&self) -> bool {
        value_of(self.quantity_on_hand, self.weighted_average_cost)
            .map(|value| value == self.stock_value)
            .unwrap_or(false)
    }
}

// =============================================================================
// Movements
// =============================================================================

/// A request to move stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MovementRequest {
    pub kind: MovementKind,
    pub product_id: String,
    #[serde(default)]
    pub source_warehouse_id: Option<String>,
    #[serde(default)]
    pub destination_warehouse_id: Option<String>,
    pub quantity: i64,
    /// Required for `in`; optional for `return` (defaults to the current CUMP).
    #[serde(default)]
    pub unit_cost: Option<Money>,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub document_id: Option<String>,
}

impl MovementRequest {
    fn base(kind: MovementKind, product_id: &str, quantity: i64) -> Self {
        MovementRequest {
            kind,
            product_id: product_id.to_string(),
            source_warehouse_id: None,
            destination_warehouse_id: None,
            quantity,
            unit_cost: None,
            document_type: None,
            document_id: None,
        }
    }

    /// Goods received into `warehouse_id` at `unit_cost`.
    pub fn inbound(product_id: &str, warehouse_id: &str, quantity: i64, unit_cost: Money) -> Self {
        MovementRequest {
            destination_warehouse_id: Some(warehouse_id.to_string()),
            unit_cost: Some(unit_cost),
            ..Self::base(MovementKind::In, product_id, quantity)
        }
    }

    /// Goods leaving `warehouse_id`.
    pub fn outbound(product_id: &str, warehouse_id: &str, quantity: i64) -> Self {
        MovementRequest {
            source_warehouse_id: Some(warehouse_id.to_string()),
            ..Self::base(MovementKind::Out, product_id, quantity)
        }
    }

    pub fn transfer(product_id: &str, from: &str, to: &str, quantity: i64) -> Self {
        MovementRequest {
            source_warehouse_id: Some(from.to_string()),
            destination_warehouse_id: Some(to.to_string()),
            ..Self::base(MovementKind::Transfer, product_id, quantity)
        }
    }

    /// Links the movement to the document that caused it.
    pub fn for_document(mut self, document_type: &str, document_id: &str) -> Self {
        self.document_type = Some(document_type.to_string());
        self.document_id = Some(document_id.to_string());
        self
    }

    /// Checks the warehouse combination and amounts for the movement kind.
    ///
    /// ```text
    ///   kind        source   destination   unit_cost
    ///   in            -          ✔          required
    ///   return        -          ✔          optional
    ///   out           ✔          -             -
    ///   transfer      ✔          ✔ (≠)         -
    ///   adjustment    exactly one              -
    /// ```
    pub fn validate(&self) -> CoreResult<()> {
        validate_quantity(self.quantity)?;
        if self.product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "product_id".to_string(),
            }
            .into());
        }
        if let Some(cost) = self.unit_cost {
            if cost.is_negative() {
                return Err(ValidationError::MustNotBeNegative {
                    field: "unit_cost".to_string(),
                }
                .into());
            }
        }

        let source = self.source_warehouse_id.as_deref().filter(|w| !w.is_empty());
        let destination = self.destination_warehouse_id.as_deref().filter(|w| !w.is_empty());
        let invalid = |reason: &str| -> CoreResult<()> {
            Err(ValidationError::InvalidFormat {
                field: "warehouse".to_string(),
                reason: reason.to_string(),
            }
            .into())
        };

        match (self.kind, source, destination) {
            (MovementKind::In, None, Some(_)) => {
                if self.unit_cost.is_none() {
                    return Err(ValidationError::Required {
                        field: "unit_cost".to_string(),
                    }
                    .into());
                }
                Ok(())
            }
            (MovementKind::Return, None, Some(_)) => Ok(()),
            (MovementKind::Out, Some(_), None) => Ok(()),
            (MovementKind::Transfer, Some(from), Some(to)) => {
                if from == to {
                    invalid("transfer source and destination must differ")
                } else {
                    Ok(())
                }
            }
            (MovementKind::Adjustment, Some(_), None) | (MovementKind::Adjustment, None, Some(_)) => Ok(()),
            (MovementKind::In | MovementKind::Return, _, _) => invalid("requires only a destination warehouse"),
            (MovementKind::Out, _, _) => invalid("requires only a source warehouse"),
            (MovementKind::Transfer, _, _) => invalid("requires a source and a destination warehouse"),
            (MovementKind::Adjustment, _, _) => invalid("requires exactly one warehouse"),
        }
    }
}

/// One immutable row of the movement log, for one warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub kind: MovementKind,
    pub product_id: String,
    /// Warehouse whose quantity this row describes.
    pub warehouse_id: String,
    pub source_warehouse_id: Option<String>,
    pub destination_warehouse_id: Option<String>,
    pub quantity: i64,
    pub unit_cost: Money,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub document_type: Option<String>,
    pub document_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    fn record(request: &MovementRequest, before: &StockRecord, after: &StockRecord, unit_cost: Money) -> Self {
        StockMovement {
            id: Uuid::new_v4().to_string(),
            kind: request.kind,
            product_id: request.product_id.clone(),
            warehouse_id: after.warehouse_id.clone(),
            source_warehouse_id: request.source_warehouse_id.clone(),
            destination_warehouse_id: request.destination_warehouse_id.clone(),
            quantity: request.quantity,
            unit_cost,
            quantity_before: before.quantity_on_hand,
            quantity_after: after.quantity_on_hand,
            document_type: request.document_type.clone(),
            document_id: request.document_id.clone(),
            created_at: after.updated_at,
        }
    }
}

/// Result of planning a movement: the records to write and the log rows to
/// append, one per warehouse touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementPlan {
    pub records: Vec<StockRecord>,
    pub movements: Vec<StockMovement>,
}

/// Computes the effect of `request` on the current records.
///
/// `source` and `destination` are the stored records for the request's
/// warehouses, `None` when no record exists yet.
pub fn plan_movement(
    request: &MovementRequest,
    source: Option<&StockRecord>,
    destination: Option<&StockRecord>,
    now: DateTime<Utc>,
) -> CoreResult<MovementPlan> {
    request.validate()?;

    let product = request.product_id.as_str();
    let source_record = |warehouse: &str| -> CoreResult<StockRecord> {
        match source {
            Some(record) => Ok(record.clone()),
            None => Err(CoreError::InsufficientStock {
                product_id: product.to_string(),
                warehouse_id: warehouse.to_string(),
                available: 0,
                requested: request.quantity,
            }),
        }
    };
    let destination_record = |warehouse: &str| -> StockRecord {
        destination
            .cloned()
            .unwrap_or_else(|| StockRecord::empty(product, warehouse, now))
    };

    let source_id = request.source_warehouse_id.as_deref().unwrap_or_default();
    let destination_id = request.destination_warehouse_id.as_deref().unwrap_or_default();
    let qty = request.quantity;

    let mut plan = MovementPlan {
        records: Vec::with_capacity(2),
        movements: Vec::with_capacity(2),
    };

    match request.kind {
        MovementKind::In | MovementKind::Return => {
            let before = destination_record(destination_id);
            let cost = request.unit_cost.unwrap_or(before.weighted_average_cost);
            let after = before.receive(qty, cost, now)?;
            plan.movements.push(StockMovement::record(request, &before, &after, cost));
            plan.records.push(after);
        }
        MovementKind::Out => {
            let before = source_record(source_id)?;
            let after = before.issue(qty, now)?;
            plan.movements
                .push(StockMovement::record(request, &before, &after, before.weighted_average_cost));
            plan.records.push(after);
        }
        MovementKind::Transfer => {
            let from_before = source_record(source_id)?;
            let from_after = from_before.issue(qty, now)?;
            let cost = from_before.weighted_average_cost;

            let to_before = destination_record(destination_id);
            let to_after = to_before.receive(qty, cost, now)?;

            plan.movements.push(StockMovement::record(request, &from_before, &from_after, cost));
            plan.movements.push(StockMovement::record(request, &to_before, &to_after, cost));
            plan.records.push(from_after);
            plan.records.push(to_after);
        }
        MovementKind::Adjustment => {
            let (before, after) = if request.destination_warehouse_id.is_some() {
                let before = destination_record(destination_id);
                let after = before.gain(qty, now)?;
                (before, after)
            } else {
                let before = source_record(source_id)?;
                let after = before.issue(qty, now)?;
                (before, after)
            };
            plan.movements
                .push(StockMovement::record(request, &before, &after, before.weighted_average_cost));
            plan.records.push(after);
        }
    }

    Ok(plan)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn stocked(quantity: i64, cost: i64) -> StockRecord {
        let now = Utc::now();
        StockRecord::empty("P1", "W1", now)
            .receive(quantity, Money::from_minor(cost), now)
            .unwrap()
    }

    #[test]
    fn test_cump_reaverages_on_receipt() {
        let record = stocked(10, 100).receive(10, Money::from_minor(200), Utc::now()).unwrap();
        assert_eq!(record.quantity_on_hand, 20);
        assert_eq!(record.weighted_average_cost.minor(), 150);
        assert_eq!(record.stock_value.minor(), 3_000);
    }

    #[test]
    fn test_cump_rounds_half_up() {
        // (3 × 100 + 1 × 101) / 4 = 100.25 → 100 ; (1 × 100 + 1 × 101) / 2 = 100.5 → 101
        let a = stocked(3, 100).receive(1, Money::from_minor(101), Utc::now()).unwrap();
        assert_eq!(a.weighted_average_cost.minor(), 100);
        let b = stocked(1, 100).receive(1, Money::from_minor(101), Utc::now()).unwrap();
        assert_eq!(b.weighted_average_cost.minor(), 101);
        assert!(b.value_is_consistent());
    }

    #[test]
    fn test_issue_keeps_cost_and_refuses_overdraw() {
        let record = stocked(5, 300);
        let after = record.issue(2, Utc::now()).unwrap();
        assert_eq!(after.quantity_on_hand, 3);
        assert_eq!(after.weighted_average_cost.minor(), 300);

        let result = record.issue(7, Utc::now());
        assert!(matches!(
            result,
            Err(CoreError::InsufficientStock { available: 5, requested: 7, .. })
        ));
    }

    #[test]
    fn test_out_without_record_is_insufficient() {
        let request = MovementRequest::outbound("P1", "W1", 1);
        let result = plan_movement(&request, None, None, Utc::now());
        assert!(matches!(result, Err(CoreError::InsufficientStock { available: 0, .. })));
    }

    #[test]
    fn test_transfer_carries_source_cost() {
        let now = Utc::now();
        let source = stocked(10, 250);
        let destination = StockRecord::empty("P1", "W2", now)
            .receive(10, Money::from_minor(150), now)
            .unwrap();

        let request = MovementRequest::transfer("P1", "W1", "W2", 4);
        let plan = plan_movement(&request, Some(&source), Some(&destination), now).unwrap();

        assert_eq!(plan.records.len(), 2);
        assert_eq!(plan.movements.len(), 2);
        assert_eq!(plan.records[0].quantity_on_hand, 6);
        assert_eq!(plan.records[1].quantity_on_hand, 14);
        // (10 × 150 + 4 × 250) / 14 = 178.57 → 179
        assert_eq!(plan.records[1].weighted_average_cost.minor(), 179);
        assert!(plan.movements.iter().all(|m| m.kind == MovementKind::Transfer));
        assert_eq!(plan.movements[0].warehouse_id, "W1");
        assert_eq!(plan.movements[1].quantity_before, 10);
        assert_eq!(plan.movements[1].quantity_after, 14);
    }

    #[test]
    fn test_adjustments() {
        let now = Utc::now();
        let record = stocked(10, 100);

        let mut gain = MovementRequest::base(MovementKind::Adjustment, "P1", 3);
        gain.destination_warehouse_id = Some("W1".to_string());
        let plan = plan_movement(&gain, None, Some(&record), now).unwrap();
        assert_eq!(plan.records[0].quantity_on_hand, 13);
        assert_eq!(plan.records[0].weighted_average_cost.minor(), 100);

        let mut loss = MovementRequest::base(MovementKind::Adjustment, "P1", 11);
        loss.source_warehouse_id = Some("W1".to_string());
        assert!(plan_movement(&loss, Some(&record), None, now).is_err());
    }

    #[test]
    fn test_return_defaults_to_current_cost() {
        let now = Utc::now();
        let record = stocked(4, 500);
        let mut request = MovementRequest::base(MovementKind::Return, "P1", 1);
        request.destination_warehouse_id = Some("W1".to_string());

        let plan = plan_movement(&request, None, Some(&record), now).unwrap();
        assert_eq!(plan.records[0].quantity_on_hand, 5);
        assert_eq!(plan.records[0].weighted_average_cost.minor(), 500);
        assert_eq!(plan.movements[0].unit_cost.minor(), 500);
    }

    #[test]
    fn test_request_validation() {
        let mut no_cost = MovementRequest::inbound("P1", "W1", 1, Money::zero());
        no_cost.unit_cost = None;
        assert!(no_cost.validate().is_err());

        assert!(MovementRequest::transfer("P1", "W1", "W1", 1).validate().is_err());
        assert!(MovementRequest::outbound("P1", "W1", 0).validate().is_err());

        let mut both = MovementRequest::base(MovementKind::Adjustment, "P1", 1);
        both.source_warehouse_id = Some("W1".to_string());
        both.destination_warehouse_id = Some("W2".to_string());
        assert!(both.validate().is_err());
    }

    proptest! {
        #[test]
        fn prop_value_matches_quantity_times_cost(
            receipts in prop::collection::vec((1i64..1_000, 0i64..100_000), 1..10),
            issues in prop::collection::vec(1i64..500, 0..10),
        ) {
            let now = Utc::now();
            let mut record = StockRecord::empty("P", "W", now);
            let min_cost = receipts.iter().map(|(_, c)| *c).min().unwrap_or(0);
            let max_cost = receipts.iter().map(|(_, c)| *c).max().unwrap_or(0);

            for (qty, cost) in &receipts {
                record = record.receive(*qty, Money::from_minor(*cost), now).unwrap();
                prop_assert!(record.value_is_consistent());
            }
            prop_assert!(record.weighted_average_cost.minor() >= min_cost);
            prop_assert!(record.weighted_average_cost.minor() <= max_cost);

            for qty in issues {
                match record.issue(qty, now) {
                    Ok(next) => record = next,
                    Err(_) => prop_assert!(qty > record.quantity_on_hand),
                }
                prop_assert!(record.quantity_on_hand >= 0);
                prop_assert!(record.value_is_consistent());
            }
        }
    }
}
