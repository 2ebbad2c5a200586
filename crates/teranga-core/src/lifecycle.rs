//! # Document Lifecycles
//!
//! Legal status transitions for each document kind.
//!
//! ## State Machines
//! ```text
//! QUOTE           draft ──► sent ──┬──► accepted ══► converted
//!                                  ├──► refused
//!                                  └──► expired
//!
//! ORDER           draft ──► confirmed ──► in_progress
//!                   │           │             │
//!                   │           ╞═════════════╪══► partially_delivered ══► delivered
//!                   └───────────┴─────────────┴──► cancelled
//!
//! DELIVERY NOTE   draft ══► validated
//!                   └─────► cancelled
//!
//! INVOICE /       draft ══► validated ──► sent
//! CREDIT NOTE       │           │          │
//!                   │           ╞══════════╪══► partially_paid ══► paid
//!                   └───────────┴──────────┴──► cancelled   (nothing paid)
//!
//!   ──►  requestable through change_status
//!   ══►  reached only through a dedicated operation
//! ```
//!
//! Storage uses the same tables: a transition claims the document with
//! `UPDATE … WHERE status IN (predecessors)`, so a concurrent change makes the
//! claim fail instead of overwriting.

use crate::document::{DocumentLine, SalesDocument};
use crate::error::{CoreError, CoreResult};
use crate::types::{DocumentKind, DocumentStatus};

use DocumentStatus::*;

/// Order statuses from which a delivery note may be generated.
pub const DELIVERABLE_ORDER_STATUSES: &[DocumentStatus] = &[Confirmed, InProgress, PartiallyDelivered];

/// Invoice statuses from which a credit note may be created.
pub const CREDITABLE_INVOICE_STATUSES: &[DocumentStatus] = &[Validated, Sent, PartiallyPaid, Paid];

/// Statuses that accept a payment.
pub const PAYABLE_STATUSES: &[DocumentStatus] = &[Validated, Sent, PartiallyPaid];

/// Quote statuses from which conversion to an order is allowed.
pub const CONVERTIBLE_QUOTE_STATUSES: &[DocumentStatus] = &[Accepted];

/// The only status in which a document can be edited, deleted or validated.
pub const EDITABLE_STATUSES: &[DocumentStatus] = &[Draft];

/// Statuses a caller may request through `change_status` from `from`.
pub fn requestable_targets(kind: DocumentKind, from: DocumentStatus) -> &'static [DocumentStatus] {
    match (kind, from) {
        (DocumentKind::Quote, Draft) => &[Sent],
        (DocumentKind::Quote, Sent) => &[Accepted, Refused, Expired],

        (DocumentKind::Order, Draft) => &[Confirmed, Cancelled],
        (DocumentKind::Order, Confirmed) => &[InProgress, Cancelled],
        (DocumentKind::Order, InProgress) => &[Cancelled],

        (DocumentKind::DeliveryNote, Draft) => &[Cancelled],

        (DocumentKind::Invoice | DocumentKind::CreditNote, Draft) => &[Cancelled],
        (DocumentKind::Invoice | DocumentKind::CreditNote, Validated) => &[Sent, Cancelled],
        (DocumentKind::Invoice | DocumentKind::CreditNote, Sent) => &[Cancelled],

        _ => &[],
    }
}

/// Statuses from which `to` can be requested through `change_status`.
pub fn requestable_sources(kind: DocumentKind, to: DocumentStatus) -> Vec<DocumentStatus> {
    DocumentStatus::ALL
        .iter()
        .copied()
        .filter(|from| requestable_targets(kind, *from).contains(&to))
        .collect()
}

/// Statuses a kind reaches only through a dedicated operation.
pub fn is_system_managed(kind: DocumentKind, status: DocumentStatus) -> bool {
    match kind {
        DocumentKind::Quote => status == Converted,
        DocumentKind::Order => matches!(status, PartiallyDelivered | Delivered),
        DocumentKind::DeliveryNote => status == Validated,
        DocumentKind::Invoice | DocumentKind::CreditNote => {
            matches!(status, Validated | PartiallyPaid | Paid)
        }
    }
}

/// The status at which a kind receives its document number.
pub const fn numbering_status(kind: DocumentKind) -> DocumentStatus {
    match kind {
        DocumentKind::Quote => Sent,
        DocumentKind::Order => Confirmed,
        DocumentKind::DeliveryNote | DocumentKind::Invoice | DocumentKind::CreditNote => Validated,
    }
}

/// Checks a `change_status` request against the current document.
///
/// ## Checks
/// 1. `to` must not be system-managed for the kind
/// 2. `to` must be a legal successor of the current status
/// 3. invoices and credit notes cannot be cancelled once something is paid
pub fn check_transition(doc: &SalesDocument, to: DocumentStatus) -> CoreResult<()> {
    let illegal = || CoreError::InvalidTransition {
        kind: doc.kind,
        from: doc.status,
        to,
    };

    if is_system_managed(doc.kind, to) {
        return Err(illegal());
    }

    if !requestable_targets(doc.kind, doc.status).contains(&to) {
        return Err(illegal());
    }

    if doc.kind.is_financial() && to == Cancelled && !doc.amount_paid.is_zero() {
        return Err(CoreError::invalid_state(
            &doc.id,
            doc.status,
            "payments have been recorded; issue a credit note instead",
        ));
    }

    Ok(())
}

/// Fails unless the document is still a draft.
pub fn ensure_mutable(doc: &SalesDocument) -> CoreResult<()> {
    if doc.status == Draft {
        Ok(())
    } else {
        Err(CoreError::invalid_state(
            &doc.id,
            doc.status,
            "only draft documents can be modified",
        ))
    }
}

/// Order status implied by its lines' delivery progress.
///
/// ```text
///   every line delivered ≥ ordered   → delivered
///   something delivered              → partially_delivered
///   nothing delivered, was partial   → in_progress   (quantities released)
///   otherwise                        → unchanged
/// ```
pub fn order_delivery_status(current: DocumentStatus, lines: &[DocumentLine]) -> DocumentStatus {
    let any_delivered = lines.iter().any(|l| l.delivered_quantity > 0);
    let all_delivered = !lines.is_empty() && lines.iter().all(DocumentLine::is_fully_delivered);

    if all_delivered {
        Delivered
    } else if any_delivered {
        PartiallyDelivered
    } else if matches!(current, PartiallyDelivered | Delivered) {
        InProgress
    } else {
        current
    }
}

/// Status of an invoice or credit note after `amount_paid` changed.
pub fn status_after_payment(doc: &SalesDocument) -> DocumentStatus {
    if doc.amount_paid >= doc.totals.total_ttc {
        Paid
    } else if doc.amount_paid.is_positive() {
        PartiallyPaid
    } else {
        doc.status
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{CounterpartySnapshot, LineInput, NewDocument};
    use crate::money::Money;
    use crate::types::{Percentage, TaxRate};
    use chrono::{NaiveDate, Utc};

    fn doc(kind: DocumentKind, status: DocumentStatus) -> SalesDocument {
        let mut new = NewDocument::new(
            kind,
            CounterpartySnapshot::named("Client"),
            NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            vec![LineInput {
                product_id: "P".to_string(),
                designation: "Produit".to_string(),
                quantity: 10,
                unit_price: Money::from_minor(1_000),
                discount: Percentage::zero(),
                tax_rate: TaxRate::STANDARD,
                source_line_id: None,
            }],
        );
        new.warehouse_id = Some("W".to_string());
        let mut doc = SalesDocument::draft(new, Utc::now()).unwrap();
        doc.status = status;
        doc
    }

    #[test]
    fn test_quote_transitions() {
        assert!(check_transition(&doc(DocumentKind::Quote, Draft), Sent).is_ok());
        assert!(check_transition(&doc(DocumentKind::Quote, Sent), Accepted).is_ok());
        assert!(check_transition(&doc(DocumentKind::Quote, Sent), Expired).is_ok());

        let skipped = check_transition(&doc(DocumentKind::Quote, Draft), Accepted);
        assert!(matches!(skipped, Err(CoreError::InvalidTransition { .. })));

        // converted only through convert_to_order
        let converted = check_transition(&doc(DocumentKind::Quote, Accepted), Converted);
        assert!(matches!(converted, Err(CoreError::InvalidTransition { .. })));
    }

    #[test]
    fn test_order_transitions() {
        assert!(check_transition(&doc(DocumentKind::Order, Draft), Confirmed).is_ok());
        assert!(check_transition(&doc(DocumentKind::Order, InProgress), Cancelled).is_ok());
        assert!(check_transition(&doc(DocumentKind::Order, Confirmed), Delivered).is_err());
        assert!(check_transition(&doc(DocumentKind::Order, PartiallyDelivered), Cancelled).is_err());
    }

    #[test]
    fn test_validated_is_never_requestable() {
        assert!(check_transition(&doc(DocumentKind::DeliveryNote, Draft), Validated).is_err());
        assert!(check_transition(&doc(DocumentKind::Invoice, Draft), Validated).is_err());
        assert!(check_transition(&doc(DocumentKind::Invoice, Sent), Paid).is_err());
    }

    #[test]
    fn test_paid_invoice_cannot_be_cancelled() {
        let unpaid = doc(DocumentKind::Invoice, Validated);
        assert!(check_transition(&unpaid, Cancelled).is_ok());

        let mut paid = doc(DocumentKind::Invoice, Sent);
        paid.amount_paid = Money::from_minor(100);
        let result = check_transition(&paid, Cancelled);
        assert!(matches!(result, Err(CoreError::InvalidState { .. })));
    }

    #[test]
    fn test_ensure_mutable() {
        assert!(ensure_mutable(&doc(DocumentKind::Order, Draft)).is_ok());
        assert!(matches!(
            ensure_mutable(&doc(DocumentKind::Order, Confirmed)),
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_numbering_status() {
        assert_eq!(numbering_status(DocumentKind::Quote), Sent);
        assert_eq!(numbering_status(DocumentKind::Order), Confirmed);
        assert_eq!(numbering_status(DocumentKind::CreditNote), Validated);
    }

    #[test]
    fn test_requestable_sources() {
        let sources = requestable_sources(DocumentKind::Order, Cancelled);
        assert!(sources.contains(&Draft));
        assert!(sources.contains(&Confirmed));
        assert!(sources.contains(&InProgress));
        assert_eq!(sources.len(), 3);
    }

    #[test]
    fn test_order_delivery_status() {
        let mut order = doc(DocumentKind::Order, Confirmed);
        assert_eq!(order_delivery_status(order.status, &order.lines), Confirmed);

        order.lines[0].delivered_quantity = 6;
        assert_eq!(order_delivery_status(order.status, &order.lines), PartiallyDelivered);

        order.lines[0].delivered_quantity = 10;
        assert_eq!(order_delivery_status(order.status, &order.lines), Delivered);

        order.lines[0].delivered_quantity = 0;
        assert_eq!(order_delivery_status(PartiallyDelivered, &order.lines), InProgress);
    }

    #[test]
    fn test_status_after_payment() {
        let mut invoice = doc(DocumentKind::Invoice, Validated);
        invoice.amount_paid = Money::from_minor(5_000);
        assert_eq!(status_after_payment(&invoice), PartiallyPaid);

        invoice.amount_paid = invoice.totals.total_ttc;
        assert_eq!(status_after_payment(&invoice), Paid);
    }
}
