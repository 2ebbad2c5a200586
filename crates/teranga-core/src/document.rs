//! # Sales Documents
//!
//! The shared shape of quotes, orders, delivery notes, invoices and credit
//! notes.
//!
//! ## Anatomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SalesDocument                                                          │
//! │  ─────────────                                                          │
//! │  id (UUID)              internal_reference  FA-BR-1A2B3C4D  (draft)     │
//! │  kind, status           document_number     FA2026-00001    (numbered)  │
//! │  counterparty ────────► CounterpartySnapshot (copied, never live)      │
//! │  lines[1..] ──────────► DocumentLine { qty, price, discount, rate,     │
//! │                                        amounts{ht,tax,ttc},           │
//! │                                        delivered_quantity,            │
//! │                                        source_line_id }               │
//! │  totals ──────────────► DocumentTotals (recomputed, never hand-set)    │
//! │  links ───────────────► quote_id / order_id / delivery_note_id /       │
//! │                         invoice_id + successors                        │
//! │  version               bumped by every claimed transition              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Building a document never touches storage: [`SalesDocument::draft`]
//! validates the input, computes every amount and returns the value the
//! repository persists.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::calculator::{compute_document_totals, compute_line};
use crate::error::{CoreError, CoreResult};
use crate::lifecycle::ensure_mutable;
use crate::money::Money;
use crate::types::{DocumentKind, DocumentStatus, Percentage, TaxRate};
use crate::validation::{validate_counterparty, validate_line_input, validate_lines_present};

// =============================================================================
// Counterparty Snapshot
// =============================================================================

/// Client data frozen into the document at creation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CounterpartySnapshot {
    pub counterparty_id: Option<String>,
    pub display_name: String,
    pub address: Option<String>,
    /// NINEA.
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl CounterpartySnapshot {
    /// A snapshot carrying only a display name.
    pub fn named(display_name: impl Into<String>) -> Self {
        CounterpartySnapshot {
            display_name: display_name.into(),
            ..Default::default()
        }
    }
}

// =============================================================================
// Lines
// =============================================================================

/// Derived amounts of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineAmounts {
    pub ht: Money,
    pub tax: Money,
    pub ttc: Money,
}

/// What a caller provides for a line. Amounts are always derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineInput {
    pub product_id: String,
    pub designation: String,
    pub quantity: i64,
    pub unit_price: Money,
    #[serde(default)]
    pub discount: Percentage,
    #[serde(default)]
    pub tax_rate: TaxRate,
    #[serde(default)]
    pub source_line_id: Option<String>,
}

/// A line of any sales document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentLine {
    pub id: String,
    pub product_id: String,
    pub designation: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount: Percentage,
    pub tax_rate: TaxRate,
    pub amounts: LineAmounts,
    /// Only meaningful on order lines.
    #[serde(default)]
    pub delivered_quantity: i64,
    /// Delivery line → order line, credit-note line → invoice line.
    #[serde(default)]
    pub source_line_id: Option<String>,
}

impl DocumentLine {
    /// Validates the input and computes the line amounts.
    pub fn from_input(input: LineInput) -> CoreResult<Self> {
        validate_line_input(&input)?;
        let amounts = compute_line(input.quantity, input.unit_price, input.discount, input.tax_rate)?;

        Ok(DocumentLine {
            id: Uuid::new_v4().to_string(),
            product_id: input.product_id.trim().to_string(),
            designation: input.designation.trim().to_string(),
            quantity: input.quantity,
            unit_price: input.unit_price,
            discount: input.discount,
            tax_rate: input.tax_rate,
            amounts,
            delivered_quantity: 0,
            source_line_id: input.source_line_id,
        })
    }

    /// Copies the commercial terms of this line, optionally with another quantity.
    ///
    /// Used when a document is derived from another (quote → order,
    /// order → delivery note, invoice → credit note).
    pub fn derive_input(&self, quantity: i64, link_source: bool) -> LineInput {
        LineInput {
            product_id: self.product_id.clone(),
            designation: self.designation.clone(),
            quantity,
            unit_price: self.unit_price,
            discount: self.discount,
            tax_rate: self.tax_rate,
            source_line_id: if link_source { Some(self.id.clone()) } else { None },
        }
    }

    /// Quantity still to deliver on an order line.
    #[inline]
    pub fn remaining_to_deliver(&self) -> i64 {
        (self.quantity - self.delivered_quantity).max(0)
    }

    #[inline]
    pub fn is_fully_delivered(&self) -> bool {
        self.delivered_quantity >= self.quantity
    }
}

// =============================================================================
// Totals & Links
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentTotals {
    pub total_ht: Money,
    pub total_tax: Money,
    pub total_ttc: Money,
    pub global_discount_amount: Money,
}

/// A pointer to another sales document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentRef {
    pub kind: DocumentKind,
    pub id: String,
}

/// Cross-document links. Predecessors are plain ids; `successors` lists the
/// documents spawned from this one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentLinks {
    pub quote_id: Option<String>,
    pub order_id: Option<String>,
    pub delivery_note_id: Option<String>,
    pub invoice_id: Option<String>,
    #[serde(default)]
    pub successors: Vec<DocumentRef>,
}

// =============================================================================
// Inputs
// =============================================================================

/// Everything needed to create a draft.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewDocument {
    pub kind: DocumentKind,
    pub counterparty: CounterpartySnapshot,
    #[ts(as = "String")]
    pub issue_date: NaiveDate,
    /// Due date for invoices, validity date for quotes, delivery date for orders.
    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub lines: Vec<LineInput>,
    #[serde(default)]
    pub global_discount: Percentage,
    #[serde(default)]
    pub terms: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Required on delivery notes.
    #[serde(default)]
    pub warehouse_id: Option<String>,
    #[serde(default)]
    pub links: DocumentLinks,
}

impl NewDocument {
    /// A minimal draft request; callers fill in the optional fields.
    pub fn new(
        kind: DocumentKind,
        counterparty: CounterpartySnapshot,
        issue_date: NaiveDate,
        lines: Vec<LineInput>,
    ) -> Self {
        NewDocument {
            kind,
            counterparty,
            issue_date,
            due_date: None,
            lines,
            global_discount: Percentage::zero(),
            terms: None,
            notes: None,
            warehouse_id: None,
            links: DocumentLinks::default(),
        }
    }
}

/// A partial update of a draft. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentPatch {
    pub counterparty: Option<CounterpartySnapshot>,
    #[ts(as = "Option<String>")]
    pub issue_date: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    pub lines: Option<Vec<LineInput>>,
    pub global_discount: Option<Percentage>,
    pub terms: Option<String>,
    pub notes: Option<String>,
    pub warehouse_id: Option<String>,
}

// =============================================================================
// Sales Document
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesDocument {
    pub id: String,
    pub kind: DocumentKind,
    pub document_number: Option<String>,
    pub fiscal_year: Option<i32>,
    pub sequence: Option<i64>,
    pub internal_reference: String,
    pub counterparty: CounterpartySnapshot,
    #[ts(as = "String")]
    pub issue_date: NaiveDate,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    pub status: DocumentStatus,
    pub lines: Vec<DocumentLine>,
    pub global_discount: Percentage,
    pub totals: DocumentTotals,
    pub links: DocumentLinks,
    pub terms: Option<String>,
    pub notes: Option<String>,
    pub warehouse_id: Option<String>,
    pub amount_paid: Money,
    pub journal_entry_id: Option<String>,
    pub version: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub validated_at: Option<DateTime<Utc>>,
}

/// `{code}-BR-{8 hex}`, e.g. `FA-BR-1A2B3C4D`.
pub fn internal_reference(kind: DocumentKind) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}-BR-{}", kind.code(), hex[..8].to_uppercase())
}

fn build_lines(inputs: Vec<LineInput>) -> CoreResult<Vec<DocumentLine>> {
    validate_lines_present(&inputs)?;
    inputs.into_iter().map(DocumentLine::from_input).collect()
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl SalesDocument {
    /// Builds a new draft from caller input.
    ///
    /// ## Flow
    /// ```text
    /// NewDocument
    ///   │ validate counterparty, ≥ 1 line, every line
    ///   │ compute line amounts, then totals
    ///   │ assign id + internal reference
    ///   ▼
    /// SalesDocument { status: draft, document_number: None, version: 1 }
    /// ```
    pub fn draft(new: NewDocument, now: DateTime<Utc>) -> CoreResult<Self> {
        validate_counterparty(&new.counterparty)?;

        let warehouse_id = trimmed(new.warehouse_id);
        if new.kind == DocumentKind::DeliveryNote && warehouse_id.is_none() {
            return Err(crate::error::ValidationError::Required {
                field: "warehouse_id".to_string(),
            }
            .into());
        }

        let lines = build_lines(new.lines)?;
        let totals = compute_document_totals(&lines, new.global_discount)?;

        Ok(SalesDocument {
            id: Uuid::new_v4().to_string(),
            kind: new.kind,
            document_number: None,
            fiscal_year: None,
            sequence: None,
            internal_reference: internal_reference(new.kind),
            counterparty: new.counterparty,
            issue_date: new.issue_date,
            due_date: new.due_date,
            status: DocumentStatus::Draft,
            lines,
            global_discount: new.global_discount,
            totals,
            links: new.links,
            terms: trimmed(new.terms),
            notes: trimmed(new.notes),
            warehouse_id,
            amount_paid: Money::zero(),
            journal_entry_id: None,
            version: 1,
            created_at: now,
            updated_at: now,
            validated_at: None,
        })
    }

    /// Applies a patch to a draft and recomputes totals.
    ///
    /// Replacing the lines of an order discards delivery progress, which a
    /// draft order never has.
    pub fn apply_patch(&mut self, patch: DocumentPatch, now: DateTime<Utc>) -> CoreResult<()> {
        ensure_mutable(self)?;
        if self.has_fixed_lines() && (patch.lines.is_some() || patch.global_discount.is_some()) {
            return Err(CoreError::invalid_state(
                &self.id,
                self.status,
                "lines are fixed by the source document",
            ));
        }

        if let Some(counterparty) = patch.counterparty {
            validate_counterparty(&counterparty)?;
            self.counterparty = counterparty;
        }
        if let Some(issue_date) = patch.issue_date {
            self.issue_date = issue_date;
        }
        if patch.due_date.is_some() {
            self.due_date = patch.due_date;
        }
        if let Some(lines) = patch.lines {
            self.lines = build_lines(lines)?;
        }
        if let Some(discount) = patch.global_discount {
            self.global_discount = discount;
        }
        if patch.terms.is_some() {
            self.terms = trimmed(patch.terms);
        }
        if patch.notes.is_some() {
            self.notes = trimmed(patch.notes);
        }
        if patch.warehouse_id.is_some() {
            let warehouse_id = trimmed(patch.warehouse_id);
            if self.kind == DocumentKind::DeliveryNote && warehouse_id.is_none() {
                return Err(crate::error::ValidationError::Required {
                    field: "warehouse_id".to_string(),
                }
                .into());
            }
            self.warehouse_id = warehouse_id;
        }

        self.recompute_totals()?;
        self.updated_at = now;
        Ok(())
    }

    /// Whether the quantities were checked against another document when
    /// this one was generated: every credit note, and a delivery note
    /// generated from an order.
    pub fn has_fixed_lines(&self) -> bool {
        match self.kind {
            DocumentKind::CreditNote => true,
            DocumentKind::DeliveryNote => self.links.order_id.is_some(),
            _ => false,
        }
    }

    /// The number once assigned, the internal reference before.
    pub fn reference(&self) -> &str {
        self.document_number
            .as_deref()
            .unwrap_or(&self.internal_reference)
    }

    /// Totals recomputed from the current lines.
    pub fn computed_totals(&self) -> CoreResult<DocumentTotals> {
        compute_document_totals(&self.lines, self.global_discount)
    }

    pub fn recompute_totals(&mut self) -> CoreResult<()> {
        self.totals = self.computed_totals()?;
        Ok(())
    }

    /// Whether the stored totals match a fresh computation from the lines.
    pub fn totals_are_consistent(&self) -> bool {
        let lines_ok = self.lines.iter().all(|line| {
            compute_line(line.quantity, line.unit_price, line.discount, line.tax_rate)
                .map(|amounts| amounts == line.amounts)
                .unwrap_or(false)
        });
        lines_ok && self.computed_totals().map(|t| t == self.totals).unwrap_or(false)
    }

    /// TTC still to be paid (or refunded, for a credit note).
    pub fn remaining_due(&self) -> Money {
        self.totals.total_ttc - self.amount_paid
    }

    pub fn line(&self, line_id: &str) -> Option<&DocumentLine> {
        self.lines.iter().find(|l| l.id == line_id)
    }

    pub fn line_mut(&mut self, line_id: &str) -> Option<&mut DocumentLine> {
        self.lines.iter_mut().find(|l| l.id == line_id)
    }

    /// Fails with [`CoreError::InvalidState`] unless the status is one of `allowed`.
    pub fn ensure_status(&self, allowed: &[DocumentStatus], operation: &str) -> CoreResult<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(CoreError::invalid_state(
                &self.id,
                self.status,
                format!("cannot {}", operation),
            ))
        }
    }

    /// Records a spawned document in the back-links.
    pub fn add_successor(&mut self, kind: DocumentKind, id: impl Into<String>) {
        self.links.successors.push(DocumentRef { kind, id: id.into() });
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
