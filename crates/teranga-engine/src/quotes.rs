//! # Quote Service
//!
//! ```text
//!   draft ──► sent ──► accepted ──► converted   (spawns a draft order)
//!               │
//!               ├────► refused
//!               └────► expired   (by hand, or expire_overdue)
//! ```

use std::ops::Deref;

use chrono::{NaiveDate, Utc};
use tracing::info;

use teranga_core::lifecycle::CONVERTIBLE_QUOTE_STATUSES;
use teranga_core::{DocumentKind, DocumentStatus, NewDocument, SalesDocument};
use teranga_db::{Database, DocumentRepository};

use crate::documents::{insert_successor, refuse, DocumentService};
use crate::error::EngineResult;

#[derive(Debug, Clone)]
pub struct QuoteService {
    documents: DocumentService,
}

impl Deref for QuoteService {
    type Target = DocumentService;

    fn deref(&self) -> &DocumentService {
        &self.documents
    }
}

impl QuoteService {
    pub fn new(db: Database) -> Self {
        QuoteService {
            documents: DocumentService::new(db, DocumentKind::Quote),
        }
    }

    /// Turns an accepted quote into a draft order.
    ///
    /// Lines, global discount, terms and notes are copied verbatim; both
    /// documents link to each other and the quote becomes `converted`.
    pub async fn convert_to_order(&self, quote_id: &str) -> EngineResult<SalesDocument> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        if !DocumentRepository::claim(&mut tx, quote_id, DocumentKind::Quote, CONVERTIBLE_QUOTE_STATUSES, now).await? {
            return Err(refuse(&mut tx, quote_id, DocumentKind::Quote, CONVERTIBLE_QUOTE_STATUSES, "convert").await);
        }
        let mut quote = DocumentRepository::fetch(&mut tx, quote_id).await?;

        let lines = quote
            .lines
            .iter()
            .map(|line| line.derive_input(line.quantity, true))
            .collect();
        let mut new = NewDocument::new(
            DocumentKind::Order,
            quote.counterparty.clone(),
            now.date_naive(),
            lines,
        );
        new.global_discount = quote.global_discount;
        new.terms = quote.terms.clone();
        new.notes = quote.notes.clone();
        new.warehouse_id = quote.warehouse_id.clone();
        new.links.quote_id = Some(quote.id.clone());

        let order = insert_successor(&mut tx, &mut quote, new, now).await?;

        quote.status = DocumentStatus::Converted;
        quote.updated_at = now;
        DocumentRepository::update(&mut tx, &quote).await?;
        tx.commit().await?;

        info!(quote = %quote.reference(), order = %order.id, "Quote converted to order");
        Ok(order)
    }

    /// Expires every sent quote whose validity date is before `today`.
    ///
    /// Returns the ids of the expired quotes.
    pub async fn expire_overdue(&self, today: NaiveDate) -> EngineResult<Vec<String>> {
        let mut tx = self.db.begin().await?;
        let expired = DocumentRepository::expire_overdue(&mut tx, today, Utc::now()).await?;
        tx.commit().await?;

        if !expired.is_empty() {
            info!(count = expired.len(), %today, "Overdue quotes expired");
        }
        Ok(expired)
    }
}
