//! Atomic invoice writes and the billed total they drive.

use std::collections::HashMap;

use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::ledger::{self, InvoiceNumber, ItemPlan, WriteKind};
use crate::models::{
    InvoiceDraft, InvoiceFigures, InvoiceItem, InvoiceRevision, InvoiceWithItems,
    ListInvoicesFilter, NewInvoice,
};
use crate::services::client_directory::{
    business_not_found, client_not_found, recompute_billed_total,
};
use crate::services::metrics::{
    amount_as_f64, record_operation, INVOICES_TOTAL, INVOICE_AMOUNT_TOTAL,
};
use crate::services::store::{LedgerStore, LedgerTx};

fn invoice_not_found(invoice_id: Uuid, client_id: Uuid) -> AppError {
    AppError::NotFound(anyhow::anyhow!(
        "Invoice {} not found for client {}",
        invoice_id,
        client_id
    ))
}

/// Creates, edits and deletes invoices. Each write covers the header, its items
/// and the client's billed total in one transaction.
#[derive(Clone)]
pub struct InvoiceLedger<S: LedgerStore> {
    store: S,
}

impl<S: LedgerStore> InvoiceLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Issue a new invoice under the next number of the client's business.
    #[instrument(skip(self, draft), fields(items = draft.items.len()))]
    pub async fn create_invoice(
        &self,
        client_id: Uuid,
        draft: &InvoiceDraft,
    ) -> Result<InvoiceWithItems, AppError> {
        draft.validate()?;

        let result = self.write_new_invoice(client_id, draft).await;
        record_operation("create_invoice", &result);
        result
    }

    async fn write_new_invoice(
        &self,
        client_id: Uuid,
        draft: &InvoiceDraft,
    ) -> Result<InvoiceWithItems, AppError> {
        let mut tx = self.store.begin().await?;

        let client = tx
            .lock_client(client_id)
            .await?
            .ok_or_else(|| client_not_found(client_id))?;
        let business = tx
            .lock_business(client.business_id)
            .await?
            .ok_or_else(|| business_not_found(client.business_id))?;

        let figures = InvoiceFigures::compute(&business.state_code, &client.state_code, draft)?;

        let last_issued = tx.last_invoice_number(business.business_id).await?;
        let invoice_number = InvoiceNumber::next_after(last_issued.as_deref(), draft.invoice_date)?;

        let invoice = tx
            .insert_invoice(&NewInvoice {
                business_id: business.business_id,
                client_id,
                invoice_number: invoice_number.to_string(),
                revision: InvoiceRevision {
                    invoice_date: draft.invoice_date,
                    shipping_charges: draft.shipping_charges,
                    figures: figures.clone(),
                },
            })
            .await?;

        let mut items = Vec::with_capacity(draft.items.len());
        for (position, input) in draft.items.iter().enumerate() {
            let item = InvoiceItem::from_input(Uuid::new_v4(), invoice.invoice_id, position, input)?;
            tx.insert_item(&item).await?;
            items.push(item);
        }

        recompute_billed_total(&mut tx, &client).await?;
        tx.commit().await?;

        INVOICES_TOTAL
            .with_label_values(&[figures.regime.as_str(), "created"])
            .inc();
        INVOICE_AMOUNT_TOTAL
            .with_label_values(&[figures.regime.as_str()])
            .inc_by(amount_as_f64(invoice.total_after_tax));

        info!(
            invoice_id = %invoice.invoice_id,
            invoice_number = %invoice.invoice_number,
            regime = figures.regime.as_str(),
            total_after_tax = %invoice.total_after_tax,
            "Invoice created"
        );

        Ok(InvoiceWithItems { invoice, items })
    }

    /// Rewrite an invoice's date, shipping and items. The number is kept.
    #[instrument(skip(self, draft), fields(items = draft.items.len()))]
    pub async fn edit_invoice(
        &self,
        invoice_id: Uuid,
        client_id: Uuid,
        draft: &InvoiceDraft,
    ) -> Result<InvoiceWithItems, AppError> {
        draft.validate()?;
        let submitted: Vec<Option<Uuid>> = draft.items.iter().map(|item| item.item_id).collect();
        ledger::distinct_ids(&submitted)?;

        let result = self
            .write_revision(invoice_id, client_id, draft, &submitted)
            .await;
        record_operation("edit_invoice", &result);
        result
    }

    async fn write_revision(
        &self,
        invoice_id: Uuid,
        client_id: Uuid,
        draft: &InvoiceDraft,
        submitted: &[Option<Uuid>],
    ) -> Result<InvoiceWithItems, AppError> {
        let mut tx = self.store.begin().await?;

        let client = tx
            .lock_client(client_id)
            .await?
            .ok_or_else(|| client_not_found(client_id))?;
        let existing = tx
            .get_invoice(invoice_id, client_id)
            .await?
            .ok_or_else(|| invoice_not_found(invoice_id, client_id))?;
        let business = tx
            .get_business(existing.business_id)
            .await?
            .ok_or_else(|| business_not_found(existing.business_id))?;

        let stored: Vec<Uuid> = tx
            .list_items(&[invoice_id])
            .await?
            .into_iter()
            .map(|item| item.item_id)
            .collect();
        let plan = ItemPlan::build(&stored, submitted)?;

        if !plan.delete.is_empty() {
            tx.delete_items(invoice_id, &plan.delete).await?;
        }

        let figures = InvoiceFigures::compute(&business.state_code, &client.state_code, draft)?;
        let invoice = tx
            .update_invoice(
                invoice_id,
                &InvoiceRevision {
                    invoice_date: draft.invoice_date,
                    shipping_charges: draft.shipping_charges,
                    figures: figures.clone(),
                },
            )
            .await?;

        let mut items = Vec::with_capacity(plan.writes.len());
        for write in &plan.writes {
            let item = InvoiceItem::from_input(
                write.id,
                invoice_id,
                write.position,
                &draft.items[write.position],
            )?;
            match write.kind {
                WriteKind::Update => tx.update_item(&item).await?,
                WriteKind::Insert => tx.insert_item(&item).await?,
            }
            items.push(item);
        }

        recompute_billed_total(&mut tx, &client).await?;
        tx.commit().await?;

        INVOICES_TOTAL
            .with_label_values(&[figures.regime.as_str(), "edited"])
            .inc();

        info!(
            invoice_id = %invoice_id,
            invoice_number = %invoice.invoice_number,
            deleted_items = plan.delete.len(),
            previous_total = %existing.total_after_tax,
            total_after_tax = %invoice.total_after_tax,
            "Invoice edited"
        );

        Ok(InvoiceWithItems { invoice, items })
    }

    /// Remove an invoice and its items, then re-derive the billed total.
    #[instrument(skip(self))]
    pub async fn delete_invoice(&self, invoice_id: Uuid, client_id: Uuid) -> Result<(), AppError> {
        let result = async {
            let mut tx = self.store.begin().await?;

            let client = tx
                .lock_client(client_id)
                .await?
                .ok_or_else(|| client_not_found(client_id))?;
            let invoice = tx
                .get_invoice(invoice_id, client_id)
                .await?
                .ok_or_else(|| invoice_not_found(invoice_id, client_id))?;

            tx.delete_invoice(invoice_id).await?;
            recompute_billed_total(&mut tx, &client).await?;
            tx.commit().await?;

            info!(
                invoice_id = %invoice_id,
                invoice_number = %invoice.invoice_number,
                "Invoice deleted"
            );
            Ok::<_, AppError>(())
        }
        .await;

        record_operation("delete_invoice", &result);
        result
    }

    #[instrument(skip(self))]
    pub async fn get_invoice(
        &self,
        invoice_id: Uuid,
        client_id: Uuid,
    ) -> Result<InvoiceWithItems, AppError> {
        let mut tx = self.store.begin().await?;
        let invoice = tx
            .get_invoice(invoice_id, client_id)
            .await?
            .ok_or_else(|| invoice_not_found(invoice_id, client_id))?;
        let items = tx.list_items(&[invoice_id]).await?;
        tx.commit().await?;

        Ok(InvoiceWithItems { invoice, items })
    }

    /// One page of a client's invoices, each with its items.
    #[instrument(skip(self))]
    pub async fn list_invoices_for_client(
        &self,
        client_id: Uuid,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<InvoiceWithItems>, AppError> {
        let mut tx = self.store.begin().await?;
        tx.get_client(client_id)
            .await?
            .ok_or_else(|| client_not_found(client_id))?;

        let invoices = tx.list_invoices(client_id, filter).await?;
        let invoice_ids: Vec<Uuid> = invoices.iter().map(|i| i.invoice_id).collect();
        let items = if invoice_ids.is_empty() {
            Vec::new()
        } else {
            tx.list_items(&invoice_ids).await?
        };
        tx.commit().await?;

        let mut items_by_invoice: HashMap<Uuid, Vec<InvoiceItem>> = HashMap::new();
        for item in items {
            items_by_invoice.entry(item.invoice_id).or_default().push(item);
        }

        Ok(invoices
            .into_iter()
            .map(|invoice| {
                let mut items = items_by_invoice
                    .remove(&invoice.invoice_id)
                    .unwrap_or_default();
                items.sort_by_key(|item| item.position);
                InvoiceWithItems { invoice, items }
            })
            .collect())
    }
}
