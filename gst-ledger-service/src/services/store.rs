//! Storage seam for the ledger.
//!
//! Every operation runs on a [`LedgerTx`]. Dropping a transaction without calling
//! [`LedgerTx::commit`] discards all of its writes.

use async_trait::async_trait;
use rust_decimal::Decimal;
use service_core::error::AppError;
use uuid::Uuid;

use crate::ledger::Period;
use crate::models::{
    Business, Client, ClientProfile, ClientSummary, CreateBusiness, CreateClient, Invoice,
    InvoiceItem, InvoiceRevision, ListInvoicesFilter, NewInvoice, Payment, PaymentDetails,
};

/// A handle that opens ledger transactions.
#[async_trait]
pub trait LedgerStore: Clone + Send + Sync + 'static {
    type Tx: LedgerTx;

    async fn begin(&self) -> Result<Self::Tx, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

/// One unit of work against the ledger tables.
///
/// `lock_*` reads take a row lock held until commit or drop. Unique-key violations
/// surface as [`AppError::Conflict`].
#[async_trait]
pub trait LedgerTx: Send {
    async fn commit(self) -> Result<(), AppError>;

    // Businesses

    async fn insert_business(&mut self, input: &CreateBusiness) -> Result<Business, AppError>;

    async fn get_business(&mut self, business_id: Uuid) -> Result<Option<Business>, AppError>;

    async fn lock_business(&mut self, business_id: Uuid) -> Result<Option<Business>, AppError>;

    // Clients

    async fn insert_client(&mut self, input: &CreateClient) -> Result<Client, AppError>;

    async fn get_client(&mut self, client_id: Uuid) -> Result<Option<Client>, AppError>;

    async fn lock_client(&mut self, client_id: Uuid) -> Result<Option<Client>, AppError>;

    async fn find_client_by_username(
        &mut self,
        business_id: Uuid,
        username: &str,
    ) -> Result<Option<Client>, AppError>;

    async fn update_client_profile(
        &mut self,
        client_id: Uuid,
        profile: &ClientProfile,
    ) -> Result<Option<Client>, AppError>;

    async fn list_client_summaries(
        &mut self,
        business_id: Uuid,
    ) -> Result<Vec<ClientSummary>, AppError>;

    async fn set_billed_total(&mut self, client_id: Uuid, total: Decimal) -> Result<(), AppError>;

    async fn set_paid_total(&mut self, client_id: Uuid, total: Decimal) -> Result<(), AppError>;

    async fn sum_invoice_totals(&mut self, client_id: Uuid) -> Result<Decimal, AppError>;

    async fn sum_payment_amounts(&mut self, client_id: Uuid) -> Result<Decimal, AppError>;

    // Invoices

    /// Invoice number of the business's most recently created invoice.
    async fn last_invoice_number(&mut self, business_id: Uuid)
        -> Result<Option<String>, AppError>;

    async fn insert_invoice(&mut self, invoice: &NewInvoice) -> Result<Invoice, AppError>;

    /// Only returns the invoice if it belongs to `client_id`.
    async fn get_invoice(
        &mut self,
        invoice_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<Invoice>, AppError>;

    async fn update_invoice(
        &mut self,
        invoice_id: Uuid,
        revision: &InvoiceRevision,
    ) -> Result<Invoice, AppError>;

    /// Removes the header and, by cascade, its items.
    async fn delete_invoice(&mut self, invoice_id: Uuid) -> Result<(), AppError>;

    /// A page of invoices, highest sequence first.
    async fn list_invoices(
        &mut self,
        client_id: Uuid,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, AppError>;

    /// Items of the given invoices, ordered by invoice then position.
    async fn list_items(&mut self, invoice_ids: &[Uuid]) -> Result<Vec<InvoiceItem>, AppError>;

    async fn insert_item(&mut self, item: &InvoiceItem) -> Result<(), AppError>;

    async fn update_item(&mut self, item: &InvoiceItem) -> Result<(), AppError>;

    async fn delete_items(&mut self, invoice_id: Uuid, item_ids: &[Uuid]) -> Result<(), AppError>;

    // Payments

    async fn insert_payment(
        &mut self,
        business_id: Uuid,
        client_id: Uuid,
        details: &PaymentDetails,
    ) -> Result<Payment, AppError>;

    /// Only returns the payment if it belongs to `client_id`.
    async fn get_payment(
        &mut self,
        payment_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<Payment>, AppError>;

    async fn update_payment(
        &mut self,
        payment_id: Uuid,
        details: &PaymentDetails,
    ) -> Result<Payment, AppError>;

    async fn delete_payment(&mut self, payment_id: Uuid) -> Result<(), AppError>;

    /// Payments in the period, latest payment date first.
    async fn list_payments(
        &mut self,
        client_id: Uuid,
        period: &Period,
    ) -> Result<Vec<Payment>, AppError>;
}
