//! In-memory ledger store for tests and local runs.
//!
//! A transaction takes the store lock for its whole lifetime and works on a copy
//! of the state, so writes become visible only on commit and concurrent
//! transactions are fully serialised.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

use crate::ledger::{InvoiceNumber, Period};
use crate::models::{
    Business, Client, ClientProfile, ClientSummary, CreateBusiness, CreateClient, Invoice,
    InvoiceItem, InvoiceRevision, ListInvoicesFilter, NewInvoice, Payment, PaymentDetails,
};
use crate::services::store::{LedgerStore, LedgerTx};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    businesses: HashMap<Uuid, Business>,
    clients: HashMap<Uuid, Client>,
    /// Creation order.
    invoices: Vec<Invoice>,
    items: Vec<InvoiceItem>,
    /// Creation order.
    payments: Vec<Payment>,
}

/// Shared in-memory store. Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_on: Arc<StdMutex<Option<&'static str>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call of the named transaction operation fail with a
    /// database error, until [`MemoryStore::clear_failure`] is called.
    pub fn fail_on(&self, operation: &'static str) {
        if let Ok(mut slot) = self.fail_on.lock() {
            *slot = Some(operation);
        }
    }

    pub fn clear_failure(&self) {
        if let Ok(mut slot) = self.fail_on.lock() {
            *slot = None;
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, AppError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTx {
            guard,
            working,
            fail_on: self.fail_on.clone(),
        })
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_on: Arc<StdMutex<Option<&'static str>>>,
}

impl MemoryTx {
    fn check(&self, operation: &'static str) -> Result<(), AppError> {
        let armed = self
            .fail_on
            .lock()
            .map(|slot| *slot == Some(operation))
            .unwrap_or(false);
        if armed {
            debug!(operation, "Injected store failure");
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "Injected failure in {}",
                operation
            )));
        }
        Ok(())
    }

    fn client_mut(&mut self, client_id: Uuid) -> Result<&mut Client, AppError> {
        self.working
            .clients
            .get_mut(&client_id)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client {} not found", client_id)))
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn commit(self) -> Result<(), AppError> {
        self.check("commit")?;
        let MemoryTx {
            mut guard, working, ..
        } = self;
        *guard = working;
        Ok(())
    }

    async fn insert_business(&mut self, input: &CreateBusiness) -> Result<Business, AppError> {
        self.check("insert_business")?;

        if let Some(gstin) = &input.gstin {
            if self
                .working
                .businesses
                .values()
                .any(|b| b.gstin.as_ref() == Some(gstin))
            {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "A business with GSTIN '{}' already exists",
                    gstin
                )));
            }
        }

        let business = Business {
            business_id: Uuid::new_v4(),
            name: input.name.clone(),
            gstin: input.gstin.clone(),
            address: input.address.clone(),
            phone: input.phone.clone(),
            state: input.state.clone(),
            state_code: input.state_code.clone(),
            account_number: input.account_number.clone(),
            ifsc_code: input.ifsc_code.clone(),
            bank_name: input.bank_name.clone(),
            created_utc: Utc::now(),
        };
        self.working
            .businesses
            .insert(business.business_id, business.clone());
        Ok(business)
    }

    async fn get_business(&mut self, business_id: Uuid) -> Result<Option<Business>, AppError> {
        self.check("get_business")?;
        Ok(self.working.businesses.get(&business_id).cloned())
    }

    async fn lock_business(&mut self, business_id: Uuid) -> Result<Option<Business>, AppError> {
        self.check("lock_business")?;
        Ok(self.working.businesses.get(&business_id).cloned())
    }

    async fn insert_client(&mut self, input: &CreateClient) -> Result<Client, AppError> {
        self.check("insert_client")?;

        let taken = self
            .working
            .clients
            .values()
            .any(|c| c.business_id == input.business_id && c.username == input.username);
        if taken {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Username '{}' is already taken",
                input.username
            )));
        }

        let now = Utc::now();
        let profile = &input.profile;
        let client = Client {
            client_id: Uuid::new_v4(),
            business_id: input.business_id,
            username: input.username.clone(),
            name: profile.name.clone(),
            email: profile.email.clone(),
            address: profile.address.clone(),
            phone: profile.phone.clone(),
            state: profile.state.clone(),
            state_code: profile.state_code.clone(),
            gstin: profile.gstin.clone(),
            account_number: profile.account_number.clone(),
            ifsc_code: profile.ifsc_code.clone(),
            bank_name: profile.bank_name.clone(),
            total_billed: Decimal::ZERO,
            total_paid: Decimal::ZERO,
            created_utc: now,
            updated_utc: now,
        };
        self.working.clients.insert(client.client_id, client.clone());
        Ok(client)
    }

    async fn get_client(&mut self, client_id: Uuid) -> Result<Option<Client>, AppError> {
        self.check("get_client")?;
        Ok(self.working.clients.get(&client_id).cloned())
    }

    async fn lock_client(&mut self, client_id: Uuid) -> Result<Option<Client>, AppError> {
        self.check("lock_client")?;
        Ok(self.working.clients.get(&client_id).cloned())
    }

    async fn find_client_by_username(
        &mut self,
        business_id: Uuid,
        username: &str,
    ) -> Result<Option<Client>, AppError> {
        self.check("find_client_by_username")?;
        Ok(self
            .working
            .clients
            .values()
            .find(|c| c.business_id == business_id && c.username == username)
            .cloned())
    }

    async fn update_client_profile(
        &mut self,
        client_id: Uuid,
        profile: &ClientProfile,
    ) -> Result<Option<Client>, AppError> {
        self.check("update_client_profile")?;

        let Some(client) = self.working.clients.get_mut(&client_id) else {
            return Ok(None);
        };
        client.name = profile.name.clone();
        client.email = profile.email.clone();
        client.address = profile.address.clone();
        client.phone = profile.phone.clone();
        client.state = profile.state.clone();
        client.state_code = profile.state_code.clone();
        client.gstin = profile.gstin.clone();
        client.account_number = profile.account_number.clone();
        client.ifsc_code = profile.ifsc_code.clone();
        client.bank_name = profile.bank_name.clone();
        client.updated_utc = Utc::now();
        Ok(Some(client.clone()))
    }

    async fn list_client_summaries(
        &mut self,
        business_id: Uuid,
    ) -> Result<Vec<ClientSummary>, AppError> {
        self.check("list_client_summaries")?;

        let state = &self.working;
        let mut clients: Vec<&Client> = state
            .clients
            .values()
            .filter(|c| c.business_id == business_id)
            .collect();
        clients.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.username.cmp(&b.username)));

        let summaries = clients
            .into_iter()
            .map(|client| {
                // max_by_key keeps the last maximum, so later-created rows win ties.
                let last_invoice = state
                    .invoices
                    .iter()
                    .filter(|i| i.client_id == client.client_id)
                    .max_by_key(|i| i.invoice_date);
                let last_payment = state
                    .payments
                    .iter()
                    .filter(|p| p.client_id == client.client_id)
                    .max_by_key(|p| p.payment_date);

                ClientSummary {
                    client_id: client.client_id,
                    username: client.username.clone(),
                    name: client.name.clone(),
                    total_billed: client.total_billed,
                    total_paid: client.total_paid,
                    outstanding_balance: client.outstanding_balance(),
                    last_invoice_number: last_invoice.map(|i| i.invoice_number.clone()),
                    last_invoice_amount: last_invoice.map(|i| i.total_after_tax),
                    last_invoice_date: last_invoice.map(|i| i.invoice_date),
                    last_payment_amount: last_payment.map(|p| p.amount),
                    last_payment_date: last_payment.map(|p| p.payment_date),
                }
            })
            .collect();

        Ok(summaries)
    }

    async fn set_billed_total(&mut self, client_id: Uuid, total: Decimal) -> Result<(), AppError> {
        self.check("set_billed_total")?;
        let client = self.client_mut(client_id)?;
        client.total_billed = total;
        client.updated_utc = Utc::now();
        Ok(())
    }

    async fn set_paid_total(&mut self, client_id: Uuid, total: Decimal) -> Result<(), AppError> {
        self.check("set_paid_total")?;
        let client = self.client_mut(client_id)?;
        client.total_paid = total;
        client.updated_utc = Utc::now();
        Ok(())
    }

    async fn sum_invoice_totals(&mut self, client_id: Uuid) -> Result<Decimal, AppError> {
        self.check("sum_invoice_totals")?;
        Ok(self
            .working
            .invoices
            .iter()
            .filter(|i| i.client_id == client_id)
            .map(|i| i.total_after_tax)
            .sum())
    }

    async fn sum_payment_amounts(&mut self, client_id: Uuid) -> Result<Decimal, AppError> {
        self.check("sum_payment_amounts")?;
        Ok(self
            .working
            .payments
            .iter()
            .filter(|p| p.client_id == client_id)
            .map(|p| p.amount)
            .sum())
    }

    async fn last_invoice_number(
        &mut self,
        business_id: Uuid,
    ) -> Result<Option<String>, AppError> {
        self.check("last_invoice_number")?;
        Ok(self
            .working
            .invoices
            .iter()
            .rev()
            .find(|i| i.business_id == business_id)
            .map(|i| i.invoice_number.clone()))
    }

    async fn insert_invoice(&mut self, invoice: &NewInvoice) -> Result<Invoice, AppError> {
        self.check("insert_invoice")?;

        let duplicate = self.working.invoices.iter().any(|i| {
            i.business_id == invoice.business_id && i.invoice_number == invoice.invoice_number
        });
        if duplicate {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Invoice number '{}' already exists",
                invoice.invoice_number
            )));
        }

        let now = Utc::now();
        let revision = &invoice.revision;
        let figures = &revision.figures;
        let inserted = Invoice {
            invoice_id: Uuid::new_v4(),
            business_id: invoice.business_id,
            client_id: invoice.client_id,
            invoice_number: invoice.invoice_number.clone(),
            invoice_date: revision.invoice_date,
            shipping_charges: revision.shipping_charges,
            cgst: figures.cgst,
            sgst: figures.sgst,
            igst: figures.igst,
            total_before_tax: figures.total_before_tax,
            total_after_tax: figures.total_after_tax,
            amount_in_words: figures.amount_in_words.clone(),
            created_utc: now,
            updated_utc: now,
        };
        self.working.invoices.push(inserted.clone());
        Ok(inserted)
    }

    async fn get_invoice(
        &mut self,
        invoice_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<Invoice>, AppError> {
        self.check("get_invoice")?;
        Ok(self
            .working
            .invoices
            .iter()
            .find(|i| i.invoice_id == invoice_id && i.client_id == client_id)
            .cloned())
    }

    async fn update_invoice(
        &mut self,
        invoice_id: Uuid,
        revision: &InvoiceRevision,
    ) -> Result<Invoice, AppError> {
        self.check("update_invoice")?;

        let invoice = self
            .working
            .invoices
            .iter_mut()
            .find(|i| i.invoice_id == invoice_id)
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Invoice {} not found", invoice_id))
            })?;

        let figures = &revision.figures;
        invoice.invoice_date = revision.invoice_date;
        invoice.shipping_charges = revision.shipping_charges;
        invoice.cgst = figures.cgst;
        invoice.sgst = figures.sgst;
        invoice.igst = figures.igst;
        invoice.total_before_tax = figures.total_before_tax;
        invoice.total_after_tax = figures.total_after_tax;
        invoice.amount_in_words = figures.amount_in_words.clone();
        invoice.updated_utc = Utc::now();
        Ok(invoice.clone())
    }

    async fn delete_invoice(&mut self, invoice_id: Uuid) -> Result<(), AppError> {
        self.check("delete_invoice")?;
        self.working.invoices.retain(|i| i.invoice_id != invoice_id);
        self.working.items.retain(|item| item.invoice_id != invoice_id);
        Ok(())
    }

    async fn list_invoices(
        &mut self,
        client_id: Uuid,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, AppError> {
        self.check("list_invoices")?;

        let mut invoices: Vec<Invoice> = self
            .working
            .invoices
            .iter()
            .filter(|i| i.client_id == client_id && filter.period.contains(i.invoice_date))
            .cloned()
            .collect();
        invoices.sort_by_key(|i| {
            std::cmp::Reverse(InvoiceNumber::sequence_of(&i.invoice_number).unwrap_or(0))
        });

        Ok(invoices
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.page_size as usize)
            .collect())
    }

    async fn list_items(&mut self, invoice_ids: &[Uuid]) -> Result<Vec<InvoiceItem>, AppError> {
        self.check("list_items")?;

        let mut items: Vec<InvoiceItem> = self
            .working
            .items
            .iter()
            .filter(|item| invoice_ids.contains(&item.invoice_id))
            .cloned()
            .collect();
        items.sort_by_key(|item| (item.invoice_id, item.position));
        Ok(items)
    }

    async fn insert_item(&mut self, item: &InvoiceItem) -> Result<(), AppError> {
        self.check("insert_item")?;

        if self.working.items.iter().any(|i| i.item_id == item.item_id) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Invoice item {} already exists",
                item.item_id
            )));
        }
        self.working.items.push(item.clone());
        Ok(())
    }

    async fn update_item(&mut self, item: &InvoiceItem) -> Result<(), AppError> {
        self.check("update_item")?;

        if let Some(stored) = self
            .working
            .items
            .iter_mut()
            .find(|i| i.item_id == item.item_id && i.invoice_id == item.invoice_id)
        {
            *stored = item.clone();
        }
        Ok(())
    }

    async fn delete_items(&mut self, invoice_id: Uuid, item_ids: &[Uuid]) -> Result<(), AppError> {
        self.check("delete_items")?;
        self.working
            .items
            .retain(|i| !(i.invoice_id == invoice_id && item_ids.contains(&i.item_id)));
        Ok(())
    }

    async fn insert_payment(
        &mut self,
        business_id: Uuid,
        client_id: Uuid,
        details: &PaymentDetails,
    ) -> Result<Payment, AppError> {
        self.check("insert_payment")?;

        let now = Utc::now();
        let payment = Payment {
            payment_id: Uuid::new_v4(),
            business_id,
            client_id,
            payment_date: details.payment_date,
            amount: details.amount,
            payee_name: details.payee_name.clone(),
            created_utc: now,
            updated_utc: now,
        };
        self.working.payments.push(payment.clone());
        Ok(payment)
    }

    async fn get_payment(
        &mut self,
        payment_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<Payment>, AppError> {
        self.check("get_payment")?;
        Ok(self
            .working
            .payments
            .iter()
            .find(|p| p.payment_id == payment_id && p.client_id == client_id)
            .cloned())
    }

    async fn update_payment(
        &mut self,
        payment_id: Uuid,
        details: &PaymentDetails,
    ) -> Result<Payment, AppError> {
        self.check("update_payment")?;

        let payment = self
            .working
            .payments
            .iter_mut()
            .find(|p| p.payment_id == payment_id)
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Payment {} not found", payment_id))
            })?;
        payment.payment_date = details.payment_date;
        payment.amount = details.amount;
        payment.payee_name = details.payee_name.clone();
        payment.updated_utc = Utc::now();
        Ok(payment.clone())
    }

    async fn delete_payment(&mut self, payment_id: Uuid) -> Result<(), AppError> {
        self.check("delete_payment")?;
        self.working.payments.retain(|p| p.payment_id != payment_id);
        Ok(())
    }

    async fn list_payments(
        &mut self,
        client_id: Uuid,
        period: &Period,
    ) -> Result<Vec<Payment>, AppError> {
        self.check("list_payments")?;

        // Newest first, then a stable sort keeps creation order inside a date.
        let mut payments: Vec<Payment> = self
            .working
            .payments
            .iter()
            .rev()
            .filter(|p| p.client_id == client_id && period.contains(p.payment_date))
            .cloned()
            .collect();
        payments.sort_by_key(|p| std::cmp::Reverse(p.payment_date));
        Ok(payments)
    }
}
