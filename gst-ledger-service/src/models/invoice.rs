//! Invoice header, line items and the inputs that produce them.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::validation;
use crate::ledger::{self, Period, TaxRegime};

/// Invoice header. Written together with its items or not at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub business_id: Uuid,
    pub client_id: Uuid,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub shipping_charges: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub total_before_tax: Decimal,
    pub total_after_tax: Decimal,
    pub amount_in_words: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// One line of an invoice. `position` is its index in the last accepted item list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct InvoiceItem {
    pub item_id: Uuid,
    pub invoice_id: Uuid,
    pub description: String,
    pub hsn_code: String,
    pub rate: Decimal,
    pub quantity: i32,
    pub net_amount: Decimal,
    pub position: i32,
}

impl InvoiceItem {
    pub fn from_input(
        item_id: Uuid,
        invoice_id: Uuid,
        position: usize,
        input: &ItemInput,
    ) -> Result<Self, AppError> {
        let position = i32::try_from(position).map_err(|_| {
            AppError::BadRequest(anyhow::anyhow!("Item position {} is out of range", position))
        })?;

        Ok(Self {
            item_id,
            invoice_id,
            description: input.description.clone(),
            hsn_code: input.hsn_code.clone(),
            rate: input.rate,
            quantity: input.quantity,
            net_amount: ledger::net_amount(input.rate, input.quantity)?,
            position,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceWithItems {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
}

/// Submitted line item. `item_id` is only meaningful when editing.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ItemInput {
    #[serde(default)]
    pub item_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255, message = "Description must be 1-255 characters"))]
    pub description: String,
    #[validate(custom(function = "validation::hsn_code"))]
    pub hsn_code: String,
    #[validate(custom(function = "validation::positive_money"))]
    pub rate: Decimal,
    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "Quantity must be between 1 and 1000000"
    ))]
    pub quantity: i32,
}

/// Submitted invoice body, used for both create and edit.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InvoiceDraft {
    pub invoice_date: NaiveDate,
    #[serde(default)]
    #[validate(custom(function = "validation::non_negative_money"))]
    pub shipping_charges: Decimal,
    #[validate(length(
        min = 1,
        max = 500,
        message = "An invoice needs between 1 and 500 items"
    ))]
    #[validate(nested)]
    pub items: Vec<ItemInput>,
}

/// Derived money fields of an invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceFigures {
    pub regime: TaxRegime,
    pub total_before_tax: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub total_after_tax: Decimal,
    pub amount_in_words: String,
}

impl InvoiceFigures {
    /// Fails with `BadRequest` when a line or the grand total would not fit a money column.
    pub fn compute(
        issuer_state_code: &str,
        client_state_code: &str,
        draft: &InvoiceDraft,
    ) -> Result<Self, AppError> {
        let total_before_tax =
            ledger::total_before_tax(draft.items.iter().map(|item| (item.rate, item.quantity)))?;
        let tax = ledger::assess(
            issuer_state_code,
            client_state_code,
            total_before_tax,
            draft.shipping_charges,
        )?;

        Ok(Self {
            regime: tax.regime,
            total_before_tax,
            cgst: tax.cgst,
            sgst: tax.sgst,
            igst: tax.igst,
            amount_in_words: ledger::amount_in_words(tax.total_after_tax),
            total_after_tax: tax.total_after_tax,
        })
    }
}

/// Header fields written on create.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub business_id: Uuid,
    pub client_id: Uuid,
    pub invoice_number: String,
    pub revision: InvoiceRevision,
}

/// Header fields rewritten on every create or edit.
#[derive(Debug, Clone)]
pub struct InvoiceRevision {
    pub invoice_date: NaiveDate,
    pub shipping_charges: Decimal,
    pub figures: InvoiceFigures,
}

/// Filter parameters for listing a client's invoices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListInvoicesFilter {
    pub period: Period,
    pub page: u32,
    pub page_size: u32,
}

impl ListInvoicesFilter {
    pub const DEFAULT_PAGE_SIZE: u32 = 10;
    pub const MAX_PAGE_SIZE: u32 = 100;

    /// Apply paging defaults and bounds. Pages are 1-based.
    pub fn new(
        period: Period,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Self, AppError> {
        let page = page.unwrap_or(1);
        let page_size = page_size.unwrap_or(Self::DEFAULT_PAGE_SIZE);

        if page == 0 {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "page must be at least 1"
            )));
        }
        if !(1..=Self::MAX_PAGE_SIZE).contains(&page_size) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "page_size must be between 1 and {}",
                Self::MAX_PAGE_SIZE
            )));
        }

        Ok(Self {
            period,
            page,
            page_size,
        })
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }
}

impl Default for ListInvoicesFilter {
    fn default() -> Self {
        Self {
            period: Period::All,
            page: 1,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}
