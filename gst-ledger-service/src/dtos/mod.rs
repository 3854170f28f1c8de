//! Query parameters and response envelopes for the HTTP API.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

use crate::ledger::Period;
use crate::models::{InvoiceWithItems, ListInvoicesFilter, Payment};

/// `financial_year=2024-25`, or `start_date` and `end_date` together.
#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub financial_year: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl PeriodQuery {
    pub fn to_period(&self) -> Result<Period, AppError> {
        Period::resolve(
            self.financial_year.as_deref(),
            self.start_date,
            self.end_date,
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListInvoicesQuery {
    pub financial_year: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ListInvoicesQuery {
    pub fn to_filter(&self) -> Result<ListInvoicesFilter, AppError> {
        let period = Period::resolve(
            self.financial_year.as_deref(),
            self.start_date,
            self.end_date,
        )?;
        ListInvoicesFilter::new(period, self.page, self.page_size)
    }
}

#[derive(Debug, Serialize)]
pub struct InvoicePage {
    pub page: u32,
    pub page_size: u32,
    pub invoices: Vec<InvoiceWithItems>,
}

#[derive(Debug, Serialize)]
pub struct PaymentList {
    pub count: usize,
    pub payments: Vec<Payment>,
}
