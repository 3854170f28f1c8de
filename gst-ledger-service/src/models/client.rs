//! Client model with its denormalized running totals.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::validation;

/// A customer of a business.
///
/// `total_billed` and `total_paid` always equal the sums over the client's
/// invoices and payments. Only the ledger services write them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub client_id: Uuid,
    pub business_id: Uuid,
    pub username: String,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub state: String,
    pub state_code: String,
    pub gstin: Option<String>,
    pub account_number: Option<String>,
    pub ifsc_code: Option<String>,
    pub bank_name: Option<String>,
    pub total_billed: Decimal,
    pub total_paid: Decimal,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Client {
    pub fn outstanding_balance(&self) -> Decimal {
        self.total_billed - self.total_paid
    }
}

/// Input for onboarding a client. Totals always start at zero.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateClient {
    pub business_id: Uuid,
    #[validate(length(min = 3, max = 100, message = "Username must be 3-100 characters"))]
    pub username: String,
    #[validate(nested)]
    #[serde(flatten)]
    pub profile: ClientProfile,
}

/// Everything about a client except identity and totals.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ClientProfile {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(max = 255, message = "Address must not exceed 255 characters"))]
    pub address: Option<String>,
    #[validate(length(min = 10, max = 20, message = "Phone must be 10-20 characters"))]
    pub phone: Option<String>,
    #[validate(length(min = 2, max = 100, message = "State must be 2-100 characters"))]
    pub state: String,
    #[validate(length(min = 1, max = 5, message = "State code must be 1-5 characters"))]
    pub state_code: String,
    #[validate(custom(function = "validation::gstin"))]
    pub gstin: Option<String>,
    #[validate(length(min = 6, max = 20, message = "Account number must be 6-20 characters"))]
    pub account_number: Option<String>,
    #[validate(length(min = 2, max = 11, message = "IFSC code must be 2-11 characters"))]
    pub ifsc_code: Option<String>,
    #[validate(length(max = 50, message = "Bank name must not exceed 50 characters"))]
    pub bank_name: Option<String>,
}

/// Per-client account overview for a business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ClientSummary {
    pub client_id: Uuid,
    pub username: String,
    pub name: String,
    pub total_billed: Decimal,
    pub total_paid: Decimal,
    pub outstanding_balance: Decimal,
    pub last_invoice_number: Option<String>,
    pub last_invoice_amount: Option<Decimal>,
    pub last_invoice_date: Option<NaiveDate>,
    pub last_payment_amount: Option<Decimal>,
    pub last_payment_date: Option<NaiveDate>,
}

/// Stored totals next to freshly summed ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalsRefresh {
    pub client_id: Uuid,
    pub billed_before: Decimal,
    pub billed_after: Decimal,
    pub paid_before: Decimal,
    pub paid_after: Decimal,
}

impl TotalsRefresh {
    pub fn was_drifted(&self) -> bool {
        self.billed_before != self.billed_after || self.paid_before != self.paid_after
    }
}
