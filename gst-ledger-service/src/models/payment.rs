//! Payment model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::validation;

/// Money received from a client. Not tied to any invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub payment_id: Uuid,
    pub business_id: Uuid,
    pub client_id: Uuid,
    pub payment_date: NaiveDate,
    pub amount: Decimal,
    pub payee_name: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for recording or correcting a payment.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PaymentDetails {
    pub payment_date: NaiveDate,
    #[validate(custom(function = "validation::positive_money"))]
    pub amount: Decimal,
    #[validate(length(min = 1, max = 255, message = "Payee name must be 1-255 characters"))]
    pub payee_name: String,
}
