//! Issuing business model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::validation;

/// The entity that issues invoices. Its state code decides the GST regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Business {
    pub business_id: Uuid,
    pub name: String,
    pub gstin: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub state: String,
    pub state_code: String,
    pub account_number: Option<String>,
    pub ifsc_code: Option<String>,
    pub bank_name: Option<String>,
    pub created_utc: DateTime<Utc>,
}

/// Input for onboarding a business.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBusiness {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    #[validate(custom(function = "validation::gstin"))]
    pub gstin: Option<String>,
    #[validate(length(max = 255, message = "Address must not exceed 255 characters"))]
    pub address: Option<String>,
    #[validate(length(min = 10, max = 20, message = "Phone must be 10-20 characters"))]
    pub phone: Option<String>,
    #[validate(length(min = 2, max = 100, message = "State must be 2-100 characters"))]
    pub state: String,
    #[validate(length(min = 1, max = 5, message = "State code must be 1-5 characters"))]
    pub state_code: String,
    #[validate(length(min = 6, max = 20, message = "Account number must be 6-20 characters"))]
    pub account_number: Option<String>,
    #[validate(length(min = 2, max = 11, message = "IFSC code must be 2-11 characters"))]
    pub ifsc_code: Option<String>,
    #[validate(length(max = 50, message = "Bank name must not exceed 50 characters"))]
    pub bank_name: Option<String>,
}
