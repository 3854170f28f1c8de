//! Common test utilities for gst-ledger-service integration tests.
#![allow(dead_code)]

use chrono::NaiveDate;
use gst_ledger_service::models::{
    Business, Client, ClientProfile, CreateBusiness, CreateClient, InvoiceDraft, ItemInput,
    PaymentDetails,
};
use gst_ledger_service::services::MemoryStore;
use gst_ledger_service::AppState;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Once;
use uuid::Uuid;

static INIT: Once = Once::new();

/// Tamil Nadu, the issuing business's state in every test.
pub const HOME_STATE_CODE: &str = "33";
/// Karnataka, for inter-state clients.
pub const OTHER_STATE_CODE: &str = "29";

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,gst_ledger_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Fresh services over an empty in-memory store.
pub fn spawn_ledger() -> AppState<MemoryStore> {
    init_tracing();
    AppState::new(MemoryStore::new())
}

pub fn d(value: &str) -> Decimal {
    Decimal::from_str(value).expect("Invalid decimal literal")
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("Invalid date")
}

pub async fn create_test_business(state: &AppState<MemoryStore>) -> Business {
    state
        .directory
        .create_business(&CreateBusiness {
            name: "Sahay Traders".to_string(),
            gstin: None,
            address: Some("12 Mount Road, Chennai".to_string()),
            phone: None,
            state: "Tamil Nadu".to_string(),
            state_code: HOME_STATE_CODE.to_string(),
            account_number: None,
            ifsc_code: None,
            bank_name: None,
        })
        .await
        .expect("Failed to create business")
}

pub fn profile(name: &str, state_code: &str) -> ClientProfile {
    ClientProfile {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        address: None,
        phone: None,
        state: if state_code == HOME_STATE_CODE {
            "Tamil Nadu".to_string()
        } else {
            "Karnataka".to_string()
        },
        state_code: state_code.to_string(),
        gstin: None,
        account_number: None,
        ifsc_code: None,
        bank_name: None,
    }
}

pub async fn create_test_client(
    state: &AppState<MemoryStore>,
    business_id: Uuid,
    username: &str,
    state_code: &str,
) -> Client {
    state
        .directory
        .create_client(&CreateClient {
            business_id,
            username: username.to_string(),
            profile: profile(&format!("Client {}", username), state_code),
        })
        .await
        .expect("Failed to create client")
}

pub fn item(description: &str, rate: &str, quantity: i32) -> ItemInput {
    ItemInput {
        item_id: None,
        description: description.to_string(),
        hsn_code: "8471".to_string(),
        rate: d(rate),
        quantity,
    }
}

pub fn existing_item(item_id: Uuid, description: &str, rate: &str, quantity: i32) -> ItemInput {
    ItemInput {
        item_id: Some(item_id),
        ..item(description, rate, quantity)
    }
}

pub fn draft(invoice_date: NaiveDate, items: Vec<ItemInput>) -> InvoiceDraft {
    InvoiceDraft {
        invoice_date,
        shipping_charges: Decimal::ZERO,
        items,
    }
}

/// Two items worth 250 before tax, 295 after tax either way.
pub fn standard_draft(invoice_date: NaiveDate) -> InvoiceDraft {
    draft(
        invoice_date,
        vec![item("Keyboard", "100", 2), item("Mouse", "50", 1)],
    )
}

pub fn payment(payment_date: NaiveDate, amount: &str) -> PaymentDetails {
    PaymentDetails {
        payment_date,
        amount: d(amount),
        payee_name: "Accounts Desk".to_string(),
    }
}

/// Stored client row, for checking totals.
pub async fn reload_client(state: &AppState<MemoryStore>, client_id: Uuid) -> Client {
    state
        .directory
        .get_client(client_id)
        .await
        .expect("Failed to reload client")
}
