//! GST invoice and payment ledger.
//!
//! Invoices are numbered per issuing business, taxed as intra-state (CGST + SGST)
//! or inter-state (IGST), and written atomically with their line items. Every
//! invoice and payment write re-derives the client's billed and paid totals
//! inside the same transaction.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod services;
pub mod startup;

pub use startup::{build_router, AppState};
