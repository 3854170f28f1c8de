//! HTTP handlers for gst-ledger-service.

pub mod businesses;
pub mod clients;
pub mod health;
pub mod invoices;
pub mod payments;
