//! Services module for gst-ledger-service.

pub mod client_directory;
pub mod database;
pub mod invoice_ledger;
pub mod memory;
pub mod metrics;
pub mod payment_ledger;
pub mod store;

pub use client_directory::ClientDirectory;
pub use database::Database;
pub use invoice_ledger::InvoiceLedger;
pub use memory::MemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use payment_ledger::PaymentLedger;
pub use store::{LedgerStore, LedgerTx};
