//! Domain models for gst-ledger-service.

mod business;
mod client;
mod invoice;
mod payment;
pub mod validation;

pub use business::{Business, CreateBusiness};
pub use client::{Client, ClientProfile, ClientSummary, CreateClient, TotalsRefresh};
pub use invoice::{
    Invoice, InvoiceDraft, InvoiceFigures, InvoiceItem, InvoiceRevision, InvoiceWithItems,
    ItemInput, ListInvoicesFilter, NewInvoice,
};
pub use payment::{Payment, PaymentDetails};
