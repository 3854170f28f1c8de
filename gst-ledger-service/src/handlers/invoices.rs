//! Invoice endpoints, all scoped to one client.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{InvoicePage, ListInvoicesQuery};
use crate::models::{InvoiceDraft, InvoiceWithItems};
use crate::services::LedgerStore;
use crate::startup::AppState;

pub async fn create_invoice<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(client_id): Path<Uuid>,
    Json(draft): Json<InvoiceDraft>,
) -> Result<(StatusCode, Json<InvoiceWithItems>), AppError> {
    tracing::info!(
        client_id = %client_id,
        invoice_date = %draft.invoice_date,
        items = draft.items.len(),
        "Creating invoice"
    );

    let invoice = state.invoices.create_invoice(client_id, &draft).await?;

    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn get_invoice<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path((client_id, invoice_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<InvoiceWithItems>, AppError> {
    let invoice = state.invoices.get_invoice(invoice_id, client_id).await?;
    Ok(Json(invoice))
}

pub async fn edit_invoice<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path((client_id, invoice_id)): Path<(Uuid, Uuid)>,
    Json(draft): Json<InvoiceDraft>,
) -> Result<Json<InvoiceWithItems>, AppError> {
    tracing::info!(
        client_id = %client_id,
        invoice_id = %invoice_id,
        items = draft.items.len(),
        "Editing invoice"
    );

    let invoice = state
        .invoices
        .edit_invoice(invoice_id, client_id, &draft)
        .await?;
    Ok(Json(invoice))
}

pub async fn delete_invoice<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path((client_id, invoice_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    state.invoices.delete_invoice(invoice_id, client_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_invoices<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(client_id): Path<Uuid>,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<InvoicePage>, AppError> {
    let filter = query.to_filter()?;
    let invoices = state
        .invoices
        .list_invoices_for_client(client_id, &filter)
        .await?;

    Ok(Json(InvoicePage {
        page: filter.page,
        page_size: filter.page_size,
        invoices,
    }))
}
