//! Business onboarding and per-business client views.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{Business, Client, ClientSummary, CreateBusiness};
use crate::services::LedgerStore;
use crate::startup::AppState;

pub async fn create_business<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Json(payload): Json<CreateBusiness>,
) -> Result<(StatusCode, Json<Business>), AppError> {
    tracing::info!(name = %payload.name, state_code = %payload.state_code, "Creating business");

    let business = state.directory.create_business(&payload).await?;

    Ok((StatusCode::CREATED, Json(business)))
}

pub async fn get_business<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(business_id): Path<Uuid>,
) -> Result<Json<Business>, AppError> {
    let business = state.directory.get_business(business_id).await?;
    Ok(Json(business))
}

/// Every client of the business with totals, balance and latest activity.
pub async fn list_client_summaries<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(business_id): Path<Uuid>,
) -> Result<Json<Vec<ClientSummary>>, AppError> {
    let summaries = state.directory.list_client_summaries(business_id).await?;
    Ok(Json(summaries))
}

pub async fn find_client_by_username<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path((business_id, username)): Path<(Uuid, String)>,
) -> Result<Json<Client>, AppError> {
    let client = state
        .directory
        .find_client_by_username(business_id, &username)
        .await?;
    Ok(Json(client))
}
