//! Client onboarding, profile maintenance and total re-verification.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{Client, ClientProfile, CreateClient, TotalsRefresh};
use crate::services::LedgerStore;
use crate::startup::AppState;

pub async fn create_client<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Json(payload): Json<CreateClient>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    tracing::info!(
        business_id = %payload.business_id,
        username = %payload.username,
        "Creating client"
    );

    let client = state.directory.create_client(&payload).await?;

    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn get_client<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Client>, AppError> {
    let client = state.directory.get_client(client_id).await?;
    Ok(Json(client))
}

pub async fn update_client<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(client_id): Path<Uuid>,
    Json(payload): Json<ClientProfile>,
) -> Result<Json<Client>, AppError> {
    let client = state
        .directory
        .update_client_profile(client_id, &payload)
        .await?;
    Ok(Json(client))
}

pub async fn refresh_totals<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<TotalsRefresh>, AppError> {
    let refresh = state.directory.refresh_client_totals(client_id).await?;
    Ok(Json(refresh))
}
