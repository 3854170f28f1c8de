//! Payment endpoints, all scoped to one client.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{PaymentList, PeriodQuery};
use crate::models::{Payment, PaymentDetails};
use crate::services::LedgerStore;
use crate::startup::AppState;

pub async fn add_payment<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(client_id): Path<Uuid>,
    Json(details): Json<PaymentDetails>,
) -> Result<(StatusCode, Json<Payment>), AppError> {
    tracing::info!(
        client_id = %client_id,
        amount = %details.amount,
        payment_date = %details.payment_date,
        "Recording payment"
    );

    let payment = state.payments.add_payment(client_id, &details).await?;

    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn update_payment<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path((client_id, payment_id)): Path<(Uuid, Uuid)>,
    Json(details): Json<PaymentDetails>,
) -> Result<Json<Payment>, AppError> {
    let payment = state
        .payments
        .update_payment(payment_id, client_id, &details)
        .await?;
    Ok(Json(payment))
}

pub async fn delete_payment<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path((client_id, payment_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    state.payments.delete_payment(payment_id, client_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_payments<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(client_id): Path<Uuid>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<PaymentList>, AppError> {
    let period = query.to_period()?;
    let payments = state
        .payments
        .list_payments_for_client(client_id, &period)
        .await?;

    Ok(Json(PaymentList {
        count: payments.len(),
        payments,
    }))
}
