//! Businesses, clients and the running totals kept on each client.

use rust_decimal::Decimal;
use service_core::error::AppError;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    Business, Client, ClientProfile, ClientSummary, CreateBusiness, CreateClient, TotalsRefresh,
};
use crate::services::metrics::record_operation;
use crate::services::store::{LedgerStore, LedgerTx};

pub(crate) fn client_not_found(client_id: Uuid) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Client {} not found", client_id))
}

pub(crate) fn business_not_found(business_id: Uuid) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Business {} not found", business_id))
}

/// Rewrite `total_billed` from the client's invoices. The client row must already
/// be locked by `tx`.
pub(crate) async fn recompute_billed_total<T: LedgerTx>(
    tx: &mut T,
    client: &Client,
) -> Result<Decimal, AppError> {
    let total = tx.sum_invoice_totals(client.client_id).await?;
    tx.set_billed_total(client.client_id, total).await?;

    info!(
        client_id = %client.client_id,
        before = %client.total_billed,
        after = %total,
        "Billed total recomputed"
    );

    Ok(total)
}

/// Rewrite `total_paid` from the client's payments. The client row must already
/// be locked by `tx`.
pub(crate) async fn recompute_paid_total<T: LedgerTx>(
    tx: &mut T,
    client: &Client,
) -> Result<Decimal, AppError> {
    let total = tx.sum_payment_amounts(client.client_id).await?;
    tx.set_paid_total(client.client_id, total).await?;

    info!(
        client_id = %client.client_id,
        before = %client.total_paid,
        after = %total,
        "Paid total recomputed"
    );

    Ok(total)
}

/// Onboarding and lookup of businesses and clients.
#[derive(Clone)]
pub struct ClientDirectory<S: LedgerStore> {
    store: S,
}

impl<S: LedgerStore> ClientDirectory<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_business(&self, input: &CreateBusiness) -> Result<Business, AppError> {
        input.validate()?;

        let mut tx = self.store.begin().await?;
        let result = tx.insert_business(input).await;
        record_operation("create_business", &result);
        let business = result?;
        tx.commit().await?;

        Ok(business)
    }

    #[instrument(skip(self))]
    pub async fn get_business(&self, business_id: Uuid) -> Result<Business, AppError> {
        let mut tx = self.store.begin().await?;
        let business = tx
            .get_business(business_id)
            .await?
            .ok_or_else(|| business_not_found(business_id))?;
        tx.commit().await?;
        Ok(business)
    }

    /// Register a client under an existing business. Totals start at zero.
    #[instrument(skip(self, input), fields(business_id = %input.business_id, username = %input.username))]
    pub async fn create_client(&self, input: &CreateClient) -> Result<Client, AppError> {
        input.validate()?;

        let result = async {
            let mut tx = self.store.begin().await?;
            tx.get_business(input.business_id)
                .await?
                .ok_or_else(|| business_not_found(input.business_id))?;
            let client = tx.insert_client(input).await?;
            tx.commit().await?;
            Ok::<_, AppError>(client)
        }
        .await;

        record_operation("create_client", &result);
        result
    }

    #[instrument(skip(self))]
    pub async fn get_client(&self, client_id: Uuid) -> Result<Client, AppError> {
        let mut tx = self.store.begin().await?;
        let client = tx
            .get_client(client_id)
            .await?
            .ok_or_else(|| client_not_found(client_id))?;
        tx.commit().await?;
        Ok(client)
    }

    #[instrument(skip(self))]
    pub async fn find_client_by_username(
        &self,
        business_id: Uuid,
        username: &str,
    ) -> Result<Client, AppError> {
        let mut tx = self.store.begin().await?;
        let client = tx
            .find_client_by_username(business_id, username)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!(
                    "No client '{}' in business {}",
                    username,
                    business_id
                ))
            })?;
        tx.commit().await?;
        Ok(client)
    }

    /// Replace the editable profile fields. Totals are left as they are.
    #[instrument(skip(self, profile))]
    pub async fn update_client_profile(
        &self,
        client_id: Uuid,
        profile: &ClientProfile,
    ) -> Result<Client, AppError> {
        profile.validate()?;

        let result = async {
            let mut tx = self.store.begin().await?;
            let client = tx
                .update_client_profile(client_id, profile)
                .await?
                .ok_or_else(|| client_not_found(client_id))?;
            tx.commit().await?;
            Ok::<_, AppError>(client)
        }
        .await;

        record_operation("update_client_profile", &result);
        result
    }

    #[instrument(skip(self))]
    pub async fn list_client_summaries(
        &self,
        business_id: Uuid,
    ) -> Result<Vec<ClientSummary>, AppError> {
        let mut tx = self.store.begin().await?;
        tx.get_business(business_id)
            .await?
            .ok_or_else(|| business_not_found(business_id))?;
        let summaries = tx.list_client_summaries(business_id).await?;
        tx.commit().await?;
        Ok(summaries)
    }

    /// Recompute both totals from the underlying rows and report what changed.
    #[instrument(skip(self))]
    pub async fn refresh_client_totals(&self, client_id: Uuid) -> Result<TotalsRefresh, AppError> {
        let result = async {
            let mut tx = self.store.begin().await?;
            let client = tx
                .lock_client(client_id)
                .await?
                .ok_or_else(|| client_not_found(client_id))?;

            let billed_after = recompute_billed_total(&mut tx, &client).await?;
            let paid_after = recompute_paid_total(&mut tx, &client).await?;
            tx.commit().await?;

            Ok::<_, AppError>(TotalsRefresh {
                client_id,
                billed_before: client.total_billed,
                billed_after,
                paid_before: client.total_paid,
                paid_after,
            })
        }
        .await;

        record_operation("refresh_client_totals", &result);

        if let Ok(refresh) = &result {
            if refresh.was_drifted() {
                warn!(
                    client_id = %client_id,
                    billed_before = %refresh.billed_before,
                    billed_after = %refresh.billed_after,
                    paid_before = %refresh.paid_before,
                    paid_after = %refresh.paid_after,
                    "Client totals had drifted and were corrected"
                );
            }
        }

        result
    }
}
