//! Payment writes and the paid total they drive.

use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::ledger::Period;
use crate::models::{Payment, PaymentDetails};
use crate::services::client_directory::{client_not_found, recompute_paid_total};
use crate::services::metrics::{
    amount_as_f64, record_operation, PAYMENTS_TOTAL, PAYMENT_AMOUNT_TOTAL,
};
use crate::services::store::{LedgerStore, LedgerTx};

fn payment_not_found(payment_id: Uuid, client_id: Uuid) -> AppError {
    AppError::NotFound(anyhow::anyhow!(
        "Payment {} not found for client {}",
        payment_id,
        client_id
    ))
}

/// Records, corrects and removes payments, keeping `total_paid` equal to their sum.
#[derive(Clone)]
pub struct PaymentLedger<S: LedgerStore> {
    store: S,
}

impl<S: LedgerStore> PaymentLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(skip(self, details), fields(amount = %details.amount))]
    pub async fn add_payment(
        &self,
        client_id: Uuid,
        details: &PaymentDetails,
    ) -> Result<Payment, AppError> {
        details.validate()?;

        let result = async {
            let mut tx = self.store.begin().await?;
            let client = tx
                .lock_client(client_id)
                .await?
                .ok_or_else(|| client_not_found(client_id))?;

            let payment = tx
                .insert_payment(client.business_id, client_id, details)
                .await?;
            recompute_paid_total(&mut tx, &client).await?;
            tx.commit().await?;

            Ok::<_, AppError>(payment)
        }
        .await;

        record_operation("add_payment", &result);

        if let Ok(payment) = &result {
            PAYMENTS_TOTAL.with_label_values(&["added"]).inc();
            PAYMENT_AMOUNT_TOTAL
                .with_label_values(&["added"])
                .inc_by(amount_as_f64(payment.amount));
            info!(payment_id = %payment.payment_id, "Payment recorded");
        }

        result
    }

    #[instrument(skip(self, details), fields(amount = %details.amount))]
    pub async fn update_payment(
        &self,
        payment_id: Uuid,
        client_id: Uuid,
        details: &PaymentDetails,
    ) -> Result<Payment, AppError> {
        details.validate()?;

        let result = async {
            let mut tx = self.store.begin().await?;
            let client = tx
                .lock_client(client_id)
                .await?
                .ok_or_else(|| client_not_found(client_id))?;
            let previous = tx
                .get_payment(payment_id, client_id)
                .await?
                .ok_or_else(|| payment_not_found(payment_id, client_id))?;

            let payment = tx.update_payment(payment_id, details).await?;
            recompute_paid_total(&mut tx, &client).await?;
            tx.commit().await?;

            info!(
                payment_id = %payment_id,
                previous_amount = %previous.amount,
                amount = %payment.amount,
                "Payment updated"
            );
            Ok::<_, AppError>(payment)
        }
        .await;

        record_operation("update_payment", &result);
        if result.is_ok() {
            PAYMENTS_TOTAL.with_label_values(&["updated"]).inc();
        }

        result
    }

    #[instrument(skip(self))]
    pub async fn delete_payment(&self, payment_id: Uuid, client_id: Uuid) -> Result<(), AppError> {
        let result = async {
            let mut tx = self.store.begin().await?;
            let client = tx
                .lock_client(client_id)
                .await?
                .ok_or_else(|| client_not_found(client_id))?;
            let payment = tx
                .get_payment(payment_id, client_id)
                .await?
                .ok_or_else(|| payment_not_found(payment_id, client_id))?;

            tx.delete_payment(payment_id).await?;
            recompute_paid_total(&mut tx, &client).await?;
            tx.commit().await?;

            info!(payment_id = %payment_id, amount = %payment.amount, "Payment deleted");
            Ok::<_, AppError>(())
        }
        .await;

        record_operation("delete_payment", &result);
        if result.is_ok() {
            PAYMENTS_TOTAL.with_label_values(&["deleted"]).inc();
        }

        result
    }

    /// A client's payments in the period, latest payment date first.
    #[instrument(skip(self))]
    pub async fn list_payments_for_client(
        &self,
        client_id: Uuid,
        period: &Period,
    ) -> Result<Vec<Payment>, AppError> {
        let mut tx = self.store.begin().await?;
        tx.get_client(client_id)
            .await?
            .ok_or_else(|| client_not_found(client_id))?;
        let payments = tx.list_payments(client_id, period).await?;
        tx.commit().await?;
        Ok(payments)
    }
}
