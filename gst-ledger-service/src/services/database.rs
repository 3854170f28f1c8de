//! PostgreSQL ledger store.

use async_trait::async_trait;
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::ledger::Period;
use crate::models::{
    Business, Client, ClientProfile, ClientSummary, CreateBusiness, CreateClient, Invoice,
    InvoiceItem, InvoiceRevision, ListInvoicesFilter, NewInvoice, Payment, PaymentDetails,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{LedgerStore, LedgerTx};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "gst-ledger-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for Database {
    type Tx = DatabaseTx;

    async fn begin(&self) -> Result<DatabaseTx, AppError> {
        let tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;
        Ok(DatabaseTx { tx })
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }
}

/// An open PostgreSQL transaction. Rolled back when dropped uncommitted.
pub struct DatabaseTx {
    tx: Transaction<'static, Postgres>,
}

fn db_error(action: &str, e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::RowNotFound => {
            AppError::NotFound(anyhow::anyhow!("Failed to {}: row not found", action))
        }
        _ => AppError::DatabaseError(anyhow::anyhow!("Failed to {}: {}", action, e)),
    }
}

#[async_trait]
impl LedgerTx for DatabaseTx {
    async fn commit(self) -> Result<(), AppError> {
        self.tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })
    }

    // -------------------------------------------------------------------------
    // Business Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn insert_business(&mut self, input: &CreateBusiness) -> Result<Business, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_business"])
            .start_timer();

        let business = sqlx::query_as::<_, Business>(
            r#"
            INSERT INTO businesses (business_id, name, gstin, address, phone, state, state_code, account_number, ifsc_code, bank_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING business_id, name, gstin, address, phone, state, state_code, account_number, ifsc_code, bank_name, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.gstin)
        .bind(&input.address)
        .bind(&input.phone)
        .bind(&input.state)
        .bind(&input.state_code)
        .bind(&input.account_number)
        .bind(&input.ifsc_code)
        .bind(&input.bank_name)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "A business with GSTIN '{}' already exists",
                    input.gstin.as_deref().unwrap_or_default()
                ))
            }
            _ => db_error("create business", e),
        })?;

        timer.observe_duration();

        info!(business_id = %business.business_id, "Business created");

        Ok(business)
    }

    #[instrument(skip(self))]
    async fn get_business(&mut self, business_id: Uuid) -> Result<Option<Business>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_business"])
            .start_timer();

        let business = sqlx::query_as::<_, Business>(
            r#"
            SELECT business_id, name, gstin, address, phone, state, state_code, account_number, ifsc_code, bank_name, created_utc
            FROM businesses
            WHERE business_id = $1
            "#,
        )
        .bind(business_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("get business", e))?;

        timer.observe_duration();

        Ok(business)
    }

    #[instrument(skip(self))]
    async fn lock_business(&mut self, business_id: Uuid) -> Result<Option<Business>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["lock_business"])
            .start_timer();

        let business = sqlx::query_as::<_, Business>(
            r#"
            SELECT business_id, name, gstin, address, phone, state, state_code, account_number, ifsc_code, bank_name, created_utc
            FROM businesses
            WHERE business_id = $1
            FOR NO KEY UPDATE
            "#,
        )
        .bind(business_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("lock business", e))?;

        timer.observe_duration();

        Ok(business)
    }

    // -------------------------------------------------------------------------
    // Client Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(business_id = %input.business_id, username = %input.username))]
    async fn insert_client(&mut self, input: &CreateClient) -> Result<Client, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_client"])
            .start_timer();

        let profile = &input.profile;
        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (client_id, business_id, username, name, email, address, phone, state, state_code, gstin, account_number, ifsc_code, bank_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING client_id, business_id, username, name, email, address, phone, state, state_code, gstin,
                      account_number, ifsc_code, bank_name, total_billed, total_paid, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.business_id)
        .bind(&input.username)
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(&profile.address)
        .bind(&profile.phone)
        .bind(&profile.state)
        .bind(&profile.state_code)
        .bind(&profile.gstin)
        .bind(&profile.account_number)
        .bind(&profile.ifsc_code)
        .bind(&profile.bank_name)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Username '{}' is already taken",
                    input.username
                ))
            }
            _ => db_error("create client", e),
        })?;

        timer.observe_duration();

        info!(client_id = %client.client_id, "Client created");

        Ok(client)
    }

    #[instrument(skip(self))]
    async fn get_client(&mut self, client_id: Uuid) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT client_id, business_id, username, name, email, address, phone, state, state_code, gstin,
                   account_number, ifsc_code, bank_name, total_billed, total_paid, created_utc, updated_utc
            FROM clients
            WHERE client_id = $1
            "#,
        )
        .bind(client_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("get client", e))?;

        timer.observe_duration();

        Ok(client)
    }

    #[instrument(skip(self))]
    async fn lock_client(&mut self, client_id: Uuid) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["lock_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT client_id, business_id, username, name, email, address, phone, state, state_code, gstin,
                   account_number, ifsc_code, bank_name, total_billed, total_paid, created_utc, updated_utc
            FROM clients
            WHERE client_id = $1
            FOR NO KEY UPDATE
            "#,
        )
        .bind(client_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("lock client", e))?;

        timer.observe_duration();

        Ok(client)
    }

    #[instrument(skip(self))]
    async fn find_client_by_username(
        &mut self,
        business_id: Uuid,
        username: &str,
    ) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_client_by_username"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT client_id, business_id, username, name, email, address, phone, state, state_code, gstin,
                   account_number, ifsc_code, bank_name, total_billed, total_paid, created_utc, updated_utc
            FROM clients
            WHERE business_id = $1 AND username = $2
            "#,
        )
        .bind(business_id)
        .bind(username)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("find client", e))?;

        timer.observe_duration();

        Ok(client)
    }

    #[instrument(skip(self, profile))]
    async fn update_client_profile(
        &mut self,
        client_id: Uuid,
        profile: &ClientProfile,
    ) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_client_profile"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients
            SET name = $2, email = $3, address = $4, phone = $5, state = $6, state_code = $7,
                gstin = $8, account_number = $9, ifsc_code = $10, bank_name = $11, updated_utc = NOW()
            WHERE client_id = $1
            RETURNING client_id, business_id, username, name, email, address, phone, state, state_code, gstin,
                      account_number, ifsc_code, bank_name, total_billed, total_paid, created_utc, updated_utc
            "#,
        )
        .bind(client_id)
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(&profile.address)
        .bind(&profile.phone)
        .bind(&profile.state)
        .bind(&profile.state_code)
        .bind(&profile.gstin)
        .bind(&profile.account_number)
        .bind(&profile.ifsc_code)
        .bind(&profile.bank_name)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("update client", e))?;

        timer.observe_duration();

        Ok(client)
    }

    #[instrument(skip(self))]
    async fn list_client_summaries(
        &mut self,
        business_id: Uuid,
    ) -> Result<Vec<ClientSummary>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_client_summaries"])
            .start_timer();

        let summaries = sqlx::query_as::<_, ClientSummary>(
            r#"
            SELECT c.client_id, c.username, c.name, c.total_billed, c.total_paid,
                   c.total_billed - c.total_paid AS outstanding_balance,
                   li.invoice_number AS last_invoice_number,
                   li.total_after_tax AS last_invoice_amount,
                   li.invoice_date AS last_invoice_date,
                   lp.amount AS last_payment_amount,
                   lp.payment_date AS last_payment_date
            FROM clients c
            LEFT JOIN LATERAL (
                SELECT invoice_number, total_after_tax, invoice_date
                FROM invoices i
                WHERE i.client_id = c.client_id
                ORDER BY i.invoice_date DESC, i.created_utc DESC
                LIMIT 1
            ) li ON TRUE
            LEFT JOIN LATERAL (
                SELECT amount, payment_date
                FROM payments p
                WHERE p.client_id = c.client_id
                ORDER BY p.payment_date DESC, p.created_utc DESC
                LIMIT 1
            ) lp ON TRUE
            WHERE c.business_id = $1
            ORDER BY c.name, c.username
            "#,
        )
        .bind(business_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| db_error("list client summaries", e))?;

        timer.observe_duration();

        Ok(summaries)
    }

    #[instrument(skip(self))]
    async fn set_billed_total(&mut self, client_id: Uuid, total: Decimal) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["set_billed_total"])
            .start_timer();

        sqlx::query("UPDATE clients SET total_billed = $2, updated_utc = NOW() WHERE client_id = $1")
            .bind(client_id)
            .bind(total)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("update billed total", e))?;

        timer.observe_duration();

        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_paid_total(&mut self, client_id: Uuid, total: Decimal) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["set_paid_total"])
            .start_timer();

        sqlx::query("UPDATE clients SET total_paid = $2, updated_utc = NOW() WHERE client_id = $1")
            .bind(client_id)
            .bind(total)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("update paid total", e))?;

        timer.observe_duration();

        Ok(())
    }

    #[instrument(skip(self))]
    async fn sum_invoice_totals(&mut self, client_id: Uuid) -> Result<Decimal, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["sum_invoice_totals"])
            .start_timer();

        let total = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(total_after_tax), 0) FROM invoices WHERE client_id = $1",
        )
        .bind(client_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| db_error("sum invoice totals", e))?;

        timer.observe_duration();

        Ok(total)
    }

    #[instrument(skip(self))]
    async fn sum_payment_amounts(&mut self, client_id: Uuid) -> Result<Decimal, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["sum_payment_amounts"])
            .start_timer();

        let total = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE client_id = $1",
        )
        .bind(client_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| db_error("sum payment amounts", e))?;

        timer.observe_duration();

        Ok(total)
    }

    // -------------------------------------------------------------------------
    // Invoice Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn last_invoice_number(
        &mut self,
        business_id: Uuid,
    ) -> Result<Option<String>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["last_invoice_number"])
            .start_timer();

        let number = sqlx::query_scalar::<_, String>(
            r#"
            SELECT invoice_number
            FROM invoices
            WHERE business_id = $1
            ORDER BY created_utc DESC
            LIMIT 1
            "#,
        )
        .bind(business_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("read last invoice number", e))?;

        timer.observe_duration();

        Ok(number)
    }

    #[instrument(skip(self, invoice), fields(invoice_number = %invoice.invoice_number))]
    async fn insert_invoice(&mut self, invoice: &NewInvoice) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_invoice"])
            .start_timer();

        let revision = &invoice.revision;
        let figures = &revision.figures;
        let inserted = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (invoice_id, business_id, client_id, invoice_number, invoice_date, shipping_charges,
                                  cgst, sgst, igst, total_before_tax, total_after_tax, amount_in_words)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING invoice_id, business_id, client_id, invoice_number, invoice_date, shipping_charges,
                      cgst, sgst, igst, total_before_tax, total_after_tax, amount_in_words, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(invoice.business_id)
        .bind(invoice.client_id)
        .bind(&invoice.invoice_number)
        .bind(revision.invoice_date)
        .bind(revision.shipping_charges)
        .bind(figures.cgst)
        .bind(figures.sgst)
        .bind(figures.igst)
        .bind(figures.total_before_tax)
        .bind(figures.total_after_tax)
        .bind(&figures.amount_in_words)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Invoice number '{}' already exists",
                    invoice.invoice_number
                ))
            }
            _ => db_error("create invoice", e),
        })?;

        timer.observe_duration();

        Ok(inserted)
    }

    #[instrument(skip(self))]
    async fn get_invoice(
        &mut self,
        invoice_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT invoice_id, business_id, client_id, invoice_number, invoice_date, shipping_charges,
                   cgst, sgst, igst, total_before_tax, total_after_tax, amount_in_words, created_utc, updated_utc
            FROM invoices
            WHERE invoice_id = $1 AND client_id = $2
            "#,
        )
        .bind(invoice_id)
        .bind(client_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("get invoice", e))?;

        timer.observe_duration();

        Ok(invoice)
    }

    #[instrument(skip(self, revision))]
    async fn update_invoice(
        &mut self,
        invoice_id: Uuid,
        revision: &InvoiceRevision,
    ) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_invoice"])
            .start_timer();

        let figures = &revision.figures;
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET invoice_date = $2, shipping_charges = $3, cgst = $4, sgst = $5, igst = $6,
                total_before_tax = $7, total_after_tax = $8, amount_in_words = $9, updated_utc = NOW()
            WHERE invoice_id = $1
            RETURNING invoice_id, business_id, client_id, invoice_number, invoice_date, shipping_charges,
                      cgst, sgst, igst, total_before_tax, total_after_tax, amount_in_words, created_utc, updated_utc
            "#,
        )
        .bind(invoice_id)
        .bind(revision.invoice_date)
        .bind(revision.shipping_charges)
        .bind(figures.cgst)
        .bind(figures.sgst)
        .bind(figures.igst)
        .bind(figures.total_before_tax)
        .bind(figures.total_after_tax)
        .bind(&figures.amount_in_words)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| db_error("update invoice", e))?;

        timer.observe_duration();

        Ok(invoice)
    }

    #[instrument(skip(self))]
    async fn delete_invoice(&mut self, invoice_id: Uuid) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_invoice"])
            .start_timer();

        sqlx::query("DELETE FROM invoices WHERE invoice_id = $1")
            .bind(invoice_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("delete invoice", e))?;

        timer.observe_duration();

        Ok(())
    }

    #[instrument(skip(self, filter), fields(page = filter.page, page_size = filter.page_size))]
    async fn list_invoices(
        &mut self,
        client_id: Uuid,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let (start_date, end_date) = filter.period.bounds();
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT invoice_id, business_id, client_id, invoice_number, invoice_date, shipping_charges,
                   cgst, sgst, igst, total_before_tax, total_after_tax, amount_in_words, created_utc, updated_utc
            FROM invoices
            WHERE client_id = $1
              AND ($2::date IS NULL OR invoice_date >= $2)
              AND ($3::date IS NULL OR invoice_date <= $3)
            ORDER BY CAST(SPLIT_PART(invoice_number, '/', 1) AS BIGINT) DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(client_id)
        .bind(start_date)
        .bind(end_date)
        .bind(i64::from(filter.page_size))
        .bind(filter.offset())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| db_error("list invoices", e))?;

        timer.observe_duration();

        Ok(invoices)
    }

    #[instrument(skip(self, invoice_ids), fields(invoice_count = invoice_ids.len()))]
    async fn list_items(&mut self, invoice_ids: &[Uuid]) -> Result<Vec<InvoiceItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_items"])
            .start_timer();

        let items = sqlx::query_as::<_, InvoiceItem>(
            r#"
            SELECT item_id, invoice_id, description, hsn_code, rate, quantity, net_amount, position
            FROM invoice_items
            WHERE invoice_id = ANY($1)
            ORDER BY invoice_id, position
            "#,
        )
        .bind(invoice_ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| db_error("list invoice items", e))?;

        timer.observe_duration();

        Ok(items)
    }

    #[instrument(skip(self, item), fields(item_id = %item.item_id, position = item.position))]
    async fn insert_item(&mut self, item: &InvoiceItem) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_item"])
            .start_timer();

        sqlx::query(
            r#"
            INSERT INTO invoice_items (item_id, invoice_id, description, hsn_code, rate, quantity, net_amount, position)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(item.item_id)
        .bind(item.invoice_id)
        .bind(&item.description)
        .bind(&item.hsn_code)
        .bind(item.rate)
        .bind(item.quantity)
        .bind(item.net_amount)
        .bind(item.position)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("insert invoice item", e))?;

        timer.observe_duration();

        Ok(())
    }

    #[instrument(skip(self, item), fields(item_id = %item.item_id, position = item.position))]
    async fn update_item(&mut self, item: &InvoiceItem) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_item"])
            .start_timer();

        sqlx::query(
            r#"
            UPDATE invoice_items
            SET description = $3, hsn_code = $4, rate = $5, quantity = $6, net_amount = $7, position = $8
            WHERE item_id = $1 AND invoice_id = $2
            "#,
        )
        .bind(item.item_id)
        .bind(item.invoice_id)
        .bind(&item.description)
        .bind(&item.hsn_code)
        .bind(item.rate)
        .bind(item.quantity)
        .bind(item.net_amount)
        .bind(item.position)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("update invoice item", e))?;

        timer.observe_duration();

        Ok(())
    }

    #[instrument(skip(self, item_ids), fields(count = item_ids.len()))]
    async fn delete_items(&mut self, invoice_id: Uuid, item_ids: &[Uuid]) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_items"])
            .start_timer();

        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = $1 AND item_id = ANY($2)")
            .bind(invoice_id)
            .bind(item_ids)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("delete invoice items", e))?;

        timer.observe_duration();

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Payment Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, details))]
    async fn insert_payment(
        &mut self,
        business_id: Uuid,
        client_id: Uuid,
        details: &PaymentDetails,
    ) -> Result<Payment, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_payment"])
            .start_timer();

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (payment_id, business_id, client_id, payment_date, amount, payee_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING payment_id, business_id, client_id, payment_date, amount, payee_name, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(business_id)
        .bind(client_id)
        .bind(details.payment_date)
        .bind(details.amount)
        .bind(&details.payee_name)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| db_error("create payment", e))?;

        timer.observe_duration();

        Ok(payment)
    }

    #[instrument(skip(self))]
    async fn get_payment(
        &mut self,
        payment_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_payment"])
            .start_timer();

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT payment_id, business_id, client_id, payment_date, amount, payee_name, created_utc, updated_utc
            FROM payments
            WHERE payment_id = $1 AND client_id = $2
            "#,
        )
        .bind(payment_id)
        .bind(client_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("get payment", e))?;

        timer.observe_duration();

        Ok(payment)
    }

    #[instrument(skip(self, details))]
    async fn update_payment(
        &mut self,
        payment_id: Uuid,
        details: &PaymentDetails,
    ) -> Result<Payment, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_payment"])
            .start_timer();

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET payment_date = $2, amount = $3, payee_name = $4, updated_utc = NOW()
            WHERE payment_id = $1
            RETURNING payment_id, business_id, client_id, payment_date, amount, payee_name, created_utc, updated_utc
            "#,
        )
        .bind(payment_id)
        .bind(details.payment_date)
        .bind(details.amount)
        .bind(&details.payee_name)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| db_error("update payment", e))?;

        timer.observe_duration();

        Ok(payment)
    }

    #[instrument(skip(self))]
    async fn delete_payment(&mut self, payment_id: Uuid) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_payment"])
            .start_timer();

        sqlx::query("DELETE FROM payments WHERE payment_id = $1")
            .bind(payment_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("delete payment", e))?;

        timer.observe_duration();

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_payments(
        &mut self,
        client_id: Uuid,
        period: &Period,
    ) -> Result<Vec<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_payments"])
            .start_timer();

        let (start_date, end_date) = period.bounds();
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT payment_id, business_id, client_id, payment_date, amount, payee_name, created_utc, updated_utc
            FROM payments
            WHERE client_id = $1
              AND ($2::date IS NULL OR payment_date >= $2)
              AND ($3::date IS NULL OR payment_date <= $3)
            ORDER BY payment_date DESC, created_utc DESC
            "#,
        )
        .bind(client_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| db_error("list payments", e))?;

        timer.observe_duration();

        Ok(payments)
    }
}
