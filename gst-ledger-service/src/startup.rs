//! Application startup and lifecycle management.

use crate::config::LedgerConfig;
use crate::handlers::{businesses, clients, health, invoices, payments};
use crate::services::metrics::track_http_metrics;
use crate::services::{
    init_metrics, ClientDirectory, Database, InvoiceLedger, LedgerStore, PaymentLedger,
};
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::request_id_middleware;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState<S: LedgerStore> {
    pub store: S,
    pub invoices: InvoiceLedger<S>,
    pub payments: PaymentLedger<S>,
    pub directory: ClientDirectory<S>,
}

impl<S: LedgerStore> AppState<S> {
    pub fn new(store: S) -> Self {
        Self {
            invoices: InvoiceLedger::new(store.clone()),
            payments: PaymentLedger::new(store.clone()),
            directory: ClientDirectory::new(store.clone()),
            store,
        }
    }
}

/// All HTTP routes over the given store.
pub fn build_router<S: LedgerStore>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health::health_check::<S>))
        .route("/ready", get(health::readiness_check::<S>))
        .route("/metrics", get(health::metrics_handler))
        .route("/businesses", post(businesses::create_business::<S>))
        .route("/businesses/:business_id", get(businesses::get_business::<S>))
        .route(
            "/businesses/:business_id/clients",
            get(businesses::list_client_summaries::<S>),
        )
        .route(
            "/businesses/:business_id/clients/by-username/:username",
            get(businesses::find_client_by_username::<S>),
        )
        .route("/clients", post(clients::create_client::<S>))
        .route(
            "/clients/:client_id",
            get(clients::get_client::<S>).put(clients::update_client::<S>),
        )
        .route(
            "/clients/:client_id/totals/refresh",
            post(clients::refresh_totals::<S>),
        )
        .route(
            "/clients/:client_id/invoices",
            get(invoices::list_invoices::<S>).post(invoices::create_invoice::<S>),
        )
        .route(
            "/clients/:client_id/invoices/:invoice_id",
            get(invoices::get_invoice::<S>)
                .put(invoices::edit_invoice::<S>)
                .delete(invoices::delete_invoice::<S>),
        )
        .route(
            "/clients/:client_id/payments",
            get(payments::list_payments::<S>).post(payments::add_payment::<S>),
        )
        .route(
            "/clients/:client_id/payments/:payment_id",
            put(payments::update_payment::<S>).delete(payments::delete_payment::<S>),
        )
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(track_http_metrics))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    listener: TcpListener,
    state: AppState<Database>,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: LedgerConfig) -> Result<Self, AppError> {
        Self::build_internal(config, true).await
    }

    /// Build the application without running migrations.
    /// Use this in tests when migrations are already applied by the test harness.
    pub async fn build_without_migrations(config: LedgerConfig) -> Result<Self, AppError> {
        Self::build_internal(config, false).await
    }

    async fn build_internal(config: LedgerConfig, run_migrations: bool) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        if run_migrations {
            db.run_migrations().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to run migrations");
                e
            })?;
        }

        let http_addr = config.common.bind_addr();
        let listener = TcpListener::bind(http_addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %http_addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = listener.local_addr()?.port();

        tracing::info!(http_port = http_port, "GST ledger service listener bound");

        Ok(Self {
            http_port,
            listener,
            state: AppState::new(db),
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &Database {
        &self.state.store
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        tracing::info!(
            service = "gst-ledger-service",
            version = env!("CARGO_PKG_VERSION"),
            http_port = self.http_port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, router).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}
