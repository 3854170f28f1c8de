//! Prometheus metrics for gst-ledger-service.

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::time::Instant;

/// HTTP request counter by method, route and status.
pub static HTTP_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gst_ledger_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .expect("Failed to register http_requests_total")
});

/// HTTP request duration histogram by method and route.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "gst_ledger_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register http_request_duration")
});

/// Ledger operation counter by operation and outcome.
pub static LEDGER_OPERATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gst_ledger_operations_total",
        "Total number of ledger operations by outcome",
        &["operation", "status"]
    )
    .expect("Failed to register ledger_operations_total")
});

/// Invoice counter by tax regime.
pub static INVOICES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gst_ledger_invoices_total",
        "Total number of invoices written by tax regime",
        &["regime", "action"]
    )
    .expect("Failed to register invoices_total")
});

/// Payment counter by action.
pub static PAYMENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gst_ledger_payments_total",
        "Total number of payment writes by action",
        &["action"] // added, updated, deleted
    )
    .expect("Failed to register payments_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "gst_ledger_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Invoiced amount counter.
pub static INVOICE_AMOUNT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gst_ledger_invoice_amount_total",
        "Total amount invoiced after tax",
        &["regime"]
    )
    .expect("Failed to register invoice_amount_total")
});

/// Received amount counter.
pub static PAYMENT_AMOUNT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gst_ledger_payment_amount_total",
        "Total amount received in payments",
        &["action"]
    )
    .expect("Failed to register payment_amount_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gst_ledger_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&HTTP_REQUESTS_TOTAL);
    Lazy::force(&HTTP_REQUEST_DURATION);
    Lazy::force(&LEDGER_OPERATIONS_TOTAL);
    Lazy::force(&INVOICES_TOTAL);
    Lazy::force(&PAYMENTS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&INVOICE_AMOUNT_TOTAL);
    Lazy::force(&PAYMENT_AMOUNT_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}

/// Count a finished ledger operation, and its error kind when it failed.
pub fn record_operation<T>(operation: &str, result: &Result<T, AppError>) {
    match result {
        Ok(_) => LEDGER_OPERATIONS_TOTAL
            .with_label_values(&[operation, "success"])
            .inc(),
        Err(e) => {
            LEDGER_OPERATIONS_TOTAL
                .with_label_values(&[operation, "error"])
                .inc();
            ERRORS_TOTAL.with_label_values(&[e.kind()]).inc();
        }
    }
}

pub fn amount_as_f64(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or_default()
}

/// Records request count and latency per matched route.
pub async fn track_http_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path])
        .observe(start.elapsed().as_secs_f64());

    response
}
