//! Metrics collection for the question service
//!
//! Prometheus metrics registered in the default registry and exposed on `/metrics`.

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge_vec, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec,
};

lazy_static! {
    // HTTP Request Metrics

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "qa_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .expect("Failed to register HTTP_REQUESTS_TOTAL");

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "qa_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");

    /// In-flight HTTP requests
    pub static ref HTTP_REQUESTS_IN_FLIGHT: IntGaugeVec = register_int_gauge_vec!(
        "qa_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
        &["method", "path"]
    )
    .expect("Failed to register HTTP_REQUESTS_IN_FLIGHT");

    // Domain Metrics

    /// Question operations by outcome
    pub static ref QUESTION_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "qa_question_operations_total",
        "Total number of question operations",
        &["operation", "status"]
    )
    .expect("Failed to register QUESTION_OPERATIONS_TOTAL");

    /// Views counted by successful reads
    pub static ref QUESTION_VIEWS_TOTAL: IntCounter = register_int_counter!(
        "qa_question_views_total",
        "Total number of question views recorded"
    )
    .expect("Failed to register QUESTION_VIEWS_TOTAL");
}

/// Count a question operation under its outcome class.
pub fn record_question_operation<T>(operation: &str, result: &crate::Result<T>) {
    let status = match result {
        Ok(_) => "success",
        Err(e) if e.status().is_client_error() => "client_error",
        Err(_) => "server_error",
    };

    QUESTION_OPERATIONS_TOTAL
        .with_label_values(&[operation, status])
        .inc();
}

/// Helper to sanitize path for metrics labels (replace ids, limit cardinality)
pub fn sanitize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        [] => "/".to_string(),
        [collection] => format!("/{collection}"),
        ["questions", _] => "/questions/{id}".to_string(),
        // Unknown shapes collapse to their first segment
        [first, ..] => format!("/{first}/*"),
    }
}
