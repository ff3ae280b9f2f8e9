/// Metrics and telemetry for Screendiff
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - Upload counts
/// - Comparison outcomes and latencies
/// - Deletions per namespace
use lazy_static::lazy_static;
use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_counter_vec,
    Encoder, Gauge, Histogram, IntCounter, IntCounterVec, TextEncoder,
};
use std::time::Instant;

lazy_static! {
    /// Process start, used for the uptime gauge
    static ref STARTED_AT: Instant = Instant::now();

    /// Total images stored in the uploads namespace
    pub static ref UPLOADS_TOTAL: IntCounter = register_int_counter!(
        "screendiff_uploads_total",
        "Total number of uploaded images"
    )
    .unwrap();

    /// Comparisons by outcome (success, invalid_request, invalid_reference, failure)
    pub static ref COMPARISONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "screendiff_comparisons_total",
        "Total number of comparison requests",
        &["outcome"]
    )
    .unwrap();

    /// Time spent in the diff engine
    pub static ref COMPARISON_DURATION_SECONDS: Histogram = register_histogram!(
        "screendiff_comparison_duration_seconds",
        "Image comparison latencies in seconds",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .unwrap();

    /// Deleted blobs by namespace
    pub static ref DELETES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "screendiff_deletes_total",
        "Total number of deleted blobs",
        &["namespace"]
    )
    .unwrap();

    /// Application uptime in seconds
    pub static ref UPTIME_SECONDS: Gauge = register_gauge!(
        "screendiff_uptime_seconds",
        "Application uptime in seconds"
    )
    .unwrap();
}

/// Start the uptime clock
pub fn init() {
    lazy_static::initialize(&STARTED_AT);
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    UPTIME_SECONDS.set(STARTED_AT.elapsed().as_secs_f64());

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "metrics_encode_failed");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record a stored upload
pub fn record_upload() {
    UPLOADS_TOTAL.inc();
}

/// Record a comparison outcome
pub fn record_comparison(outcome: &str) {
    COMPARISONS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record diff engine latency
pub fn record_comparison_duration(duration: f64) {
    COMPARISON_DURATION_SECONDS.observe(duration);
}

/// Record a deletion
pub fn record_delete(namespace: &str) {
    DELETES_TOTAL.with_label_values(&[namespace]).inc();
}
