/// Metrics and telemetry for the file relay
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - Upload counts, outcomes and sizes
/// - Download counts and outcomes
/// - Identifier collisions
/// - Process uptime

use lazy_static::lazy_static;
use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_counter_vec, Encoder,
    Gauge, Histogram, IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    // ========== Upload Metrics ==========

    /// Uploads by outcome
    pub static ref UPLOADS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "relay_uploads_total",
        "Total number of upload attempts",
        &["outcome"]
    )
    .unwrap();

    /// Size of successfully stored uploads
    pub static ref UPLOAD_BYTES: Histogram = register_histogram!(
        "relay_upload_bytes",
        "Size of stored uploads in bytes",
        vec![1024.0, 16384.0, 131072.0, 1048576.0, 8388608.0, 67108864.0, 536870912.0]
    )
    .unwrap();

    /// Generated names that were already taken
    pub static ref ID_COLLISIONS_TOTAL: IntCounter = register_int_counter!(
        "relay_id_collisions_total",
        "Number of generated names that collided with an existing object"
    )
    .unwrap();

    // ========== Download Metrics ==========

    /// Downloads by outcome
    pub static ref DOWNLOADS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "relay_downloads_total",
        "Total number of download attempts",
        &["outcome"]
    )
    .unwrap();

    // ========== System Metrics ==========

    /// Server uptime in seconds
    pub static ref UPTIME_SECONDS: Gauge = register_gauge!(
        "relay_uptime_seconds",
        "Server uptime in seconds"
    )
    .unwrap();
}

/// Render all registered metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record an upload attempt
pub fn record_upload(outcome: &str, size_bytes: u64) {
    UPLOADS_TOTAL.with_label_values(&[outcome]).inc();
    if outcome == "success" {
        UPLOAD_BYTES.observe(size_bytes as f64);
    }
}

/// Record a name collision during upload
pub fn record_id_collision() {
    ID_COLLISIONS_TOTAL.inc();
}

/// Record a download attempt
pub fn record_download(outcome: &str) {
    DOWNLOADS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Start the background task that keeps the uptime gauge current
pub fn start_uptime_tracker() {
    let start = std::time::Instant::now();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(10));
        loop {
            interval.tick().await;
            UPTIME_SECONDS.set(start.elapsed().as_secs_f64());
        }
    });
}
