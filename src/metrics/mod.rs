//! Metrics module
//!
//! Prometheus counters and histograms for chunked uploads, registered in the
//! default registry.

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, Counter, CounterVec, Encoder,
    Histogram, TextEncoder,
};

lazy_static! {
    // Upload metrics
    pub static ref UPLOADS_TOTAL: CounterVec = register_counter_vec!(
        "omics_uploads_total",
        "Total number of chunked uploads",
        &["status"]
    ).unwrap();

    pub static ref UPLOAD_BYTES_TOTAL: Counter = register_counter!(
        "omics_upload_bytes_total",
        "Total bytes of successfully completed uploads"
    ).unwrap();

    pub static ref UPLOAD_DURATION: Histogram = register_histogram!(
        "omics_upload_duration_seconds",
        "Upload duration in seconds, including the checksum pass",
        vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0, 3600.0]
    ).unwrap();

    // Chunk metrics
    pub static ref CHUNKS_TOTAL: CounterVec = register_counter_vec!(
        "omics_upload_chunks_total",
        "Chunk requests by outcome",
        &["status"]  // "accepted" or "rejected"
    ).unwrap();

    pub static ref BYTES_ACKNOWLEDGED: Counter = register_counter!(
        "omics_upload_bytes_acknowledged_total",
        "Bytes confirmed by server-reported offsets"
    ).unwrap();

    pub static ref RETRANSMISSIONS: Counter = register_counter!(
        "omics_upload_retransmissions_total",
        "Responses whose offset asked for bytes to be resent"
    ).unwrap();

    // Checksum metrics
    pub static ref CHECKSUM_DURATION: Histogram = register_histogram!(
        "omics_checksum_duration_seconds",
        "MD5 checksum pass duration in seconds",
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 60.0]
    ).unwrap();

    // Error metrics
    pub static ref ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "omics_errors_total",
        "Total errors",
        &["type"]
    ).unwrap();
}

/// Record a completed upload
pub fn record_upload_success(bytes: u64) {
    UPLOADS_TOTAL.with_label_values(&["success"]).inc();
    UPLOAD_BYTES_TOTAL.inc_by(bytes as f64);
}

/// Record a failed upload
pub fn record_upload_failure() {
    UPLOADS_TOTAL.with_label_values(&["failure"]).inc();
}

/// Record upload duration
pub fn record_upload_duration(duration_secs: f64) {
    UPLOAD_DURATION.observe(duration_secs);
}

/// Record a chunk response by outcome
pub fn record_chunk(status: &str) {
    CHUNKS_TOTAL.with_label_values(&[status]).inc();
}

/// Record newly acknowledged bytes
pub fn record_bytes_acknowledged(bytes: u64) {
    BYTES_ACKNOWLEDGED.inc_by(bytes as f64);
}

/// Record a retransmission request from the server
pub fn record_retransmission() {
    RETRANSMISSIONS.inc();
}

/// Record checksum pass duration
pub fn record_checksum_duration(duration_secs: f64) {
    CHECKSUM_DURATION.observe(duration_secs);
}

/// Record an error
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

/// Encode the default registry in the Prometheus text format
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_upload_success() {
        let before = UPLOADS_TOTAL.with_label_values(&["success"]).get();
        record_upload_success(1024);
        let after = UPLOADS_TOTAL.with_label_values(&["success"]).get();
        assert!(after > before);
    }

    #[test]
    fn test_record_chunk_outcomes() {
        let before = CHUNKS_TOTAL.with_label_values(&["rejected"]).get();
        record_chunk("rejected");
        assert!(CHUNKS_TOTAL.with_label_values(&["rejected"]).get() > before);
    }

    #[test]
    fn test_render_contains_registered_metrics() {
        record_error("test");
        record_retransmission();
        let text = render();
        assert!(text.contains("omics_errors_total"));
        assert!(text.contains("omics_upload_retransmissions_total"));
    }
}
