use manta_utils::metrics::{register_counter_metric_instrument, register_gauge_metric_instrument, Metrics};
use manta_utils::register_metric;
use once_cell::sync::Lazy;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge};
use opentelemetry::KeyValue;

register_metric!(MANTA_METRICS, MantaMetrics);

/// Metrics for Manta API calls exported to OTEL
pub struct MantaMetrics {
    /// Duration of Manta API calls in seconds
    pub api_duration_seconds: Gauge<f64>,
    /// Total number of Manta API calls
    pub api_calls_total: Counter<f64>,
    /// Total bytes sent in requests
    pub request_bytes_total: Counter<f64>,
}

impl Metrics for MantaMetrics {
    fn register() -> Self {
        let meter = global::meter("manta_http_client");

        let api_duration_seconds = register_gauge_metric_instrument(
            &meter,
            "manta_api_duration_seconds".to_string(),
            "Duration of Manta API calls".to_string(),
            "s".to_string(),
        );

        let api_calls_total = register_counter_metric_instrument(
            &meter,
            "manta_api_calls_total".to_string(),
            "Total number of Manta API calls".to_string(),
            "calls".to_string(),
        );

        let request_bytes_total = register_counter_metric_instrument(
            &meter,
            "manta_request_bytes_total".to_string(),
            "Total request bytes sent to the Manta API".to_string(),
            "bytes".to_string(),
        );

        Self { api_duration_seconds, api_calls_total, request_bytes_total }
    }
}

impl MantaMetrics {
    /// Record a successful API call
    pub fn record_success(&self, operation: &str, duration_s: f64, request_bytes: u64) {
        self.record(operation, duration_s, request_bytes, true, "none");
    }

    /// Record a failed API call
    pub fn record_failure(&self, operation: &str, duration_s: f64, request_bytes: u64, error_type: &str) {
        self.record(operation, duration_s, request_bytes, false, error_type);
    }

    fn record(&self, operation: &str, duration_s: f64, request_bytes: u64, success: bool, error_type: &str) {
        let attrs = [
            KeyValue::new("operation", operation.to_string()),
            KeyValue::new("success", success.to_string()),
            KeyValue::new("error_type", error_type.to_string()),
        ];

        self.api_calls_total.add(1.0, &attrs);
        self.api_duration_seconds.record(duration_s, &attrs);

        let op_attr = [KeyValue::new("operation", operation.to_string())];
        self.request_bytes_total.add(request_bytes as f64, &op_attr);
    }
}
