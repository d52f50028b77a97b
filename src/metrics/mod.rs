//! Prometheus metrics for classification, training and the assistant.
//!
//! Metrics live in a process-wide registry and are exported in the text
//! exposition format by `GET /metrics`.

use lazy_static::lazy_static;
use prometheus::{Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry};

const NAMESPACE: &str = "ticket_triage";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Classification requests by outcome
    ///
    /// Labels: outcome (classified, empty_default, not_ready, error)
    pub static ref CLASSIFY_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("classify_requests_total", "Total number of classification requests")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create CLASSIFY_REQUESTS_TOTAL metric");

    /// Time spent in vectorization and both classifiers
    pub static ref PREDICTION_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "prediction_duration_seconds",
            "Ticket prediction duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0])
    ).expect("Failed to create PREDICTION_DURATION_SECONDS metric");

    /// Training runs by outcome
    ///
    /// Labels: outcome (success, failure)
    pub static ref TRAINING_RUNS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("training_runs_total", "Total number of training runs")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create TRAINING_RUNS_TOTAL metric");

    /// Assistant responses by kind
    ///
    /// Labels: kind (ai_generated, fallback)
    pub static ref ASSISTANT_RESPONSES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("assistant_responses_total", "Total number of assistant responses")
            .namespace(NAMESPACE),
        &["kind"]
    ).expect("Failed to create ASSISTANT_RESPONSES_TOTAL metric");

    /// 1 when a complete artifact set is loaded
    pub static ref MODELS_READY: IntGauge = IntGauge::with_opts(
        Opts::new("models_ready", "Whether trained models are loaded")
            .namespace(NAMESPACE)
    ).expect("Failed to create MODELS_READY metric");
}

/// Register all metrics with the global registry.
///
/// Calling this more than once is harmless.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(CLASSIFY_REQUESTS_TOTAL.clone()),
        Box::new(PREDICTION_DURATION_SECONDS.clone()),
        Box::new(TRAINING_RUNS_TOTAL.clone()),
        Box::new(ASSISTANT_RESPONSES_TOTAL.clone()),
        Box::new(MODELS_READY.clone()),
    ];

    for collector in collectors {
        match PROMETHEUS_REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e),
        }
    }

    tracing::debug!("Prometheus metrics initialized");
    Ok(())
}

/// Generate Prometheus text format metrics
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
    }

    #[test]
    fn test_gather_includes_namespace() {
        init_metrics().unwrap();
        CLASSIFY_REQUESTS_TOTAL
            .with_label_values(&["classified"])
            .inc();

        let output = gather_metrics();
        assert!(output.contains("ticket_triage_classify_requests_total"));
    }
}
