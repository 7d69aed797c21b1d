//! Prometheus metrics for the dispatcher.
//!
//! All metrics follow the naming convention: `vdp_<component>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., dispatch_requests_total)
//! - **Gauge**: Value that can go up or down (e.g., dispatch_deferred_pending)
//! - **Histogram**: Distribution of values (e.g., dispatch_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Envelopes handed to the dispatcher
    pub static ref DISPATCH_REQUESTS: Counter = Counter::new(
        "vdp_dispatch_requests_total",
        "Total envelopes received by the dispatcher"
    ).expect("metric creation failed");

    /// Responses handed to the connection layer, by outcome
    pub static ref DISPATCH_RESPONSES: CounterVec = CounterVec::new(
        Opts::new("vdp_dispatch_responses_total", "Responses produced by the dispatcher"),
        &["outcome"]  // value, error, dropped
    ).expect("metric creation failed");

    /// Error responses by kind
    pub static ref DISPATCH_ERRORS: CounterVec = CounterVec::new(
        Opts::new("vdp_dispatch_errors_total", "Error responses by error kind"),
        &["kind"]
    ).expect("metric creation failed");

    /// Deferred calls registered and not yet completed
    pub static ref DEFERRED_PENDING: Gauge = Gauge::new(
        "vdp_dispatch_deferred_pending",
        "Deferred results awaiting completion"
    ).expect("metric creation failed");

    /// Dispatch jobs waiting for a worker
    pub static ref WORKER_QUEUE_DEPTH: Gauge = Gauge::new(
        "vdp_worker_queue_depth",
        "Dispatch jobs queued behind busy workers"
    ).expect("metric creation failed");

    /// Time from receipt to response (synchronous path) or to registration
    /// (deferred path)
    pub static ref DISPATCH_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "vdp_dispatch_duration_seconds",
            "Time spent on a worker per dispatch"
        ).buckets(exponential_buckets(0.0001, 2.0, 16).expect("valid buckets"))
    ).expect("metric creation failed");
}

/// Proof that the dispatch metrics are registered.
#[derive(Debug, Clone, Copy)]
pub struct MetricsHandle {
    _registered: (),
}

/// Register all metrics with the global registry.
///
/// # Errors
///
/// Returns `TelemetryError::MetricsInit` if a metric is already registered.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(DISPATCH_REQUESTS.clone()),
        Box::new(DISPATCH_RESPONSES.clone()),
        Box::new(DISPATCH_ERRORS.clone()),
        Box::new(DEFERRED_PENDING.clone()),
        Box::new(WORKER_QUEUE_DEPTH.clone()),
        Box::new(DISPATCH_DURATION.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle { _registered: () })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_then_encode() {
        // A second registration in the same process reports AlreadyReg.
        let _ = register_metrics();
        DISPATCH_REQUESTS.inc();
        let text = encode_metrics().unwrap();
        assert!(text.contains("vdp_dispatch_requests_total"));
    }

    #[test]
    fn test_labelled_counters() {
        DISPATCH_ERRORS.with_label_values(&["unknown_service"]).inc();
        assert!(DISPATCH_ERRORS.with_label_values(&["unknown_service"]).get() >= 1.0);
    }

    #[test]
    fn test_histogram_timer() {
        let before = DISPATCH_DURATION.get_sample_count();
        {
            let _timer = HistogramTimer::new(&DISPATCH_DURATION);
        }
        assert!(DISPATCH_DURATION.get_sample_count() > before);
    }
}
