//! # VDP Telemetry
//!
//! Logging and metrics for the remote-invocation dispatcher.
//!
//! ## Components
//!
//! - **Logs**: a global `tracing` subscriber, JSON in containers and
//!   human-readable in development
//! - **Metrics**: Prometheus counters, gauges and histograms for dispatch
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vdp_telemetry::{TelemetryConfig, init_telemetry};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_telemetry(config).expect("Failed to init telemetry");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `VDP_SERVICE_NAME` | `vdp` | Service name in logs |
//! | `VDP_NODE_ID` | `local` | Node identifier |
//! | `VDP_LOG_LEVEL` | `info` | Log level filter |
//! | `VDP_JSON_LOGS` | container-dependent | JSON log output |
//! | `VDP_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

#![warn(missing_docs)]

mod config;
mod logging;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, MetricsHandle, DEFERRED_PENDING, DISPATCH_DURATION,
    DISPATCH_ERRORS, DISPATCH_REQUESTS, DISPATCH_RESPONSES, WORKER_QUEUE_DEPTH,
};
pub use tracing_setup::build_filter;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// A global subscriber is already installed.
    #[error("Failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),

    /// Metric registration or encoding failed.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Invalid filter or other configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that must be held for the lifetime of the application.
///
/// # Errors
///
/// Fails if called twice in one process.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    tracing_setup::init_tracing(&config)?;

    Ok(TelemetryGuard {
        service_name: config.full_service_name(),
        _metrics: metrics,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
    _metrics: MetricsHandle,
}

impl TelemetryGuard {
    /// Service name the guard was initialized for.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry...");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}

/// Convenience macro for recording a metric with a value.
#[macro_export]
macro_rules! metric_observe {
    ($metric:expr, $value:expr) => {
        $metric.observe($value)
    };
    ($metric:expr, $labels:expr, $value:expr) => {
        $metric.with_label_values($labels).observe($value)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "vdp");
    }

    #[test]
    fn test_metric_macros() {
        metric_inc!(DISPATCH_REQUESTS);
        metric_inc!(DISPATCH_RESPONSES, &["value"]);
        metric_observe!(DISPATCH_DURATION, 0.002);
        assert!(DISPATCH_RESPONSES.with_label_values(&["value"]).get() >= 1.0);
    }
}
