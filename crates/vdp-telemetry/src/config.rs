//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Node identifier, distinguishes replicas of the same service
    pub node_id: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive
    pub log_level: String,

    /// Whether to enable console output (for development)
    pub console_output: bool,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "vdp".to_string(),
            node_id: "local".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `VDP_SERVICE_NAME`: Service name (default: vdp)
    /// - `VDP_NODE_ID`: Node identifier (default: local)
    /// - `VDP_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `VDP_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `VDP_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("VDP_SERVICE_NAME").unwrap_or_else(|_| "vdp".to_string()),

            node_id: env::var("VDP_NODE_ID").unwrap_or_else(|_| "local".to_string()),

            log_level: env::var("VDP_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("VDP_CONSOLE_OUTPUT")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),

            json_logs: env::var("VDP_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(is_container),
        }
    }

    /// Service name qualified with the node id.
    pub fn full_service_name(&self) -> String {
        if self.node_id == "local" {
            self.service_name.clone()
        } else {
            format!("{}-{}", self.service_name, self.node_id)
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
