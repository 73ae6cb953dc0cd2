//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive
    pub log_level: String,

    /// Whether to write logs to stdout at all
    pub console_output: bool,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Include thread ids in log lines
    pub thread_ids: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "zone-gate".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            thread_ids: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `ZG_SERVICE_NAME`: Service name (default: zone-gate)
    /// - `ZG_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `ZG_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `ZG_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    /// - `ZG_THREAD_IDS`: Include thread ids (default: true)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("ZG_SERVICE_NAME").unwrap_or_else(|_| "zone-gate".to_string()),

            log_level: env::var("ZG_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("ZG_CONSOLE_OUTPUT")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),

            json_logs: env::var("ZG_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(is_container),

            thread_ids: env::var("ZG_THREAD_IDS")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
        }
    }
}

/// `true`, `1`, `yes` and `on` (any case) enable a flag.
pub(crate) fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
