//! # Zone Telemetry
//!
//! Logging and metrics for zone-gate.
//!
//! ## Components
//!
//! - **Logs**: `tracing` events rendered by `tracing-subscriber`, pretty on a
//!   terminal, JSON in containers
//! - **Metrics**: Prometheus counters, gauges and histograms in a process-wide
//!   registry, rendered with [`encode_metrics`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use zone_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ZG_SERVICE_NAME` | `zone-gate` | Service name in logs |
//! | `ZG_LOG_LEVEL` | `info` | Log filter (falls back to `RUST_LOG`) |
//! | `ZG_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `ZG_JSON_LOGS` | `false` | JSON lines instead of pretty output |
//! | `ZG_THREAD_IDS` | `true` | Include thread ids |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, MetricsHandle, ACCESS_DECISIONS,
    BROKER_CONNECTED, CORRELATIONS_PENDING, DISPATCH_DURATION, DISPATCH_ERRORS,
    FACE_MATCH_DISCARDED, INBOUND_MESSAGES, MESSAGES_RECEIVED, PUBLISHES,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Metrics first so early log lines can be counted
    let metrics = register_metrics()?;
    init_logging(&config)?;

    tracing::debug!(registered = metrics.registered(), "Prometheus metrics registered");

    Ok(TelemetryGuard {
        service_name: config.service_name,
        _metrics: metrics,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry");
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

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
