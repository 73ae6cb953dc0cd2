//! Prometheus metrics for zone-gate subsystems.
//!
//! All metrics follow the naming convention: `zg_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., decisions_total)
//! - **Gauge**: Value that can go up or down (e.g., correlations_pending)
//! - **Histogram**: Distribution of values (e.g., dispatch_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // TRANSPORT METRICS (zg-01)
    // =========================================================================

    /// Messages delivered by the broker, before any decoding
    pub static ref MESSAGES_RECEIVED: CounterVec = CounterVec::new(
        Opts::new("zg_transport_messages_received_total", "Messages delivered by the broker"),
        &["source"]  // source: serial suffix of the topic
    ).expect("metric creation failed");

    /// Publish attempts by result
    pub static ref PUBLISHES: CounterVec = CounterVec::new(
        Opts::new("zg_transport_publishes_total", "Outbound publish attempts"),
        &["tag", "result"]  // result: sent/skipped/failed
    ).expect("metric creation failed");

    /// 1 while the broker session is up
    pub static ref BROKER_CONNECTED: Gauge = Gauge::new(
        "zg_transport_broker_connected",
        "Whether the broker session is established"
    ).expect("metric creation failed");

    // =========================================================================
    // DISPATCH METRICS (zg-04)
    // =========================================================================

    /// Inbound messages by routed family
    pub static ref INBOUND_MESSAGES: CounterVec = CounterVec::new(
        Opts::new("zg_dispatch_messages_total", "Inbound messages by kind"),
        &["kind"]  // kind: face_match/general/unknown_routed/loopback/dropped
    ).expect("metric creation failed");

    /// Messages dropped or failed, by stage
    pub static ref DISPATCH_ERRORS: CounterVec = CounterVec::new(
        Opts::new("zg_dispatch_errors_total", "Dispatch failures by stage"),
        &["stage"]  // stage: empty/decode/missing_keys/handler
    ).expect("metric creation failed");

    /// Time spent on one drain cycle
    pub static ref DISPATCH_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "zg_dispatch_cycle_duration_seconds",
            "Time spent processing one inbound message"
        ).buckets(exponential_buckets(0.0001, 2.0, 14).expect("bucket layout"))
    ).expect("metric creation failed");

    // =========================================================================
    // ACCESS METRICS (zg-02, zg-03)
    // =========================================================================

    /// Access decisions by outcome and reason
    pub static ref ACCESS_DECISIONS: CounterVec = CounterVec::new(
        Opts::new("zg_access_decisions_total", "Zone policy decisions"),
        &["outcome", "reason"]
    ).expect("metric creation failed");

    /// FaceMatch events discarded before evaluation
    pub static ref FACE_MATCH_DISCARDED: CounterVec = CounterVec::new(
        Opts::new("zg_face_match_discarded_total", "FaceMatch events discarded"),
        &["reason"]  // reason: watchlist_not_permitted/no_reader
    ).expect("metric creation failed");

    /// Outstanding correlation entries
    pub static ref CORRELATIONS_PENDING: Gauge = Gauge::new(
        "zg_correlations_pending",
        "Decisions awaiting a transaction acknowledgement"
    ).expect("metric creation failed");
}

/// Handle returned once metrics are registered.
#[derive(Debug)]
pub struct MetricsHandle {
    registered: usize,
}

impl MetricsHandle {
    #[must_use]
    pub fn registered(&self) -> usize {
        self.registered
    }
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Transport
        Box::new(MESSAGES_RECEIVED.clone()),
        Box::new(PUBLISHES.clone()),
        Box::new(BROKER_CONNECTED.clone()),
        // Dispatch
        Box::new(INBOUND_MESSAGES.clone()),
        Box::new(DISPATCH_ERRORS.clone()),
        Box::new(DISPATCH_DURATION.clone()),
        // Access
        Box::new(ACCESS_DECISIONS.clone()),
        Box::new(FACE_MATCH_DISCARDED.clone()),
        Box::new(CORRELATIONS_PENDING.clone()),
    ];

    let registered = metrics.len();
    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle { registered })
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
