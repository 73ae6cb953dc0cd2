//! # Zone-Gate Runtime
//!
//! The main entry point for the zone-gate access router.
//!
//! ## Message Flow
//!
//! ```text
//! Readers / controllers / face recognition
//!              │ MQTT  {base_topic}/{serial}
//!              ↓
//!      MqttTransport (zg-01) ──RawMessage──→ Dispatcher (zg-04)
//!              ↑                                │
//!              │                   ┌────────────┴────────────┐
//!              │                   ↓                         ↓
//!              │           FaceMatchHandler (zg-03)   GeneralEnvelopeHandler
//!              │                   │
//!              │                   ↓
//!              │           ZoneAccessService (zg-02) ──→ MemoryIdentityStore
//!              │                   │
//!              └─── publish ───────┘   {base_topic}/{own_serial}
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (file named by `ZG_CONFIG`, then environment)
//! 2. Initialize logging and metrics
//! 3. Load the identity store and wire the subsystems
//! 4. Connect to the broker (failure is fatal)
//! 5. Start the dispatcher, correlation sweeper and timers
//! 6. Run until Ctrl+C

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{debug, error, info};

use gate_runtime::{Announcer, GateConfig, GateContainer};
use zone_telemetry::{encode_metrics, init_telemetry, TelemetryConfig};

/// The runtime orchestrating all subsystems.
pub struct GateRuntime {
    container: Arc<GateContainer>,
    announcer: Arc<Announcer>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl GateRuntime {
    pub fn new(config: GateConfig) -> Result<Self> {
        info!("Creating zone-gate runtime");

        let container =
            Arc::new(GateContainer::new(config).context("Failed to load identity store")?);
        let announcer = Arc::new(Announcer::new(
            container.transport.clone(),
            container.envelopes.clone(),
            container.sinks.sensors.clone(),
            container.config.mqtt.status_reporting,
            container.config.general.raspberry_pi,
        ));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            container,
            announcer,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Connect and start every task.
    pub async fn start(&self) -> Result<()> {
        info!("===========================================");
        info!("  Zone-Gate Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        // Listen before connecting so the first session is announced too.
        let sessions = self.container.transport.subscribe_sessions();
        let announcer = Arc::clone(&self.announcer);
        let mut announce_shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = announcer.run_on_connect(sessions) => {}
                _ = announce_shutdown.changed() => {
                    info!("[zg-01] Announcer shutdown signal received");
                }
            }
        });

        self.container
            .transport
            .connect()
            .await
            .context("Failed to connect to MQTT broker")?;

        let dispatcher = Arc::clone(&self.container.core.dispatcher);
        let dispatch_shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            dispatcher.run(dispatch_shutdown).await;
        });

        let correlations = Arc::clone(&self.container.core.correlations);
        let gc_interval = self.container.config.correlation.gc_interval();
        let gc_shutdown = self.shutdown_rx.clone();
        tokio::spawn(shared_bus::cleanup_task(correlations, gc_interval, gc_shutdown));

        let timers = Arc::clone(&self.announcer);
        let status_interval =
            Duration::from_secs(self.container.config.timers.status_interval_secs.max(1));
        let sensor_interval =
            Duration::from_secs(self.container.config.timers.cpu_sensor_interval_secs.max(1));
        let mut timer_shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = timers.run_timers(status_interval, sensor_interval) => {}
                _ = timer_shutdown.changed() => {
                    info!("Timer shutdown signal received");
                }
            }
        });

        info!("All subsystems running");
        info!("Publish topic: {}", self.container.transport.publish_topic());
        Ok(())
    }

    /// Shutdown the runtime gracefully.
    ///
    /// The dispatcher finishes the message in hand before it stops.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        tokio::time::sleep(Duration::from_millis(500)).await;
        self.container.transport.disconnect().await;

        match encode_metrics() {
            Ok(text) => debug!(metrics = %text, "Final metrics"),
            Err(e) => error!(error = %e, "Failed to encode metrics"),
        }
        info!("Shutdown complete");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = GateConfig::load().context("Invalid configuration")?;
    let _telemetry = init_telemetry(TelemetryConfig::from_env())?;

    let runtime = GateRuntime::new(config)?;
    runtime.start().await?;

    info!("Zone gate is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;

    Ok(())
}
