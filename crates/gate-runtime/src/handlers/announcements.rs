//! On-connect announcements and periodic status traffic.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use shared_bus::EnvelopePublisher;
use shared_types::{
    new_object_id, Command, EnvelopeFactory, Route, SensorReading, StatusReport,
};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use zg_01_transport::SessionEvent;
use zone_telemetry::log_event;
use zg_04_dispatcher::SensorSink;

use crate::adapters::machine::{cpu_model, cpu_temperature};

/// Publishes what controllers expect to hear from a server that came online,
/// and keeps the periodic status traffic going.
pub struct Announcer {
    publisher: Arc<dyn EnvelopePublisher>,
    envelopes: EnvelopeFactory,
    sensors: Arc<dyn SensorSink>,
    status_reporting: bool,
    raspberry_pi: bool,
    sensor_name: String,
}

impl Announcer {
    #[must_use]
    pub fn new(
        publisher: Arc<dyn EnvelopePublisher>,
        envelopes: EnvelopeFactory,
        sensors: Arc<dyn SensorSink>,
        status_reporting: bool,
        raspberry_pi: bool,
    ) -> Self {
        Self {
            publisher,
            envelopes,
            sensors,
            status_reporting,
            raspberry_pi,
            sensor_name: cpu_model(),
        }
    }

    /// Announcements for a fresh session: ask every controller for its system
    /// information and configuration, then report our own status.
    pub async fn announce_online(&self) {
        self.send(Command::SysinfoRequest, Route::broadcast()).await;
        self.send(Command::ConfigFileRequest, Route::broadcast()).await;

        if self.status_reporting {
            self.send(
                Command::Status(StatusReport {
                    response: "online".to_string(),
                    reason: "restarted".to_string(),
                }),
                Route::own(),
            )
            .await;
            self.send(Command::StatusRequest, Route::broadcast()).await;
            self.report_cpu_temperature().await;
        }
    }

    /// Ask every controller for its status.
    pub async fn request_status(&self) {
        if self.status_reporting {
            self.send(Command::StatusRequest, Route::broadcast()).await;
        }
    }

    /// Log the host CPU temperature and, with status reporting, publish it.
    pub async fn report_cpu_temperature(&self) {
        let Some(temperature) = cpu_temperature(self.raspberry_pi) else {
            debug!("CPU temperature unavailable");
            return;
        };

        let identity = self.envelopes.identity();
        let reading = SensorReading {
            object_id: Some(new_object_id()),
            date_time: self.envelopes.format_datetime(&Local::now()),
            serial_source: identity.serial.clone(),
            host_name: Some(identity.host_name.clone()),
            ip_address: Some(identity.ip_address.clone()),
            sensor_name: Some("CPU_temp".to_string()),
            temp_value: Some(temperature),
        };
        if let Err(e) = self.sensors.append_reading(reading) {
            warn!(error = %e, "Failed to record CPU temperature");
        }
        info!(sensor = %self.sensor_name, temperature, "Server CPU sensor");

        if self.status_reporting {
            self.send(
                Command::CpuSensor {
                    sensor_name: self.sensor_name.clone(),
                    temperature,
                },
                Route::broadcast(),
            )
            .await;
        }
    }

    /// Announce on every accepted ConnAck until the transport goes away.
    pub async fn run_on_connect(&self, mut sessions: broadcast::Receiver<SessionEvent>) {
        loop {
            match sessions.recv().await {
                Ok(event) => {
                    log_event!(
                        info,
                        "zg-01",
                        "Broker session established, announcing",
                        reconnect = event.reconnect
                    );
                    self.announce_online().await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Missed session events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    /// Periodic status requests and CPU reports.
    pub async fn run_timers(&self, status_interval: Duration, sensor_interval: Duration) {
        let mut status = tokio::time::interval(status_interval);
        let mut sensor = tokio::time::interval(sensor_interval);
        // The first tick fires immediately; the connect announcement covers it.
        status.tick().await;
        sensor.tick().await;
        loop {
            tokio::select! {
                _ = status.tick() => self.request_status().await,
                _ = sensor.tick() => self.report_cpu_temperature().await,
            }
        }
    }

    async fn send(&self, command: Command, route: Route) {
        let envelope = self.envelopes.build(&command, route, None);
        let tag = envelope.tag();
        let outcome = self.publisher.publish(envelope).await;
        debug!(tag, result = outcome.label(), "Announcement");
    }
}
