use rumqttc::{MqttOptions, QoS};
use serde::{Deserialize, Serialize};
use shared_types::DeviceEntry;
use std::time::Duration;

/// Broker session settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttSettings {
    /// Broker host name or address
    pub broker_host: String,
    /// Broker port (1883 plain)
    pub broker_port: u16,
    /// Topic prefix; every device publishes on `{base_topic}/{serial}`
    pub base_topic: String,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u64,
    /// Credentials, sent only when `username` is set
    pub username: Option<String>,
    pub password: Option<String>,
    /// Upper bound on the initial connect wait
    pub connect_timeout_ms: u64,
    /// Pause after a broken session before polling again
    pub reconnect_delay_ms: u64,
    /// Client request queue depth
    pub request_capacity: usize,
    /// QoS level (0-2) for publishes
    pub publish_qos: u8,
    /// QoS level (0-2) for subscriptions
    pub subscribe_qos: u8,
    /// Extra devices to listen to, after the directory's own targets
    pub test_clients: Vec<DeviceEntry>,
    /// Announce status on connect and request status periodically
    pub status_reporting: bool,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            base_topic: "access".to_string(),
            keep_alive_secs: 60,
            username: None,
            password: None,
            connect_timeout_ms: 10_000,
            reconnect_delay_ms: 2_000,
            request_capacity: 100,
            publish_qos: 0,
            subscribe_qos: 0,
            test_clients: Vec::new(),
            status_reporting: true,
        }
    }
}

impl MqttSettings {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Topic owned by `serial`.
    #[must_use]
    pub fn topic_for(&self, serial: &str) -> String {
        shared_types::device_topic(&self.base_topic, serial)
    }

    /// Session options for `client_id`. Clean session, no persistence.
    #[must_use]
    pub fn mqtt_options(&self, client_id: &str) -> MqttOptions {
        let mut options = MqttOptions::new(client_id, self.broker_host.as_str(), self.broker_port);
        options.set_keep_alive(Duration::from_secs(self.keep_alive_secs.max(5)));
        options.set_clean_session(true);
        if let Some(username) = &self.username {
            options.set_credentials(username.as_str(), self.password.as_deref().unwrap_or(""));
        }
        options
    }
}

/// Map a configured QoS level; anything above 2 is clamped.
#[must_use]
pub fn qos_level(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}
