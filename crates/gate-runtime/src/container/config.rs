//! # Gate Configuration
//!
//! Unified configuration for the transport, the policy engine and the
//! runtime timers.
//!
//! ## Sources
//!
//! 1. Built-in defaults
//! 2. JSON file named by `ZG_CONFIG` (any subset of sections and fields)
//! 3. Environment overrides (`ZG_BROKER_HOST`, `ZG_BROKER_PORT`, `ZG_SERIAL`,
//!    `ZG_BASE_TOPIC`, `ZG_MQTT_USERNAME`, `ZG_MQTT_PASSWORD`, `ZG_STORE_PATH`)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use zg_01_transport::MqttSettings;
use zg_02_zone_policy::ZonePolicy;

/// Environment variable naming the JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "ZG_CONFIG";

/// Complete gate configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub mqtt: MqttSettings,
    pub access: AccessSettings,
    pub general: GeneralSettings,
    pub machine: MachineSettings,
    pub correlation: CorrelationSettings,
    pub timers: TimerSettings,
    pub store: StoreSettings,
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("invalid config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },

    #[error("own serial number is empty; set machine.serial or ZG_SERIAL")]
    EmptySerial,

    #[error("MQTT base topic is empty")]
    EmptyBaseTopic,

    #[error("correlation TTL must be greater than zero")]
    ZeroCorrelationTtl,

    #[error("invalid dateTime format {0:?}")]
    InvalidDatetimeFormat(String),
}

/// Zone policy switches and FaceMatch watchlist filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessSettings {
    pub perimeter_zone: u32,
    pub access_zone_function: bool,
    pub anti_passback_function: bool,
    /// Watchlists whose matches need the reader's verification mode,
    /// name to id.
    pub verify_watchlists: BTreeMap<String, String>,
}

impl Default for AccessSettings {
    fn default() -> Self {
        let policy = ZonePolicy::default();
        Self {
            perimeter_zone: policy.perimeter_zone,
            access_zone_function: policy.access_zone_function,
            anti_passback_function: policy.anti_passback_function,
            verify_watchlists: BTreeMap::new(),
        }
    }
}

impl AccessSettings {
    #[must_use]
    pub fn policy(&self) -> ZonePolicy {
        ZonePolicy {
            perimeter_zone: self.perimeter_zone,
            access_zone_function: self.access_zone_function,
            anti_passback_function: self.anti_passback_function,
        }
    }

    #[must_use]
    pub fn verify_watchlist_ids(&self) -> Vec<String> {
        self.verify_watchlists.values().cloned().collect()
    }
}

/// Formatting and diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// chrono layout of every `dateTime` field
    pub datetime_format: String,
    /// Save each inbound payload before decoding
    pub capture_raw_payloads: bool,
    /// Prefix of captured payload files
    pub capture_path: PathBuf,
    /// Where sysinfo, sysconfig and user schema dumps go
    pub diagnostics_dir: PathBuf,
    /// Read the CPU temperature the Raspberry Pi way
    pub raspberry_pi: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            datetime_format: shared_types::envelope::DEFAULT_DATETIME_FORMAT.to_string(),
            capture_raw_payloads: false,
            capture_path: PathBuf::from("data/paho"),
            diagnostics_dir: PathBuf::from("data"),
            raspberry_pi: false,
        }
    }
}

/// Identity of this instance on the bus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineSettings {
    /// Own serial; also the suffix of the publish topic
    pub serial: String,
    /// Broker client id; generated when absent
    pub client_id: Option<String>,
    /// Detected when absent
    pub host_name: Option<String>,
    /// Detected when absent
    pub ip_address: Option<String>,
}

/// Pending correlation lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationSettings {
    pub ttl_secs: u64,
    pub gc_interval_secs: u64,
}

impl Default for CorrelationSettings {
    fn default() -> Self {
        Self {
            ttl_secs: shared_bus::DEFAULT_CORRELATION_TTL_SECS,
            gc_interval_secs: shared_bus::DEFAULT_CORRELATION_GC_SECS,
        }
    }
}

impl CorrelationSettings {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    #[must_use]
    pub fn gc_interval(&self) -> Duration {
        Duration::from_secs(self.gc_interval_secs.max(1))
    }
}

/// Periodic tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerSettings {
    /// Status request broadcast interval
    pub status_interval_secs: u64,
    /// Own CPU temperature report interval
    pub cpu_sensor_interval_secs: u64,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            status_interval_secs: 60,
            cpu_sensor_interval_secs: 60,
        }
    }
}

/// Identity store snapshot location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// JSON export with users, cameras, readers and servers
    pub path: Option<PathBuf>,
}

impl GateConfig {
    /// Load from `ZG_CONFIG` (if set) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Apply overrides from `lookup` (the environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("ZG_BROKER_HOST") {
            self.mqtt.broker_host = host;
        }
        if let Some(port) = lookup("ZG_BROKER_PORT") {
            self.mqtt.broker_port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "ZG_BROKER_PORT",
                value: port.clone(),
            })?;
        }
        if let Some(serial) = lookup("ZG_SERIAL") {
            self.machine.serial = serial;
        }
        if let Some(topic) = lookup("ZG_BASE_TOPIC") {
            self.mqtt.base_topic = topic;
        }
        if let Some(username) = lookup("ZG_MQTT_USERNAME") {
            self.mqtt.username = Some(username);
        }
        if let Some(password) = lookup("ZG_MQTT_PASSWORD") {
            self.mqtt.password = Some(password);
        }
        if let Some(path) = lookup("ZG_STORE_PATH") {
            self.store.path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Reject configurations the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.machine.serial.trim().is_empty() {
            return Err(ConfigError::EmptySerial);
        }
        if self.mqtt.base_topic.trim_matches('/').is_empty() {
            return Err(ConfigError::EmptyBaseTopic);
        }
        if self.correlation.ttl_secs == 0 {
            return Err(ConfigError::ZeroCorrelationTtl);
        }
        if !shared_types::is_valid_datetime_format(&self.general.datetime_format) {
            return Err(ConfigError::InvalidDatetimeFormat(
                self.general.datetime_format.clone(),
            ));
        }
        Ok(())
    }
}
