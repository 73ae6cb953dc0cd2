//! Host facts stamped on outbound headers and the CPU sensor report.

use crate::container::config::MachineSettings;
use shared_types::MachineIdentity;
use std::net::UdpSocket;
use std::path::Path;
use tracing::{debug, warn};
use uuid::Uuid;

const PI_THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";
const THERMAL_ROOT: &str = "/sys/class/thermal";

/// Resolve this instance's identity, detecting what the settings leave out.
#[must_use]
pub fn machine_identity(settings: &MachineSettings, program_version: &str) -> MachineIdentity {
    MachineIdentity {
        client_id: settings
            .client_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(generate_client_id),
        program_version: program_version.to_string(),
        serial: settings.serial.trim().to_string(),
        host_name: settings.host_name.clone().unwrap_or_else(host_name),
        ip_address: settings
            .ip_address
            .clone()
            .or_else(local_ip_address)
            .unwrap_or_else(|| "0.0.0.0".to_string()),
    }
}

/// Unique per process start; brokers drop an older session with the same id.
#[must_use]
pub fn generate_client_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(16);
    format!("zone-gate-{id}")
}

#[must_use]
pub fn host_name() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Address of the interface holding the default route. No packet is sent.
#[must_use]
pub fn local_ip_address() -> Option<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    if let Err(e) = socket.connect("8.8.8.8:80") {
        warn!(error = %e, "Network unreachable, IP address unknown");
        return None;
    }
    socket.local_addr().ok().map(|addr| addr.ip().to_string())
}

/// CPU model name from `/proc/cpuinfo`, used as the sensor name.
#[must_use]
pub fn cpu_model() -> String {
    std::fs::read_to_string("/proc/cpuinfo")
        .ok()
        .and_then(|info| parse_cpu_model(&info))
        .unwrap_or_else(|| "CPU".to_string())
}

fn parse_cpu_model(cpuinfo: &str) -> Option<String> {
    cpuinfo.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        matches!(key.trim(), "model name" | "Model").then(|| value.trim().to_string())
    })
}

/// CPU temperature in degrees Celsius.
///
/// A Raspberry Pi exposes one thermal zone; elsewhere every zone is averaged.
#[must_use]
pub fn cpu_temperature(raspberry_pi: bool) -> Option<f64> {
    if raspberry_pi {
        return read_millidegrees(Path::new(PI_THERMAL_ZONE));
    }

    let readings: Vec<f64> = std::fs::read_dir(THERMAL_ROOT)
        .ok()?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("thermal_zone"))
        .filter_map(|entry| read_millidegrees(&entry.path().join("temp")))
        .collect();
    average(&readings)
}

fn read_millidegrees(path: &Path) -> Option<f64> {
    let raw = std::fs::read_to_string(path).ok()?;
    match raw.trim().parse::<f64>() {
        Ok(milli) => Some(round2(milli / 1000.0)),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Unreadable thermal zone");
            None
        }
    }
}

fn average(readings: &[f64]) -> Option<f64> {
    if readings.is_empty() {
        return None;
    }
    Some(round2(readings.iter().sum::<f64>() / readings.len() as f64))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
