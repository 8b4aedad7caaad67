//! Payload types composed into `status` and `metrics` responses.

use serde::{Deserialize, Serialize};

/// A flat snapshot of the collector's performance figures, as returned
/// by the `metrics` action.
///
/// Tick figures come from the sampler's lock-free stats cells; memory,
/// CPU and disk figures from the host metrics adapter (hardware values
/// may be up to 10 seconds stale by design). Memory values are MiB,
/// disk values GiB, CPU values percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Ticks per second over the 5-second window.
    pub tps_5s: f64,
    /// Ticks per second over the 1-minute window.
    pub tps_1m: f64,
    /// Mean milliseconds per tick over the 1-minute window.
    pub mspt: f64,
    /// Process CPU usage, percent.
    pub cpu_process: f64,
    /// Whole-host CPU usage, percent.
    pub cpu_system: f64,
    /// Process resident memory, MiB.
    pub mem_used: f64,
    /// Process virtual memory, MiB.
    pub mem_total: f64,
    /// Host total memory, MiB (the ceiling the process could grow to).
    pub mem_max: f64,
    /// Host memory in use, MiB.
    pub host_mem_used: f64,
    /// Host memory total, MiB.
    pub host_mem_total: f64,
    /// Disk space used on the data partition, GiB.
    pub disk_used: f64,
    /// Disk space total on the data partition, GiB.
    pub disk_total: f64,
}

/// The public status report returned by the unauthenticated `status`
/// action.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Always true while the process is serving.
    pub online: bool,
    /// The host's message of the day, raw (may contain `§` color codes).
    pub motd: String,
    /// The message of the day with color codes stripped.
    pub motd_plain: String,
    /// Host software version string.
    pub version: String,
    /// Host API version string.
    pub api_version: String,
    /// Players currently online.
    pub players: u32,
    /// Configured player capacity.
    pub max_players: u32,
    /// The host's default game mode name.
    pub gamemode: String,
    /// Cached server icon as a `data:image/png;base64,` URL, if one
    /// exists on disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Installed plugin list, present only when enabled in config.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<String>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_serializes_flat() {
        let snap = MetricsSnapshot {
            tps_5s: 19.8,
            tps_1m: 20.0,
            mspt: 12.5,
            ..MetricsSnapshot::default()
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["tps_5s"], 19.8);
        assert_eq!(json["mspt"], 12.5);
        assert_eq!(json["disk_total"], 0.0);
    }

    #[test]
    fn status_omits_optional_fields() {
        let status = StatusReport {
            online: true,
            motd: String::from("A §aMinecraft §rServer"),
            motd_plain: String::from("A Minecraft Server"),
            version: String::from("1.21"),
            api_version: String::from("1.21-R0.1"),
            players: 3,
            max_players: 20,
            gamemode: String::from("SURVIVAL"),
            icon: None,
            plugins: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert!(json.get("icon").is_none());
        assert!(json.get("plugins").is_none());
        assert_eq!(json["players"], 3);
    }
}
