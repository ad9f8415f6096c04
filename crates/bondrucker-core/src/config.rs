// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Manager configuration: timings, retry bounds, store header, and the
// default printer. Persisted as pretty JSON next to the application data.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::{PrinterConfig, StoreInfo};

/// File name used by [`load_config`] / [`save_config`] callers.
pub const CONFIG_FILE: &str = "bondrucker.json";

/// Persistent manager settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Header printed on every receipt.
    pub store: StoreInfo,
    /// Printer used for auto-print and when no printer is given explicitly.
    pub default_printer: Option<PrinterConfig>,
    /// Queue newly arrived orders automatically. Off unless the operator
    /// opts in.
    pub auto_print_enabled: bool,
    pub scan: ScanSettings,
    pub connection: ConnectionSettings,
    pub queue: QueueSettings,
    pub probe: ProbeSettings,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            store: StoreInfo::default(),
            default_printer: None,
            auto_print_enabled: false,
            scan: ScanSettings::default(),
            connection: ConnectionSettings::default(),
            queue: QueueSettings::default(),
            probe: ProbeSettings::default(),
        }
    }
}

/// Device discovery timings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Live discovery cancels itself after this long.
    #[serde(with = "millis")]
    pub timeout: Duration,
    /// Pause after cancelling a scan that was still running.
    #[serde(with = "millis")]
    pub restart_pause: Duration,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            restart_pause: Duration::from_secs(1),
        }
    }
}

/// Pairing and connect retry bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// How many times bond state is polled after a pairing request.
    pub pairing_polls: u32,
    #[serde(with = "millis")]
    pub pairing_poll_interval: Duration,
    /// Tries per protocol candidate.
    pub attempts_per_candidate: u32,
    /// Delay before try `n + 1` is `n × connect_base_delay`.
    #[serde(with = "millis")]
    pub connect_base_delay: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            pairing_polls: 20,
            pairing_poll_interval: Duration::from_secs(1),
            attempts_per_candidate: 5,
            connect_base_delay: Duration::from_millis(1000),
        }
    }
}

/// Print queue retry bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Print attempts per queue round.
    pub attempts_per_round: u32,
    #[serde(with = "millis")]
    pub attempt_pause: Duration,
    /// A job whose `retry_count` reached this value is dropped.
    pub max_requeues: u32,
    #[serde(with = "millis")]
    pub inter_job_pause: Duration,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            attempts_per_round: 3,
            attempt_pause: Duration::from_secs(1),
            max_requeues: 3,
            inter_job_pause: Duration::from_millis(500),
        }
    }
}

/// Read timeouts for the diagnostic status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    #[serde(with = "millis")]
    pub status_timeout: Duration,
    #[serde(with = "millis")]
    pub offline_timeout: Duration,
    #[serde(with = "millis")]
    pub poll_interval: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            status_timeout: Duration::from_millis(1500),
            offline_timeout: Duration::from_millis(1000),
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// Load settings from `path`. A missing or unreadable file yields defaults.
pub fn load_config(path: impl AsRef<Path>) -> ManagerConfig {
    let path = path.as_ref();
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no config file, using defaults");
            return ManagerConfig::default();
        }
    };
    match serde_json::from_str(&data) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "config file is corrupt, using defaults");
            ManagerConfig::default()
        }
    }
}

/// Write settings to `path` as pretty JSON, creating missing parent
/// directories.
pub fn save_config(path: impl AsRef<Path>, config: &ManagerConfig) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(config)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)?;
    debug!(path = %path.display(), "settings saved");
    Ok(())
}

/// `Duration` as integer milliseconds.
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaperWidth;

    #[test]
    fn defaults_match_hardware_timings() {
        let cfg = ManagerConfig::default();
        assert_eq!(cfg.scan.timeout, Duration::from_secs(60));
        assert_eq!(cfg.connection.pairing_polls, 20);
        assert_eq!(cfg.connection.attempts_per_candidate, 5);
        assert_eq!(cfg.queue.attempts_per_round, 3);
        assert_eq!(cfg.queue.max_requeues, 3);
        assert_eq!(cfg.probe.status_timeout, Duration::from_millis(1500));
        assert!(!cfg.auto_print_enabled);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);

        let mut cfg = ManagerConfig::default();
        cfg.store.name = "Noodle Bar".into();
        cfg.default_printer = Some(PrinterConfig::bluetooth(
            "Counter",
            "00:11:22:33:44:55",
            PaperWidth::Mm80,
        ));
        cfg.queue.inter_job_pause = Duration::from_millis(250);

        save_config(&path, &cfg).expect("save");
        assert_eq!(load_config(&path), cfg);
    }

    #[test]
    fn save_creates_missing_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("deeper").join(CONFIG_FILE);

        save_config(&path, &ManagerConfig::default()).expect("save");
        assert!(path.is_file());
        assert_eq!(load_config(&path), ManagerConfig::default());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(load_config(dir.path().join("absent.json")), ManagerConfig::default());
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{ not json").expect("write");
        assert_eq!(load_config(&path), ManagerConfig::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{ "auto_print_enabled": true, "scan": { "timeout": 5000 } }"#)
            .expect("write");
        let cfg = load_config(&path);
        assert!(cfg.auto_print_enabled);
        assert_eq!(cfg.scan.timeout, Duration::from_secs(5));
        assert_eq!(cfg.scan.restart_pause, Duration::from_secs(1));
        assert_eq!(cfg.connection, ConnectionSettings::default());
    }
}
