use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

use crate::drivers::pipeline::PersistencePolicy;

/// Where raw telemetry lines come from.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// A real device on a serial port.
    Serial {
        port: String,
        #[serde(default = "default_baud")]
        baud: u32,
    },
    /// Seeded on-box generator; no hardware required.
    Synthetic {
        #[serde(default = "default_rate")]
        rate_hz: f64,
        #[serde(default)]
        seed: u64,
    },
}

fn default_baud() -> u32 {
    115_200
}

fn default_rate() -> f64 {
    100.0
}

/// Startup configuration, loaded once from a JSON file. Everything that can
/// change while the pipeline runs arrives as a control message instead.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    /// Ring capacity per channel, i.e. the graph window of the display side.
    pub capacity: usize,
    /// Initial statistics sub-window; `1 < window <= capacity`.
    pub stats_window: usize,
    /// Explicit log destination. When absent a timestamped file is created
    /// under `log_dir`.
    pub log_path: Option<PathBuf>,
    pub log_dir: PathBuf,
    /// Depth of the reader-to-pipeline queue.
    pub queue_depth: usize,
    pub drain_on_shutdown: bool,
    pub persistence: PersistencePolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::Serial {
                port: "COM4".to_string(),
                baud: default_baud(),
            },
            capacity: 200,
            stats_window: 50,
            log_path: None,
            log_dir: PathBuf::from("logs"),
            queue_depth: 256,
            drain_on_shutdown: true,
            persistence: PersistencePolicy::Degrade,
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open config {}", path.display()))?;
        let config: AppConfig = serde_json::from_reader(file)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.capacity > 1,
            "capacity must be at least 2, got {}",
            self.capacity
        );
        ensure!(
            self.stats_window > 1 && self.stats_window <= self.capacity,
            "stats window {} outside 2..={}",
            self.stats_window,
            self.capacity
        );
        ensure!(self.queue_depth > 0, "queue depth must be positive");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_device_setup() {
        let config = AppConfig::default();
        assert_eq!(
            config.source,
            SourceConfig::Serial {
                port: "COM4".to_string(),
                baud: 115_200
            }
        );
        assert_eq!(config.capacity, 200);
        assert_eq!(config.stats_window, 50);
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.persistence, PersistencePolicy::Degrade);
        config.validate().unwrap();
    }

    #[test]
    fn json_overrides_merge_with_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{
                "source": { "kind": "synthetic", "rate_hz": 250.0, "seed": 9 },
                "capacity": 100,
                "stats_window": 25,
                "persistence": "fatal"
            }"#,
        )
        .unwrap();
        assert_eq!(
            config.source,
            SourceConfig::Synthetic {
                rate_hz: 250.0,
                seed: 9
            }
        );
        assert_eq!(config.capacity, 100);
        assert_eq!(config.stats_window, 25);
        assert_eq!(config.persistence, PersistencePolicy::Fatal);
        // untouched fields keep their defaults
        assert_eq!(config.queue_depth, 256);
        assert!(config.drain_on_shutdown);
    }

    #[test]
    fn serial_source_defaults_its_baud_rate() {
        let config: AppConfig = serde_json::from_str(
            r#"{ "source": { "kind": "serial", "port": "/dev/ttyUSB0" } }"#,
        )
        .unwrap();
        assert_eq!(
            config.source,
            SourceConfig::Serial {
                port: "/dev/ttyUSB0".to_string(),
                baud: 115_200
            }
        );
    }

    #[test]
    fn load_rejects_an_invalid_stats_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = File::create(&path).unwrap();
        write!(file, r#"{{ "capacity": 10, "stats_window": 11 }}"#).unwrap();
        assert!(AppConfig::load(&path).is_err());
    }

    #[test]
    fn load_rejects_a_window_of_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = File::create(&path).unwrap();
        write!(file, r#"{{ "stats_window": 1 }}"#).unwrap();
        assert!(AppConfig::load(&path).is_err());
    }
}
