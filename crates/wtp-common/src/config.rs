//! ---
//! wtp_section: "00-shared-runtime"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Shared primitives and utilities for the simulator runtime."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_tick_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_speed() -> f64 {
    1.0
}

fn default_start_running() -> bool {
    true
}

fn default_historian_capacity() -> usize {
    7_200
}

fn default_alarm_history_capacity() -> usize {
    200
}

fn default_cleared_retention() -> Duration {
    Duration::from_secs(300)
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_file_output() -> bool {
    true
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9_899))
}

pub const MIN_SPEED: f64 = 0.1;
pub const MAX_SPEED: f64 = 100.0;

/// Primary configuration object for the WTP-Sim runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub historian: HistorianConfig,
    #[serde(default)]
    pub alarms: AlarmConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "WTP_CONFIG";

    /// Load configuration from disk, respecting the `WTP_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<AppConfig>()
            .with_context(|| format!("failed to load config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.simulation.validate()?;
        if self.historian.capacity == 0 {
            return Err(anyhow!("historian capacity must be greater than zero"));
        }
        for (tag, thresholds) in &self.alarms.thresholds {
            thresholds.validate(tag)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Wall-clock interval between engine ticks.
    #[serde(default = "default_tick_interval")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub tick_interval: Duration,
    /// Simulated seconds per wall-clock second.
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default = "default_start_running")]
    pub start_running: bool,
    /// Additional scenario definitions loaded next to the built-in library.
    #[serde(default)]
    pub scenario_files: Vec<PathBuf>,
    /// Scenario id started as soon as the engine comes up.
    #[serde(default)]
    pub autostart_scenario: Option<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            speed: default_speed(),
            start_running: default_start_running(),
            scenario_files: Vec::new(),
            autostart_scenario: None,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(anyhow!("simulation tick_interval must be greater than zero"));
        }
        if !(MIN_SPEED..=MAX_SPEED).contains(&self.speed) {
            return Err(anyhow!(
                "simulation speed {} outside [{}, {}]",
                self.speed,
                MIN_SPEED,
                MAX_SPEED
            ));
        }
        Ok(())
    }

    /// Tick interval in seconds, the unit the stage models integrate over.
    pub fn tick_seconds(&self) -> f64 {
        self.tick_interval.as_secs_f64()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorianConfig {
    #[serde(default = "default_historian_capacity")]
    pub capacity: usize,
}

impl Default for HistorianConfig {
    fn default() -> Self {
        Self {
            capacity: default_historian_capacity(),
        }
    }
}

/// Alarm limits for a single tag. Any subset may be configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hh: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ll: Option<f64>,
}

impl ThresholdSet {
    pub const fn new(ll: Option<f64>, l: Option<f64>, h: Option<f64>, hh: Option<f64>) -> Self {
        Self { hh, h, l, ll }
    }

    pub const fn high(h: f64, hh: f64) -> Self {
        Self::new(None, None, Some(h), Some(hh))
    }

    pub const fn low(ll: f64, l: f64) -> Self {
        Self::new(Some(ll), Some(l), None, None)
    }

    pub const fn band(ll: f64, l: f64, h: f64, hh: f64) -> Self {
        Self::new(Some(ll), Some(l), Some(h), Some(hh))
    }

    pub fn is_empty(&self) -> bool {
        self.hh.is_none() && self.h.is_none() && self.l.is_none() && self.ll.is_none()
    }

    /// Limits must be ordered `ll <= l <= h <= hh` wherever both ends are present.
    pub fn validate(&self, tag: &str) -> Result<()> {
        let ordered = [self.ll, self.l, self.h, self.hh];
        let present: Vec<f64> = ordered.iter().flatten().copied().collect();
        if present.iter().any(|limit| !limit.is_finite()) {
            return Err(anyhow!("thresholds for '{}' must be finite", tag));
        }
        if present.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(anyhow!(
                "thresholds for '{}' must satisfy ll <= l <= h <= hh",
                tag
            ));
        }
        Ok(())
    }
}

fn default_thresholds() -> IndexMap<String, ThresholdSet> {
    [
        ("AIT-302", ThresholdSet::high(0.3, 1.0)),
        ("AIT-401", ThresholdSet::band(0.2, 0.5, 3.0, 4.0)),
        ("AIT-402", ThresholdSet::low(0.2, 0.5)),
        ("AIT-403", ThresholdSet::band(6.5, 6.8, 8.0, 8.5)),
        ("LIT-101", ThresholdSet::band(2.0, 4.0, 16.0, 18.0)),
        ("LIT-401", ThresholdSet::band(3.0, 6.0, 18.0, 19.5)),
        ("PDIT-101", ThresholdSet::high(8.0, 12.0)),
        ("PDIT-301", ThresholdSet::high(8.0, 10.0)),
        ("AIT-101", ThresholdSet::high(50.0, 100.0)),
        ("LIT-301", ThresholdSet::high(6.0, 8.0)),
        ("AIT-404", ThresholdSet::new(None, Some(0.5), Some(1.5), Some(2.0))),
    ]
    .into_iter()
    .map(|(tag, set)| (tag.to_owned(), set))
    .collect()
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmConfig {
    #[serde(default = "default_alarm_history_capacity")]
    pub history_capacity: usize,
    /// Simulated time a cleared alarm stays visible before eviction.
    #[serde(default = "default_cleared_retention")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub cleared_retention: Duration,
    #[serde(default = "default_thresholds")]
    pub thresholds: IndexMap<String, ThresholdSet>,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_alarm_history_capacity(),
            cleared_retention: default_cleared_retention(),
            thresholds: default_thresholds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
    #[serde(default = "default_file_output")]
    pub file_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            file_output: default_file_output(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            listen: default_metrics_listen(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_yields_defaults() {
        let config: AppConfig = "".parse().unwrap();
        assert_eq!(config.simulation.tick_interval, Duration::from_millis(500));
        assert_eq!(config.simulation.speed, 1.0);
        assert_eq!(config.historian.capacity, 7_200);
        assert_eq!(config.alarms.history_capacity, 200);
        assert_eq!(config.alarms.cleared_retention, Duration::from_secs(300));
        assert_eq!(
            config.alarms.thresholds.get("AIT-302"),
            Some(&ThresholdSet::high(0.3, 1.0))
        );
    }

    #[test]
    fn sections_override_defaults() {
        let config: AppConfig = r#"
            [simulation]
            tick_interval = 250
            speed = 10.0

            [alarms]
            history_capacity = 50
            cleared_retention = 60

            [alarms.thresholds."AIT-401"]
            l = 0.8
            h = 2.5
        "#
        .parse()
        .unwrap();
        assert_eq!(config.simulation.tick_interval, Duration::from_millis(250));
        assert_eq!(config.simulation.tick_seconds(), 0.25);
        assert_eq!(config.alarms.history_capacity, 50);
        assert_eq!(config.alarms.thresholds.len(), 1);
        let set = config.alarms.thresholds["AIT-401"];
        assert_eq!(set.l, Some(0.8));
        assert_eq!(set.hh, None);
    }

    #[test]
    fn misordered_thresholds_rejected() {
        let err = r#"
            [alarms.thresholds."LIT-101"]
            h = 10.0
            hh = 5.0
        "#
        .parse::<AppConfig>()
        .unwrap_err();
        assert!(format!("{err:#}").contains("LIT-101"));
    }

    #[test]
    fn speed_outside_range_rejected() {
        assert!("[simulation]\nspeed = 500.0".parse::<AppConfig>().is_err());
        assert!("[simulation]\ntick_interval = 0".parse::<AppConfig>().is_err());
    }

    #[test]
    fn load_with_source_uses_first_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wtp.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[historian]\ncapacity = 10").unwrap();

        let missing = dir.path().join("missing.toml");
        let loaded = AppConfig::load_with_source(&[missing, path.clone()]).unwrap();
        assert_eq!(loaded.source, path);
        assert_eq!(loaded.config.historian.capacity, 10);
    }
}
