// Runtime configuration and sensor registry overrides
use crate::domain::sensor::{Preset, SensorDefinition, SensorRegistry};
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PitwallConfig {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub acquisition: AcquisitionSettings,
    #[serde(default)]
    pub alerts: AlertSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AcquisitionSettings {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlertSettings {
    #[serde(default = "default_retention_minutes")]
    pub retention_minutes: i64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:3000/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_token_path() -> PathBuf {
    PathBuf::from("config/session.token")
}

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_retention_minutes() -> i64 {
    crate::application::alert_service::DEFAULT_RETENTION_MINUTES
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            token_path: default_token_path(),
        }
    }
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            retention_minutes: default_retention_minutes(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Load `config/pitwall.toml`; a missing file falls back to defaults.
pub fn load_pitwall_config() -> anyhow::Result<PitwallConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/pitwall").required(false))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[derive(Debug, Deserialize)]
struct SensorsFile {
    #[serde(default)]
    sensors: Vec<SensorDefinition>,
    #[serde(default)]
    presets: HashMap<String, Vec<String>>,
}

/// Load the sensor registry, preferring an override file over the built-in
/// table. A present-but-malformed override is a startup error, never a
/// silent fallback.
pub fn load_sensor_registry(path: &Path) -> anyhow::Result<SensorRegistry> {
    if !path.exists() {
        return Ok(SensorRegistry::default());
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading sensor registry {}", path.display()))?;
    let file: SensorsFile = toml::from_str(&raw)
        .with_context(|| format!("parsing sensor registry {}", path.display()))?;

    let mut presets: Vec<Preset> = file
        .presets
        .into_iter()
        .map(|(name, sensor_ids)| Preset { name, sensor_ids })
        .collect();
    presets.sort_by(|a, b| a.name.cmp(&b.name));

    SensorRegistry::new(file.sensors, presets)
        .with_context(|| format!("validating sensor registry {}", path.display()))
}
