//! Configuration for hazardwatch.
//!
//! A TOML file at the platform config path, overridable through
//! `HAZARDWATCH_`-prefixed environment variables, translated into a
//! validated `hazardwatch_core::EngineConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use hazardwatch_core::config::{
    DEFAULT_EMERGENCY_MARKERS, DEFAULT_HAZARD_KEYWORDS, DEFAULT_HISTORY_CAPACITY,
};
use hazardwatch_core::{ChannelFlags, Contact, CoreError, EngineConfig, NotificationSettings};

/// Environment variable prefix. Nested keys use a double underscore,
/// e.g. `HAZARDWATCH_HISTORY__CAPACITY=20`.
pub const ENV_PREFIX: &str = "HAZARDWATCH_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<CoreError> for ConfigError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Validation {
                field: "config".into(),
                reason: other.to_string(),
            },
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub notifications: Notifications,

    #[serde(default)]
    pub classifier: Classifier,

    #[serde(default)]
    pub history: History,

    #[serde(default)]
    pub persistence: Persistence,

    #[serde(default)]
    pub operator: Operator,
}

/// Initial notification settings for a session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Notifications {
    #[serde(default = "enabled")]
    pub popup: bool,

    #[serde(default = "enabled")]
    pub audible: bool,

    #[serde(default = "enabled")]
    pub push: bool,

    #[serde(default = "enabled")]
    pub escalation_enabled: bool,

    /// Human-readable duration, e.g. `"5m"` or `"90s"`.
    #[serde(default = "default_escalation_delay")]
    pub escalation_delay: String,

    #[serde(default)]
    pub contacts: Vec<ContactEntry>,
}

impl Default for Notifications {
    fn default() -> Self {
        Self {
            popup: true,
            audible: true,
            push: true,
            escalation_enabled: true,
            escalation_delay: default_escalation_delay(),
            contacts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ContactEntry {
    pub name: String,
    /// Phone number, e-mail or any address the host understands.
    pub address: String,
}

/// Which feed records count as hazards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Classifier {
    #[serde(default = "default_markers")]
    pub emergency_markers: Vec<String>,

    #[serde(default = "default_keywords")]
    pub hazard_keywords: Vec<String>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            emergency_markers: default_markers(),
            hazard_keywords: default_keywords(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct History {
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Persistence {
    /// JSON-lines file emergency records are appended to. Defaults to the
    /// platform data directory.
    pub path: Option<PathBuf>,

    /// Prime the deduplicator with ids already present in the file.
    #[serde(default = "enabled")]
    pub seed_from_log: bool,
}

impl Default for Persistence {
    fn default() -> Self {
        Self {
            path: None,
            seed_from_log: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Operator {
    /// Recorded on acknowledgment records.
    #[serde(default = "default_operator_name")]
    pub name: String,

    #[serde(default = "default_icon")]
    pub icon: String,
}

impl Default for Operator {
    fn default() -> Self {
        Self {
            name: default_operator_name(),
            icon: default_icon(),
        }
    }
}

fn enabled() -> bool {
    true
}
fn default_escalation_delay() -> String {
    "5m".into()
}
fn default_markers() -> Vec<String> {
    DEFAULT_EMERGENCY_MARKERS
        .iter()
        .map(|s| (*s).to_owned())
        .collect()
}
fn default_keywords() -> Vec<String> {
    DEFAULT_HAZARD_KEYWORDS
        .iter()
        .map(|s| (*s).to_owned())
        .collect()
}
fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}
fn default_operator_name() -> String {
    EngineConfig::default().acknowledged_by
}
fn default_icon() -> String {
    EngineConfig::default().notification_icon
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Parsed escalation delay.
    pub fn escalation_delay(&self) -> Result<Duration, ConfigError> {
        parse_delay(&self.notifications.escalation_delay)
    }

    /// Build a validated engine configuration. `seen_ids` is left empty;
    /// the host fills it from its own durable store.
    pub fn to_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let n = &self.notifications;
        let settings = NotificationSettings {
            channels: ChannelFlags {
                popup: n.popup,
                audible: n.audible,
                push: n.push,
            },
            escalation_enabled: n.escalation_enabled,
            escalation_delay: self.escalation_delay()?,
            contacts: n
                .contacts
                .iter()
                .map(|c| Contact {
                    name: c.name.clone(),
                    address: c.address.clone(),
                })
                .collect(),
        };

        let config = EngineConfig {
            settings,
            emergency_markers: self.classifier.emergency_markers.clone(),
            hazard_keywords: self.classifier.hazard_keywords.clone(),
            history_capacity: self.history.capacity,
            notification_icon: self.operator.icon.clone(),
            acknowledged_by: self.operator.name.clone(),
            seen_ids: Vec::new(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Where emergency records go: the configured path, else the
    /// platform data directory.
    pub fn persistence_path(&self) -> PathBuf {
        self.persistence.path.clone().unwrap_or_else(default_log_path)
    }
}

/// Parse a human-readable delay such as `"30s"` or `"5m"`.
pub fn parse_delay(raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw.trim()).map_err(|e| ConfigError::Validation {
        field: "escalation_delay".into(),
        reason: format!("'{raw}' is not a duration: {e}"),
    })
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "hazardwatch", "hazardwatch")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default JSON-lines log for emergency records.
pub fn default_log_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".local/share").join("emergencies.jsonl"),
        |dirs| dirs.data_dir().join("emergencies.jsonl"),
    )
}

fn dirs_fallback(base: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(base);
    p.push("hazardwatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from the canonical path and the environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` (missing file is fine) and the environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if anything goes wrong.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_translate_to_default_engine_config() {
        let engine = Config::default().to_engine_config().unwrap();
        let expected = EngineConfig::default();

        assert_eq!(engine.settings, expected.settings);
        assert_eq!(engine.emergency_markers, expected.emergency_markers);
        assert_eq!(engine.hazard_keywords, expected.hazard_keywords);
        assert_eq!(engine.history_capacity, 50);
        assert_eq!(engine.acknowledged_by, "Manager");
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[notifications]
audible = false
escalation_delay = "90s"

[[notifications.contacts]]
name = "Front desk"
address = "+1 555 0100"

[history]
capacity = 10
"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        let engine = config.to_engine_config().unwrap();

        assert!(!engine.settings.channels.audible);
        assert!(engine.settings.channels.popup);
        assert_eq!(engine.settings.escalation_delay, Duration::from_secs(90));
        assert_eq!(engine.settings.contacts.len(), 1);
        assert_eq!(engine.history_capacity, 10);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.history.capacity, 50);
    }

    #[test]
    fn out_of_range_delay_is_rejected() {
        let mut config = Config::default();
        config.notifications.escalation_delay = "2h".into();
        let err = config.to_engine_config().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "escalation_delay"));

        config.notifications.escalation_delay = "soon".into();
        assert!(config.to_engine_config().is_err());
    }

    #[test]
    fn zero_history_capacity_is_rejected() {
        let mut config = Config::default();
        config.history.capacity = 0;
        assert!(matches!(
            config.to_engine_config(),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.operator.name = "Night shift".into();
        config.persistence.path = Some(dir.path().join("log.jsonl"));
        save_config_to(&config, &path).unwrap();

        assert_eq!(load_config_from(&path).unwrap(), config);
    }
}
