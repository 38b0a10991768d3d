//! TOML-based application configuration.
//!
//! Stores user preferences for notification behavior and the planners'
//! query windows. Configuration is stored at `~/.config/calwake/config.toml`.

use serde::{Deserialize, Serialize};

use super::data_dir;

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Master switch. When false, the alarm planner no-ops entirely.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub sound: bool,
    #[serde(default = "default_true")]
    pub vibration: bool,
    /// Minutes offered when the user snoozes without picking a duration.
    #[serde(default = "default_snooze_minutes")]
    pub default_snooze_minutes: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/calwake/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub notifications: NotificationsConfig,
    /// How far ahead the alarm planner looks for instances to arm.
    #[serde(default = "default_alarm_window_hours")]
    pub alarm_window_hours: u32,
    /// How far ahead the live planner fetches events. Wider than the alarm
    /// window so a future wake time always exists and the refresh chain
    /// cannot die.
    #[serde(default = "default_live_fetch_days")]
    pub live_fetch_days: u32,
}

fn default_true() -> bool {
    true
}
fn default_snooze_minutes() -> u32 {
    10
}
fn default_alarm_window_hours() -> u32 {
    24
}
fn default_live_fetch_days() -> u32 {
    30
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sound: true,
            vibration: true,
            default_snooze_minutes: default_snooze_minutes(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            notifications: NotificationsConfig::default(),
            alarm_window_hours: default_alarm_window_hours(),
            live_fetch_days: default_live_fetch_days(),
        }
    }
}

impl Config {
    fn path() -> Result<std::path::PathBuf, Box<dyn std::error::Error>> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the defaults on first run.
    ///
    /// # Errors
    /// Returns an error if an existing file fails to parse or the default
    /// cannot be written.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    /// Returns an error if the config cannot be serialized or written.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(Self::path()?, content)?;
        Ok(())
    }

    /// Load config, falling back to defaults on any error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let mut val = &json;
        for part in key.split('.') {
            val = val.get(part)?;
        }
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key and persist.
    ///
    /// # Errors
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut json = serde_json::to_value(&*self)?;
        {
            let mut slot = &mut json;
            for part in key.split('.') {
                slot = slot
                    .get_mut(part)
                    .ok_or_else(|| format!("unknown config key: {key}"))?;
            }
            *slot = match slot {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(value.parse()?),
                serde_json::Value::Number(_) => {
                    serde_json::Value::Number(value.parse::<u64>()?.into())
                }
                _ => serde_json::Value::String(value.to_string()),
            };
        }
        *self = serde_json::from_value(json)?;
        self.save()?;
        Ok(())
    }
}
