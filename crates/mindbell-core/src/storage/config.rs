//! TOML-based application configuration.
//!
//! Stores:
//! - Wakeup delay and reason code
//! - Notification preferences
//! - Wake service limits and the watch loop poll interval
//!
//! Configuration is stored at `<data dir>/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{ConfigError, Result};
use crate::wakeup::{ReasonCode, Settings};

/// Wakeup request configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeupConfig {
    #[serde(default = "default_delay_secs")]
    pub delay_secs: i64,
    #[serde(default)]
    pub reason: ReasonCode,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub vibration: bool,
}

/// Wake service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub wakeup: WakeupConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

/// Longest accepted `wakeup.delay_secs`: one day.
pub const MAX_DELAY_SECS: i64 = 24 * 60 * 60;

// Default functions
fn default_delay_secs() -> i64 {
    240
}
fn default_true() -> bool {
    true
}
fn default_max_pending() -> usize {
    super::wake_service::DEFAULT_MAX_PENDING
}
fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for WakeupConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_delay_secs(),
            reason: 0,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { vibration: true }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_pending: default_max_pending(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => value
                    .parse::<i64>()
                    .map(|n| serde_json::Value::Number(n.into()))
                    .map_err(|_| invalid(format!("cannot parse '{value}' as integer")))?,
                serde_json::Value::Object(_) => return Err(unknown()),
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wakeup.delay_secs < 0 {
            return Err(ConfigError::InvalidValue {
                key: "wakeup.delay_secs".into(),
                message: format!("{} is negative", self.wakeup.delay_secs),
            });
        }
        if self.wakeup.delay_secs > MAX_DELAY_SECS {
            return Err(ConfigError::InvalidValue {
                key: "wakeup.delay_secs".into(),
                message: format!(
                    "{} exceeds the maximum of {MAX_DELAY_SECS}",
                    self.wakeup.delay_secs
                ),
            });
        }
        if self.service.max_pending == 0 {
            return Err(ConfigError::InvalidValue {
                key: "service.max_pending".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.service.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "service.poll_interval_ms".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not parse or
    /// validate. On error `self` is unchanged.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Scheduler settings derived from the `[wakeup]` section.
    ///
    /// # Errors
    ///
    /// Returns an error if the config does not validate.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        self.validate()?;
        let delay = chrono::Duration::try_seconds(self.wakeup.delay_secs).ok_or_else(|| {
            ConfigError::InvalidValue {
                key: "wakeup.delay_secs".into(),
                message: format!("{} is out of range", self.wakeup.delay_secs),
            }
        })?;
        Ok(Settings {
            delay,
            reason: self.wakeup.reason,
        })
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.service.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.wakeup.delay_secs, 240);
        assert_eq!(parsed.service.max_pending, 8);
        assert!(parsed.notifications.vibration);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[wakeup]\ndelay_secs = 11\n").unwrap();
        assert_eq!(parsed.wakeup.delay_secs, 11);
        assert_eq!(parsed.wakeup.reason, 0);
        assert_eq!(parsed.service.poll_interval_ms, 1000);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("wakeup.delay_secs").as_deref(), Some("240"));
        assert_eq!(cfg.get("notifications.vibration").as_deref(), Some("true"));
        assert!(cfg.get("wakeup.missing_key").is_none());
    }

    #[test]
    fn set_parses_by_existing_type() {
        let mut cfg = Config::default();
        cfg.set("wakeup.delay_secs", "11").unwrap();
        cfg.set("notifications.vibration", "false").unwrap();
        assert_eq!(cfg.wakeup.delay_secs, 11);
        assert!(!cfg.notifications.vibration);
        assert_eq!(cfg.settings().unwrap().delay, chrono::Duration::seconds(11));
    }

    #[test]
    fn set_rejects_unknown_and_invalid() {
        let mut cfg = Config::default();
        assert!(cfg.set("wakeup.nope", "1").is_err());
        assert!(cfg.set("wakeup", "1").is_err());
        assert!(cfg.set("wakeup.delay_secs", "soon").is_err());
        assert!(cfg.set("wakeup.delay_secs", "-1").is_err());
        assert!(cfg.set("service.max_pending", "0").is_err());
        assert_eq!(cfg.wakeup.delay_secs, 240);
    }

    #[test]
    fn delay_is_bounded() {
        let mut cfg = Config::default();
        cfg.set("wakeup.delay_secs", &MAX_DELAY_SECS.to_string()).unwrap();
        assert_eq!(
            cfg.settings().unwrap().delay,
            chrono::Duration::seconds(MAX_DELAY_SECS)
        );

        assert!(cfg.set("wakeup.delay_secs", "100000000000000").is_err());
        assert!(cfg.set("wakeup.delay_secs", "9223372036854775807").is_err());
        assert_eq!(cfg.wakeup.delay_secs, MAX_DELAY_SECS);

        cfg.wakeup.delay_secs = i64::MAX;
        assert!(matches!(
            cfg.settings(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn load_from_writes_defaults_on_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.wakeup.delay_secs, 240);
        assert!(path.exists());

        std::fs::write(&path, "[wakeup]\ndelay_secs = 30\n").unwrap();
        assert_eq!(Config::load_from(&path).unwrap().wakeup.delay_secs, 30);

        std::fs::write(&path, "[wakeup]\ndelay_secs = -30\n").unwrap();
        assert!(Config::load_from(&path).is_err());

        std::fs::write(&path, "[wakeup]\ndelay_secs = 9223372036854775807\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
