//! TOML-based application configuration.
//!
//! Stores:
//! - Limits on how many groups and timers per group the model accepts
//! - Sequencing behavior when a timer reaches its alarm
//! - Defaults for newly added timers and groups
//!
//! Configuration is stored at `~/.config/rivalt/config.toml` and passed
//! explicitly to [`TimerModel::new`](crate::TimerModel::new).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, CoreError, Result};
use crate::timer::{DisplayType, SoundType, Thresholds};

/// Caps enforced by the model on structural edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_timers_per_group")]
    pub max_timers_per_group: usize,
    #[serde(default = "default_max_groups")]
    pub max_groups: usize,
}

/// What happens when the selected timer reaches its alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencingConfig {
    /// Start the next timer of the same group.
    #[serde(default = "default_true")]
    pub auto_advance_timers: bool,
    /// After the last timer of a group, start the first timer of the next group.
    #[serde(default = "default_true")]
    pub auto_advance_groups: bool,
}

/// Settings given to new groups and timers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_starting_time")]
    pub starting_time_secs: u64,
    #[serde(default = "default_warning_time")]
    pub warning_time_secs: u64,
    #[serde(default = "default_final_time")]
    pub final_time_secs: u64,
    #[serde(default)]
    pub display_type: DisplayType,
    #[serde(default)]
    pub sound_type: SoundType,
    #[serde(default)]
    pub transition_sound_filename: Option<String>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/rivalt/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub sequencing: SequencingConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

// Default functions
fn default_max_timers_per_group() -> usize {
    7
}
fn default_max_groups() -> usize {
    7
}
fn default_true() -> bool {
    true
}
fn default_starting_time() -> u64 {
    300
}
fn default_warning_time() -> u64 {
    60
}
fn default_final_time() -> u64 {
    10
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_timers_per_group: default_max_timers_per_group(),
            max_groups: default_max_groups(),
        }
    }
}

impl Default for SequencingConfig {
    fn default() -> Self {
        Self {
            auto_advance_timers: default_true(),
            auto_advance_groups: default_true(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            starting_time_secs: default_starting_time(),
            warning_time_secs: default_warning_time(),
            final_time_secs: default_final_time(),
            display_type: DisplayType::default(),
            sound_type: SoundType::default(),
            transition_sound_filename: None,
        }
    }
}

impl DefaultsConfig {
    /// Default thresholds, clamped into a valid order.
    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(
            self.starting_time_secs,
            self.warning_time_secs,
            self.final_time_secs,
        )
        .clamped()
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

    fn set_json_value_by_path(root: &mut serde_json::Value, key: &str, value: &str) -> Result<()> {
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".into(),
        };
        let unparsable = |expected: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("cannot parse '{value}' as {expected}"),
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown().into());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|_| unparsable("bool"))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value.parse::<u64>().map_err(|_| unparsable("number"))?.into(),
                    ),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value)
                            .map_err(|e| ConfigError::ParseFailed(format!("{key}: {e}")))?
                    }
                    serde_json::Value::String(_) | serde_json::Value::Null if value == "none" => {
                        serde_json::Value::Null
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown().into())
    }

    /// Default location, `<data dir>/config.toml`.
    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed
    /// or fails validation, or if the default config cannot be written.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if no file exists.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                tracing::info!(path = %path.display(), "loaded config");
                Ok(cfg)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(err) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: err.to_string(),
            }
            .into()),
        }
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default config");
            Self::default()
        })
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// See [`Config::save`].
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        tracing::info!(path = %path.display(), "saved config");
        Ok(())
    }

    /// Check values the model relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for zero limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_timers_per_group == 0 {
            return Err(ConfigError::InvalidValue {
                key: "limits.max_timers_per_group".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.limits.max_groups == 0 {
            return Err(ConfigError::InvalidValue {
                key: "limits.max_groups".into(),
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

    /// Set a config value by dot-separated key. Does not persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result fails validation. `self` is unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| {
            CoreError::Config(ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
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
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn empty_file_matches_default() {
        let parsed: Config = toml::from_str("").unwrap();
        assert_eq!(parsed, Config::default());
        assert!(parsed.sequencing.auto_advance_timers);
        assert!(parsed.sequencing.auto_advance_groups);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [limits]
            max_timers_per_group = 3

            [defaults.sound_type]
            type = "sound_vibrate"
            file = "bell.mp3"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.limits.max_timers_per_group, 3);
        assert_eq!(parsed.limits.max_groups, 7);
        assert!(parsed.sequencing.auto_advance_timers);
        assert_eq!(parsed.defaults.sound_type, SoundType::SoundVibrate("bell.mp3".into()));
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("limits.max_timers_per_group").as_deref(), Some("7"));
        assert_eq!(cfg.get("sequencing.auto_advance_groups").as_deref(), Some("true"));
        assert_eq!(cfg.get("defaults.display_type").as_deref(), Some("numerical"));
        assert!(cfg.get("limits.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("sequencing.auto_advance_groups", "false").unwrap();
        cfg.set("defaults.starting_time_secs", "90").unwrap();
        cfg.set("defaults.display_type", "stoplights").unwrap();
        cfg.set("defaults.sound_type", r#"{"type": "vibrate"}"#).unwrap();
        cfg.set("defaults.transition_sound_filename", "chime.mp3").unwrap();

        assert!(!cfg.sequencing.auto_advance_groups);
        assert_eq!(cfg.defaults.starting_time_secs, 90);
        assert_eq!(cfg.defaults.display_type, DisplayType::Stoplights);
        assert_eq!(cfg.defaults.sound_type, SoundType::Vibrate);
        assert_eq!(cfg.defaults.transition_sound_filename.as_deref(), Some("chime.mp3"));

        cfg.set("defaults.transition_sound_filename", "none").unwrap();
        assert_eq!(cfg.defaults.transition_sound_filename, None);
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_types() {
        let mut cfg = Config::default();
        assert!(cfg.set("limits.nonexistent", "1").is_err());
        assert!(cfg.set("sequencing.auto_advance_timers", "maybe").is_err());
        assert!(cfg.set("defaults.display_type", "sundial").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn set_rejects_zero_limits() {
        let mut cfg = Config::default();
        assert!(cfg.set("limits.max_groups", "0").is_err());
        assert_eq!(cfg.limits.max_groups, 7);
    }

    #[test]
    fn default_thresholds_are_clamped() {
        let mut cfg = Config::default();
        assert_eq!(cfg.defaults.thresholds(), Thresholds::new(300, 60, 10));
        cfg.defaults.warning_time_secs = 500;
        cfg.defaults.final_time_secs = 500;
        assert_eq!(cfg.defaults.thresholds(), Thresholds::new(300, 299, 298));
    }

    #[test]
    fn load_from_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn save_then_load_preserves_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.set("limits.max_timers_per_group", "3").unwrap();
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.limits.max_timers_per_group, 3);
    }

    #[test]
    fn load_from_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[limits]\nmax_groups = 0\n").unwrap();
        assert!(Config::load_from(&path).is_err());
        std::fs::write(&path, "not = [valid").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
