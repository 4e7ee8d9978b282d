//! TOML-based application configuration.
//!
//! Stores:
//! - Defaults applied to newly created programs
//! - Logging level for the CLI
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;

use super::data_dir;
use crate::error::{ConfigError, Result};
use crate::program::{default_daily_focus_slots, DistributionPolicy, Program};

/// Defaults for `program create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramDefaults {
    #[serde(default)]
    pub distribution: DistributionPolicy,
    #[serde(default)]
    pub include_weekends: bool,
    #[serde(default = "default_daily_focus_slots")]
    pub daily_focus_slots: u32,
    #[serde(default = "default_length_days")]
    pub length_days: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `warn` or `coachflow_core=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: ProgramDefaults,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_length_days() -> u32 {
    28
}
fn default_log_level() -> String {
    "warn".into()
}

impl Default for ProgramDefaults {
    fn default() -> Self {
        Self {
            distribution: DistributionPolicy::default(),
            include_weekends: false,
            daily_focus_slots: default_daily_focus_slots(),
            length_days: default_length_days(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ProgramDefaults {
    /// Stamp these defaults onto a freshly created program.
    pub fn apply(&self, program: &mut Program) {
        program.distribution = self.distribution;
        program.include_weekends = self.include_weekends;
        program.daily_focus_slots = self.daily_focus_slots;
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
    ) -> std::result::Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let (parent_path, leaf) = match key.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        if let Some(parent_path) = parent_path {
            for part in parent_path.split('.') {
                current = current.get_mut(part).ok_or_else(unknown)?;
            }
        }

        let obj = current.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(leaf).ok_or_else(unknown)?;

        let new_value = match existing {
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                value
                    .parse::<bool>()
                    .map_err(|e| invalid(e.to_string()))?,
            ),
            serde_json::Value::Number(_) => {
                let n = value
                    .parse::<u64>()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                serde_json::Value::Number(n.into())
            }
            _ => serde_json::Value::String(value.into()),
        };

        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the default file on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::path()?)
    }

    /// Write to `<data_dir>/config.toml`.
    pub fn save(&self) -> Result<()> {
        self.save_to(Self::path()?)
    }

    fn load_from(path: PathBuf) -> Result<Self> {
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                ConfigError::LoadFailed {
                    path,
                    message: e.to_string(),
                }
                .into()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }
            .into()),
        }
    }

    fn save_to(&self, path: PathBuf) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Get a value by dot path (`defaults.include_weekends`) as a string.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match Self::get_json_value_by_path(&json, key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot path. The value is parsed according to the type of
    /// the existing field and the result must still form a valid config.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// All leaf keys with their current values, in dot-path form.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let path = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&path, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out.sort();
        out
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
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
        assert_eq!(parsed.defaults.daily_focus_slots, 2);
        assert_eq!(parsed.defaults.distribution, DistributionPolicy::Spread);
        assert_eq!(parsed.logging.level, "warn");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[defaults]\ninclude_weekends = true\n").unwrap();
        assert!(parsed.defaults.include_weekends);
        assert_eq!(parsed.defaults.length_days, 28);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("defaults.include_weekends").as_deref(), Some("false"));
        assert_eq!(cfg.get("defaults.distribution").as_deref(), Some("spread"));
        assert_eq!(cfg.get("logging.level").as_deref(), Some("warn"));
        assert!(cfg.get("defaults.missing").is_none());
    }

    #[test]
    fn set_updates_typed_values() {
        let mut cfg = Config::default();
        cfg.set("defaults.include_weekends", "true").unwrap();
        cfg.set("defaults.daily_focus_slots", "3").unwrap();
        cfg.set("defaults.distribution", "first_day").unwrap();
        assert!(cfg.defaults.include_weekends);
        assert_eq!(cfg.defaults.daily_focus_slots, 3);
        assert_eq!(cfg.defaults.distribution, DistributionPolicy::FirstDay);
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_values() {
        let mut cfg = Config::default();
        assert!(cfg.set("defaults.nope", "1").is_err());
        assert!(cfg.set("defaults.include_weekends", "maybe").is_err());
        assert!(cfg.set("defaults.distribution", "weekly").is_err());
        assert!(!cfg.defaults.include_weekends);
    }

    #[test]
    fn entries_lists_leaf_keys() {
        let entries = Config::default().entries();
        assert!(entries.contains(&("logging.level".to_string(), "warn".to_string())));
        assert!(entries
            .iter()
            .any(|(k, _)| k == "defaults.length_days"));
    }

    #[test]
    fn defaults_apply_to_program() {
        let mut defaults = ProgramDefaults::default();
        defaults.include_weekends = true;
        defaults.distribution = DistributionPolicy::AllDays;
        let mut program = Program::new("org", "P", 7);
        defaults.apply(&mut program);
        assert!(program.include_weekends);
        assert_eq!(program.distribution, DistributionPolicy::AllDays);
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = Config::load_from(path.clone()).unwrap();
        assert_eq!(cfg.defaults.length_days, 28);
        assert!(path.exists());
    }

    #[test]
    fn unreadable_file_is_an_error_not_first_use() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be cannot be read as text.
        let path = dir.path().join("config.toml");
        std::fs::create_dir(&path).unwrap();

        let err = Config::load_from(path.clone()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::CoreError::Config(ConfigError::LoadFailed { .. })
        ));
        assert!(path.is_dir());
    }

    #[test]
    fn existing_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[defaults]\nlength_days = 42\n").unwrap();

        let cfg = Config::load_from(path.clone()).unwrap();
        assert_eq!(cfg.defaults.length_days, 42);
        assert!(std::fs::read_to_string(&path).unwrap().contains("42"));
    }
}
