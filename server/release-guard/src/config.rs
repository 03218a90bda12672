//! Process configuration with sane defaults, overridable from the environment.

use std::path::PathBuf;

use crate::error::GuardError;
use crate::records::Dataset;
use crate::types::PolicySettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Text,
  Json,
}

#[derive(Debug, Clone)]
pub struct Config {
  /// `tracing_subscriber::EnvFilter` directive, e.g. `info` or `release_guard=debug`.
  pub log_filter: String,
  pub log_format: LogFormat,
  /// Dataset to serve instead of the built-in sample.
  pub data_path: Option<PathBuf>,
  /// Settings committed at start instead of the defaults.
  pub settings_path: Option<PathBuf>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      log_filter: "info".into(),
      log_format: LogFormat::Text,
      data_path: None,
      settings_path: None,
    }
  }
}

impl Config {
  pub fn from_env() -> Self {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Build from any key lookup; unset or empty keys keep their defaults.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    let defaults = Self::default();
    Self {
      log_filter: get("RELEASE_GUARD_LOG").unwrap_or(defaults.log_filter),
      log_format: match get("RELEASE_GUARD_LOG_FORMAT").as_deref() {
        Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => defaults.log_format,
      },
      data_path: get("RELEASE_GUARD_DATA").map(PathBuf::from),
      settings_path: get("RELEASE_GUARD_SETTINGS").map(PathBuf::from),
    }
  }

  pub fn load_dataset(&self) -> Result<Dataset, GuardError> {
    match &self.data_path {
      Some(path) => {
        let raw = std::fs::read_to_string(path)
          .map_err(|e| GuardError::io(path.display().to_string(), e))?;
        Ok(serde_json::from_str(&raw)?)
      }
      None => Ok(Dataset::sample()?),
    }
  }

  /// Settings file contents, if one is configured. Not yet validated.
  pub fn load_settings(&self) -> Result<Option<PolicySettings>, GuardError> {
    let Some(path) = &self.settings_path else {
      return Ok(None);
    };
    let raw = std::fs::read_to_string(path)
      .map_err(|e| GuardError::io(path.display().to_string(), e))?;
    Ok(Some(serde_json::from_str(&raw)?))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();
    move |key: &str| map.get(key).cloned()
  }

  #[test]
  fn defaults_when_unset() {
    let config = Config::from_lookup(lookup(&[]));
    assert_eq!(config.log_filter, "info");
    assert_eq!(config.log_format, LogFormat::Text);
    assert!(config.data_path.is_none());
    assert!(config.settings_path.is_none());
  }

  #[test]
  fn env_overrides() {
    let config = Config::from_lookup(lookup(&[
      ("RELEASE_GUARD_LOG", "release_guard=debug"),
      ("RELEASE_GUARD_LOG_FORMAT", "JSON"),
      ("RELEASE_GUARD_DATA", "/tmp/data.json"),
      ("RELEASE_GUARD_SETTINGS", ""),
    ]));
    assert_eq!(config.log_filter, "release_guard=debug");
    assert_eq!(config.log_format, LogFormat::Json);
    assert_eq!(config.data_path, Some(PathBuf::from("/tmp/data.json")));
    assert!(config.settings_path.is_none());
  }

  #[test]
  fn missing_data_file_is_io_error() {
    let config = Config {
      data_path: Some(PathBuf::from("/definitely/not/here.json")),
      ..Config::default()
    };
    let err = config.load_dataset().unwrap_err();
    assert!(matches!(err, GuardError::Io { .. }));
  }

  #[test]
  fn sample_used_without_data_path() {
    let data = Config::default().load_dataset().unwrap();
    assert!(!data.merge_requests.is_empty());
  }
}
