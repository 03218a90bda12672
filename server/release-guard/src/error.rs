//! Structured error types for the release guard core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuardError {
  #[error("invalid score: {score} (expected 0..=100)")]
  InvalidScore { score: i64 },

  #[error("invalid settings: risk_threshold {threshold} (expected 0..=100)")]
  InvalidSettings { threshold: i64 },

  #[error("validation: {0}")]
  Validation(#[from] ValidationError),

  #[error("invalid filter: {field}: {reason}")]
  InvalidFilter { field: String, reason: String },

  #[error("not found: {id}")]
  NotFound { id: String },

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),

  #[error("io: {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },
}

impl GuardError {
  pub fn invalid_filter(field: &str, reason: &str) -> Self {
    Self::InvalidFilter {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
    Self::Io {
      path: path.into(),
      source,
    }
  }

  /// Field a caller should highlight, when the error is tied to one.
  pub fn field(&self) -> Option<&str> {
    match self {
      Self::InvalidScore { .. } => Some("score"),
      Self::InvalidSettings { .. } => Some("risk_threshold"),
      Self::Validation(v) => Some(v.field()),
      Self::InvalidFilter { field, .. } => Some(field.as_str()),
      Self::NotFound { .. } => Some("id"),
      Self::Json(_) | Self::Io { .. } => None,
    }
  }
}

/// A rejected settings replacement. Each variant names one violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("risk_threshold: {threshold} is outside 0..=100")]
  ThresholdOutOfRange { threshold: i64 },

  #[error("high_risk_paths[{index}]: must not be empty")]
  EmptyPathEntry { index: usize },

  #[error("high_risk_paths: duplicate entry {path:?}")]
  DuplicatePathEntry { path: String },
}

impl ValidationError {
  pub fn field(&self) -> &'static str {
    match self {
      Self::ThresholdOutOfRange { .. } => "risk_threshold",
      Self::EmptyPathEntry { .. } | Self::DuplicatePathEntry { .. } => "high_risk_paths",
    }
  }
}
