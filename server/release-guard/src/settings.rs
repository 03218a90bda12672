//! Live policy settings with validated, all-or-nothing replacement.
//!
//! The current value is an immutable snapshot behind one pointer. Readers
//! clone the `Arc` and never observe a half-written update; writers serialize
//! on the write lock and swap the pointer only after validation passes.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::ValidationError;
use crate::types::PolicySettings;

/// One committed settings value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsSnapshot {
  /// Starts at 0 (defaults) and advances on every effective replace.
  pub revision: u64,
  pub fingerprint: String,
  pub settings: PolicySettings,
}

impl SettingsSnapshot {
  fn new(revision: u64, settings: PolicySettings) -> Self {
    Self {
      revision,
      fingerprint: settings.fingerprint(),
      settings,
    }
  }
}

pub struct SettingsStore {
  current: RwLock<Arc<SettingsSnapshot>>,
}

impl SettingsStore {
  pub fn new() -> Self {
    Self::with_initial(PolicySettings::default())
  }

  /// Start from caller-supplied settings. Validation still applies.
  pub fn try_with(initial: PolicySettings) -> Result<Self, ValidationError> {
    validate(&initial)?;
    Ok(Self::with_initial(initial))
  }

  fn with_initial(initial: PolicySettings) -> Self {
    Self {
      current: RwLock::new(Arc::new(SettingsSnapshot::new(0, initial))),
    }
  }

  /// Last committed settings (or the defaults).
  pub fn get(&self) -> PolicySettings {
    self.snapshot().settings.clone()
  }

  pub fn snapshot(&self) -> Arc<SettingsSnapshot> {
    self.current.read().clone()
  }

  /// Validate and commit `new` as a whole. On error nothing changes.
  ///
  /// Returns the snapshot in effect once the call completes: the one just
  /// committed, or the current one when `new` is equivalent to it (path order
  /// aside), in which case the revision is kept.
  pub fn replace(&self, new: PolicySettings) -> Result<Arc<SettingsSnapshot>, ValidationError> {
    if let Err(e) = validate(&new) {
      tracing::warn!(event = "settings.rejected", field = e.field(), error = %e);
      return Err(e);
    }

    let mut current = self.current.write();
    if current.settings.is_equivalent(&new) {
      tracing::debug!(event = "settings.unchanged", revision = current.revision);
      return Ok(Arc::clone(&*current));
    }

    let next = Arc::new(SettingsSnapshot::new(current.revision + 1, new));
    tracing::info!(
      event = "settings.replaced",
      revision = next.revision,
      fingerprint = %next.fingerprint,
      risk_threshold = next.settings.risk_threshold,
      high_risk_paths = next.settings.high_risk_paths.len(),
    );
    *current = Arc::clone(&next);
    Ok(next)
  }
}

impl Default for SettingsStore {
  fn default() -> Self {
    Self::new()
  }
}

/// Check every constraint on a candidate settings object.
pub fn validate(settings: &PolicySettings) -> Result<(), ValidationError> {
  if !(0..=100).contains(&settings.risk_threshold) {
    return Err(ValidationError::ThresholdOutOfRange {
      threshold: settings.risk_threshold,
    });
  }

  let mut seen = HashSet::new();
  for (index, path) in settings.high_risk_paths.iter().enumerate() {
    if path.trim().is_empty() {
      return Err(ValidationError::EmptyPathEntry { index });
    }
    if !seen.insert(path.as_str()) {
      return Err(ValidationError::DuplicatePathEntry { path: path.clone() });
    }
  }
  Ok(())
}
