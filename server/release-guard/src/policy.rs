//! Policy evaluation: which automated actions a scored change warrants.
//!
//! Pure decision function. Carrying out the actions (labels, blocks, branch
//! creation) is the job of an external actuator.

use std::collections::BTreeSet;

use crate::error::GuardError;
use crate::paths;
use crate::tier;
use crate::types::{Action, PolicyDecision, PolicySettings, ScoredItem};

/// Evaluate one item against a settings snapshot.
///
/// Path matching is reported for explanation only; `block` is driven by the
/// threshold alone.
pub fn evaluate(item: &ScoredItem, settings: &PolicySettings) -> Result<PolicyDecision, GuardError> {
  if !(0..=100).contains(&settings.risk_threshold) {
    tracing::error!(
      event = "policy.invalid_settings",
      item = %item.id,
      threshold = settings.risk_threshold,
    );
    return Err(GuardError::InvalidSettings {
      threshold: settings.risk_threshold,
    });
  }

  let tier = tier::classify(item.score).map_err(|e| {
    tracing::error!(event = "policy.invalid_score", item = %item.id, score = item.score);
    e
  })?;

  let exceeds_threshold = item.score >= settings.risk_threshold;
  let matched_paths = paths::matched_paths(&item.changed_paths, &settings.high_risk_paths);
  let matches_high_risk_path = !matched_paths.is_empty();

  let mut actions = BTreeSet::new();
  if settings.auto_block_high_risk && exceeds_threshold {
    actions.insert(Action::Block);
  }
  if settings.auto_create_fix_branches && item.vulnerability_linked {
    actions.insert(Action::CreateFixBranch);
  }
  if settings.require_security_scan_pass {
    actions.insert(Action::RequireScanPass);
  }

  Ok(PolicyDecision {
    item_id: item.id.clone(),
    tier,
    matches_high_risk_path,
    matched_paths,
    exceeds_threshold,
    actions,
    settings_fingerprint: settings.fingerprint(),
  })
}
