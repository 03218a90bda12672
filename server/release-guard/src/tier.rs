//! Score-to-tier classification and declared-tier integrity checks.

use serde::Serialize;

use crate::error::GuardError;
use crate::records::MergeRequest;
use crate::types::RiskTier;

/// Inclusive lower bound of each tier above `Low`, highest first.
const TIER_FLOORS: [(i64, RiskTier); 3] = [
  (85, RiskTier::Critical),
  (65, RiskTier::High),
  (40, RiskTier::Medium),
];

/// Map a 0–100 score to its tier. Lower bounds are inclusive (85 is critical).
pub fn classify(score: i64) -> Result<RiskTier, GuardError> {
  if !(0..=100).contains(&score) {
    return Err(GuardError::InvalidScore { score });
  }
  let tier = TIER_FLOORS
    .iter()
    .find(|(floor, _)| score >= *floor)
    .map(|(_, tier)| *tier)
    .unwrap_or(RiskTier::Low);
  Ok(tier)
}

/// A record whose declared tier disagrees with the tier its score implies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierMismatch {
  pub id: String,
  pub score: i64,
  pub declared: RiskTier,
  pub derived: RiskTier,
}

/// Compare a declared tier with the score-derived one. Neither side wins;
/// a disagreement is reported, not corrected.
pub fn check_declared_tier(
  id: &str,
  score: i64,
  declared: RiskTier,
) -> Result<Option<TierMismatch>, GuardError> {
  let derived = classify(score)?;
  if derived == declared {
    return Ok(None);
  }
  Ok(Some(TierMismatch {
    id: id.to_string(),
    score,
    declared,
    derived,
  }))
}

/// Check every merge request and log each disagreement.
pub fn audit_merge_requests(records: &[MergeRequest]) -> Result<Vec<TierMismatch>, GuardError> {
  let mut out = Vec::new();
  for mr in records {
    if let Some(m) = check_declared_tier(&mr.id, mr.risk_score, mr.risk_level)? {
      tracing::warn!(
        event = "tier.mismatch",
        id = %m.id,
        score = m.score,
        declared = %m.declared,
        derived = %m.derived,
        "declared tier disagrees with score"
      );
      out.push(m);
    }
  }
  Ok(out)
}
