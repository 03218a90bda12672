//! Dashboard headline numbers derived from the record collections.

use serde::Serialize;

use crate::error::GuardError;
use crate::records::{Dataset, FixMrStatus, LogActionType, LogResult, MergeRequest, VulnStatus};
use crate::tier;
use crate::types::RiskTier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeverityCount {
  pub severity: RiskTier,
  pub count: usize,
}

/// Length of the dashboard's high-risk list.
pub const RECENT_HIGH_RISK_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
  pub total_merge_requests: usize,
  /// Merge requests whose score classifies as high or critical.
  pub high_risk_merge_requests: usize,
  pub vulnerabilities_detected: usize,
  pub pending_vulnerabilities: usize,
  pub merge_blocks_applied: usize,
  /// Entries in the fix merge request collection.
  pub fix_mrs_generated: usize,
  pub open_fix_mrs: usize,
  /// Vulnerabilities per severity, critical first.
  pub severity_distribution: Vec<SeverityCount>,
  /// First high-risk merge requests in dataset order.
  pub recent_high_risk: Vec<MergeRequest>,
}

fn successful_logs(data: &Dataset, action: LogActionType) -> usize {
  data
    .agent_logs
    .iter()
    .filter(|l| l.action_type == action && l.result == LogResult::Success)
    .count()
}

pub fn summarize(data: &Dataset) -> Result<DashboardStats, GuardError> {
  let mut high_risk = Vec::new();
  for mr in &data.merge_requests {
    if tier::classify(mr.risk_score)? >= RiskTier::High {
      high_risk.push(mr);
    }
  }

  let severity_distribution = RiskTier::ALL
    .iter()
    .rev()
    .map(|&severity| SeverityCount {
      severity,
      count: data
        .vulnerabilities
        .iter()
        .filter(|v| v.severity == severity)
        .count(),
    })
    .collect();

  Ok(DashboardStats {
    total_merge_requests: data.merge_requests.len(),
    high_risk_merge_requests: high_risk.len(),
    vulnerabilities_detected: data.vulnerabilities.len(),
    pending_vulnerabilities: data
      .vulnerabilities
      .iter()
      .filter(|v| v.status == VulnStatus::Pending)
      .count(),
    merge_blocks_applied: successful_logs(data, LogActionType::MergeBlocked),
    fix_mrs_generated: data.fix_merge_requests.len(),
    open_fix_mrs: data
      .fix_merge_requests
      .iter()
      .filter(|f| f.status == FixMrStatus::Open)
      .count(),
    severity_distribution,
    recent_high_risk: high_risk
      .into_iter()
      .take(RECENT_HIGH_RISK_LIMIT)
      .cloned()
      .collect(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sample_summary() {
    let stats = summarize(&Dataset::sample().unwrap()).unwrap();
    assert_eq!(stats.total_merge_requests, 8);
    assert_eq!(stats.high_risk_merge_requests, 4);
    assert_eq!(stats.vulnerabilities_detected, 8);
    assert_eq!(stats.pending_vulnerabilities, 5);
    assert_eq!(stats.merge_blocks_applied, 2);
    assert_eq!(stats.fix_mrs_generated, 5);
    assert_eq!(stats.open_fix_mrs, 3);

    let recent: Vec<_> = stats.recent_high_risk.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(recent, vec!["MR-1041", "MR-998", "MR-1055", "MR-1072"]);

    let dist: Vec<_> = stats
      .severity_distribution
      .iter()
      .map(|s| (s.severity, s.count))
      .collect();
    assert_eq!(
      dist,
      vec![
        (RiskTier::Critical, 2),
        (RiskTier::High, 2),
        (RiskTier::Medium, 3),
        (RiskTier::Low, 1),
      ]
    );
  }

  #[test]
  fn empty_dataset_is_all_zero() {
    let stats = summarize(&Dataset::default()).unwrap();
    assert_eq!(stats.total_merge_requests, 0);
    assert!(stats.severity_distribution.iter().all(|s| s.count == 0));
    assert!(stats.recent_high_risk.is_empty());
  }

  #[test]
  fn recent_high_risk_is_capped() {
    let mut data = Dataset::sample().unwrap();
    let template = data.merge_requests[0].clone();
    for i in 0..4 {
      let mut mr = template.clone();
      mr.id = format!("MR-9{}", i);
      mr.risk_score = 65;
      data.merge_requests.push(mr);
    }
    let stats = summarize(&data).unwrap();
    assert_eq!(stats.high_risk_merge_requests, 8);
    assert_eq!(stats.recent_high_risk.len(), RECENT_HIGH_RISK_LIMIT);
    assert_eq!(stats.recent_high_risk[4].id, "MR-90");
  }
}
