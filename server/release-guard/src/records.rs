//! Record collections: merge requests, vulnerabilities, automated fix merge
//! requests and agent activity logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::query::{FieldKind, FieldValue, QueryField, Queryable};
use crate::types::{RiskTier, ScoredItem};

// ---------------------------------------------------------------------------
// Merge requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MrStatus {
  Safe,
  Review,
  Blocked,
}

impl MrStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Safe => "safe",
      Self::Review => "review",
      Self::Blocked => "blocked",
    }
  }
}

/// Qualitative impact estimate; opaque, supplied with the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlastRadius {
  Low,
  Medium,
  High,
}

impl BlastRadius {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Low => "Low",
      Self::Medium => "Medium",
      Self::High => "High",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRequest {
  pub id: String,
  pub title: String,
  pub author: String,
  pub project: String,
  pub risk_score: i64,
  /// Tier as recorded upstream; checked against `risk_score`, never trusted blindly.
  pub risk_level: RiskTier,
  pub blast_radius: BlastRadius,
  #[serde(default)]
  pub labels: Vec<String>,
  pub status: MrStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  #[serde(default)]
  pub risk_reasons: Vec<String>,
  #[serde(default)]
  pub affected_files: Vec<String>,
  #[serde(default)]
  pub suggested_action: String,
  #[serde(default)]
  pub url: Option<String>,
}

impl MergeRequest {
  /// Policy input for this MR. `vulnerability_linked` comes from the caller.
  pub fn to_scored_item(&self, vulnerability_linked: bool) -> ScoredItem {
    ScoredItem {
      id: self.id.clone(),
      score: self.risk_score,
      changed_paths: self.affected_files.clone(),
      vulnerability_linked,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeRequestField {
  Id,
  Title,
  Author,
  Project,
  RiskScore,
  RiskLevel,
  BlastRadius,
  Status,
  CreatedAt,
  UpdatedAt,
}

impl QueryField for MergeRequestField {
  fn name(self) -> &'static str {
    match self {
      Self::Id => "id",
      Self::Title => "title",
      Self::Author => "author",
      Self::Project => "project",
      Self::RiskScore => "risk_score",
      Self::RiskLevel => "risk_level",
      Self::BlastRadius => "blast_radius",
      Self::Status => "status",
      Self::CreatedAt => "created_at",
      Self::UpdatedAt => "updated_at",
    }
  }

  fn kind(self) -> FieldKind {
    match self {
      Self::RiskScore => FieldKind::Integer,
      Self::RiskLevel => FieldKind::Tier,
      Self::CreatedAt | Self::UpdatedAt => FieldKind::Timestamp,
      _ => FieldKind::Text,
    }
  }
}

impl Queryable for MergeRequest {
  type Field = MergeRequestField;

  fn value(&self, field: MergeRequestField) -> FieldValue {
    use MergeRequestField as F;
    match field {
      F::Id => FieldValue::text(&self.id),
      F::Title => FieldValue::text(&self.title),
      F::Author => FieldValue::text(&self.author),
      F::Project => FieldValue::text(&self.project),
      F::RiskScore => FieldValue::Integer(self.risk_score),
      F::RiskLevel => FieldValue::Tier(self.risk_level),
      F::BlastRadius => FieldValue::text(self.blast_radius.as_str()),
      F::Status => FieldValue::text(self.status.as_str()),
      F::CreatedAt => FieldValue::Timestamp(self.created_at),
      F::UpdatedAt => FieldValue::Timestamp(self.updated_at),
    }
  }

  fn search_fields(&self) -> Vec<&str> {
    vec![
      self.title.as_str(),
      self.project.as_str(),
      self.author.as_str(),
      self.id.as_str(),
    ]
  }

  fn default_sort() -> MergeRequestField {
    MergeRequestField::RiskScore
  }
}

// ---------------------------------------------------------------------------
// Vulnerabilities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VulnStatus {
  Fixed,
  Pending,
}

impl VulnStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Fixed => "fixed",
      Self::Pending => "pending",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
  pub id: String,
  pub cve_id: String,
  pub package_name: String,
  pub installed_version: String,
  pub fixed_version: String,
  pub severity: RiskTier,
  pub status: VulnStatus,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub related_mr_id: Option<String>,
  pub project: String,
  pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VulnerabilityField {
  Id,
  CveId,
  PackageName,
  Severity,
  Status,
  Project,
  RelatedMrId,
  DetectedAt,
}

impl QueryField for VulnerabilityField {
  fn name(self) -> &'static str {
    match self {
      Self::Id => "id",
      Self::CveId => "cve_id",
      Self::PackageName => "package_name",
      Self::Severity => "severity",
      Self::Status => "status",
      Self::Project => "project",
      Self::RelatedMrId => "related_mr_id",
      Self::DetectedAt => "detected_at",
    }
  }

  fn kind(self) -> FieldKind {
    match self {
      Self::Severity => FieldKind::Tier,
      Self::DetectedAt => FieldKind::Timestamp,
      _ => FieldKind::Text,
    }
  }
}

impl Queryable for Vulnerability {
  type Field = VulnerabilityField;

  fn value(&self, field: VulnerabilityField) -> FieldValue {
    use VulnerabilityField as F;
    match field {
      F::Id => FieldValue::text(&self.id),
      F::CveId => FieldValue::text(&self.cve_id),
      F::PackageName => FieldValue::text(&self.package_name),
      F::Severity => FieldValue::Tier(self.severity),
      F::Status => FieldValue::text(self.status.as_str()),
      F::Project => FieldValue::text(&self.project),
      F::RelatedMrId => FieldValue::optional_text(self.related_mr_id.as_deref()),
      F::DetectedAt => FieldValue::Timestamp(self.detected_at),
    }
  }

  fn search_fields(&self) -> Vec<&str> {
    vec![
      self.cve_id.as_str(),
      self.package_name.as_str(),
      self.project.as_str(),
    ]
  }

  fn default_sort() -> VulnerabilityField {
    VulnerabilityField::DetectedAt
  }
}

// ---------------------------------------------------------------------------
// Fix merge requests (opened automatically to patch a vulnerability)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixMrStatus {
  Open,
  Merged,
  Closed,
}

impl FixMrStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Open => "open",
      Self::Merged => "merged",
      Self::Closed => "closed",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixMergeRequest {
  pub id: String,
  pub title: String,
  /// CVE id of the vulnerability this change patches.
  pub target_vuln: String,
  pub project: String,
  pub status: FixMrStatus,
  pub created_at: DateTime<Utc>,
  pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixMergeRequestField {
  Id,
  Title,
  TargetVuln,
  Project,
  Status,
  CreatedAt,
}

impl QueryField for FixMergeRequestField {
  fn name(self) -> &'static str {
    match self {
      Self::Id => "id",
      Self::Title => "title",
      Self::TargetVuln => "target_vuln",
      Self::Project => "project",
      Self::Status => "status",
      Self::CreatedAt => "created_at",
    }
  }

  fn kind(self) -> FieldKind {
    match self {
      Self::CreatedAt => FieldKind::Timestamp,
      _ => FieldKind::Text,
    }
  }
}

impl Queryable for FixMergeRequest {
  type Field = FixMergeRequestField;

  fn value(&self, field: FixMergeRequestField) -> FieldValue {
    use FixMergeRequestField as F;
    match field {
      F::Id => FieldValue::text(&self.id),
      F::Title => FieldValue::text(&self.title),
      F::TargetVuln => FieldValue::text(&self.target_vuln),
      F::Project => FieldValue::text(&self.project),
      F::Status => FieldValue::text(self.status.as_str()),
      F::CreatedAt => FieldValue::Timestamp(self.created_at),
    }
  }

  fn search_fields(&self) -> Vec<&str> {
    vec![
      self.title.as_str(),
      self.project.as_str(),
      self.target_vuln.as_str(),
      self.id.as_str(),
    ]
  }

  fn default_sort() -> FixMergeRequestField {
    FixMergeRequestField::CreatedAt
  }
}

// ---------------------------------------------------------------------------
// Agent activity logs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogActionType {
  RiskScorePosted,
  MrLabeled,
  MergeBlocked,
  FixBranchCreated,
  FixMrCreated,
}

impl LogActionType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::RiskScorePosted => "risk_score_posted",
      Self::MrLabeled => "mr_labeled",
      Self::MergeBlocked => "merge_blocked",
      Self::FixBranchCreated => "fix_branch_created",
      Self::FixMrCreated => "fix_mr_created",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogResult {
  Success,
  Warning,
  Error,
}

impl LogResult {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Success => "success",
      Self::Warning => "warning",
      Self::Error => "error",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentLog {
  pub id: String,
  pub timestamp: DateTime<Utc>,
  pub project: String,
  pub mr_id: String,
  pub action_type: LogActionType,
  pub result: LogResult,
  pub message: String,
  #[serde(default)]
  pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentLogField {
  Id,
  Timestamp,
  Project,
  MrId,
  ActionType,
  Result,
}

impl QueryField for AgentLogField {
  fn name(self) -> &'static str {
    match self {
      Self::Id => "id",
      Self::Timestamp => "timestamp",
      Self::Project => "project",
      Self::MrId => "mr_id",
      Self::ActionType => "action_type",
      Self::Result => "result",
    }
  }

  fn kind(self) -> FieldKind {
    match self {
      Self::Timestamp => FieldKind::Timestamp,
      _ => FieldKind::Text,
    }
  }
}

impl Queryable for AgentLog {
  type Field = AgentLogField;

  fn value(&self, field: AgentLogField) -> FieldValue {
    use AgentLogField as F;
    match field {
      F::Id => FieldValue::text(&self.id),
      F::Timestamp => FieldValue::Timestamp(self.timestamp),
      F::Project => FieldValue::text(&self.project),
      F::MrId => FieldValue::text(&self.mr_id),
      F::ActionType => FieldValue::text(self.action_type.as_str()),
      F::Result => FieldValue::text(self.result.as_str()),
    }
  }

  fn search_fields(&self) -> Vec<&str> {
    vec![self.project.as_str(), self.message.as_str()]
  }

  fn default_sort() -> AgentLogField {
    AgentLogField::Timestamp
  }
}

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// The collections a listing UI reads from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
  #[serde(default)]
  pub merge_requests: Vec<MergeRequest>,
  #[serde(default)]
  pub vulnerabilities: Vec<Vulnerability>,
  #[serde(default)]
  pub fix_merge_requests: Vec<FixMergeRequest>,
  #[serde(default)]
  pub agent_logs: Vec<AgentLog>,
}

const SAMPLE_JSON: &str = include_str!("../data/sample.json");

impl Dataset {
  /// Built-in sample data.
  pub fn sample() -> Result<Self, serde_json::Error> {
    serde_json::from_str(SAMPLE_JSON)
  }

  /// True when some vulnerability points at this merge request.
  pub fn is_vulnerability_linked(&self, mr_id: &str) -> bool {
    self
      .vulnerabilities
      .iter()
      .any(|v| v.related_mr_id.as_deref() == Some(mr_id))
  }

  pub fn merge_request(&self, id: &str) -> Option<&MergeRequest> {
    self.merge_requests.iter().find(|mr| mr.id == id)
  }

  /// Fix merge requests opened against a CVE.
  pub fn fixes_for(&self, cve_id: &str) -> impl Iterator<Item = &FixMergeRequest> + '_ {
    let cve_id = cve_id.to_string();
    self
      .fix_merge_requests
      .iter()
      .filter(move |f| f.target_vuln == cve_id)
  }

  /// Policy inputs for every merge request, vulnerability links resolved.
  pub fn scored_items(&self) -> Vec<ScoredItem> {
    self
      .merge_requests
      .iter()
      .map(|mr| mr.to_scored_item(self.is_vulnerability_linked(&mr.id)))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::query::{query, QueryRequest, SortDirection, SortState};

  fn sample() -> Dataset {
    Dataset::sample().unwrap()
  }

  #[test]
  fn sample_data_loads() {
    let data = sample();
    assert_eq!(data.merge_requests.len(), 8);
    assert_eq!(data.vulnerabilities.len(), 8);
    assert_eq!(data.fix_merge_requests.len(), 5);
    assert_eq!(data.agent_logs.len(), 15);
  }

  #[test]
  fn fix_merge_requests_newest_first_and_filter_by_status() {
    let data = sample();
    let req = QueryRequest::new(SortState::new(FixMergeRequest::default_sort()));
    let ids: Vec<_> = query(&data.fix_merge_requests, &req).into_iter().map(|f| f.id).collect();
    assert_eq!(
      ids,
      vec!["FIX-MR-203", "FIX-MR-202", "FIX-MR-201", "FIX-MR-198", "FIX-MR-195"]
    );

    let merged = QueryRequest::new(SortState::new(FixMergeRequestField::CreatedAt))
      .with_filter(FixMergeRequestField::Status, FieldValue::text("merged"));
    let out = query(&data.fix_merge_requests, &merged);
    assert_eq!(out.len(), 2);
    assert!(out.iter().all(|f| f.status == FixMrStatus::Merged));

    let req = QueryRequest::new(SortState::new(FixMergeRequestField::CreatedAt)).with_text("PYJWT");
    assert_eq!(query(&data.fix_merge_requests, &req)[0].id, "FIX-MR-203");
  }

  #[test]
  fn every_fix_targets_a_known_vulnerability() {
    let data = sample();
    for fix in &data.fix_merge_requests {
      assert!(
        data.vulnerabilities.iter().any(|v| v.cve_id == fix.target_vuln),
        "{} targets unknown {}",
        fix.id,
        fix.target_vuln
      );
    }
    assert_eq!(data.fixes_for("CVE-2025-6677").count(), 1);
    assert_eq!(data.fixes_for("CVE-2025-1102").count(), 0);
  }

  #[test]
  fn merge_requests_default_to_highest_risk_first() {
    let data = sample();
    let req = QueryRequest::new(SortState::new(MergeRequest::default_sort()));
    let out = query(&data.merge_requests, &req);
    assert_eq!(out[0].id, "MR-1041");
    assert_eq!(out.last().unwrap().id, "MR-1080");
  }

  #[test]
  fn merge_request_search_covers_title_project_author_id() {
    let data = sample();
    let sort = SortState::new(MergeRequestField::RiskScore);
    for (needle, expected) in [
      ("pkce", "MR-1041"),
      ("SERVICES/NOTIF", "MR-1033"),
      ("lena", "MR-1067"),
      ("mr-1055", "MR-1055"),
    ] {
      let out = query(&data.merge_requests, &QueryRequest::new(sort).with_text(needle));
      assert_eq!(out.len(), 1, "needle {}", needle);
      assert_eq!(out[0].id, expected);
    }
  }

  #[test]
  fn merge_request_filters_by_status_and_tier() {
    let data = sample();
    let req = QueryRequest::new(SortState::new(MergeRequestField::CreatedAt))
      .with_filter(MergeRequestField::Status, FieldValue::text("blocked"));
    let ids: Vec<_> = query(&data.merge_requests, &req).into_iter().map(|m| m.id).collect();
    assert_eq!(ids, vec!["MR-1072", "MR-1041"]);

    let req = QueryRequest::new(SortState::new(MergeRequestField::RiskScore))
      .with_filter(MergeRequestField::RiskLevel, FieldValue::Tier(RiskTier::Low));
    assert_eq!(query(&data.merge_requests, &req).len(), 3);
  }

  #[test]
  fn tier_fields_sort_by_tier_order() {
    let data = sample();
    let mut req = QueryRequest::new(SortState::new(VulnerabilityField::Severity));
    req.sort.direction = SortDirection::Asc;
    let out = query(&data.vulnerabilities, &req);
    assert_eq!(out.first().unwrap().severity, RiskTier::Low);
    assert_eq!(out.last().unwrap().severity, RiskTier::Critical);
  }

  #[test]
  fn vulnerability_search_ignores_description() {
    let data = sample();
    let sort = SortState::new(VulnerabilityField::DetectedAt);
    assert_eq!(query(&data.vulnerabilities, &QueryRequest::new(sort).with_text("psycopg")).len(), 1);
    assert!(query(&data.vulnerabilities, &QueryRequest::new(sort).with_text("SSH handshake")).is_empty());
  }

  #[test]
  fn logs_filter_by_action_and_search_message() {
    let data = sample();
    let req = QueryRequest::new(SortState::new(AgentLogField::Timestamp))
      .with_filter(AgentLogField::ActionType, FieldValue::text("merge_blocked"));
    let out = query(&data.agent_logs, &req);
    assert_eq!(out.len(), 2);
    assert!(out.iter().all(|l| l.action_type == LogActionType::MergeBlocked));

    let req = QueryRequest::new(SortState::new(AgentLogField::Timestamp)).with_text("webhook delay");
    assert_eq!(query(&data.agent_logs, &req)[0].id, "log-010");
  }

  #[test]
  fn vulnerability_links_resolve_from_related_mr() {
    let data = sample();
    assert!(data.is_vulnerability_linked("MR-998"));
    assert!(data.is_vulnerability_linked("MR-1041"));
    assert!(!data.is_vulnerability_linked("MR-1067"));

    let items = data.scored_items();
    let mr = items.iter().find(|i| i.id == "MR-1041").unwrap();
    assert!(mr.vulnerability_linked);
    assert_eq!(mr.score, 94);
  }
}
