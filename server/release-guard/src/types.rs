//! Core types: tiers, scored items, policy settings and decisions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::query::QuerySpec;
use crate::records::{AgentLogField, FixMergeRequestField, MergeRequestField, VulnerabilityField};

// ---------------------------------------------------------------------------
// Risk tier
// ---------------------------------------------------------------------------

/// Discrete risk/severity bucket. Variant order is the tier order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
  Low,
  Medium,
  High,
  Critical,
}

impl RiskTier {
  pub const ALL: [RiskTier; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Low => "low",
      Self::Medium => "medium",
      Self::High => "high",
      Self::Critical => "critical",
    }
  }

  pub fn from_str_loose(s: &str) -> Option<Self> {
    match s.to_ascii_lowercase().as_str() {
      "low" => Some(Self::Low),
      "medium" | "med" => Some(Self::Medium),
      "high" => Some(Self::High),
      "critical" | "crit" => Some(Self::Critical),
      _ => None,
    }
  }
}

impl fmt::Display for RiskTier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ---------------------------------------------------------------------------
// Scored item (input to policy evaluation)
// ---------------------------------------------------------------------------

/// A change with an externally computed risk score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoredItem {
  pub id: String,
  pub score: i64,
  #[serde(default)]
  pub changed_paths: Vec<String>,
  /// Set by the caller when the change is tied to a known vulnerability.
  #[serde(default)]
  pub vulnerability_linked: bool,
}

// ---------------------------------------------------------------------------
// Policy settings
// ---------------------------------------------------------------------------

/// Live policy configuration. Replaced as a whole, never patched field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicySettings {
  pub risk_threshold: i64,
  pub auto_block_high_risk: bool,
  pub auto_create_fix_branches: bool,
  pub require_security_scan_pass: bool,
  pub high_risk_paths: Vec<String>,
}

/// Threshold presets offered by configuration UIs.
pub const THRESHOLD_PRESETS: [i64; 4] = [50, 65, 75, 85];

impl Default for PolicySettings {
  fn default() -> Self {
    Self {
      risk_threshold: 75,
      auto_block_high_risk: true,
      auto_create_fix_branches: true,
      require_security_scan_pass: false,
      high_risk_paths: vec![
        "auth/".into(),
        "payments/".into(),
        "terraform/".into(),
        "k8s/".into(),
      ],
    }
  }
}

impl PolicySettings {
  /// Same policy: equal scalar fields and the same set of paths.
  pub fn is_equivalent(&self, other: &Self) -> bool {
    self.risk_threshold == other.risk_threshold
      && self.auto_block_high_risk == other.auto_block_high_risk
      && self.auto_create_fix_branches == other.auto_create_fix_branches
      && self.require_security_scan_pass == other.require_security_scan_pass
      && self.sorted_paths() == other.sorted_paths()
  }

  fn sorted_paths(&self) -> Vec<&str> {
    let mut paths: Vec<&str> = self.high_risk_paths.iter().map(String::as_str).collect();
    paths.sort_unstable();
    paths
  }

  /// Stable hex digest of the settings. Path order does not affect it.
  /// For display and tracing; equality checks use [`Self::is_equivalent`].
  pub fn fingerprint(&self) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&self.risk_threshold.to_le_bytes());
    hasher.update(&[
      self.auto_block_high_risk as u8,
      self.auto_create_fix_branches as u8,
      self.require_security_scan_pass as u8,
    ]);
    for p in self.sorted_paths() {
      // Length prefix keeps ["ab","c"] distinct from ["a","bc"].
      hasher.update(&(p.len() as u64).to_le_bytes());
      hasher.update(p.as_bytes());
    }
    let hex = hasher.finalize().to_hex();
    hex[..16].to_string()
  }
}

// ---------------------------------------------------------------------------
// Policy decision (derived, never stored)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
  Block,
  CreateFixBranch,
  RequireScanPass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyDecision {
  pub item_id: String,
  pub tier: RiskTier,
  pub matches_high_risk_path: bool,
  /// Changed paths that hit a high-risk prefix, in input order.
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub matched_paths: Vec<String>,
  pub exceeds_threshold: bool,
  pub actions: BTreeSet<Action>,
  pub settings_fingerprint: String,
}

impl PolicyDecision {
  pub fn has(&self, action: Action) -> bool {
    self.actions.contains(&action)
  }
}

// ---------------------------------------------------------------------------
// Inbound requests (JSON contract, one per stdin line)
// ---------------------------------------------------------------------------

/// One request line. Unknown `op` values fail to parse.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
  Classify { score: i64 },
  Evaluate { item: ScoredItem },
  /// Evaluate a merge request from the loaded dataset by id.
  EvaluateMergeRequest { id: String },
  GetSettings,
  ReplaceSettings { settings: PolicySettings },
  QueryMergeRequests(QuerySpec<MergeRequestField>),
  QueryVulnerabilities(QuerySpec<VulnerabilityField>),
  QueryFixMergeRequests(QuerySpec<FixMergeRequestField>),
  QueryLogs(QuerySpec<AgentLogField>),
  AuditTiers,
  Summary,
}

// ---------------------------------------------------------------------------
// CLI stream wrappers
// ---------------------------------------------------------------------------

/// Structured error output for rejected request lines.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
      field: None,
    }
  }

  pub fn with_field(mut self, field: impl Into<String>) -> Self {
    self.field = Some(field.into());
    self
  }
}
