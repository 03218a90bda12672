//! Request dispatch: owns the settings store and the loaded dataset.

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::GuardError;
use crate::policy;
use crate::query::{self, Queryable, QuerySpec};
use crate::records::Dataset;
use crate::settings::SettingsStore;
use crate::summary;
use crate::tier;
use crate::types::{PolicyDecision, Request};

/// Shared service state. All methods take `&self`; safe to use from many threads.
pub struct Engine {
  settings: SettingsStore,
  data: Dataset,
}

impl Engine {
  pub fn new(settings: SettingsStore, data: Dataset) -> Self {
    Self { settings, data }
  }

  /// Default settings over the built-in sample data.
  pub fn with_sample() -> Result<Self, GuardError> {
    Ok(Self::new(SettingsStore::new(), Dataset::sample()?))
  }

  pub fn settings(&self) -> &SettingsStore {
    &self.settings
  }

  pub fn data(&self) -> &Dataset {
    &self.data
  }

  /// Evaluate a dataset merge request against the current settings.
  pub fn evaluate_merge_request(&self, id: &str) -> Result<Option<PolicyDecision>, GuardError> {
    let Some(mr) = self.data.merge_request(id) else {
      return Ok(None);
    };
    let item = mr.to_scored_item(self.data.is_vulnerability_linked(id));
    let snapshot = self.settings.snapshot();
    policy::evaluate(&item, &snapshot.settings).map(Some)
  }

  /// Handle one request and return its JSON response body.
  pub fn process(&self, request: Request) -> Result<Value, GuardError> {
    match request {
      Request::Classify { score } => {
        let tier = tier::classify(score)?;
        Ok(json!({ "score": score, "tier": tier }))
      }
      Request::Evaluate { item } => {
        let snapshot = self.settings.snapshot();
        to_json(&policy::evaluate(&item, &snapshot.settings)?)
      }
      Request::EvaluateMergeRequest { id } => match self.evaluate_merge_request(&id)? {
        Some(decision) => to_json(&decision),
        None => Err(GuardError::NotFound { id }),
      },
      Request::GetSettings => to_json(&*self.settings.snapshot()),
      Request::ReplaceSettings { settings } => to_json(&*self.settings.replace(settings)?),
      Request::QueryMergeRequests(spec) => run_query(&self.data.merge_requests, spec),
      Request::QueryVulnerabilities(spec) => run_query(&self.data.vulnerabilities, spec),
      Request::QueryFixMergeRequests(spec) => run_query(&self.data.fix_merge_requests, spec),
      Request::QueryLogs(spec) => run_query(&self.data.agent_logs, spec),
      Request::AuditTiers => {
        let mismatches = tier::audit_merge_requests(&self.data.merge_requests)?;
        Ok(json!({ "mismatches": mismatches }))
      }
      Request::Summary => to_json(&summary::summarize(&self.data)?),
    }
  }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, GuardError> {
  Ok(serde_json::to_value(value)?)
}

fn run_query<R>(records: &[R], spec: QuerySpec<R::Field>) -> Result<Value, GuardError>
where
  R: Queryable + Serialize,
  R::Field: Serialize,
{
  let request = spec.into_request(R::default_sort())?;
  let results = query::query(records, &request);
  Ok(json!({
    "sort": request.sort,
    "total": records.len(),
    "count": results.len(),
    "results": results,
  }))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{Action, PolicySettings};

  fn request(line: &str) -> Request {
    serde_json::from_str(line).unwrap()
  }

  #[test]
  fn classify_request() {
    let engine = Engine::with_sample().unwrap();
    let out = engine.process(request(r#"{"op":"classify","score":65}"#)).unwrap();
    assert_eq!(out["tier"], "high");

    let err = engine.process(request(r#"{"op":"classify","score":101}"#)).unwrap_err();
    assert_eq!(err.field(), Some("score"));
  }

  #[test]
  fn evaluate_uses_current_settings() {
    let engine = Engine::with_sample().unwrap();
    let line = r#"{"op":"evaluate","item":{"id":"MR-1","score":80,"changed_paths":["k8s/x.yaml"]}}"#;
    let out = engine.process(request(line)).unwrap();
    assert_eq!(out["exceeds_threshold"], true);
    assert_eq!(out["actions"], json!(["block"]));

    let mut stricter = PolicySettings::default();
    stricter.risk_threshold = 85;
    engine.settings().replace(stricter).unwrap();
    let out = engine.process(request(line)).unwrap();
    assert_eq!(out["exceeds_threshold"], false);
    assert_eq!(out["actions"], json!([]));
  }

  #[test]
  fn dataset_merge_request_links_vulnerabilities() {
    let engine = Engine::with_sample().unwrap();
    let d = engine.evaluate_merge_request("MR-998").unwrap().unwrap();
    assert!(d.has(Action::Block));
    assert!(d.has(Action::CreateFixBranch));
    assert!(d.matches_high_risk_path);

    let d = engine.evaluate_merge_request("MR-1055").unwrap().unwrap();
    assert!(!d.has(Action::CreateFixBranch));

    assert!(engine.evaluate_merge_request("MR-0").unwrap().is_none());
  }

  #[test]
  fn rejected_replace_reports_field() {
    let engine = Engine::with_sample().unwrap();
    let line = r#"{"op":"replace_settings","settings":{
      "risk_threshold":70,"auto_block_high_risk":true,"auto_create_fix_branches":true,
      "require_security_scan_pass":false,"high_risk_paths":["auth/","auth/"]}}"#;
    let err = engine.process(request(line)).unwrap_err();
    assert_eq!(err.field(), Some("high_risk_paths"));
    assert_eq!(engine.settings().get(), PolicySettings::default());
  }

  #[test]
  fn query_response_shape() {
    let engine = Engine::with_sample().unwrap();
    let line = r#"{"op":"query_vulnerabilities","filters":[{"field":"status","value":"pending"}],"sort":"severity"}"#;
    let out = engine.process(request(line)).unwrap();
    assert_eq!(out["total"], 8);
    assert_eq!(out["count"], 5);
    assert_eq!(out["sort"]["direction"], "desc");
    assert_eq!(out["results"][0]["severity"], "critical");
  }

  #[test]
  fn replace_response_is_the_committed_snapshot() {
    let engine = Engine::with_sample().unwrap();
    let line = r#"{"op":"replace_settings","settings":{
      "risk_threshold":65,"auto_block_high_risk":true,"auto_create_fix_branches":false,
      "require_security_scan_pass":true,"high_risk_paths":["payments/"]}}"#;
    let out = engine.process(request(line)).unwrap();
    assert_eq!(out["revision"], 1);
    assert_eq!(out["settings"]["risk_threshold"], 65);
    assert_eq!(out["fingerprint"], json!(engine.settings().snapshot().fingerprint));

    let again = engine.process(request(line)).unwrap();
    assert_eq!(again["revision"], 1);
  }

  #[test]
  fn fix_merge_request_query() {
    let engine = Engine::with_sample().unwrap();
    let line = r#"{"op":"query_fix_merge_requests","filters":[{"field":"target_vuln","value":"CVE-2025-4421"}]}"#;
    let out = engine.process(request(line)).unwrap();
    assert_eq!(out["total"], 5);
    assert_eq!(out["count"], 1);
    assert_eq!(out["results"][0]["id"], "FIX-MR-201");
    assert_eq!(out["sort"]["key"], "created_at");
  }

  #[test]
  fn audit_flags_sample_mismatch() {
    let engine = Engine::with_sample().unwrap();
    let out = engine.process(Request::AuditTiers).unwrap();
    let ids: Vec<_> = out["mismatches"]
      .as_array()
      .unwrap()
      .iter()
      .map(|m| m["id"].as_str().unwrap().to_string())
      .collect();
    assert_eq!(ids, vec!["MR-998"]);
  }
}
