//! High-risk path matching: literal, case-sensitive prefix comparison.

/// Pattern applies to path (byte-wise prefix; no globbing, no case folding).
fn path_has_prefix(path: &str, pattern: &str) -> bool {
  !pattern.is_empty() && path.as_bytes().starts_with(pattern.as_bytes())
}

/// True iff any changed path starts with any high-risk pattern.
pub fn matches<P, Q>(changed_paths: &[P], high_risk_paths: &[Q]) -> bool
where
  P: AsRef<str>,
  Q: AsRef<str>,
{
  changed_paths.iter().any(|cp| {
    high_risk_paths
      .iter()
      .any(|hp| path_has_prefix(cp.as_ref(), hp.as_ref()))
  })
}

/// Changed paths that hit at least one pattern, in input order.
pub fn matched_paths<P, Q>(changed_paths: &[P], high_risk_paths: &[Q]) -> Vec<String>
where
  P: AsRef<str>,
  Q: AsRef<str>,
{
  changed_paths
    .iter()
    .map(|cp| cp.as_ref())
    .filter(|cp| high_risk_paths.iter().any(|hp| path_has_prefix(cp, hp.as_ref())))
    .map(str::to_string)
    .collect()
}
