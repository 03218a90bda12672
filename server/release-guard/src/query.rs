//! Generic filter / sort / free-text search over record collections.
//!
//! One implementation serves merge requests, vulnerabilities and agent logs.
//! Each record type supplies its accessors through [`Queryable`] and names its
//! filterable fields with a closed enum, so a misspelled field is rejected at
//! the boundary instead of silently matching everything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::GuardError;
use crate::types::RiskTier;

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
  Integer,
  Timestamp,
  Tier,
  Text,
}

/// Resolved value of one record field.
///
/// Values of the same kind compare naturally: integers numerically,
/// timestamps chronologically, tiers by tier order, text lexicographically.
/// `Missing` (an absent optional field) sorts before everything else.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
  Missing,
  Integer(i64),
  Timestamp(DateTime<Utc>),
  Tier(RiskTier),
  Text(String),
}

impl FieldValue {
  pub fn text(s: impl Into<String>) -> Self {
    Self::Text(s.into())
  }

  pub fn optional_text(s: Option<&str>) -> Self {
    s.map(Self::text).unwrap_or(Self::Missing)
  }

  /// Interpret a JSON filter value for a field of `kind`.
  pub fn from_json(kind: FieldKind, value: &serde_json::Value) -> Option<Self> {
    if value.is_null() {
      return Some(Self::Missing);
    }
    match kind {
      FieldKind::Integer => value.as_i64().map(Self::Integer),
      FieldKind::Timestamp => value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| Self::Timestamp(dt.with_timezone(&Utc))),
      FieldKind::Tier => value
        .as_str()
        .and_then(RiskTier::from_str_loose)
        .map(Self::Tier),
      FieldKind::Text => value.as_str().map(Self::text),
    }
  }
}

// ---------------------------------------------------------------------------
// Record capability
// ---------------------------------------------------------------------------

/// A record type's closed set of filterable / sortable fields.
pub trait QueryField: Copy + Ord + fmt::Debug {
  fn name(self) -> &'static str;
  fn kind(self) -> FieldKind;
}

/// Field accessors for one record type.
pub trait Queryable: Clone {
  type Field: QueryField;

  fn value(&self, field: Self::Field) -> FieldValue;

  /// Fields searched by the free-text query.
  fn search_fields(&self) -> Vec<&str>;

  fn default_sort() -> Self::Field;
}

// ---------------------------------------------------------------------------
// Sort state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
  Asc,
  #[default]
  Desc,
}

impl SortDirection {
  pub fn flipped(self) -> Self {
    match self {
      Self::Asc => Self::Desc,
      Self::Desc => Self::Asc,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortState<F> {
  pub key: F,
  pub direction: SortDirection,
}

impl<F: QueryField> SortState<F> {
  /// New keys start descending: highest risk / most recent first.
  pub fn new(key: F) -> Self {
    Self {
      key,
      direction: SortDirection::Desc,
    }
  }

  /// Selecting the active key flips direction; a new key resets to descending.
  pub fn toggle(self, key: F) -> Self {
    if key == self.key {
      Self {
        key,
        direction: self.direction.flipped(),
      }
    } else {
      Self::new(key)
    }
  }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest<F> {
  pub text: Option<String>,
  pub filters: BTreeMap<F, FieldValue>,
  pub sort: SortState<F>,
}

impl<F: QueryField> QueryRequest<F> {
  pub fn new(sort: SortState<F>) -> Self {
    Self {
      text: None,
      filters: BTreeMap::new(),
      sort,
    }
  }

  pub fn with_text(mut self, text: impl Into<String>) -> Self {
    self.text = Some(text.into());
    self
  }

  pub fn with_filter(mut self, field: F, value: FieldValue) -> Self {
    self.filters.insert(field, value);
    self
  }
}

/// Wire form of a query, before field values are checked. Unknown keys are
/// rejected so a misspelled `filters` cannot quietly match everything.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, bound(deserialize = "F: Deserialize<'de>"))]
pub struct QuerySpec<F> {
  #[serde(default)]
  pub text: Option<String>,
  #[serde(default)]
  pub filters: Vec<FilterSpec<F>>,
  #[serde(default)]
  pub sort: Option<F>,
  #[serde(default)]
  pub direction: Option<SortDirection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterSpec<F> {
  pub field: F,
  pub value: serde_json::Value,
}

impl<F: QueryField> QuerySpec<F> {
  /// Check every filter against its field's kind and build the request.
  pub fn into_request(self, default_sort: F) -> Result<QueryRequest<F>, GuardError> {
    let mut filters = BTreeMap::new();
    for f in self.filters {
      let value = FieldValue::from_json(f.field.kind(), &f.value).ok_or_else(|| {
        GuardError::invalid_filter(
          f.field.name(),
          &format!("value {} does not fit a {:?} field", f.value, f.field.kind()),
        )
      })?;
      if filters.insert(f.field, value).is_some() {
        return Err(GuardError::invalid_filter(f.field.name(), "duplicate filter"));
      }
    }

    let key = self.sort.unwrap_or(default_sort);
    let direction = self.direction.unwrap_or_default();
    Ok(QueryRequest {
      text: self.text,
      filters,
      sort: SortState { key, direction },
    })
  }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Ordered records satisfying a request. Owned; later edits to the input do
/// not show through.
pub type QueryResult<R> = Vec<R>;

/// Run a request over `records` without modifying them.
///
/// A record is kept when every filter matches exactly and, for a non-empty
/// text query, at least one search field contains it (case-insensitive).
/// Sorting is stable: records with equal keys keep their input order.
pub fn query<R: Queryable>(records: &[R], request: &QueryRequest<R::Field>) -> QueryResult<R> {
  let needle = request
    .text
    .as_deref()
    .filter(|t| !t.is_empty())
    .map(str::to_lowercase);

  let mut keyed: Vec<(FieldValue, &R)> = records
    .iter()
    .filter(|r| {
      request
        .filters
        .iter()
        .all(|(field, wanted)| r.value(*field) == *wanted)
    })
    .filter(|r| match &needle {
      Some(n) => r
        .search_fields()
        .iter()
        .any(|s| s.to_lowercase().contains(n.as_str())),
      None => true,
    })
    .map(|r| (r.value(request.sort.key), r))
    .collect();

  match request.sort.direction {
    SortDirection::Asc => keyed.sort_by(|a, b| a.0.cmp(&b.0)),
    SortDirection::Desc => keyed.sort_by(|a, b| b.0.cmp(&a.0)),
  }

  tracing::debug!(
    event = "query.executed",
    total = records.len(),
    matched = keyed.len(),
    sort = request.sort.key.name(),
  );

  keyed.into_iter().map(|(_, r)| r.clone()).collect()
}
