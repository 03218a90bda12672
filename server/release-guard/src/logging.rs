//! Tracing subscriber setup. Logs go to stderr; stdout carries responses.

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LogFormat};

pub const FALLBACK_FILTER: &str = "info";

/// Parse `directive`, falling back to [`FALLBACK_FILTER`]. The parse error is
/// returned so the caller can report it once logging is up.
pub fn build_filter(directive: &str) -> (EnvFilter, Option<ParseError>) {
  match EnvFilter::try_new(directive) {
    Ok(filter) => (filter, None),
    Err(e) => (EnvFilter::new(FALLBACK_FILTER), Some(e)),
  }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(config: &Config) {
  let (filter, rejected) = build_filter(&config.log_filter);
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false);

  let _ = match config.log_format {
    LogFormat::Json => builder.json().try_init(),
    LogFormat::Text => builder.try_init(),
  };

  if let Some(e) = rejected {
    tracing::warn!(
      event = "logging.filter_rejected",
      directive = %config.log_filter,
      fallback = FALLBACK_FILTER,
      error = %e,
    );
  }
}
