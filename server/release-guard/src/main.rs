//! Binary entrypoint: read JSON-lines requests from stdin, write one JSON
//! line per request to stdout.
//!
//! Each output line is either the response body or an ErrorOutput, flushed
//! as soon as it is written. Blank lines are skipped.

use release_guard::{logging, stream, Config, Engine, GuardError, SettingsStore};
use std::io;

fn main() {
  let config = Config::from_env();
  logging::init(&config);

  let engine = match build_engine(&config) {
    Ok(e) => e,
    Err(e) => {
      tracing::error!(event = "startup.failed", error = %e);
      std::process::exit(1);
    }
  };
  tracing::info!(
    event = "startup.ready",
    merge_requests = engine.data().merge_requests.len(),
    vulnerabilities = engine.data().vulnerabilities.len(),
    fix_merge_requests = engine.data().fix_merge_requests.len(),
    agent_logs = engine.data().agent_logs.len(),
    settings = %engine.settings().snapshot().fingerprint,
  );

  let stdin = io::stdin();
  let stdout = io::stdout();
  if let Err(e) = stream::run(&engine, stdin.lock(), stdout.lock()) {
    tracing::error!(event = "stream.failed", error = %e);
    std::process::exit(1);
  }
}

fn build_engine(config: &Config) -> Result<Engine, GuardError> {
  let data = config.load_dataset()?;
  let store = match config.load_settings()? {
    Some(initial) => SettingsStore::try_with(initial)?,
    None => SettingsStore::new(),
  };
  Ok(Engine::new(store, data))
}
