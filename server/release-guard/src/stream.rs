//! JSON-lines request loop: one request per input line, one response line
//! per request. Blank lines are skipped.

use serde::Serialize;
use std::io::{self, BufRead, Write};

use crate::engine::Engine;
use crate::types::{ErrorOutput, Request};

/// One output line: the response body or an ErrorOutput.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
  Body(serde_json::Value),
  Error(ErrorOutput),
}

impl Response {
  pub fn is_error(&self) -> bool {
    matches!(self, Self::Error(_))
  }
}

/// Answer one input line. `None` for blank lines.
pub fn respond(engine: &Engine, line: &str) -> Option<Response> {
  let trimmed = line.trim();
  if trimmed.is_empty() {
    return None;
  }

  let request: Request = match serde_json::from_str(trimmed) {
    Ok(r) => r,
    Err(e) => {
      tracing::warn!(event = "request.unparsed", error = %e);
      return Some(Response::Error(ErrorOutput::new(format!("json parse: {}", e))));
    }
  };

  Some(match engine.process(request) {
    Ok(body) => Response::Body(body),
    Err(e) => {
      tracing::debug!(event = "request.failed", error = %e);
      let mut err = ErrorOutput::new(e.to_string());
      if let Some(field) = e.field() {
        err = err.with_field(field);
      }
      Response::Error(err)
    }
  })
}

/// Serve `reader` until EOF. Every response is flushed before the next line
/// is read. Fails only on I/O errors.
pub fn run<R: BufRead, W: Write>(engine: &Engine, reader: R, mut writer: W) -> io::Result<()> {
  for line in reader.lines() {
    let line = line?;
    if let Some(response) = respond(engine, &line) {
      serde_json::to_writer(&mut writer, &response)?;
      writer.write_all(b"\n")?;
      writer.flush()?;
    }
  }
  Ok(())
}
