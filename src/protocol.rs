//! Worker protocol module
//!
//! Parent and worker exchange newline-delimited JSON messages over the
//! worker's stdin and stdout. Every message carries a `type` tag.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Messages sent from the parent to the worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Run the benchmark `iterations` times and report the total
    Run { id: u64, iterations: u64 },
}

/// Messages sent from the worker back to the parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Timing for a completed request, `total` in nanoseconds
    Result { id: u64, total: u64, iterations: u64 },
    /// The script failed while serving the request
    Error { id: u64, message: String },
}

impl Response {
    /// Id of the request this response answers
    pub fn id(&self) -> u64 {
        match self {
            Response::Result { id, .. } | Response::Error { id, .. } => *id,
        }
    }
}

/// Serialize a message as a single protocol line, newline included
pub fn encode_line<T: Serialize>(message: &T) -> Result<String> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Parse a single protocol line
pub fn decode_line<T: for<'de> Deserialize<'de>>(line: &str) -> Result<T> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(Error::protocol_error("empty line"));
    }

    serde_json::from_str(trimmed)
        .map_err(|e| Error::protocol_error(format!("invalid message '{trimmed}': {e}")))
}
