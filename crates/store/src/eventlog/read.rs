// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tolerant JSONL reader.
//!
//! Readers never abort on a bad line: malformed lines come back as
//! `EventLine::Err` and iteration continues. A final line without a
//! terminating newline is a torn append and is not surfaced at all.

use crate::error::StoreError;
use std::io::Read;
use std::path::Path;

/// One line of an events file, 1-based `seq`.
#[derive(Debug, Clone)]
pub enum EventLine {
    Ok { seq: u64, value: serde_json::Value },
    Err { seq: u64, raw_line: String, error: String },
}

impl EventLine {
    pub fn seq(&self) -> u64 {
        match self {
            EventLine::Ok { seq, .. } | EventLine::Err { seq, .. } => *seq,
        }
    }

    pub fn value(&self) -> Option<&serde_json::Value> {
        match self {
            EventLine::Ok { value, .. } => Some(value),
            EventLine::Err { .. } => None,
        }
    }
}

/// Read every complete line of an events file.
///
/// A missing file reads as empty — callers decide whether absence is an
/// error.
pub fn read_events_jsonl(path: &Path) -> Result<Vec<EventLine>, StoreError> {
    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    let mut content = Vec::new();
    file.read_to_end(&mut content).map_err(|e| StoreError::io(path, e))?;
    Ok(parse_complete_lines(&content))
}

/// Parse the newline-terminated prefix of a JSONL buffer.
pub fn parse_complete_lines(content: &[u8]) -> Vec<EventLine> {
    let complete_len = match content.iter().rposition(|&b| b == b'\n') {
        Some(pos) => pos + 1,
        None => 0,
    };

    let mut out = Vec::new();
    let mut seq = 0u64;
    for raw in content[..complete_len].split(|&b| b == b'\n') {
        if raw.is_empty() {
            continue;
        }
        seq += 1;
        let line = String::from_utf8_lossy(raw);
        match serde_json::from_str::<serde_json::Value>(&line) {
            Ok(value) if value.is_object() => out.push(EventLine::Ok { seq, value }),
            Ok(_) => out.push(EventLine::Err {
                seq,
                raw_line: line.into_owned(),
                error: "line is not a JSON object".to_string(),
            }),
            Err(e) => out.push(EventLine::Err {
                seq,
                raw_line: line.into_owned(),
                error: e.to_string(),
            }),
        }
    }
    out
}

#[cfg(test)]
#[path = "read_tests.rs"]
mod tests;
