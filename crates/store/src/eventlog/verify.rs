// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replay and chain verification.

use super::read::{read_events_jsonl, EventLine};
use crate::error::StoreError;
use guild_core::envelope::canonical_event_hash;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Verification issue classes, in the order checks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyIssueCode {
    MissingKey,
    InvalidEventHash,
    PrevHashChainMismatch,
    NonmonotonicTs,
    DuplicateEventId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyIssue {
    pub code: VerifyIssueCode,
    /// 1-based line number the issue was found at.
    pub seq: u64,
    pub detail: String,
}

/// Keys every envelope line must carry.
const REQUIRED_KEYS: [&str; 8] = [
    "schema_version",
    "event_id",
    "ts_wallclock",
    "ts_monotonic_ms",
    "run_id",
    "type",
    "prev_event_hash",
    "event_hash",
];

/// Verify a parsed event stream: required keys, hash re-derivation, chain
/// continuity, monotonic timestamps, and id uniqueness.
pub fn verify_replay_events(events: &[(u64, serde_json::Value)]) -> Vec<VerifyIssue> {
    let mut issues = Vec::new();
    let mut prev_hash: Option<String> = None;
    let mut prev_mono: Option<u64> = None;
    let mut seen_ids: HashSet<String> = HashSet::new();

    for (position, (seq, event)) in events.iter().enumerate() {
        let mut keys_ok = true;
        for key in REQUIRED_KEYS {
            if event.get(key).is_none() {
                keys_ok = false;
                issues.push(VerifyIssue {
                    code: VerifyIssueCode::MissingKey,
                    seq: *seq,
                    detail: format!("missing key: {key}"),
                });
            }
        }

        if let Some(hash) = event.get("event_hash").and_then(|h| h.as_str()) {
            let derived = canonical_event_hash(event);
            if derived != hash {
                issues.push(VerifyIssue {
                    code: VerifyIssueCode::InvalidEventHash,
                    seq: *seq,
                    detail: format!("stored {hash}, derived {derived}"),
                });
            }
        }

        let prev_field = event.get("prev_event_hash").map(|v| v.as_str().map(str::to_string));
        if keys_ok {
            let expected = if position == 0 { None } else { prev_hash.clone() };
            let actual = prev_field.clone().flatten();
            if actual != expected {
                issues.push(VerifyIssue {
                    code: VerifyIssueCode::PrevHashChainMismatch,
                    seq: *seq,
                    detail: format!("expected {expected:?}, found {actual:?}"),
                });
            }
        }

        if let Some(mono) = event.get("ts_monotonic_ms").and_then(|t| t.as_u64()) {
            if let Some(prev) = prev_mono {
                if mono <= prev {
                    issues.push(VerifyIssue {
                        code: VerifyIssueCode::NonmonotonicTs,
                        seq: *seq,
                        detail: format!("{mono} after {prev}"),
                    });
                }
            }
            prev_mono = Some(mono);
        }

        if let Some(id) = event.get("event_id").and_then(|i| i.as_str()) {
            if !seen_ids.insert(id.to_string()) {
                issues.push(VerifyIssue {
                    code: VerifyIssueCode::DuplicateEventId,
                    seq: *seq,
                    detail: id.to_string(),
                });
            }
        }

        prev_hash = event.get("event_hash").and_then(|h| h.as_str()).map(str::to_string);
    }

    issues
}

/// How much scrutiny a replay applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayMode {
    /// Parsed events only.
    Raw,
    /// Parse plus chain verification.
    Verified,
    /// Verified, asserting no parse or verification issues.
    Deterministic,
    /// Verified, with current session status attached by the caller.
    Live,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayReport {
    pub mode: ReplayMode,
    pub events: Vec<serde_json::Value>,
    /// (seq, error) for lines that did not parse.
    pub parse_errors: Vec<(u64, String)>,
    pub issues: Vec<VerifyIssue>,
    /// Set in `deterministic` mode (and `verified`, informationally).
    pub deterministic_ok: Option<bool>,
    /// Filled by the session runtime in `live` mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_status: Option<guild_core::RunStatus>,
}

/// Replay one events file under the requested mode.
pub fn replay_run(events_path: &Path, mode: ReplayMode) -> Result<ReplayReport, StoreError> {
    let lines = read_events_jsonl(events_path)?;

    let mut events = Vec::new();
    let mut parsed = Vec::new();
    let mut parse_errors = Vec::new();
    for line in lines {
        match line {
            EventLine::Ok { seq, value } => {
                events.push(value.clone());
                parsed.push((seq, value));
            }
            EventLine::Err { seq, error, .. } => parse_errors.push((seq, error)),
        }
    }

    let issues = match mode {
        ReplayMode::Raw => Vec::new(),
        ReplayMode::Verified | ReplayMode::Deterministic | ReplayMode::Live => {
            verify_replay_events(&parsed)
        }
    };

    let deterministic_ok = match mode {
        ReplayMode::Raw => None,
        _ => Some(parse_errors.is_empty() && issues.is_empty()),
    };

    Ok(ReplayReport { mode, events, parse_errors, issues, deterministic_ok, live_status: None })
}

#[cfg(test)]
#[path = "verify_tests.rs"]
mod tests;
