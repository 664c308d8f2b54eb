// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event envelope written to every run's events.jsonl.
//!
//! Envelopes form a hash chain: `event_hash` is the SHA-256 of the
//! envelope's canonical JSON with the `event_hash` key absent, and
//! `prev_event_hash` repeats the previous line's `event_hash` (null on the
//! first line). Canonical JSON here means serde_json's default map
//! serialization, which orders keys lexicographically — re-serializing a
//! parsed line therefore reproduces the exact bytes that were hashed, even
//! when the line carries envelope keys this build does not know about.

use crate::actor::Visibility;
use crate::id::{EventId, RunId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Current envelope schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// One event line in a run log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub schema_version: u32,
    pub event_id: EventId,
    /// Wallclock ISO-8601 timestamp; informational only.
    pub ts_wallclock: String,
    /// Strictly increasing per file; the ordering authority.
    pub ts_monotonic_ms: u64,
    pub run_id: RunId,
    /// Opaque handle of the live session that produced this event.
    pub session_ref: String,
    pub correlation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causation_id: Option<String>,
    /// Agent id, `human:<id>`, or `system`.
    pub actor: String,
    pub visibility: Visibility,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Previous line's `event_hash`; null on line 1.
    pub prev_event_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_hash: Option<String>,
}

impl EventEnvelope {
    /// Build an unhashed envelope with schema defaults.
    ///
    /// `ts_monotonic_ms`, `prev_event_hash`, and `event_hash` are assigned
    /// by the event log at append time.
    pub fn new(
        run_id: RunId,
        session_ref: impl Into<String>,
        actor: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            event_id: EventId::generate(),
            ts_wallclock: String::new(),
            ts_monotonic_ms: 0,
            run_id,
            session_ref: session_ref.into(),
            correlation_id: run_id.to_string(),
            causation_id: None,
            actor: actor.into(),
            visibility: Visibility::Team,
            event_type: event_type.into(),
            payload,
            prev_event_hash: None,
            event_hash: None,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_causation(mut self, causation_id: impl Into<String>) -> Self {
        self.causation_id = Some(causation_id.into());
        self
    }
}

/// SHA-256 over the canonical JSON of an event object with `event_hash`
/// removed. Operates on the raw parsed value so unknown envelope keys
/// participate in the hash.
pub fn canonical_event_hash(event: &serde_json::Value) -> String {
    let mut stripped = event.clone();
    if let Some(map) = stripped.as_object_mut() {
        map.remove("event_hash");
    }
    let canonical = stripped.to_string();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
