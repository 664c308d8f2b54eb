// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only run event logs.
//!
//! One `events.jsonl` per run, one JSON envelope per line, chained by
//! SHA-256. Appends are serialized per absolute file path by an
//! in-process mutex; this control plane is single-process, so no
//! cross-process locking exists. Readers never take a lock and treat a
//! trailing partial line as end-of-stream.

mod bus;
mod read;
mod verify;

pub use bus::{LogEvent, RuntimeEventBus};
pub use read::{read_events_jsonl, EventLine};
pub use verify::{replay_run, verify_replay_events, ReplayMode, ReplayReport, VerifyIssue, VerifyIssueCode};

use crate::error::StoreError;
use guild_core::envelope::canonical_event_hash;
use guild_core::{Clock, EventEnvelope};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Object-safe clock facade so the log can be shared without generics.
pub trait SharedClock: Send + Sync {
    fn epoch_ms(&self) -> u64;
    fn iso_now(&self) -> String;
}

impl<C: Clock> SharedClock for C {
    fn epoch_ms(&self) -> u64 {
        Clock::epoch_ms(self)
    }

    fn iso_now(&self) -> String {
        Clock::iso_now(self)
    }
}

/// The append side of the event log, plus the process-local bus.
#[derive(Clone)]
pub struct EventLog {
    locks: Arc<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>>,
    bus: RuntimeEventBus,
    clock: Arc<dyn SharedClock>,
}

impl EventLog {
    pub fn new(clock: Arc<dyn SharedClock>) -> Self {
        Self {
            locks: Arc::new(Mutex::new(HashMap::new())),
            bus: RuntimeEventBus::new(),
            clock,
        }
    }

    /// Log backed by the system clock.
    pub fn system() -> Self {
        Self::new(Arc::new(guild_core::SystemClock))
    }

    pub fn bus(&self) -> &RuntimeEventBus {
        &self.bus
    }

    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(path.to_path_buf()).or_default())
    }

    /// Append one envelope, completing its chain fields.
    ///
    /// Recovers `prev_event_hash` and the monotonic floor from the last
    /// complete line; assigns `ts_monotonic_ms := max(last + 1, now_ms)`;
    /// computes `event_hash`; writes exactly one newline-terminated line.
    /// A partial trailing line left by a crash is overwritten.
    pub fn append(
        &self,
        events_path: &Path,
        mut envelope: EventEnvelope,
    ) -> Result<EventEnvelope, StoreError> {
        let file_lock = self.lock_for(events_path);
        let _guard = file_lock.lock();

        if let Some(parent) = events_path.parent() {
            crate::atomic::ensure_dir(parent)?;
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(events_path)
            .map_err(|e| StoreError::io(events_path, e))?;

        let mut content = Vec::new();
        file.read_to_end(&mut content).map_err(|e| StoreError::io(events_path, e))?;

        // The write position is just after the last newline; anything past
        // it is a torn append from a crash.
        let complete_len = match content.iter().rposition(|&b| b == b'\n') {
            Some(pos) => pos + 1,
            None => 0,
        };

        let (prev_hash, last_mono) = last_chain_state(&content[..complete_len]);

        envelope.prev_event_hash = prev_hash;
        envelope.ts_monotonic_ms = last_mono.map_or_else(
            || self.clock.epoch_ms(),
            |last| (last + 1).max(self.clock.epoch_ms()),
        );
        if envelope.ts_wallclock.is_empty() {
            envelope.ts_wallclock = self.clock.iso_now();
        }

        let mut value =
            serde_json::to_value(&envelope).map_err(|e| StoreError::yaml(events_path, e))?;
        let hash = canonical_event_hash(&value);
        if let Some(map) = value.as_object_mut() {
            map.insert("event_hash".to_string(), serde_json::Value::String(hash.clone()));
        }
        envelope.event_hash = Some(hash);

        let line = value.to_string();
        file.set_len(complete_len as u64).map_err(|e| StoreError::io(events_path, e))?;
        file.seek(SeekFrom::Start(complete_len as u64))
            .map_err(|e| StoreError::io(events_path, e))?;
        file.write_all(line.as_bytes()).map_err(|e| StoreError::io(events_path, e))?;
        file.write_all(b"\n").map_err(|e| StoreError::io(events_path, e))?;
        file.sync_all().map_err(|e| StoreError::io(events_path, e))?;

        self.bus.emit(LogEvent {
            events_file_path: events_path.to_path_buf(),
            event: envelope.clone(),
        });

        Ok(envelope)
    }
}

/// Recover (last event_hash, last ts_monotonic_ms) from complete lines.
///
/// Scans from the end; unparseable lines are skipped, matching the
/// reader's tolerance.
fn last_chain_state(complete: &[u8]) -> (Option<String>, Option<u64>) {
    let text = String::from_utf8_lossy(complete);
    for line in text.lines().rev() {
        if line.trim().is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<serde_json::Value>(line) else {
            continue;
        };
        let hash = value.get("event_hash").and_then(|h| h.as_str()).map(str::to_string);
        let mono = value.get("ts_monotonic_ms").and_then(|t| t.as_u64());
        if hash.is_some() || mono.is_some() {
            return (hash, mono);
        }
    }
    (None, None)
}

#[cfg(test)]
#[path = "append_tests.rs"]
mod tests;
