// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot event-envelope backfill.
//!
//! Logs written before the hash chain existed carry lines without
//! `event_id`/`event_hash`. The backfill assigns missing ids and rewrites
//! the chain for every events file in the workspace, then records itself
//! in `company/migrations/applied.yaml`. Re-running is a no-op unless
//! forced.

use crate::atomic::atomic_write;
use crate::error::StoreError;
use crate::eventlog::{read_events_jsonl, EventLine};
use crate::records::{list_projects, list_runs, read_yaml, write_yaml};
use crate::workspace::Workspace;
use guild_core::envelope::canonical_event_hash;
use guild_core::EventId;
use serde::{Deserialize, Serialize};

pub const EVENT_ENVELOPE_MIGRATION_ID: &str = "event-envelope-backfill-v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AppliedMigration {
    id: String,
    applied_at: String,
    files_rewritten: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MigrationLedger {
    #[serde(default)]
    applied: Vec<AppliedMigration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackfillOutcome {
    pub applied: bool,
    pub files_rewritten: usize,
    pub lines_backfilled: usize,
}

/// Run the backfill across every run log in the workspace.
pub fn backfill_event_envelopes(
    ws: &Workspace,
    now_iso: &str,
    force: bool,
) -> Result<BackfillOutcome, StoreError> {
    let ledger_path = ws.migrations_ledger();
    let mut ledger: MigrationLedger = match read_yaml(&ledger_path) {
        Ok(l) => l,
        Err(StoreError::NotFound(_)) => MigrationLedger::default(),
        Err(e) => return Err(e),
    };

    if !force && ledger.applied.iter().any(|m| m.id == EVENT_ENVELOPE_MIGRATION_ID) {
        return Ok(BackfillOutcome { applied: false, files_rewritten: 0, lines_backfilled: 0 });
    }

    let mut files_rewritten = 0;
    let mut lines_backfilled = 0;
    for project_id in list_projects(ws) {
        for run_id in list_runs(ws, &project_id) {
            let path = ws.events_jsonl(&project_id, &run_id);
            let backfilled = backfill_one_file(&path)?;
            if backfilled > 0 {
                files_rewritten += 1;
                lines_backfilled += backfilled;
            }
        }
    }

    ledger.applied.push(AppliedMigration {
        id: EVENT_ENVELOPE_MIGRATION_ID.to_string(),
        applied_at: now_iso.to_string(),
        files_rewritten,
    });
    write_yaml(&ledger_path, &ledger)?;

    tracing::info!(files_rewritten, lines_backfilled, "event envelope backfill complete");
    Ok(BackfillOutcome { applied: true, files_rewritten, lines_backfilled })
}

/// Rewrite one file, assigning ids and recomputing the chain.
///
/// Returns the number of lines that needed backfill; 0 means the file was
/// already fully enveloped and was left untouched. Unparseable lines are
/// preserved byte-for-byte in place (they stay visible as parse errors).
fn backfill_one_file(path: &std::path::Path) -> Result<usize, StoreError> {
    let lines = read_events_jsonl(path)?;
    if lines.is_empty() {
        return Ok(0);
    }

    let needs_work = lines.iter().any(|l| match l {
        EventLine::Ok { value, .. } => {
            value.get("event_id").is_none() || value.get("event_hash").is_none()
        }
        EventLine::Err { .. } => false,
    });
    if !needs_work {
        return Ok(0);
    }

    let mut out = String::new();
    let mut prev_hash: Option<String> = None;
    let mut backfilled = 0;
    for line in lines {
        match line {
            EventLine::Ok { mut value, .. } => {
                let map = match value.as_object_mut() {
                    Some(m) => m,
                    None => continue,
                };
                if map.get("event_id").is_none() {
                    map.insert(
                        "event_id".to_string(),
                        serde_json::Value::String(EventId::generate().to_string()),
                    );
                    backfilled += 1;
                } else if map.get("event_hash").is_none() {
                    backfilled += 1;
                }
                map.insert(
                    "prev_event_hash".to_string(),
                    prev_hash.clone().map_or(serde_json::Value::Null, serde_json::Value::String),
                );
                map.remove("event_hash");
                let hash = canonical_event_hash(&value);
                if let Some(map) = value.as_object_mut() {
                    map.insert("event_hash".to_string(), serde_json::Value::String(hash.clone()));
                }
                prev_hash = Some(hash);
                out.push_str(&value.to_string());
                out.push('\n');
            }
            EventLine::Err { raw_line, .. } => {
                out.push_str(&raw_line);
                out.push('\n');
            }
        }
    }

    atomic_write(path, out.as_bytes())?;
    Ok(backfilled)
}

#[cfg(test)]
#[path = "migrate_tests.rs"]
mod tests;
