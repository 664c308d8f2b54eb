// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash recovery sweep.
//!
//! Runs that were `running` when the server died have no live session
//! after restart. The operator-triggered sweep marks them `failed` and
//! appends a `run.recovered_from_crash` event so the gap is visible in
//! the log.

use crate::error::RuntimeError;
use guild_core::{event_types, EventEnvelope, RunId, RunStatus};
use guild_store::{records, EventLog, Workspace};
use serde_json::json;

/// Sweep every project's runs; `live_run_ids` come from the session
/// runtime. Returns the swept run ids.
pub fn sweep_crashed_runs(
    ws: &Workspace,
    log: &EventLog,
    live_run_ids: &[RunId],
) -> Result<Vec<RunId>, RuntimeError> {
    let mut swept = Vec::new();
    for project_id in records::list_projects(ws) {
        for run_id in records::list_runs(ws, &project_id) {
            let mut run = match records::read_run(ws, &project_id, &run_id) {
                Ok(run) => run,
                Err(e) => {
                    tracing::warn!(%run_id, error = %e, "unreadable run.yaml skipped");
                    continue;
                }
            };
            if run.status != RunStatus::Running || live_run_ids.contains(&run.run_id) {
                continue;
            }

            run.transition(RunStatus::Failed);
            records::write_run(ws, &run)?;
            log.append(
                &ws.events_jsonl(&project_id, &run_id),
                EventEnvelope::new(
                    run.run_id,
                    "",
                    "system",
                    event_types::RUN_RECOVERED_FROM_CRASH,
                    json!({ "swept_to": "failed" }),
                ),
            )?;
            swept.push(run.run_id);
        }
    }
    if !swept.is_empty() {
        tracing::info!(count = swept.len(), "crashed runs recovered");
    }
    Ok(swept)
}

#[cfg(test)]
#[path = "recover_tests.rs"]
mod tests;
