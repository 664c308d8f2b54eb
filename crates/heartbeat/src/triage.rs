// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Triage pass: per-worker signal counts, score, and fingerprint.

use guild_core::{AgentId, HeartbeatConfig, RunStatus, TaskStatus};
use guild_store::{records, EventLine, Workspace};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TriageCounts {
    pub new_signals: u64,
    pub due_tasks: u64,
    pub overdue_tasks: u64,
    pub stuck_jobs: u64,
}

/// The wake score formula.
pub fn score(counts: &TriageCounts, context_unchanged_and_recent_ok: bool, quiet: bool) -> i32 {
    let mut s = 0;
    if counts.new_signals > 0 {
        s += 5;
    }
    if counts.due_tasks > 0 {
        s += 3;
    }
    if counts.overdue_tasks > 0 {
        s += 2;
    }
    if counts.stuck_jobs > 0 {
        s += 4;
    }
    if context_unchanged_and_recent_ok {
        s -= 3;
    }
    if quiet {
        s -= 2;
    }
    s
}

/// SHA-256 over the worker's triage-relevant inputs. An unchanged
/// fingerprint plus a recent `ok` report means nothing new happened.
pub fn context_fingerprint(
    worker_agent_id: &AgentId,
    worker_kind: &str,
    counts: &TriageCounts,
    run_event_cursor_entries: &BTreeMap<String, u64>,
) -> String {
    let payload = serde_json::json!({
        "worker_agent_id": worker_agent_id.as_str(),
        "worker_kind": worker_kind,
        "counts": counts,
        "run_event_cursor_entries": run_event_cursor_entries,
    });
    let mut hasher = Sha256::new();
    hasher.update(payload.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// What the triage pass computed for one worker, with per-project signal
/// attribution for project selection.
#[derive(Debug, Clone, Default)]
pub struct WorkerTriage {
    pub counts: TriageCounts,
    /// Project → signal score contribution for this worker.
    pub project_signals: BTreeMap<String, u64>,
    /// Latest cursor observed per `projectId::runId`, to advance state.
    pub observed_cursors: BTreeMap<String, u64>,
    /// Project of the worker's most recently created run, for wake-target
    /// tie-breaking.
    pub latest_project: Option<String>,
}

/// Scan the workspace for one worker's signals since the stored cursors.
pub fn triage_worker(
    ws: &Workspace,
    worker: &AgentId,
    cursors: &BTreeMap<String, u64>,
    config: &HeartbeatConfig,
    now_ms: u64,
) -> WorkerTriage {
    let mut triage = WorkerTriage::default();
    let due_horizon_ms = u64::from(config.due_horizon_minutes) * 60_000;
    let stuck_ms = u64::from(config.stuck_job_running_minutes) * 60_000;
    let mut latest_run_ms = 0u64;

    for project_id in records::list_projects(ws) {
        let mut failed_attempts_by_task: BTreeMap<String, u64> = BTreeMap::new();

        for run_id in records::list_runs(ws, &project_id) {
            let Ok(run) = records::read_run(ws, &project_id, &run_id) else {
                continue;
            };
            let owned = run.agent_id == *worker;

            // New signal lines since the cursor, from owned runs or runs
            // where this worker acted.
            let key = format!("{project_id}::{run_id}");
            let since = cursors.get(&key).copied().unwrap_or(0);
            if let Ok(lines) = guild_store::read_events_jsonl(&ws.events_jsonl(&project_id, &run_id))
            {
                let mut latest = since;
                for line in &lines {
                    let seq = line.seq();
                    if seq > latest {
                        latest = seq;
                    }
                    if seq <= since {
                        continue;
                    }
                    let by_worker = match line {
                        EventLine::Ok { value, .. } => {
                            value.get("actor").and_then(|a| a.as_str())
                                == Some(worker.as_str())
                        }
                        EventLine::Err { .. } => false,
                    };
                    if owned || by_worker {
                        triage.counts.new_signals += 1;
                        *triage.project_signals.entry(project_id.to_string()).or_default() += 1;
                    }
                }
                triage.observed_cursors.insert(key, latest);
            }

            if owned {
                if let Some(created_ms) = parse_iso_ms(&run.created_at) {
                    if created_ms >= latest_run_ms {
                        latest_run_ms = created_ms;
                        triage.latest_project = Some(project_id.to_string());
                    }
                }
                if run.status == RunStatus::Running {
                    if let Some(started_ms) = parse_iso_ms(&run.created_at) {
                        if now_ms.saturating_sub(started_ms) > stuck_ms {
                            triage.counts.stuck_jobs += 1;
                            *triage.project_signals.entry(project_id.to_string()).or_default() += 1;
                        }
                    }
                }
                if run.status == RunStatus::Failed {
                    if let Some(task_id) = &run.spec.task_id {
                        let attempts =
                            failed_attempts_by_task.entry(task_id.to_string()).or_default();
                        *attempts += 1;
                        if *attempts == 2 {
                            triage.counts.stuck_jobs += 1;
                            *triage.project_signals.entry(project_id.to_string()).or_default() += 1;
                        }
                    }
                }
            }
        }

        for task_id in records::list_tasks(ws, &project_id) {
            let Ok((task, _body)) = records::read_task(ws, &project_id, &task_id) else {
                continue;
            };
            if task.assignee_agent_id.as_ref() != Some(worker) {
                continue;
            }
            if matches!(task.status, TaskStatus::Done | TaskStatus::Canceled) {
                continue;
            }
            let Some(planned_end) = task.schedule.planned_end.as_deref() else {
                continue;
            };
            let Some(end_ms) = parse_iso_ms(planned_end) else {
                continue;
            };
            if end_ms < now_ms {
                triage.counts.overdue_tasks += 1;
                *triage.project_signals.entry(project_id.to_string()).or_default() += 1;
            } else if end_ms <= now_ms + due_horizon_ms {
                triage.counts.due_tasks += 1;
                *triage.project_signals.entry(project_id.to_string()).or_default() += 1;
            }
        }
    }

    triage
}

/// Parse an ISO-8601 timestamp (or bare date) to epoch ms.
pub fn parse_iso_ms(text: &str) -> Option<u64> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return u64::try_from(dt.timestamp_millis()).ok();
    }
    let date = chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    let dt = date.and_hms_opt(0, 0, 0)?.and_utc();
    u64::try_from(dt.timestamp_millis()).ok()
}

#[cfg(test)]
#[path = "triage_tests.rs"]
mod tests;
