// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rebuild and incremental sync.
//!
//! Both operations hold the workspace's sync mutex for their whole
//! duration, so concurrent callers serialize; the second caller observes
//! the first caller's result as a no-op delta. Events files are consumed
//! incrementally from a per-run cursor; every other file is re-projected
//! whenever its fingerprint changes.

use crate::error::IndexError;
use crate::fingerprint::Fingerprint;
use crate::schema;
use guild_core::{ArtifactHeader, ProjectId, Review, Run, RunId, Task};
use guild_store::eventlog::EventLine;
use guild_store::{records, Workspace};
use parking_lot::Mutex;
use rusqlite::{params, OptionalExtension, Transaction};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

/// Artifact types that enter the approval inbox.
const APPROVABLE_TYPES: [&str; 3] =
    ["memory_delta", "milestone_report", "heartbeat_action_proposal"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SyncOutcome {
    pub files_updated: usize,
    pub rows_deleted: usize,
    pub events_appended: usize,
}

/// Per-workspace sync mutexes, process-wide.
fn workspace_lock(root: &std::path::Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    let locks = LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut map = locks.lock();
    Arc::clone(map.entry(root.to_path_buf()).or_default())
}

/// Full scan: wipe every derived row, then project the whole workspace.
pub fn rebuild_sqlite_index(ws: &Workspace) -> Result<SyncOutcome, IndexError> {
    let lock = workspace_lock(ws.root());
    let _guard = lock.lock();
    let mut conn = schema::open(&ws.index_db())?;
    let tx = conn.transaction()?;
    for table in [
        "file_fingerprints",
        "event_cursors",
        "runs",
        "events",
        "event_parse_errors",
        "artifacts",
        "reviews",
        "pending_approvals",
        "review_decisions",
        "tasks",
        "task_milestones",
        "agent_counters",
    ] {
        tx.execute(&format!("DELETE FROM {table}"), [])?;
    }
    let outcome = project_workspace(&tx, ws)?;
    tx.commit()?;
    tracing::info!(ws = %ws.root().display(), ?outcome, "index rebuilt");
    Ok(outcome)
}

/// Incremental sync driven by fingerprints and event cursors.
pub fn sync_sqlite_index(ws: &Workspace) -> Result<SyncOutcome, IndexError> {
    let lock = workspace_lock(ws.root());
    let _guard = lock.lock();
    let mut conn = schema::open(&ws.index_db())?;
    let tx = conn.transaction()?;
    let outcome = project_workspace(&tx, ws)?;
    tx.commit()?;
    Ok(outcome)
}

fn stored_fingerprints(tx: &Transaction<'_>) -> Result<HashMap<String, String>, IndexError> {
    let mut stmt = tx.prepare("SELECT path, fingerprint FROM file_fingerprints")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
    let mut map = HashMap::new();
    for row in rows {
        let (path, fp) = row?;
        map.insert(path, fp);
    }
    Ok(map)
}

/// Project every canonical file whose fingerprint changed; handle
/// deletions for files that vanished.
fn project_workspace(tx: &Transaction<'_>, ws: &Workspace) -> Result<SyncOutcome, IndexError> {
    let mut outcome = SyncOutcome::default();
    let mut stored = stored_fingerprints(tx)?;

    for project_id in records::list_projects(ws) {
        // tasks
        for task_id in records::list_tasks(ws, &project_id) {
            let path = ws.task_md(&project_id, &task_id);
            let rel = rel_path(ws, &path);
            if let Some(fp) = Fingerprint::of(&path) {
                if stored.remove(&rel).as_deref() != Some(fp.encode().as_str()) {
                    if let Ok((task, _body)) = records::read_task(ws, &project_id, &task_id) {
                        upsert_task(tx, &task)?;
                        outcome.files_updated += 1;
                    } else {
                        tracing::warn!(%task_id, "unparseable task skipped");
                    }
                    set_fingerprint(tx, &rel, &fp)?;
                }
            }
        }

        // artifacts
        for artifact_id in records::list_artifacts(ws, &project_id) {
            let path = ws.artifact_md(&project_id, &artifact_id);
            let rel = rel_path(ws, &path);
            if let Some(fp) = Fingerprint::of(&path) {
                if stored.remove(&rel).as_deref() != Some(fp.encode().as_str()) {
                    if let Ok((header, _body)) = records::read_artifact(ws, &project_id, &artifact_id)
                    {
                        upsert_artifact(tx, &header)?;
                        outcome.files_updated += 1;
                    } else {
                        tracing::warn!(%artifact_id, "unparseable artifact skipped");
                    }
                    set_fingerprint(tx, &rel, &fp)?;
                }
            }
        }

        // runs + events
        for run_id in records::list_runs(ws, &project_id) {
            let run_path = ws.run_yaml(&project_id, &run_id);
            let rel = rel_path(ws, &run_path);
            if let Some(fp) = Fingerprint::of(&run_path) {
                if stored.remove(&rel).as_deref() != Some(fp.encode().as_str()) {
                    if let Ok(run) = records::read_run(ws, &project_id, &run_id) {
                        upsert_run(tx, &run)?;
                        outcome.files_updated += 1;
                    } else {
                        tracing::warn!(%run_id, "unparseable run.yaml skipped");
                    }
                    set_fingerprint(tx, &rel, &fp)?;
                }
            }

            let events_path = ws.events_jsonl(&project_id, &run_id);
            let events_rel = rel_path(ws, &events_path);
            if let Some(fp) = Fingerprint::of(&events_path) {
                if stored.remove(&events_rel).as_deref() != Some(fp.encode().as_str()) {
                    outcome.events_appended +=
                        append_events(tx, ws, &project_id, &run_id, &events_path)?;
                    set_fingerprint(tx, &events_rel, &fp)?;
                }
            }
        }
    }

    // reviews
    for review_id in records::list_reviews(ws) {
        let path = ws.review_yaml(&review_id);
        let rel = rel_path(ws, &path);
        if let Some(fp) = Fingerprint::of(&path) {
            if stored.remove(&rel).as_deref() != Some(fp.encode().as_str()) {
                if let Ok(review) = records::read_review(ws, &review_id) {
                    upsert_review(tx, &review)?;
                    outcome.files_updated += 1;
                } else {
                    tracing::warn!(%review_id, "unparseable review skipped");
                }
                set_fingerprint(tx, &rel, &fp)?;
            }
        }
    }

    // Anything left in `stored` vanished from disk.
    for (rel, _) in stored {
        outcome.rows_deleted += delete_rows_for(tx, &rel)?;
        tx.execute("DELETE FROM file_fingerprints WHERE path = ?1", params![rel])?;
    }

    refresh_derived_tables(tx)?;
    Ok(outcome)
}

fn rel_path(ws: &Workspace, path: &std::path::Path) -> String {
    ws.rel_of(path).unwrap_or_else(|_| path.display().to_string())
}

fn set_fingerprint(tx: &Transaction<'_>, rel: &str, fp: &Fingerprint) -> Result<(), IndexError> {
    tx.execute(
        "INSERT INTO file_fingerprints (path, fingerprint) VALUES (?1, ?2)
         ON CONFLICT(path) DO UPDATE SET fingerprint = excluded.fingerprint",
        params![rel, fp.encode()],
    )?;
    Ok(())
}

fn upsert_run(tx: &Transaction<'_>, run: &Run) -> Result<(), IndexError> {
    tx.execute(
        "INSERT INTO runs (run_id, project_id, agent_id, provider, created_at, status,
                           usage_total_tokens, usage_cost_usd, task_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(run_id) DO UPDATE SET
           status = excluded.status,
           usage_total_tokens = excluded.usage_total_tokens,
           usage_cost_usd = excluded.usage_cost_usd",
        params![
            run.run_id.as_str(),
            run.project_id.as_str(),
            run.agent_id.as_str(),
            run.provider.as_str(),
            run.created_at,
            run.status.as_str(),
            run.usage.as_ref().map(|u| u.total_tokens as i64),
            run.usage.as_ref().and_then(|u| u.cost_usd),
            run.spec.task_id.as_ref().map(|t| t.as_str().to_string()),
        ],
    )?;
    Ok(())
}

fn upsert_task(tx: &Transaction<'_>, task: &Task) -> Result<(), IndexError> {
    let depends: Vec<&str> =
        task.schedule.depends_on_task_ids.iter().map(|t| t.as_str()).collect();
    tx.execute(
        "INSERT INTO tasks (task_id, project_id, title, status, visibility, assignee_agent_id,
                            planned_start, planned_end, duration_days, depends_on_json, header_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(task_id) DO UPDATE SET
           title = excluded.title,
           status = excluded.status,
           visibility = excluded.visibility,
           assignee_agent_id = excluded.assignee_agent_id,
           planned_start = excluded.planned_start,
           planned_end = excluded.planned_end,
           duration_days = excluded.duration_days,
           depends_on_json = excluded.depends_on_json,
           header_json = excluded.header_json",
        params![
            task.id.as_str(),
            task.project_id.as_str(),
            task.title,
            task.status.as_str(),
            task.visibility.as_str(),
            task.assignee_agent_id.as_ref().map(|a| a.as_str().to_string()),
            task.schedule.planned_start,
            task.schedule.planned_end,
            task.schedule.duration_days,
            serde_json::to_string(&depends).unwrap_or_default(),
            serde_json::to_string(task).unwrap_or_default(),
        ],
    )?;
    tx.execute("DELETE FROM task_milestones WHERE task_id = ?1", params![task.id.as_str()])?;
    for milestone in &task.milestones {
        let evidence = milestone.effective_evidence();
        tx.execute(
            "INSERT INTO task_milestones
               (task_id, milestone_id, title, kind, status, requires_patch, requires_tests)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                task.id.as_str(),
                milestone.id,
                milestone.title,
                milestone.kind.as_str(),
                milestone.status.as_str(),
                evidence.requires_patch as i64,
                evidence.requires_tests as i64,
            ],
        )?;
    }
    Ok(())
}

fn upsert_artifact(tx: &Transaction<'_>, header: &ArtifactHeader) -> Result<(), IndexError> {
    tx.execute(
        "INSERT INTO artifacts (artifact_id, project_id, type, title, created_at, visibility,
                                sensitivity, produced_by, run_id, task_id, milestone_id, header_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(artifact_id) DO UPDATE SET
           title = excluded.title,
           visibility = excluded.visibility,
           sensitivity = excluded.sensitivity,
           header_json = excluded.header_json",
        params![
            header.id.as_str(),
            header.project_id.as_str(),
            header.kind.as_str(),
            header.title,
            header.created_at,
            header.visibility.as_str(),
            header.sensitivity.map(|s| s.as_str().to_string()),
            header.produced_by.as_str(),
            header.run_id.as_str(),
            header.task_id.as_ref().map(|t| t.as_str().to_string()),
            header.milestone_id,
            serde_json::to_string(header).unwrap_or_default(),
        ],
    )?;
    Ok(())
}

fn upsert_review(tx: &Transaction<'_>, review: &Review) -> Result<(), IndexError> {
    tx.execute(
        "INSERT INTO reviews (review_id, created_at, actor_id, actor_role, decision,
                              subject_kind, artifact_id, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(review_id) DO NOTHING",
        params![
            review.id.as_str(),
            review.created_at,
            review.actor_id,
            review.actor_role.as_str(),
            match review.decision {
                guild_core::ReviewDecision::Approved => "approved",
                guild_core::ReviewDecision::Denied => "denied",
            },
            review.subject.kind,
            review.subject.artifact_id.as_str(),
            review.notes,
        ],
    )?;
    Ok(())
}

/// Append new event rows from the cursor on; a shrunken file (rewritten
/// by migration) resets and re-projects from line 1.
fn append_events(
    tx: &Transaction<'_>,
    _ws: &Workspace,
    project_id: &ProjectId,
    run_id: &RunId,
    events_path: &std::path::Path,
) -> Result<usize, IndexError> {
    let lines = guild_store::read_events_jsonl(events_path)?;
    let total_lines = lines.last().map(|l| l.seq()).unwrap_or(0);

    let cursor: u64 = tx
        .query_row(
            "SELECT last_seq FROM event_cursors WHERE project_id = ?1 AND run_id = ?2",
            params![project_id.as_str(), run_id.as_str()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .map(|v| v as u64)
        .unwrap_or(0);

    let cursor = if total_lines < cursor {
        // The file was rewritten; drop stale rows and start over.
        tx.execute(
            "DELETE FROM events WHERE project_id = ?1 AND run_id = ?2",
            params![project_id.as_str(), run_id.as_str()],
        )?;
        tx.execute(
            "DELETE FROM event_parse_errors WHERE project_id = ?1 AND run_id = ?2",
            params![project_id.as_str(), run_id.as_str()],
        )?;
        0
    } else {
        cursor
    };

    let mut appended = 0;
    for line in lines {
        if line.seq() <= cursor {
            continue;
        }
        match line {
            EventLine::Ok { seq, value } => {
                tx.execute(
                    "INSERT OR REPLACE INTO events
                       (project_id, run_id, seq, event_id, ts_wallclock, ts_monotonic_ms,
                        type, actor, visibility, payload)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        project_id.as_str(),
                        run_id.as_str(),
                        seq as i64,
                        value.get("event_id").and_then(|v| v.as_str()),
                        value.get("ts_wallclock").and_then(|v| v.as_str()),
                        value.get("ts_monotonic_ms").and_then(|v| v.as_i64()),
                        value.get("type").and_then(|v| v.as_str()),
                        value.get("actor").and_then(|v| v.as_str()),
                        value.get("visibility").and_then(|v| v.as_str()),
                        value.get("payload").map(|p| p.to_string()),
                    ],
                )?;
            }
            EventLine::Err { seq, raw_line, error } => {
                tx.execute(
                    "INSERT OR REPLACE INTO event_parse_errors
                       (project_id, run_id, seq, raw_line, error)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![project_id.as_str(), run_id.as_str(), seq as i64, raw_line, error],
                )?;
            }
        }
        appended += 1;
    }

    tx.execute(
        "INSERT INTO event_cursors (project_id, run_id, last_seq) VALUES (?1, ?2, ?3)
         ON CONFLICT(project_id, run_id) DO UPDATE SET last_seq = excluded.last_seq",
        params![project_id.as_str(), run_id.as_str(), total_lines as i64],
    )?;

    Ok(appended)
}

/// Remove derived rows for a vanished file, classified by its path.
fn delete_rows_for(tx: &Transaction<'_>, rel: &str) -> Result<usize, IndexError> {
    let parts: Vec<&str> = rel.split('/').collect();
    let mut deleted = 0;
    match parts.as_slice() {
        ["work", "projects", project_id, "runs", run_id, "run.yaml"] => {
            deleted += tx.execute("DELETE FROM runs WHERE run_id = ?1", params![run_id])?;
            deleted += tx.execute(
                "DELETE FROM events WHERE project_id = ?1 AND run_id = ?2",
                params![project_id, run_id],
            )?;
            deleted += tx.execute(
                "DELETE FROM event_parse_errors WHERE project_id = ?1 AND run_id = ?2",
                params![project_id, run_id],
            )?;
            tx.execute(
                "DELETE FROM event_cursors WHERE project_id = ?1 AND run_id = ?2",
                params![project_id, run_id],
            )?;
        }
        ["work", "projects", project_id, "runs", run_id, "events.jsonl"] => {
            deleted += tx.execute(
                "DELETE FROM events WHERE project_id = ?1 AND run_id = ?2",
                params![project_id, run_id],
            )?;
            tx.execute(
                "DELETE FROM event_cursors WHERE project_id = ?1 AND run_id = ?2",
                params![project_id, run_id],
            )?;
        }
        ["work", "projects", _pid, "tasks", file] => {
            if let Some(task_id) = file.strip_suffix(".md") {
                deleted += tx.execute("DELETE FROM tasks WHERE task_id = ?1", params![task_id])?;
                deleted += tx.execute(
                    "DELETE FROM task_milestones WHERE task_id = ?1",
                    params![task_id],
                )?;
            }
        }
        ["work", "projects", _pid, "artifacts", file] => {
            if let Some(artifact_id) = file.strip_suffix(".md") {
                deleted += tx
                    .execute("DELETE FROM artifacts WHERE artifact_id = ?1", params![artifact_id])?;
            }
        }
        ["inbox", "reviews", file] => {
            if let Some(review_id) = file.strip_suffix(".yaml") {
                deleted +=
                    tx.execute("DELETE FROM reviews WHERE review_id = ?1", params![review_id])?;
            }
        }
        _ => {}
    }
    Ok(deleted)
}

/// Pending approvals, decision joins, and agent counters are cheap full
/// refreshes — they derive from tables already in this transaction.
fn refresh_derived_tables(tx: &Transaction<'_>) -> Result<(), IndexError> {
    tx.execute("DELETE FROM pending_approvals", [])?;
    let types = APPROVABLE_TYPES.map(|t| format!("'{t}'")).join(", ");
    tx.execute(
        &format!(
            "INSERT INTO pending_approvals (artifact_id, project_id, type, title, created_at, produced_by)
             SELECT a.artifact_id, a.project_id, a.type, a.title, a.created_at, a.produced_by
             FROM artifacts a
             WHERE a.type IN ({types})
               AND a.artifact_id NOT IN (SELECT artifact_id FROM reviews WHERE artifact_id IS NOT NULL)"
        ),
        [],
    )?;

    tx.execute("DELETE FROM review_decisions", [])?;
    tx.execute(
        "INSERT INTO review_decisions (review_id, decided_at, decision, actor_id, artifact_id,
                                       artifact_type, run_id)
         SELECT r.review_id, r.created_at, r.decision, r.actor_id, r.artifact_id,
                a.type, a.run_id
         FROM reviews r LEFT JOIN artifacts a ON a.artifact_id = r.artifact_id",
        [],
    )?;

    tx.execute("DELETE FROM agent_counters", [])?;
    tx.execute(
        "INSERT INTO agent_counters (agent_id, active_runs, total_runs, pending_reviews, last_seen)
         SELECT agent_id,
                SUM(CASE WHEN status = 'running' THEN 1 ELSE 0 END),
                COUNT(*),
                (SELECT COUNT(*) FROM pending_approvals p WHERE p.produced_by = runs.agent_id),
                MAX(created_at)
         FROM runs GROUP BY agent_id",
        [],
    )?;
    Ok(())
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
