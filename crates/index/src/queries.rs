// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read surface for snapshot aggregators.
//!
//! All reads open their own connection; WAL mode gives them a consistent
//! snapshot while a sync transaction is in flight.

use crate::error::IndexError;
use crate::schema;
use guild_store::Workspace;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

fn open_ro(ws: &Workspace) -> Result<Connection, IndexError> {
    Ok(schema::open(&ws.index_db())?)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRow {
    pub run_id: String,
    pub project_id: String,
    pub agent_id: String,
    pub provider: String,
    pub created_at: Option<String>,
    pub status: String,
    pub usage_total_tokens: Option<i64>,
    pub usage_cost_usd: Option<f64>,
    pub task_id: Option<String>,
}

pub fn list_runs(ws: &Workspace) -> Result<Vec<RunRow>, IndexError> {
    let conn = open_ro(ws)?;
    let mut stmt = conn.prepare(
        "SELECT run_id, project_id, agent_id, provider, created_at, status,
                usage_total_tokens, usage_cost_usd, task_id
         FROM runs ORDER BY created_at DESC, run_id DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(RunRow {
            run_id: row.get(0)?,
            project_id: row.get(1)?,
            agent_id: row.get(2)?,
            provider: row.get(3)?,
            created_at: row.get(4)?,
            status: row.get(5)?,
            usage_total_tokens: row.get(6)?,
            usage_cost_usd: row.get(7)?,
            task_id: row.get(8)?,
        })
    })?;
    Ok(rows.collect::<Result<_, _>>()?)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRow {
    pub project_id: String,
    pub run_id: String,
    pub seq: i64,
    pub event_id: Option<String>,
    pub ts_wallclock: Option<String>,
    pub ts_monotonic_ms: Option<i64>,
    pub event_type: Option<String>,
    pub actor: Option<String>,
    pub visibility: Option<String>,
    pub payload: Option<String>,
}

/// Events for one run, optionally after a cursor, ordered by seq.
pub fn events_for_run(
    ws: &Workspace,
    project_id: &str,
    run_id: &str,
    since_seq: u64,
    limit: u64,
    ascending: bool,
) -> Result<Vec<EventRow>, IndexError> {
    let conn = open_ro(ws)?;
    let order = if ascending { "ASC" } else { "DESC" };
    let mut stmt = conn.prepare(&format!(
        "SELECT project_id, run_id, seq, event_id, ts_wallclock, ts_monotonic_ms,
                type, actor, visibility, payload
         FROM events
         WHERE project_id = ?1 AND run_id = ?2 AND seq > ?3
         ORDER BY seq {order} LIMIT ?4"
    ))?;
    let rows = stmt.query_map(
        params![project_id, run_id, since_seq as i64, limit as i64],
        |row| {
            Ok(EventRow {
                project_id: row.get(0)?,
                run_id: row.get(1)?,
                seq: row.get(2)?,
                event_id: row.get(3)?,
                ts_wallclock: row.get(4)?,
                ts_monotonic_ms: row.get(5)?,
                event_type: row.get(6)?,
                actor: row.get(7)?,
                visibility: row.get(8)?,
                payload: row.get(9)?,
            })
        },
    )?;
    Ok(rows.collect::<Result<_, _>>()?)
}

/// Count of events of a given type per run.
pub fn count_events_of_type(
    ws: &Workspace,
    project_id: &str,
    run_id: &str,
    event_type: &str,
) -> Result<u64, IndexError> {
    let conn = open_ro(ws)?;
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM events WHERE project_id = ?1 AND run_id = ?2 AND type = ?3",
        params![project_id, run_id, event_type],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

/// Last event (type, wallclock) for a run.
pub fn last_event(
    ws: &Workspace,
    project_id: &str,
    run_id: &str,
) -> Result<Option<(String, Option<String>)>, IndexError> {
    let conn = open_ro(ws)?;
    Ok(conn
        .query_row(
            "SELECT type, ts_wallclock FROM events
             WHERE project_id = ?1 AND run_id = ?2 ORDER BY seq DESC LIMIT 1",
            params![project_id, run_id],
            |row| Ok((row.get::<_, Option<String>>(0)?.unwrap_or_default(), row.get(1)?)),
        )
        .optional()?)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseErrorRow {
    pub project_id: String,
    pub run_id: String,
    pub seq: i64,
    pub raw_line: Option<String>,
    pub error: Option<String>,
}

pub fn parse_errors_for_run(
    ws: &Workspace,
    project_id: &str,
    run_id: &str,
) -> Result<Vec<ParseErrorRow>, IndexError> {
    let conn = open_ro(ws)?;
    let mut stmt = conn.prepare(
        "SELECT project_id, run_id, seq, raw_line, error FROM event_parse_errors
         WHERE project_id = ?1 AND run_id = ?2 ORDER BY seq",
    )?;
    let rows = stmt.query_map(params![project_id, run_id], |row| {
        Ok(ParseErrorRow {
            project_id: row.get(0)?,
            run_id: row.get(1)?,
            seq: row.get(2)?,
            raw_line: row.get(3)?,
            error: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<Result<_, _>>()?)
}

pub fn parse_error_count(ws: &Workspace, project_id: &str, run_id: &str) -> Result<u64, IndexError> {
    let conn = open_ro(ws)?;
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM event_parse_errors WHERE project_id = ?1 AND run_id = ?2",
        params![project_id, run_id],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactRow {
    pub artifact_id: String,
    pub project_id: String,
    pub artifact_type: String,
    pub title: Option<String>,
    pub created_at: Option<String>,
    pub visibility: Option<String>,
    pub sensitivity: Option<String>,
    pub produced_by: Option<String>,
    pub run_id: Option<String>,
    pub task_id: Option<String>,
    pub milestone_id: Option<String>,
}

fn artifact_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ArtifactRow> {
    Ok(ArtifactRow {
        artifact_id: row.get(0)?,
        project_id: row.get(1)?,
        artifact_type: row.get(2)?,
        title: row.get(3)?,
        created_at: row.get(4)?,
        visibility: row.get(5)?,
        sensitivity: row.get(6)?,
        produced_by: row.get(7)?,
        run_id: row.get(8)?,
        task_id: row.get(9)?,
        milestone_id: row.get(10)?,
    })
}

const ARTIFACT_COLS: &str = "artifact_id, project_id, type, title, created_at, visibility,
                             sensitivity, produced_by, run_id, task_id, milestone_id";

pub fn artifacts_by_type(ws: &Workspace, artifact_type: &str) -> Result<Vec<ArtifactRow>, IndexError> {
    let conn = open_ro(ws)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {ARTIFACT_COLS} FROM artifacts WHERE type = ?1 ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params![artifact_type], artifact_from_row)?;
    Ok(rows.collect::<Result<_, _>>()?)
}

pub fn artifact_by_id(ws: &Workspace, artifact_id: &str) -> Result<Option<ArtifactRow>, IndexError> {
    let conn = open_ro(ws)?;
    Ok(conn
        .query_row(
            &format!("SELECT {ARTIFACT_COLS} FROM artifacts WHERE artifact_id = ?1"),
            params![artifact_id],
            artifact_from_row,
        )
        .optional()?)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingApprovalRow {
    pub artifact_id: String,
    pub project_id: String,
    pub artifact_type: String,
    pub title: Option<String>,
    pub created_at: Option<String>,
    pub produced_by: Option<String>,
}

pub fn pending_approvals(ws: &Workspace) -> Result<Vec<PendingApprovalRow>, IndexError> {
    let conn = open_ro(ws)?;
    let mut stmt = conn.prepare(
        "SELECT artifact_id, project_id, type, title, created_at, produced_by
         FROM pending_approvals ORDER BY created_at",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(PendingApprovalRow {
            artifact_id: row.get(0)?,
            project_id: row.get(1)?,
            artifact_type: row.get(2)?,
            title: row.get(3)?,
            created_at: row.get(4)?,
            produced_by: row.get(5)?,
        })
    })?;
    Ok(rows.collect::<Result<_, _>>()?)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRow {
    pub review_id: String,
    pub decided_at: Option<String>,
    pub decision: Option<String>,
    pub actor_id: Option<String>,
    pub artifact_id: Option<String>,
    pub artifact_type: Option<String>,
    pub run_id: Option<String>,
}

pub fn recent_decisions(ws: &Workspace, limit: u64) -> Result<Vec<DecisionRow>, IndexError> {
    let conn = open_ro(ws)?;
    let mut stmt = conn.prepare(
        "SELECT review_id, decided_at, decision, actor_id, artifact_id, artifact_type, run_id
         FROM review_decisions ORDER BY decided_at DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit as i64], |row| {
        Ok(DecisionRow {
            review_id: row.get(0)?,
            decided_at: row.get(1)?,
            decision: row.get(2)?,
            actor_id: row.get(3)?,
            artifact_id: row.get(4)?,
            artifact_type: row.get(5)?,
            run_id: row.get(6)?,
        })
    })?;
    Ok(rows.collect::<Result<_, _>>()?)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewRow {
    pub review_id: String,
    pub created_at: Option<String>,
    pub actor_id: Option<String>,
    pub actor_role: Option<String>,
    pub decision: Option<String>,
    pub subject_kind: Option<String>,
    pub artifact_id: Option<String>,
}

pub fn list_reviews(ws: &Workspace) -> Result<Vec<ReviewRow>, IndexError> {
    let conn = open_ro(ws)?;
    let mut stmt = conn.prepare(
        "SELECT review_id, created_at, actor_id, actor_role, decision, subject_kind, artifact_id
         FROM reviews ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(ReviewRow {
            review_id: row.get(0)?,
            created_at: row.get(1)?,
            actor_id: row.get(2)?,
            actor_role: row.get(3)?,
            decision: row.get(4)?,
            subject_kind: row.get(5)?,
            artifact_id: row.get(6)?,
        })
    })?;
    Ok(rows.collect::<Result<_, _>>()?)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRow {
    pub task_id: String,
    pub project_id: String,
    pub title: Option<String>,
    pub status: Option<String>,
    pub assignee_agent_id: Option<String>,
    pub planned_start: Option<String>,
    pub planned_end: Option<String>,
    pub duration_days: Option<f64>,
    pub depends_on: Vec<String>,
}

pub fn tasks_for_project(ws: &Workspace, project_id: &str) -> Result<Vec<TaskRow>, IndexError> {
    let conn = open_ro(ws)?;
    let mut stmt = conn.prepare(
        "SELECT task_id, project_id, title, status, assignee_agent_id,
                planned_start, planned_end, duration_days, depends_on_json
         FROM tasks WHERE project_id = ?1 ORDER BY task_id",
    )?;
    let rows = stmt.query_map(params![project_id], |row| {
        let depends_json: Option<String> = row.get(8)?;
        Ok(TaskRow {
            task_id: row.get(0)?,
            project_id: row.get(1)?,
            title: row.get(2)?,
            status: row.get(3)?,
            assignee_agent_id: row.get(4)?,
            planned_start: row.get(5)?,
            planned_end: row.get(6)?,
            duration_days: row.get(7)?,
            depends_on: depends_json
                .and_then(|j| serde_json::from_str(&j).ok())
                .unwrap_or_default(),
        })
    })?;
    Ok(rows.collect::<Result<_, _>>()?)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MilestoneRow {
    pub task_id: String,
    pub milestone_id: String,
    pub title: Option<String>,
    pub kind: Option<String>,
    pub status: Option<String>,
    pub requires_patch: bool,
    pub requires_tests: bool,
}

pub fn milestones_for_task(ws: &Workspace, task_id: &str) -> Result<Vec<MilestoneRow>, IndexError> {
    let conn = open_ro(ws)?;
    let mut stmt = conn.prepare(
        "SELECT task_id, milestone_id, title, kind, status, requires_patch, requires_tests
         FROM task_milestones WHERE task_id = ?1",
    )?;
    let rows = stmt.query_map(params![task_id], |row| {
        Ok(MilestoneRow {
            task_id: row.get(0)?,
            milestone_id: row.get(1)?,
            title: row.get(2)?,
            kind: row.get(3)?,
            status: row.get(4)?,
            requires_patch: row.get::<_, i64>(5)? != 0,
            requires_tests: row.get::<_, i64>(6)? != 0,
        })
    })?;
    Ok(rows.collect::<Result<_, _>>()?)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentCounterRow {
    pub agent_id: String,
    pub active_runs: i64,
    pub total_runs: i64,
    pub pending_reviews: i64,
    pub last_seen: Option<String>,
}

pub fn agent_counters(ws: &Workspace) -> Result<Vec<AgentCounterRow>, IndexError> {
    let conn = open_ro(ws)?;
    let mut stmt = conn.prepare(
        "SELECT agent_id, active_runs, total_runs, pending_reviews, last_seen
         FROM agent_counters ORDER BY agent_id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(AgentCounterRow {
            agent_id: row.get(0)?,
            active_runs: row.get(1)?,
            total_runs: row.get(2)?,
            pending_reviews: row.get(3)?,
            last_seen: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<Result<_, _>>()?)
}

/// Total derived row count, for no-op assertions in tests and status.
pub fn total_row_count(ws: &Workspace) -> Result<u64, IndexError> {
    let conn = open_ro(ws)?;
    let mut total = 0i64;
    for table in
        ["runs", "events", "event_parse_errors", "artifacts", "reviews", "tasks", "task_milestones"]
    {
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        total += count;
    }
    Ok(total as u64)
}
