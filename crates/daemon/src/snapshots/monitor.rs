// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run monitor rows.

use guild_index::{queries, IndexError};
use guild_store::Workspace;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts_wallclock: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorRow {
    pub run_id: String,
    pub project_id: String,
    pub run_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_event: Option<LastEvent>,
    pub parse_error_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub budget_decision_count: u64,
    pub budget_exceeded_count: u64,
}

/// Rows sorted by created_at descending. `live_status` is attached by
/// the caller when the session runtime knows the run.
pub fn run_monitor_snapshot(ws: &Workspace) -> Result<Vec<MonitorRow>, IndexError> {
    let runs = queries::list_runs(ws)?;
    let mut rows = Vec::with_capacity(runs.len());
    for run in runs {
        let last_event = queries::last_event(ws, &run.project_id, &run.run_id)?
            .map(|(event_type, ts_wallclock)| LastEvent { event_type, ts_wallclock });
        rows.push(MonitorRow {
            parse_error_count: queries::parse_error_count(ws, &run.project_id, &run.run_id)?,
            budget_decision_count: queries::count_events_of_type(
                ws,
                &run.project_id,
                &run.run_id,
                "budget.decision",
            )?,
            budget_exceeded_count: queries::count_events_of_type(
                ws,
                &run.project_id,
                &run.run_id,
                "budget.exceeded",
            )?,
            run_id: run.run_id,
            project_id: run.project_id,
            run_status: run.status,
            live_status: None,
            last_event,
            created_at: run.created_at,
        });
    }
    Ok(rows)
}
