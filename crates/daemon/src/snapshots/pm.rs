// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PM snapshot with a CPM-derived Gantt.
//!
//! Dependencies form an index + adjacency structure. Self-references are
//! ignored and edges to missing tasks dropped. A cycle is reported as
//! `dependency_cycle` — no repair is attempted — and bars still emit in
//! input order from a best-effort forward pass.

use guild_index::{queries, IndexError, TaskRow};
use guild_store::Workspace;
use serde::Serialize;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CpmStatus {
    Ok,
    DependencyCycle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GanttBar {
    pub task_id: String,
    pub title: Option<String>,
    pub status: Option<String>,
    pub duration_days: f64,
    pub earliest_start: f64,
    pub earliest_finish: f64,
    pub latest_start: f64,
    pub latest_finish: f64,
    pub critical: bool,
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub project_id: String,
    pub progress_pct: f64,
    pub blocked_tasks: u64,
    pub active_runs: u64,
    pub pending_reviews: u64,
    pub risk_flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PmSnapshot {
    pub projects: Vec<ProjectSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gantt: Option<Gantt>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gantt {
    pub cpm_status: CpmStatus,
    pub span_days: f64,
    pub bars: Vec<GanttBar>,
}

fn duration_of(task: &TaskRow) -> f64 {
    if let Some(days) = task.duration_days {
        return days.max(0.0);
    }
    // Derive from planned dates when both are present.
    if let (Some(start), Some(end)) = (&task.planned_start, &task.planned_end) {
        if let (Some(s), Some(e)) = (parse_days(start), parse_days(end)) {
            if e > s {
                return e - s;
            }
        }
    }
    1.0
}

fn parse_days(text: &str) -> Option<f64> {
    guild_heartbeat::triage::parse_iso_ms(text).map(|ms| ms as f64 / 86_400_000.0)
}

/// CPM over one project's tasks.
pub fn compute_gantt(tasks: &[TaskRow]) -> Gantt {
    let index: std::collections::HashMap<&str, usize> =
        tasks.iter().enumerate().map(|(i, t)| (t.task_id.as_str(), i)).collect();

    // Adjacency: predecessors per node, ignoring self-refs and edges to
    // missing tasks.
    let preds: Vec<Vec<usize>> = tasks
        .iter()
        .map(|task| {
            task.depends_on
                .iter()
                .filter(|dep| dep.as_str() != task.task_id)
                .filter_map(|dep| index.get(dep.as_str()).copied())
                .collect()
        })
        .collect();

    // Kahn topological order.
    let mut indegree = vec![0usize; tasks.len()];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];
    for (node, node_preds) in preds.iter().enumerate() {
        for &pred in node_preds {
            successors[pred].push(node);
            indegree[node] += 1;
        }
    }
    let mut queue: std::collections::VecDeque<usize> =
        (0..tasks.len()).filter(|&i| indegree[i] == 0).collect();
    let mut topo = Vec::with_capacity(tasks.len());
    while let Some(node) = queue.pop_front() {
        topo.push(node);
        for &next in &successors[node] {
            indegree[next] -= 1;
            if indegree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    let cyclic = topo.len() != tasks.len();
    let order: Vec<usize> =
        if cyclic { (0..tasks.len()).collect() } else { topo };

    // Forward pass.
    let durations: Vec<f64> = tasks.iter().map(duration_of).collect();
    let mut earliest_start = vec![0.0f64; tasks.len()];
    let mut earliest_finish = vec![0.0f64; tasks.len()];
    for &node in &order {
        let es = preds[node]
            .iter()
            .map(|&p| earliest_finish[p])
            .fold(0.0f64, f64::max);
        earliest_start[node] = es;
        earliest_finish[node] = es + durations[node];
    }
    let span = earliest_finish.iter().copied().fold(0.0f64, f64::max);

    // Backward pass from the span.
    let mut latest_finish = vec![span; tasks.len()];
    let mut latest_start = vec![span; tasks.len()];
    for &node in order.iter().rev() {
        let lf = successors[node]
            .iter()
            .map(|&s| latest_start[s])
            .fold(span, f64::min);
        latest_finish[node] = lf;
        latest_start[node] = lf - durations[node];
    }

    let bars = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| GanttBar {
            task_id: task.task_id.clone(),
            title: task.title.clone(),
            status: task.status.clone(),
            duration_days: durations[i],
            earliest_start: earliest_start[i],
            earliest_finish: earliest_finish[i],
            latest_start: latest_start[i],
            latest_finish: latest_finish[i],
            critical: !cyclic && (latest_start[i] - earliest_start[i]).abs() < EPSILON,
            depends_on: task.depends_on.clone(),
        })
        .collect();

    Gantt {
        cpm_status: if cyclic { CpmStatus::DependencyCycle } else { CpmStatus::Ok },
        span_days: span,
        bars,
    }
}

/// Workspace summary plus an optional per-project Gantt.
pub fn pm_snapshot(ws: &Workspace, selected_project: Option<&str>) -> Result<PmSnapshot, IndexError> {
    let runs = queries::list_runs(ws)?;
    let pending = queries::pending_approvals(ws)?;

    let mut project_ids: Vec<String> = runs.iter().map(|r| r.project_id.clone()).collect();
    for row in guild_store::records::list_projects(ws) {
        project_ids.push(row.to_string());
    }
    project_ids.sort();
    project_ids.dedup();

    let mut projects = Vec::new();
    for project_id in project_ids {
        let tasks = queries::tasks_for_project(ws, &project_id)?;
        let done = tasks.iter().filter(|t| t.status.as_deref() == Some("done")).count();
        let blocked = tasks.iter().filter(|t| t.status.as_deref() == Some("blocked")).count();
        let progress_pct = if tasks.is_empty() {
            0.0
        } else {
            (done as f64 / tasks.len() as f64) * 100.0
        };
        let active_runs = runs
            .iter()
            .filter(|r| r.project_id == project_id && r.status == "running")
            .count() as u64;
        let pending_reviews =
            pending.iter().filter(|p| p.project_id == project_id).count() as u64;

        let mut risk_flags = Vec::new();
        if blocked > 0 {
            risk_flags.push("blocked_tasks".to_string());
        }
        if runs
            .iter()
            .any(|r| r.project_id == project_id && r.status == "failed")
        {
            risk_flags.push("failed_runs".to_string());
        }

        projects.push(ProjectSummary {
            project_id,
            progress_pct,
            blocked_tasks: blocked as u64,
            active_runs,
            pending_reviews,
            risk_flags,
        });
    }

    let gantt = match selected_project {
        Some(project_id) => {
            let tasks = queries::tasks_for_project(ws, project_id)?;
            Some(compute_gantt(&tasks))
        }
        None => None,
    };

    Ok(PmSnapshot { projects, gantt })
}

#[cfg(test)]
#[path = "pm_tests.rs"]
mod tests;
