// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed read/write helpers over the workspace layout.
//!
//! Each function pairs one canonical file with its guild-core type. All
//! writes go through the atomic writer; list helpers skip entries that do
//! not parse rather than failing the whole listing.

use crate::atomic::{atomic_write, ensure_dir};
use crate::error::StoreError;
use crate::frontmatter::{parse_frontmatter, render_frontmatter};
use crate::workspace::Workspace;
use guild_core::{
    AgentId, AgentRecord, ArtifactHeader, ArtifactId, CommentRecord, CompanyRecord,
    HeartbeatConfig, HeartbeatState, MachineConfig, ProjectId, ProjectRecord, Review, ReviewId,
    Run, RunId, Task, TaskId, TeamRecord,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Read and parse one YAML file.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let text = std::fs::read_to_string(path).map_err(|e| StoreError::from_read(path, e))?;
    serde_yaml::from_str(&text).map_err(|e| StoreError::yaml(path, e))
}

/// Serialize and atomically write one YAML file.
pub fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let text = serde_yaml::to_string(value).map_err(|e| StoreError::yaml(path, e))?;
    atomic_write(path, text.as_bytes())
}

// -- workspace bootstrap --

/// Create the workspace skeleton and identity file.
pub fn init_workspace(ws: &Workspace, company: &CompanyRecord) -> Result<(), StoreError> {
    if ws.exists() {
        return Err(StoreError::Conflict(format!(
            "workspace already initialized: {}",
            ws.root().display()
        )));
    }
    for dir in [
        ws.root().join("company/migrations"),
        ws.teams_dir(),
        ws.agents_dir(),
        ws.projects_dir(),
        ws.reviews_dir(),
        ws.root().join(".local"),
    ] {
        ensure_dir(&dir)?;
    }
    write_yaml(&ws.company_yaml(), company)
}

/// Create a project directory with `project.yaml`, a seeded `memory.md`,
/// and the tasks/artifacts/runs subdirectories.
pub fn create_project_with_defaults(
    ws: &Workspace,
    project: &ProjectRecord,
) -> Result<(), StoreError> {
    let dir = ws.project_dir(&project.id);
    if dir.exists() {
        return Err(StoreError::Conflict(format!("project already exists: {}", project.id)));
    }
    ensure_dir(&ws.tasks_dir(&project.id))?;
    ensure_dir(&ws.artifacts_dir(&project.id))?;
    ensure_dir(&ws.runs_dir(&project.id))?;
    write_yaml(&ws.project_yaml(&project.id), project)?;
    atomic_write(
        &ws.project_memory_md(&project.id),
        format!("# {} memory\n\n## Notes\n", project.name).as_bytes(),
    )
}

// -- typed accessors --

pub fn read_company(ws: &Workspace) -> Result<CompanyRecord, StoreError> {
    read_yaml(&ws.company_yaml())
}

pub fn read_project(ws: &Workspace, project_id: &ProjectId) -> Result<ProjectRecord, StoreError> {
    read_yaml(&ws.project_yaml(project_id))
}

pub fn read_agent(ws: &Workspace, agent_id: &AgentId) -> Result<AgentRecord, StoreError> {
    read_yaml(&ws.agent_yaml(agent_id))
}

pub fn write_agent(ws: &Workspace, agent: &AgentRecord) -> Result<(), StoreError> {
    write_yaml(&ws.agent_yaml(&agent.id), agent)
}

pub fn write_team(ws: &Workspace, team: &TeamRecord) -> Result<(), StoreError> {
    write_yaml(&ws.team_yaml(&team.id), team)
}

pub fn read_run(ws: &Workspace, project_id: &ProjectId, run_id: &RunId) -> Result<Run, StoreError> {
    read_yaml(&ws.run_yaml(project_id, run_id))
}

/// Create a run record together with its directory tree.
pub fn create_run(ws: &Workspace, run: &Run) -> Result<(), StoreError> {
    let dir = ws.run_dir(&run.project_id, &run.run_id);
    if dir.exists() {
        return Err(StoreError::Conflict(format!("run already exists: {}", run.run_id)));
    }
    ensure_dir(&ws.run_outputs_dir(&run.project_id, &run.run_id))?;
    write_yaml(&ws.run_yaml(&run.project_id, &run.run_id), run)
}

pub fn write_run(ws: &Workspace, run: &Run) -> Result<(), StoreError> {
    write_yaml(&ws.run_yaml(&run.project_id, &run.run_id), run)
}

pub fn read_task(ws: &Workspace, project_id: &ProjectId, task_id: &TaskId) -> Result<(Task, String), StoreError> {
    let path = ws.task_md(project_id, task_id);
    let text = std::fs::read_to_string(&path).map_err(|e| StoreError::from_read(&path, e))?;
    parse_frontmatter(&path, &text)
}

pub fn write_task(ws: &Workspace, task: &Task, body: &str) -> Result<(), StoreError> {
    task.validate().map_err(StoreError::Invalid)?;
    let doc = render_frontmatter(task, body)?;
    atomic_write(&ws.task_md(&task.project_id, &task.id), doc.as_bytes())
}

pub fn read_artifact(
    ws: &Workspace,
    project_id: &ProjectId,
    artifact_id: &ArtifactId,
) -> Result<(ArtifactHeader, String), StoreError> {
    let path = ws.artifact_md(project_id, artifact_id);
    let text = std::fs::read_to_string(&path).map_err(|e| StoreError::from_read(&path, e))?;
    parse_frontmatter(&path, &text)
}

pub fn write_artifact(
    ws: &Workspace,
    header: &ArtifactHeader,
    body: &str,
) -> Result<(), StoreError> {
    header.validate_visibility().map_err(StoreError::Invalid)?;
    let doc = render_frontmatter(header, body)?;
    atomic_write(&ws.artifact_md(&header.project_id, &header.id), doc.as_bytes())
}

pub fn read_review(ws: &Workspace, review_id: &ReviewId) -> Result<Review, StoreError> {
    read_yaml(&ws.review_yaml(review_id))
}

/// Reviews are append-only: writing over an existing id is a conflict.
pub fn write_review(ws: &Workspace, review: &Review) -> Result<(), StoreError> {
    let path = ws.review_yaml(&review.id);
    if path.exists() {
        return Err(StoreError::Conflict(format!("review already exists: {}", review.id)));
    }
    write_yaml(&path, review)
}

pub fn write_comment(
    ws: &Workspace,
    project_id: &ProjectId,
    comment: &CommentRecord,
) -> Result<(), StoreError> {
    write_yaml(&ws.comment_yaml(project_id, &comment.id), comment)
}

pub fn read_machine_config(ws: &Workspace) -> Result<MachineConfig, StoreError> {
    match read_yaml(&ws.machine_yaml()) {
        Ok(cfg) => Ok(cfg),
        Err(StoreError::NotFound(_)) => Ok(MachineConfig::default()),
        Err(e) => Err(e),
    }
}

pub fn read_heartbeat_config(ws: &Workspace) -> Result<HeartbeatConfig, StoreError> {
    match read_yaml(&ws.heartbeat_config_yaml()) {
        Ok(cfg) => Ok(cfg),
        Err(StoreError::NotFound(_)) => Ok(HeartbeatConfig::default()),
        Err(e) => Err(e),
    }
}

pub fn write_heartbeat_config(ws: &Workspace, cfg: &HeartbeatConfig) -> Result<(), StoreError> {
    write_yaml(&ws.heartbeat_config_yaml(), cfg)
}

pub fn read_heartbeat_state(ws: &Workspace) -> Result<HeartbeatState, StoreError> {
    match read_yaml(&ws.heartbeat_state_yaml()) {
        Ok(state) => Ok(state),
        Err(StoreError::NotFound(_)) => Ok(HeartbeatState::default()),
        Err(e) => Err(e),
    }
}

pub fn write_heartbeat_state(ws: &Workspace, state: &HeartbeatState) -> Result<(), StoreError> {
    write_yaml(&ws.heartbeat_state_yaml(), state)
}

// -- listings --

fn list_ids(dir: &Path) -> Vec<String> {
    let mut out = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return out;
    };
    for entry in entries.flatten() {
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with('.') {
                out.push(name.to_string());
            }
        }
    }
    out.sort();
    out
}

pub fn list_projects(ws: &Workspace) -> Vec<ProjectId> {
    list_ids(&ws.projects_dir()).into_iter().map(ProjectId::from_string).collect()
}

pub fn list_runs(ws: &Workspace, project_id: &ProjectId) -> Vec<RunId> {
    list_ids(&ws.runs_dir(project_id)).into_iter().map(RunId::from_string).collect()
}

pub fn list_tasks(ws: &Workspace, project_id: &ProjectId) -> Vec<TaskId> {
    list_ids(&ws.tasks_dir(project_id))
        .into_iter()
        .filter_map(|n| n.strip_suffix(".md").map(TaskId::from_string))
        .collect()
}

pub fn list_artifacts(ws: &Workspace, project_id: &ProjectId) -> Vec<ArtifactId> {
    list_ids(&ws.artifacts_dir(project_id))
        .into_iter()
        .filter_map(|n| n.strip_suffix(".md").map(ArtifactId::from_string))
        .collect()
}

pub fn list_reviews(ws: &Workspace) -> Vec<ReviewId> {
    list_ids(&ws.reviews_dir())
        .into_iter()
        .filter_map(|n| n.strip_suffix(".yaml").map(ReviewId::from_string))
        .collect()
}

pub fn list_agents(ws: &Workspace) -> Vec<AgentRecord> {
    list_ids(&ws.agents_dir())
        .into_iter()
        .filter_map(|id| read_agent(ws, &AgentId::from_string(&id)).ok())
        .collect()
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;
