// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace layout and path discipline.
//!
//! A [`Workspace`] wraps the root directory of one company deployment.
//! All canonical paths are derived here, and every relative path taken
//! from user input must pass [`Workspace::resolve_rel`], which rejects
//! absolute paths and `..` escapes.

use crate::error::StoreError;
use guild_core::{AgentId, ArtifactId, CommentId, ProjectId, ReviewId, RunId, TaskId, TeamId};
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a workspace-relative path, rejecting absolute paths and any
    /// component that would escape the root.
    pub fn resolve_rel(&self, rel: &str) -> Result<PathBuf, StoreError> {
        let p = Path::new(rel);
        if p.is_absolute() {
            return Err(StoreError::PathEscape(rel.to_string()));
        }
        for component in p.components() {
            match component {
                Component::ParentDir => return Err(StoreError::PathEscape(rel.to_string())),
                Component::Prefix(_) | Component::RootDir => {
                    return Err(StoreError::PathEscape(rel.to_string()))
                }
                Component::CurDir | Component::Normal(_) => {}
            }
        }
        Ok(self.root.join(p))
    }

    /// Express an absolute path under the root as workspace-relative.
    pub fn rel_of(&self, abs: &Path) -> Result<String, StoreError> {
        abs.strip_prefix(&self.root)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .map_err(|_| StoreError::PathEscape(abs.display().to_string()))
    }

    // -- company --

    pub fn company_yaml(&self) -> PathBuf {
        self.root.join("company/company.yaml")
    }

    pub fn migrations_ledger(&self) -> PathBuf {
        self.root.join("company/migrations/applied.yaml")
    }

    // -- org --

    pub fn teams_dir(&self) -> PathBuf {
        self.root.join("org/teams")
    }

    pub fn team_yaml(&self, team_id: &TeamId) -> PathBuf {
        self.teams_dir().join(team_id.as_str()).join("team.yaml")
    }

    pub fn agents_dir(&self) -> PathBuf {
        self.root.join("org/agents")
    }

    pub fn agent_yaml(&self, agent_id: &AgentId) -> PathBuf {
        self.agents_dir().join(agent_id.as_str()).join("agent.yaml")
    }

    /// Curated guidance file targeted by `agent_guidance` memory deltas.
    pub fn agent_guidance_md(&self, agent_ref: &str) -> PathBuf {
        self.agents_dir().join(agent_ref).join("AGENTS.md")
    }

    // -- work --

    pub fn projects_dir(&self) -> PathBuf {
        self.root.join("work/projects")
    }

    pub fn project_dir(&self, project_id: &ProjectId) -> PathBuf {
        self.projects_dir().join(project_id.as_str())
    }

    pub fn project_yaml(&self, project_id: &ProjectId) -> PathBuf {
        self.project_dir(project_id).join("project.yaml")
    }

    pub fn project_memory_md(&self, project_id: &ProjectId) -> PathBuf {
        self.project_dir(project_id).join("memory.md")
    }

    pub fn tasks_dir(&self, project_id: &ProjectId) -> PathBuf {
        self.project_dir(project_id).join("tasks")
    }

    pub fn task_md(&self, project_id: &ProjectId, task_id: &TaskId) -> PathBuf {
        self.tasks_dir(project_id).join(format!("{}.md", task_id.as_str()))
    }

    pub fn artifacts_dir(&self, project_id: &ProjectId) -> PathBuf {
        self.project_dir(project_id).join("artifacts")
    }

    pub fn artifact_md(&self, project_id: &ProjectId, artifact_id: &ArtifactId) -> PathBuf {
        self.artifacts_dir(project_id).join(format!("{}.md", artifact_id.as_str()))
    }

    /// Sibling file of an artifact (`.patch`, `.txt`, `.json`).
    pub fn artifact_sibling(
        &self,
        project_id: &ProjectId,
        artifact_id: &ArtifactId,
        ext: &str,
    ) -> PathBuf {
        self.artifacts_dir(project_id).join(format!("{}.{ext}", artifact_id.as_str()))
    }

    pub fn comments_dir(&self, project_id: &ProjectId) -> PathBuf {
        self.project_dir(project_id).join("comments")
    }

    pub fn comment_yaml(&self, project_id: &ProjectId, comment_id: &CommentId) -> PathBuf {
        self.comments_dir(project_id).join(format!("{}.yaml", comment_id.as_str()))
    }

    pub fn runs_dir(&self, project_id: &ProjectId) -> PathBuf {
        self.project_dir(project_id).join("runs")
    }

    pub fn run_dir(&self, project_id: &ProjectId, run_id: &RunId) -> PathBuf {
        self.runs_dir(project_id).join(run_id.as_str())
    }

    pub fn run_yaml(&self, project_id: &ProjectId, run_id: &RunId) -> PathBuf {
        self.run_dir(project_id, run_id).join("run.yaml")
    }

    pub fn events_jsonl(&self, project_id: &ProjectId, run_id: &RunId) -> PathBuf {
        self.run_dir(project_id, run_id).join("events.jsonl")
    }

    pub fn run_outputs_dir(&self, project_id: &ProjectId, run_id: &RunId) -> PathBuf {
        self.run_dir(project_id, run_id).join("outputs")
    }

    pub fn run_worktree_dir(&self, project_id: &ProjectId, run_id: &RunId) -> PathBuf {
        self.run_dir(project_id, run_id).join("worktree")
    }

    // -- inbox --

    pub fn reviews_dir(&self) -> PathBuf {
        self.root.join("inbox/reviews")
    }

    pub fn review_yaml(&self, review_id: &ReviewId) -> PathBuf {
        self.reviews_dir().join(format!("{}.yaml", review_id.as_str()))
    }

    // -- .local --

    pub fn machine_yaml(&self) -> PathBuf {
        self.root.join(".local/machine.yaml")
    }

    pub fn index_db(&self) -> PathBuf {
        self.root.join(".local/index.db")
    }

    pub fn heartbeat_config_yaml(&self) -> PathBuf {
        self.root.join(".local/heartbeat/config.yaml")
    }

    pub fn heartbeat_state_yaml(&self) -> PathBuf {
        self.root.join(".local/heartbeat/state.yaml")
    }

    pub fn billing_statements_json(&self) -> PathBuf {
        self.root.join(".local/billing/reconciliation_statements.json")
    }

    /// A workspace is usable once `company/company.yaml` exists.
    pub fn exists(&self) -> bool {
        self.company_yaml().is_file()
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
