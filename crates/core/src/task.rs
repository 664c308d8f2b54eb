// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task and milestone frontmatter.
//!
//! Tasks live as markdown files with YAML frontmatter under
//! `work/projects/<pid>/tasks/`. The body must carry `## Contract` and
//! `## Milestones` headings; the frontmatter carries everything queryable.

use crate::actor::Visibility;
use crate::id::{AgentId, ProjectId, TaskId, TeamId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Draft,
    Ready,
    InProgress,
    Blocked,
    Done,
    Canceled,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Draft => "draft",
            TaskStatus::Ready => "ready",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Done => "done",
            TaskStatus::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    Coding,
    Research,
    Planning,
}

impl MilestoneKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MilestoneKind::Coding => "coding",
            MilestoneKind::Research => "research",
            MilestoneKind::Planning => "planning",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

impl MilestoneStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MilestoneStatus::Pending => "pending",
            MilestoneStatus::InProgress => "in_progress",
            MilestoneStatus::Done => "done",
        }
    }
}

/// What a milestone report must attach before approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MilestoneEvidence {
    #[serde(default)]
    pub requires_patch: bool,
    #[serde(default)]
    pub requires_tests: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub title: String,
    pub kind: MilestoneKind,
    #[serde(default)]
    pub status: MilestoneStatus,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub evidence: Option<MilestoneEvidence>,
}

impl Milestone {
    /// Effective evidence rule: coding milestones default both flags on.
    pub fn effective_evidence(&self) -> MilestoneEvidence {
        match self.evidence {
            Some(e) => e,
            None => match self.kind {
                MilestoneKind::Coding => {
                    MilestoneEvidence { requires_patch: true, requires_tests: true }
                }
                _ => MilestoneEvidence::default(),
            },
        }
    }
}

/// Planned-schedule block of a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_days: Option<f64>,
    #[serde(default)]
    pub depends_on_task_ids: Vec<TaskId>,
}

/// Cost limits for a task or project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_cost_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hard_cost_usd: Option<f64>,
}

/// Task frontmatter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default = "default_task_visibility")]
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_agent_id: Option<AgentId>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub schedule: Schedule,
    #[serde(default)]
    pub deliverables: Vec<String>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<Budget>,
}

fn default_task_visibility() -> Visibility {
    Visibility::Team
}

impl Task {
    /// Non-draft tasks must name deliverables, acceptance criteria, and at
    /// least one milestone.
    pub fn validate(&self) -> Result<(), String> {
        if self.status == TaskStatus::Draft {
            return Ok(());
        }
        if self.deliverables.is_empty() {
            return Err(format!("task {} is non-draft but has no deliverables", self.id));
        }
        if self.acceptance_criteria.is_empty() {
            return Err(format!("task {} is non-draft but has no acceptance criteria", self.id));
        }
        if self.milestones.is_empty() {
            return Err(format!("task {} is non-draft but has no milestones", self.id));
        }
        Ok(())
    }

    pub fn milestone(&self, milestone_id: &str) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == milestone_id)
    }

    /// Re-derive the task status from its milestones.
    ///
    /// All milestones done → the task auto-promotes to `done` (unless
    /// canceled). A milestone leaving `done` demotes a `done` task back to
    /// `in_progress`. Returns true when the status changed.
    pub fn reconcile_status(&mut self) -> bool {
        if self.status == TaskStatus::Canceled || self.milestones.is_empty() {
            return false;
        }
        let all_done = self.milestones.iter().all(|m| m.status == MilestoneStatus::Done);
        match (all_done, self.status) {
            (true, TaskStatus::Done) => false,
            (true, _) => {
                self.status = TaskStatus::Done;
                true
            }
            (false, TaskStatus::Done) => {
                self.status = TaskStatus::InProgress;
                true
            }
            (false, _) => false,
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
