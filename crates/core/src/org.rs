// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Org-level records: company, teams, agents, projects, comments.

use crate::actor::ActorRole;
use crate::id::{AgentId, CommentId, ProjectId, TaskId, TeamId};
use crate::provider::Provider;
use crate::task::Budget;
use serde::{Deserialize, Serialize};

/// `company/company.yaml` — workspace identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub id: String,
    pub name: String,
    pub created_at: String,
    #[serde(default)]
    pub schema_version: u32,
}

/// `org/teams/<team_id>/team.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub id: TeamId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_agent_id: Option<AgentId>,
}

/// `org/agents/<agent_id>/agent.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentId,
    pub name: String,
    pub role: ActorRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
}

/// `work/projects/<pid>/project.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub name: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<Budget>,
}

/// `work/projects/<pid>/comments/<cid>.yaml` — written by heartbeat
/// `add_comment` actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: CommentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    pub author_agent_id: AgentId,
    pub body: String,
    pub created_at: String,
}
