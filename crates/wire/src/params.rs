// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed parameter and result shapes for the method table.
//!
//! Handlers deserialize `params` into these; a failure is answered with
//! `-32602` and the serde message as detail.

use guild_core::{
    ActorRole, ArtifactId, HeartbeatWorkerReport, MemoryScope, ProjectId, Provider, RunId,
    RunSpec, Sensitivity, SubscriptionId, TaskId, TeamId, Visibility,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Common shape for methods that only need a workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceParams {
    pub workspace_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunCreateParams {
    pub workspace_dir: PathBuf,
    pub project_id: ProjectId,
    pub agent_id: String,
    pub provider: Provider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub spec: RunSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLaunchParams {
    pub workspace_dir: PathBuf,
    pub project_id: ProjectId,
    pub run_id: RunId,
    pub argv: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_text_file_abs: Option<PathBuf>,
    /// Only `claude_stream_json` is recognized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parser: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,
    #[serde(default)]
    pub high_priority: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCollectParams {
    pub session_ref: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStopParams {
    pub session_ref: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsSubscribeParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<SubscriptionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backfill_limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeResult {
    pub subscription_id: SubscriptionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsAckParams {
    pub subscription_id: SubscriptionId,
    pub cursor: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsUnsubscribeParams {
    pub subscription_id: SubscriptionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsVerifyParams {
    pub workspace_dir: PathBuf,
    pub project_id: ProjectId,
    pub run_id: RunId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryProposeParams {
    pub workspace_dir: PathBuf,
    pub project_id: ProjectId,
    pub run_id: RunId,
    pub produced_by: String,
    pub scope_kind: MemoryScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_ref: Option<String>,
    pub title: String,
    pub under_heading: String,
    pub insert_lines: Vec<String>,
    pub rationale: String,
    pub evidence: Vec<String>,
    #[serde(default = "default_visibility")]
    pub visibility: Visibility,
    #[serde(default)]
    pub sensitivity: Sensitivity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_pack_id: Option<String>,
}

fn default_visibility() -> Visibility {
    Visibility::Team
}

/// Actor identity common to every approval-side call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalActor {
    pub actor_id: String,
    pub actor_role: ActorRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_team_id: Option<TeamId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryApproveParams {
    pub workspace_dir: PathBuf,
    pub project_id: ProjectId,
    pub artifact_id: ArtifactId,
    #[serde(flatten)]
    pub actor: ApprovalActor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneApproveParams {
    pub workspace_dir: PathBuf,
    pub project_id: ProjectId,
    pub artifact_id: ArtifactId,
    #[serde(flatten)]
    pub actor: ApprovalActor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxResolveParams {
    pub workspace_dir: PathBuf,
    pub project_id: ProjectId,
    pub artifact_id: ArtifactId,
    /// `approved` or `denied`.
    pub decision: guild_core::ReviewDecision,
    #[serde(flatten)]
    pub actor: ApprovalActor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactReadParams {
    pub workspace_dir: PathBuf,
    pub project_id: ProjectId,
    pub artifact_id: ArtifactId,
    #[serde(flatten)]
    pub actor: ApprovalActor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectCreateParams {
    pub workspace_dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatTickParams {
    pub workspace_dir: PathBuf,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatReportParams {
    pub workspace_dir: PathBuf,
    pub report: HeartbeatWorkerReport,
}

/// One allocation row for `pm.apply_allocations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAllocation {
    pub task_id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_agent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyAllocationsParams {
    pub workspace_dir: PathBuf,
    pub project_id: ProjectId,
    pub allocations: Vec<TaskAllocation>,
}

#[cfg(test)]
#[path = "params_tests.rs"]
mod tests;
