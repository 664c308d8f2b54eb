// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat configuration, durable state, and worker-report types.
//!
//! The scheduler itself lives in guild-heartbeat; these types are shared
//! with the wire layer and persisted under `.local/heartbeat/`.

use crate::id::{AgentId, ProjectId, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which agents the triage pass considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeartbeatMode {
    #[default]
    WorkersOnly,
    /// Workers plus directors.
    EnterpriseV1,
}

/// Local-clock quiet hours `[start_hour, end_hour)`.
///
/// `start == end` disables the window; `start > end` wraps midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuietHours {
    #[serde(default)]
    pub start_hour: u8,
    #[serde(default)]
    pub end_hour: u8,
}

impl QuietHours {
    pub fn contains(&self, hour: u8) -> bool {
        if self.start_hour == self.end_hour {
            return false;
        }
        if self.start_hour < self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

/// `.local/heartbeat/config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub enabled: bool,
    pub mode: HeartbeatMode,
    pub interval_minutes: u32,
    pub due_horizon_minutes: u32,
    pub stuck_job_running_minutes: u32,
    pub ok_suppression_minutes: u32,
    pub min_wake_score: i32,
    pub top_k_workers: usize,
    pub jitter_max_seconds: u32,
    pub max_auto_actions_per_tick: u32,
    pub max_auto_actions_per_hour: u32,
    pub idempotency_ttl_hours: u32,
    pub quiet_hours: QuietHours,
    /// Fallback project when a wake target has no scoped signal.
    pub default_project_id: Option<ProjectId>,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: HeartbeatMode::WorkersOnly,
            interval_minutes: 15,
            due_horizon_minutes: 240,
            stuck_job_running_minutes: 90,
            ok_suppression_minutes: 45,
            min_wake_score: 5,
            top_k_workers: 2,
            jitter_max_seconds: 120,
            max_auto_actions_per_tick: 3,
            max_auto_actions_per_hour: 10,
            idempotency_ttl_hours: 24,
            quiet_hours: QuietHours::default(),
            default_project_id: None,
        }
    }
}

/// Per-worker scheduler memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_ok_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_context_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppressed_until: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_wake_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_report_status: Option<ReportStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdempotencyStatus {
    Queued,
    Executed,
}

/// One idempotency-key reservation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub first_seen_at: String,
    pub last_seen_at: String,
    pub expires_at: String,
    pub status: IdempotencyStatus,
    #[serde(default)]
    pub execution_count: u32,
}

/// Rolling scheduler counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatStats {
    #[serde(default)]
    pub ticks: u64,
    #[serde(default)]
    pub wakes: u64,
    #[serde(default)]
    pub actions_executed: u64,
    #[serde(default)]
    pub actions_deduped: u64,
    #[serde(default)]
    pub proposals_created: u64,
}

/// `.local/heartbeat/state.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatState {
    /// `projectId::runId` → last consumed event seq.
    pub run_event_cursors: BTreeMap<String, u64>,
    pub worker_state: BTreeMap<AgentId, WorkerState>,
    pub idempotency: BTreeMap<String, IdempotencyRecord>,
    /// `YYYYMMDDHH` bucket → auto-action count.
    pub hourly_action_counters: BTreeMap<String, u32>,
    pub stats: HeartbeatStats,
}

/// Outcome status a worker reports after a wake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Nothing to do; context is settled.
    Ok,
    /// The worker proposes one or more actions.
    Actions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Risk {
    Low,
    Medium,
    High,
}

/// What a heartbeat action does, by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeartbeatActionKind {
    /// Write a comment record into the project.
    AddComment {
        project_id: ProjectId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<TaskId>,
        body: String,
    },
    /// Submit a worker job, spawning a run.
    LaunchJob {
        project_id: ProjectId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<TaskId>,
        prompt: String,
    },
    /// Create a pending approval proposal without doing anything else.
    CreateApprovalItem {
        project_id: ProjectId,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },
    Noop,
}

/// One action from a worker report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatAction {
    pub idempotency_key: String,
    pub risk: Risk,
    #[serde(default)]
    pub needs_approval: bool,
    #[serde(flatten)]
    pub kind: HeartbeatActionKind,
}

/// What a woken worker returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatWorkerReport {
    pub worker_agent_id: AgentId,
    pub status: ReportStatus,
    #[serde(default)]
    pub actions: Vec<HeartbeatAction>,
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
