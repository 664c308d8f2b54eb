// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run records (`run.yaml`) and usage accounting.

use crate::id::{AgentId, ProjectId, RunId, TaskId};
use crate::provider::Provider;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a run. `Running` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Ended,
    Failed,
    Stopped,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Ended => "ended",
            RunStatus::Failed => "failed",
            RunStatus::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of work a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunSpecKind {
    #[default]
    Adhoc,
    Task,
    Heartbeat,
}

/// Declarative description of a run, persisted in `run.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSpec {
    #[serde(default)]
    pub kind: RunSpecKind,
    /// Key into machine.yaml's `repo_roots` for worktree isolation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree_relpath: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin_relpath: Option<String>,
}

/// Where a usage figure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageSource {
    /// Parsed from a provider-emitted usage line.
    ProviderReported,
    /// Derived from output length (`tokens ≈ chars / 4`).
    EstimatedChars,
}

/// Confidence attached to a usage figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageConfidence {
    High,
    Low,
}

/// Token usage for a terminal run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub source: UsageSource,
    pub confidence: UsageConfidence,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
}

impl Usage {
    /// Character-count estimate used when no provider usage line appears.
    pub fn estimate_from_chars(stdout_chars: usize, stderr_chars: usize) -> Self {
        let output_tokens = ((stdout_chars + stderr_chars) / 4).max(1) as u64;
        Self {
            source: UsageSource::EstimatedChars,
            confidence: UsageConfidence::Low,
            input_tokens: 0,
            output_tokens,
            total_tokens: output_tokens,
            cost_usd: None,
        }
    }
}

/// The run record persisted as `work/projects/<pid>/runs/<rid>/run.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: RunId,
    pub project_id: ProjectId,
    pub agent_id: AgentId,
    pub provider: Provider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub created_at: String,
    pub status: RunStatus,
    #[serde(default)]
    pub spec: RunSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl Run {
    /// Apply a status transition, enforcing terminal stickiness.
    ///
    /// Returns `false` (and leaves the record alone) when the transition
    /// would regress a terminal state. A terminal → terminal change is only
    /// permitted for `Stopped`, which preempts the default terminal status
    /// when a stop raced the child's exit.
    pub fn transition(&mut self, next: RunStatus) -> bool {
        if self.status == next {
            return true;
        }
        if self.status.is_terminal() {
            if next == RunStatus::Stopped {
                self.status = next;
                return true;
            }
            return false;
        }
        self.status = next;
        true
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
