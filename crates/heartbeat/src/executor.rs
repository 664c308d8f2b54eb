// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Report execution pipeline.
//!
//! Per action: idempotency reservation, tick and hourly rate limits, the
//! approval gate (needs_approval, risk ≥ medium, or quiet hours), then
//! dispatch by kind. Executed keys are remembered until their TTL so a
//! replayed report executes nothing twice.

use crate::error::HeartbeatError;
use crate::triage::parse_iso_ms;
use guild_core::{
    ArtifactHeader, ArtifactId, ArtifactKind, CommentId, CommentRecord, HeartbeatAction,
    HeartbeatActionKind, HeartbeatConfig, HeartbeatState, HeartbeatWorkerReport,
    IdempotencyRecord, IdempotencyStatus, ReportStatus, Risk, RunId, Visibility,
};
use guild_governance::assert_no_sensitive_text;
use guild_store::{records, Workspace};
use serde::Serialize;

/// Submits worker jobs on behalf of `launch_job` actions. The daemon
/// wires this to the session runtime through the launch lane.
pub trait JobLauncher: Send + Sync {
    fn launch(
        &self,
        ws: &Workspace,
        action: &HeartbeatAction,
        worker_agent_id: &str,
    ) -> Result<RunId, String>;
}

/// Launcher for dry contexts and tests: refuses politely.
#[derive(Debug, Clone, Default)]
pub struct NoopJobLauncher;

impl JobLauncher for NoopJobLauncher {
    fn launch(
        &self,
        _ws: &Workspace,
        _action: &HeartbeatAction,
        _worker: &str,
    ) -> Result<RunId, String> {
        Err("no job launcher configured".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    Executed,
    Deduped,
    RateLimited,
    ProposalCreated,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportOutcome {
    pub executed: u32,
    pub deduped: u32,
    pub rate_limited: u32,
    pub proposals_created: u32,
    pub failed: u32,
}

pub struct HeartbeatExecutor {
    pub launcher: std::sync::Arc<dyn JobLauncher>,
}

impl HeartbeatExecutor {
    pub fn new(launcher: std::sync::Arc<dyn JobLauncher>) -> Self {
        Self { launcher }
    }

    /// Apply one worker report to the workspace, mutating `state`.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_report(
        &self,
        ws: &Workspace,
        config: &HeartbeatConfig,
        state: &mut HeartbeatState,
        report: &HeartbeatWorkerReport,
        now_ms: u64,
        now_iso: &str,
        quiet_now: bool,
    ) -> Result<ReportOutcome, HeartbeatError> {
        let mut outcome = ReportOutcome::default();

        let worker_entry = state.worker_state.entry(report.worker_agent_id).or_default();
        worker_entry.last_report_status = Some(report.status);
        if report.status == ReportStatus::Ok {
            worker_entry.last_ok_at = Some(now_iso.to_string());
            return Ok(outcome);
        }

        let hour_bucket = hour_bucket(now_ms);
        let mut executed_this_tick = 0u32;

        for action in &report.actions {
            // 1. Idempotency.
            if let Some(existing) = state.idempotency.get(&action.idempotency_key) {
                let expired =
                    parse_iso_ms(&existing.expires_at).map_or(false, |exp| exp <= now_ms);
                if existing.status == IdempotencyStatus::Executed && !expired {
                    outcome.deduped += 1;
                    state.stats.actions_deduped += 1;
                    if let Some(entry) = state.idempotency.get_mut(&action.idempotency_key) {
                        entry.last_seen_at = now_iso.to_string();
                    }
                    continue;
                }
            }
            let ttl_ms = u64::from(config.idempotency_ttl_hours) * 3_600_000;
            state
                .idempotency
                .entry(action.idempotency_key.clone())
                .and_modify(|entry| {
                    entry.last_seen_at = now_iso.to_string();
                    entry.status = IdempotencyStatus::Queued;
                })
                .or_insert_with(|| IdempotencyRecord {
                    first_seen_at: now_iso.to_string(),
                    last_seen_at: now_iso.to_string(),
                    expires_at: iso_from_ms(now_ms + ttl_ms),
                    status: IdempotencyStatus::Queued,
                    execution_count: 0,
                });

            // 2. Rate limits.
            let hourly = state.hourly_action_counters.get(&hour_bucket).copied().unwrap_or(0);
            if executed_this_tick >= config.max_auto_actions_per_tick
                || hourly >= config.max_auto_actions_per_hour
            {
                outcome.rate_limited += 1;
                continue;
            }

            // 3. Approval gate.
            if action.needs_approval || action.risk >= Risk::Medium || quiet_now {
                self.write_proposal(ws, &report.worker_agent_id.to_string(), action, now_iso)?;
                outcome.proposals_created += 1;
                state.stats.proposals_created += 1;
                continue;
            }

            // 4. Execute.
            match self.execute_action(ws, action, &report.worker_agent_id.to_string(), now_iso) {
                Ok(()) => {
                    executed_this_tick += 1;
                    *state.hourly_action_counters.entry(hour_bucket.clone()).or_default() += 1;
                    if let Some(entry) = state.idempotency.get_mut(&action.idempotency_key) {
                        entry.status = IdempotencyStatus::Executed;
                        entry.execution_count += 1;
                    }
                    outcome.executed += 1;
                    state.stats.actions_executed += 1;
                }
                Err(e) => {
                    tracing::warn!(key = action.idempotency_key, error = e, "action failed");
                    outcome.failed += 1;
                }
            }
        }

        Ok(outcome)
    }

    /// Dispatch one approved/auto action by kind.
    pub fn execute_action(
        &self,
        ws: &Workspace,
        action: &HeartbeatAction,
        worker_agent_id: &str,
        now_iso: &str,
    ) -> Result<(), String> {
        match &action.kind {
            HeartbeatActionKind::Noop => Ok(()),
            HeartbeatActionKind::AddComment { project_id, task_id, body } => {
                assert_no_sensitive_text(body, "comment body").map_err(|e| e.to_string())?;
                let comment = CommentRecord {
                    id: CommentId::generate(),
                    task_id: *task_id,
                    author_agent_id: guild_core::AgentId::from_string(worker_agent_id),
                    body: body.clone(),
                    created_at: now_iso.to_string(),
                };
                records::write_comment(ws, project_id, &comment).map_err(|e| e.to_string())
            }
            HeartbeatActionKind::LaunchJob { .. } => {
                let run_id = self.launcher.launch(ws, action, worker_agent_id)?;
                tracing::info!(%run_id, "heartbeat job launched");
                Ok(())
            }
            HeartbeatActionKind::CreateApprovalItem { .. } => self
                .write_proposal(ws, worker_agent_id, action, now_iso)
                .map_err(|e| e.to_string()),
        }
    }

    /// Persist a `heartbeat_action_proposal` artifact embedding the
    /// action for later inbox resolution.
    fn write_proposal(
        &self,
        ws: &Workspace,
        worker_agent_id: &str,
        action: &HeartbeatAction,
        now_iso: &str,
    ) -> Result<(), HeartbeatError> {
        let project_id = match &action.kind {
            HeartbeatActionKind::AddComment { project_id, .. }
            | HeartbeatActionKind::LaunchJob { project_id, .. }
            | HeartbeatActionKind::CreateApprovalItem { project_id, .. } => *project_id,
            HeartbeatActionKind::Noop => {
                return Err(HeartbeatError::Invalid("noop needs no proposal".to_string()))
            }
        };

        let title = match &action.kind {
            HeartbeatActionKind::AddComment { .. } => "Proposed comment",
            HeartbeatActionKind::LaunchJob { .. } => "Proposed job launch",
            HeartbeatActionKind::CreateApprovalItem { title, .. } => title.as_str(),
            HeartbeatActionKind::Noop => "Proposed noop",
        };
        assert_no_sensitive_text(title, "proposal title")?;

        let mut header = ArtifactHeader::new(
            ArtifactKind::HeartbeatActionProposal,
            ArtifactId::generate(),
            title,
            project_id,
            guild_core::AgentId::from_string(worker_agent_id),
            RunId::from_string(""),
        );
        header.created_at = now_iso.to_string();
        header.visibility = Visibility::Managers;
        header.action = Some(
            serde_json::to_value(action)
                .map_err(|e| HeartbeatError::Invalid(format!("action serialize: {e}")))?,
        );

        let body = format!(
            "Heartbeat proposes `{}` (risk: {:?}, key: `{}`).\n",
            kind_name(&action.kind),
            action.risk,
            action.idempotency_key,
        );
        records::write_artifact(ws, &header, &body)?;
        Ok(())
    }
}

/// The executor doubles as governance's approved-action callback.
impl guild_governance::ActionExecutor for HeartbeatExecutor {
    fn execute(
        &self,
        ws: &Workspace,
        action: &HeartbeatAction,
        approved_by: &str,
    ) -> Result<(), String> {
        // Approved proposals execute directly; proposal-kind actions
        // would recurse, so they degrade to a no-op here.
        if matches!(action.kind, HeartbeatActionKind::CreateApprovalItem { .. }) {
            return Ok(());
        }
        let now_iso = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        self.execute_action(ws, action, approved_by, &now_iso)
    }
}

fn kind_name(kind: &HeartbeatActionKind) -> &'static str {
    match kind {
        HeartbeatActionKind::AddComment { .. } => "add_comment",
        HeartbeatActionKind::LaunchJob { .. } => "launch_job",
        HeartbeatActionKind::CreateApprovalItem { .. } => "create_approval_item",
        HeartbeatActionKind::Noop => "noop",
    }
}

/// `YYYYMMDDHH` bucket for the hourly counter.
pub fn hour_bucket(now_ms: u64) -> String {
    let dt = chrono::DateTime::from_timestamp_millis(now_ms as i64).unwrap_or_default();
    dt.format("%Y%m%d%H").to_string()
}

fn iso_from_ms(ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(ms as i64)
        .unwrap_or_default()
        .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
