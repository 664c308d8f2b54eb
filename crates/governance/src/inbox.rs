// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbox resolution.
//!
//! Resolves one pending artifact by dispatching on its frontmatter type.
//! Approval routes into the memory-delta or milestone flow; a
//! `heartbeat_action_proposal` executes its embedded action exactly once
//! through the injected executor. Denial writes a review carrying the
//! full policy trace and mutates nothing.

use crate::error::GovernanceError;
use crate::memory::deny_review;
use crate::redact::assert_no_sensitive_text;
use guild_core::{
    ActorRole, ArtifactId, ArtifactKind, HeartbeatAction, PolicyAction, PolicyRequest,
    PolicyResource, ProjectId, Review, ReviewDecision, TeamId,
};
use guild_store::{records, EventLog, Workspace};

/// Executes an approved heartbeat action. Implemented by the heartbeat
/// scheduler and injected here to keep governance free of scheduling
/// concerns.
pub trait ActionExecutor: Send + Sync {
    fn execute(
        &self,
        ws: &Workspace,
        action: &HeartbeatAction,
        approved_by: &str,
    ) -> Result<(), String>;
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct InboxResolution {
    pub review_id: String,
    pub decision: ReviewDecision,
    pub artifact_type: String,
}

/// Resolve one inbox item.
#[allow(clippy::too_many_arguments)]
pub fn resolve_inbox_item(
    ws: &Workspace,
    log: &EventLog,
    executor: &dyn ActionExecutor,
    now_iso: &str,
    project_id: &ProjectId,
    artifact_id: &ArtifactId,
    decision: ReviewDecision,
    actor_id: &str,
    actor_role: ActorRole,
    actor_team_id: Option<TeamId>,
    notes: Option<&str>,
) -> Result<InboxResolution, GovernanceError> {
    // The redaction gate runs before anything else persists.
    if let Some(notes) = notes {
        assert_no_sensitive_text(notes, "notes")?;
    }

    let (header, _body) = records::read_artifact(ws, project_id, artifact_id).map_err(|e| {
        match e {
            guild_store::StoreError::NotFound(m) => GovernanceError::NotFound(m),
            other => GovernanceError::Store(other),
        }
    })?;

    if decision == ReviewDecision::Denied {
        // Denial records the policy trace without evaluating approval
        // floors against the denier; the trace captures what an approval
        // would have checked.
        let request = PolicyRequest {
            actor_id: actor_id.to_string(),
            actor_role,
            actor_team_id,
            action: PolicyAction::Approve,
            resource: PolicyResource {
                resource_id: artifact_id.to_string(),
                visibility: header.visibility,
                kind: header.kind.as_str().to_string(),
                team_id: None,
                sensitivity: header.sensitivity,
                produced_by: Some(header.produced_by.to_string()),
            },
            run_id: Some(header.run_id),
        };
        let trace = crate::policy::evaluate_policy(&request);
        let review = deny_review(now_iso, &header, actor_id, actor_role, trace, notes);
        records::write_review(ws, &review)?;
        log.append(
            &ws.events_jsonl(project_id, &header.run_id),
            guild_core::EventEnvelope::new(
                header.run_id,
                "",
                actor_id,
                guild_core::event_types::APPROVAL_DECIDED,
                serde_json::json!({
                    "artifact_id": artifact_id.as_str(),
                    "kind": header.kind.as_str(),
                    "decision": "denied",
                    "review_id": review.id.as_str(),
                }),
            ),
        )?;
        return Ok(InboxResolution {
            review_id: review.id.to_string(),
            decision: ReviewDecision::Denied,
            artifact_type: header.kind.as_str().to_string(),
        });
    }

    let review: Review = match &header.kind {
        ArtifactKind::MemoryDelta => crate::memory::approve_memory_delta(
            ws,
            log,
            now_iso,
            project_id,
            artifact_id,
            actor_id,
            actor_role,
            actor_team_id,
            notes,
        )?,
        ArtifactKind::MilestoneReport => crate::milestone::approve_milestone(
            ws,
            log,
            now_iso,
            project_id,
            artifact_id,
            actor_id,
            actor_role,
            actor_team_id,
            notes,
        )?,
        ArtifactKind::HeartbeatActionProposal => approve_heartbeat_action(
            ws,
            log,
            executor,
            now_iso,
            project_id,
            artifact_id,
            &header,
            actor_id,
            actor_role,
            actor_team_id,
            notes,
        )?,
        other => {
            return Err(GovernanceError::Conflict(format!(
                "artifact type {} is not resolvable",
                other.as_str()
            )))
        }
    };

    Ok(InboxResolution {
        review_id: review.id.to_string(),
        decision: ReviewDecision::Approved,
        artifact_type: header.kind.as_str().to_string(),
    })
}

#[allow(clippy::too_many_arguments)]
fn approve_heartbeat_action(
    ws: &Workspace,
    log: &EventLog,
    executor: &dyn ActionExecutor,
    now_iso: &str,
    project_id: &ProjectId,
    artifact_id: &ArtifactId,
    header: &guild_core::ArtifactHeader,
    actor_id: &str,
    actor_role: ActorRole,
    actor_team_id: Option<TeamId>,
    notes: Option<&str>,
) -> Result<Review, GovernanceError> {
    let action_value = header
        .action
        .clone()
        .ok_or_else(|| GovernanceError::Invalid("proposal carries no action".to_string()))?;
    let action: HeartbeatAction = serde_json::from_value(action_value)
        .map_err(|e| GovernanceError::Invalid(format!("embedded action does not parse: {e}")))?;

    let request = PolicyRequest {
        actor_id: actor_id.to_string(),
        actor_role,
        actor_team_id,
        action: PolicyAction::Approve,
        resource: PolicyResource {
            resource_id: artifact_id.to_string(),
            visibility: header.visibility,
            kind: "heartbeat_action_proposal".to_string(),
            team_id: None,
            sensitivity: header.sensitivity,
            produced_by: Some(header.produced_by.to_string()),
        },
        run_id: Some(header.run_id),
    };
    let decision = crate::policy::enforce_policy(ws, log, project_id, &request)?;
    if !decision.allowed {
        return Err(GovernanceError::PolicyDenied(decision));
    }

    executor
        .execute(ws, &action, actor_id)
        .map_err(|e| GovernanceError::Conflict(format!("action execution failed: {e}")))?;

    let review = Review {
        id: guild_core::ReviewId::generate(),
        created_at: now_iso.to_string(),
        actor_id: actor_id.to_string(),
        actor_role,
        decision: ReviewDecision::Approved,
        subject: guild_core::ReviewSubject {
            kind: "heartbeat_action_proposal".to_string(),
            artifact_id: *artifact_id,
            project_id: Some(*project_id),
            task_id: None,
            milestone_id: None,
        },
        policy: decision,
        notes: notes.map(str::to_string),
    };
    records::write_review(ws, &review)?;

    log.append(
        &ws.events_jsonl(project_id, &header.run_id),
        guild_core::EventEnvelope::new(
            header.run_id,
            "",
            actor_id,
            guild_core::event_types::APPROVAL_DECIDED,
            serde_json::json!({
                "artifact_id": artifact_id.as_str(),
                "kind": "heartbeat_action_proposal",
                "decision": "approved",
                "review_id": review.id.as_str(),
            }),
        ),
    )?;

    Ok(review)
}

#[cfg(test)]
#[path = "inbox_tests.rs"]
mod tests;
