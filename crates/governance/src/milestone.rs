// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Milestone approval with evidence checks.
//!
//! A `milestone_report` artifact claims a task milestone is done. The
//! approver's policy check runs first, then the evidence rules: a
//! milestone requiring a patch needs at least one evidence artifact with
//! a `.patch` sibling, and one requiring tests needs at least one
//! `tests_artifacts` entry with a `.txt` or `.json` sibling. Marking the
//! milestone done may auto-promote the task.

use crate::error::GovernanceError;
use crate::redact::assert_no_sensitive_text;
use guild_core::{
    event_types, ActorRole, ArtifactHeader, ArtifactId, ArtifactKind, EventEnvelope,
    MilestoneStatus, PolicyAction, PolicyRequest, PolicyResource, ProjectId, Review,
    ReviewDecision, ReviewId, ReviewSubject, TeamId,
};
use guild_store::{records, EventLog, Workspace};
use serde_json::json;

fn load_report(
    ws: &Workspace,
    project_id: &ProjectId,
    artifact_id: &ArtifactId,
) -> Result<ArtifactHeader, GovernanceError> {
    let (header, _body) = records::read_artifact(ws, project_id, artifact_id).map_err(|e| match e
    {
        guild_store::StoreError::NotFound(m) => GovernanceError::NotFound(m),
        other => GovernanceError::Store(other),
    })?;
    if header.kind != ArtifactKind::MilestoneReport {
        return Err(GovernanceError::Conflict(format!(
            "artifact {artifact_id} is {}, not milestone_report",
            header.kind.as_str()
        )));
    }
    if header.project_id != *project_id {
        return Err(GovernanceError::Conflict(format!(
            "report {artifact_id} belongs to project {}, not {project_id}",
            header.project_id
        )));
    }
    Ok(header)
}

/// Does any listed artifact have a sibling with one of these extensions?
fn has_sibling(
    ws: &Workspace,
    project_id: &ProjectId,
    artifacts: &[ArtifactId],
    extensions: &[&str],
) -> bool {
    artifacts.iter().any(|artifact_id| {
        extensions
            .iter()
            .any(|ext| ws.artifact_sibling(project_id, artifact_id, ext).is_file())
    })
}

/// Approve a milestone report.
#[allow(clippy::too_many_arguments)]
pub fn approve_milestone(
    ws: &Workspace,
    log: &EventLog,
    now_iso: &str,
    project_id: &ProjectId,
    artifact_id: &ArtifactId,
    actor_id: &str,
    actor_role: ActorRole,
    actor_team_id: Option<TeamId>,
    notes: Option<&str>,
) -> Result<Review, GovernanceError> {
    let header = load_report(ws, project_id, artifact_id)?;
    if let Some(notes) = notes {
        assert_no_sensitive_text(notes, "notes")?;
    }

    let task_id = header
        .task_id
        .ok_or_else(|| GovernanceError::Invalid("report carries no task_id".to_string()))?;
    let milestone_id = header
        .milestone_id
        .clone()
        .ok_or_else(|| GovernanceError::Invalid("report carries no milestone_id".to_string()))?;

    let request = PolicyRequest {
        actor_id: actor_id.to_string(),
        actor_role,
        actor_team_id,
        action: PolicyAction::Approve,
        resource: PolicyResource {
            resource_id: artifact_id.to_string(),
            visibility: header.visibility,
            kind: "milestone_report".to_string(),
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

    let (mut task, body) = records::read_task(ws, project_id, &task_id).map_err(|e| match e {
        guild_store::StoreError::NotFound(m) => GovernanceError::NotFound(m),
        other => GovernanceError::Store(other),
    })?;
    let milestone = task
        .milestone(&milestone_id)
        .ok_or_else(|| {
            GovernanceError::NotFound(format!("milestone {milestone_id} not on task {task_id}"))
        })?
        .clone();
    if milestone.status == MilestoneStatus::Done {
        return Err(GovernanceError::Conflict(format!(
            "milestone {milestone_id} is already done"
        )));
    }

    let evidence = milestone.effective_evidence();
    if evidence.requires_patch
        && !has_sibling(ws, project_id, &header.evidence_artifacts, &["patch"])
    {
        return Err(GovernanceError::Conflict(format!(
            "milestone {milestone_id} requires a .patch evidence sibling"
        )));
    }
    if evidence.requires_tests
        && !has_sibling(ws, project_id, &header.tests_artifacts, &["txt", "json"])
    {
        return Err(GovernanceError::Conflict(format!(
            "milestone {milestone_id} requires a .txt or .json tests sibling"
        )));
    }

    // All checks passed; now mutate.
    for m in &mut task.milestones {
        if m.id == milestone_id {
            m.status = MilestoneStatus::Done;
        }
    }
    let promoted = task.reconcile_status();
    records::write_task(ws, &task, &body)?;

    let review = Review {
        id: ReviewId::generate(),
        created_at: now_iso.to_string(),
        actor_id: actor_id.to_string(),
        actor_role,
        decision: ReviewDecision::Approved,
        subject: ReviewSubject {
            kind: "milestone_report".to_string(),
            artifact_id: *artifact_id,
            project_id: Some(*project_id),
            task_id: Some(task_id),
            milestone_id: Some(milestone_id.clone()),
        },
        policy: decision,
        notes: notes.map(str::to_string),
    };
    records::write_review(ws, &review)?;

    log.append(
        &ws.events_jsonl(project_id, &header.run_id),
        EventEnvelope::new(
            header.run_id,
            "",
            actor_id,
            event_types::APPROVAL_DECIDED,
            json!({
                "artifact_id": artifact_id.as_str(),
                "kind": "milestone_report",
                "decision": "approved",
                "milestone_id": milestone_id,
                "task_promoted": promoted,
                "review_id": review.id.as_str(),
            }),
        ),
    )?;

    tracing::info!(
        %artifact_id,
        %task_id,
        milestone_id,
        task_promoted = promoted,
        "milestone approved"
    );
    Ok(review)
}

#[cfg(test)]
#[path = "milestone_tests.rs"]
mod tests;
