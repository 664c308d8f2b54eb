// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Memory-delta propose and approve.
//!
//! A proposal inserts lines under a heading of a curated memory file and
//! is persisted as an artifact plus a unified-diff patch sibling. The
//! patch is verified to apply to the original and reproduce the expected
//! content before anything is written. Approval re-applies the patch to
//! the possibly-drifted current target, writes an append-only review,
//! and records `approval.decided` on the proposing run.

use crate::error::GovernanceError;
use crate::redact::{assert_no_sensitive_text, redact_sensitive_text};
use guild_core::{
    event_types, ActorRole, ArtifactHeader, ArtifactId, ArtifactKind, EventEnvelope, MemoryScope,
    PolicyAction, PolicyDecision, PolicyRequest, PolicyResource, ProjectId, Review,
    ReviewDecision, ReviewId, ReviewSubject, RunId, Sensitivity, Visibility,
};
use guild_store::{records, EventLog, Workspace};
use serde_json::json;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct MemoryDeltaProposal {
    pub project_id: ProjectId,
    pub run_id: RunId,
    pub produced_by: String,
    pub scope_kind: MemoryScope,
    pub scope_ref: Option<String>,
    pub title: String,
    pub under_heading: String,
    pub insert_lines: Vec<String>,
    pub rationale: String,
    pub evidence: Vec<String>,
    pub visibility: Visibility,
    pub sensitivity: Sensitivity,
    pub context_pack_id: Option<String>,
}

/// Resolve the curated file a scope points at.
fn resolve_target(
    ws: &Workspace,
    scope_kind: MemoryScope,
    scope_ref: Option<&str>,
    project_id: &ProjectId,
) -> Result<PathBuf, GovernanceError> {
    match scope_kind {
        MemoryScope::ProjectMemory => Ok(ws.project_memory_md(project_id)),
        MemoryScope::AgentGuidance => {
            let agent_ref = scope_ref.ok_or_else(|| {
                GovernanceError::Invalid("agent_guidance scope requires scope_ref".to_string())
            })?;
            Ok(ws.agent_guidance_md(agent_ref))
        }
    }
}

/// Insert `lines` immediately after the first occurrence of `heading`.
fn insert_under_heading(
    original: &str,
    heading: &str,
    lines: &[String],
) -> Result<String, GovernanceError> {
    let mut out = Vec::new();
    let mut inserted = false;
    for line in original.lines() {
        out.push(line.to_string());
        if !inserted && line.trim() == heading.trim() {
            for insert in lines {
                out.push(insert.clone());
            }
            inserted = true;
        }
    }
    if !inserted {
        return Err(GovernanceError::NotFound(format!("heading not found: {heading}")));
    }
    let mut text = out.join("\n");
    if original.ends_with('\n') {
        text.push('\n');
    }
    Ok(text)
}

/// Render a unified diff with workspace-relative a/ b/ paths.
fn render_patch(original: &str, modified: &str, target_rel: &str) -> String {
    let patch = diffy::create_patch(original, modified);
    let body = patch.to_string();
    let mut lines = body.lines();
    let _ = lines.next();
    let _ = lines.next();
    let mut out = format!("--- a/{target_rel}\n+++ b/{target_rel}\n");
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Strip the a/ b/ header so diffy can re-parse what we wrote.
fn parse_patch(text: &str) -> Result<diffy::Patch<'_, str>, GovernanceError> {
    diffy::Patch::from_str(text)
        .map_err(|e| GovernanceError::Invalid(format!("patch does not parse: {e}")))
}

/// Validate, redact, diff, verify, and persist a proposal.
pub fn propose_memory_delta(
    ws: &Workspace,
    now_iso: &str,
    proposal: &MemoryDeltaProposal,
) -> Result<ArtifactHeader, GovernanceError> {
    if proposal.rationale.trim().is_empty() {
        return Err(GovernanceError::Invalid("rationale must be non-empty".to_string()));
    }
    if proposal.evidence.is_empty() {
        return Err(GovernanceError::Invalid("at least one evidence item required".to_string()));
    }
    if proposal.sensitivity == Sensitivity::Restricted && proposal.visibility == Visibility::Org {
        return Err(GovernanceError::Invalid(
            "sensitivity=restricted forbids visibility=org".to_string(),
        ));
    }

    // Redaction gate on every user-authored field.
    assert_no_sensitive_text(&proposal.title, "title")?;
    assert_no_sensitive_text(&proposal.rationale, "rationale")?;
    assert_no_sensitive_text(&proposal.insert_lines.join("\n"), "insert_lines")?;

    let target_abs =
        resolve_target(ws, proposal.scope_kind, proposal.scope_ref.as_deref(), &proposal.project_id)?;
    let target_rel = ws.rel_of(&target_abs)?;
    let original = std::fs::read_to_string(&target_abs)
        .map_err(|e| guild_store::StoreError::from_read(&target_abs, e))?;

    let modified = insert_under_heading(&original, &proposal.under_heading, &proposal.insert_lines)?;
    let patch_text = render_patch(&original, &modified, &target_rel);

    // The patch must round-trip before anything is persisted.
    let reparsed = parse_patch(&patch_text)?;
    let reapplied = diffy::apply(&original, &reparsed)
        .map_err(|e| GovernanceError::Invalid(format!("patch does not apply: {e}")))?;
    if reapplied != modified {
        return Err(GovernanceError::Invalid(
            "patch round-trip does not reproduce expected content".to_string(),
        ));
    }
    let patch_text = redact_sensitive_text(&patch_text);

    let artifact_id = ArtifactId::generate();
    let mut header = ArtifactHeader::new(
        ArtifactKind::MemoryDelta,
        artifact_id,
        proposal.title.clone(),
        proposal.project_id,
        guild_core::AgentId::from_string(&proposal.produced_by),
        proposal.run_id,
    );
    header.created_at = now_iso.to_string();
    header.visibility = proposal.visibility;
    header.sensitivity = Some(proposal.sensitivity);
    header.scope_kind = Some(proposal.scope_kind);
    header.scope_ref = proposal.scope_ref.clone();
    header.target_file = Some(target_rel);
    header.patch_file =
        Some(ws.rel_of(&ws.artifact_sibling(&proposal.project_id, &artifact_id, "patch"))?);
    header.rationale = Some(proposal.rationale.clone());
    header.evidence = proposal.evidence.clone();
    header.context_pack_id = proposal.context_pack_id.clone();

    let body = format!(
        "## Proposed insertion under `{}`\n\n{}\n\n## Rationale\n\n{}\n",
        proposal.under_heading,
        proposal.insert_lines.join("\n"),
        proposal.rationale,
    );
    records::write_artifact(ws, &header, &body)?;
    guild_store::atomic_write(
        &ws.artifact_sibling(&proposal.project_id, &artifact_id, "patch"),
        patch_text.as_bytes(),
    )?;

    tracing::info!(artifact_id = %artifact_id, target = ?header.target_file, "memory delta proposed");
    Ok(header)
}

/// Approve a proposal: policy, re-apply, persist, review, event.
#[allow(clippy::too_many_arguments)]
pub fn approve_memory_delta(
    ws: &Workspace,
    log: &EventLog,
    now_iso: &str,
    project_id: &ProjectId,
    artifact_id: &ArtifactId,
    actor_id: &str,
    actor_role: ActorRole,
    actor_team_id: Option<guild_core::TeamId>,
    notes: Option<&str>,
) -> Result<Review, GovernanceError> {
    let (header, _body) = records::read_artifact(ws, project_id, artifact_id)
        .map_err(|e| match e {
            guild_store::StoreError::NotFound(m) => GovernanceError::NotFound(m),
            other => GovernanceError::Store(other),
        })?;
    if header.kind != ArtifactKind::MemoryDelta {
        return Err(GovernanceError::Conflict(format!(
            "artifact {artifact_id} is {}, not memory_delta",
            header.kind.as_str()
        )));
    }

    if let Some(notes) = notes {
        assert_no_sensitive_text(notes, "notes")?;
    }

    let request = PolicyRequest {
        actor_id: actor_id.to_string(),
        actor_role,
        actor_team_id,
        action: PolicyAction::Approve,
        resource: PolicyResource {
            resource_id: artifact_id.to_string(),
            visibility: header.visibility,
            kind: "memory_delta".to_string(),
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

    // Re-apply the stored patch to the current (possibly drifted) target.
    let patch_rel = header
        .patch_file
        .clone()
        .ok_or_else(|| GovernanceError::Invalid("memory_delta has no patch_file".to_string()))?;
    let patch_abs = ws.resolve_rel(&patch_rel)?;
    let patch_text = std::fs::read_to_string(&patch_abs)
        .map_err(|e| guild_store::StoreError::from_read(&patch_abs, e))?;
    let target_rel = header
        .target_file
        .clone()
        .ok_or_else(|| GovernanceError::Invalid("memory_delta has no target_file".to_string()))?;
    let target_abs = ws.resolve_rel(&target_rel)?;
    let current = std::fs::read_to_string(&target_abs)
        .map_err(|e| guild_store::StoreError::from_read(&target_abs, e))?;

    let patch = parse_patch(&patch_text)?;
    let updated = diffy::apply(&current, &patch).map_err(|e| {
        GovernanceError::Conflict(format!("patch no longer applies to {target_rel}: {e}"))
    })?;
    guild_store::atomic_write(&target_abs, updated.as_bytes())?;

    let review = Review {
        id: ReviewId::generate(),
        created_at: now_iso.to_string(),
        actor_id: actor_id.to_string(),
        actor_role,
        decision: ReviewDecision::Approved,
        subject: ReviewSubject {
            kind: "memory_delta".to_string(),
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
        EventEnvelope::new(
            header.run_id,
            "",
            actor_id,
            event_types::APPROVAL_DECIDED,
            json!({
                "artifact_id": artifact_id.as_str(),
                "kind": "memory_delta",
                "decision": "approved",
                "review_id": review.id.as_str(),
            }),
        ),
    )?;

    tracing::info!(artifact_id = %artifact_id, review_id = %review.id, "memory delta approved");
    Ok(review)
}

/// Build the denial decision trace for a deny-without-mutation path.
pub(crate) fn deny_review(
    now_iso: &str,
    header: &ArtifactHeader,
    actor_id: &str,
    actor_role: ActorRole,
    decision: PolicyDecision,
    notes: Option<&str>,
) -> Review {
    Review {
        id: ReviewId::generate(),
        created_at: now_iso.to_string(),
        actor_id: actor_id.to_string(),
        actor_role,
        decision: ReviewDecision::Denied,
        subject: ReviewSubject {
            kind: header.kind.as_str().to_string(),
            artifact_id: header.id,
            project_id: Some(header.project_id),
            task_id: header.task_id,
            milestone_id: header.milestone_id.clone(),
        },
        policy: decision,
        notes: notes.map(str::to_string),
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
