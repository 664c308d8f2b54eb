// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Governed mutation methods: memory deltas, milestones, inbox,
//! artifact reads, and PM allocations.

use super::{governance_error, ok, store_error};
use crate::server::ServerContext;
use guild_core::{PolicyAction, PolicyRequest, PolicyResource};
use guild_governance as governance;
use guild_store::{records, Workspace};
use guild_wire::{
    ApplyAllocationsParams, ArtifactReadParams, InboxResolveParams, MemoryApproveParams,
    MemoryProposeParams, MilestoneApproveParams, RpcError,
};
use serde_json::json;

pub fn memory_propose(
    ctx: &ServerContext,
    p: MemoryProposeParams,
) -> Result<serde_json::Value, RpcError> {
    let ws = Workspace::new(&p.workspace_dir);
    let proposal = governance::MemoryDeltaProposal {
        project_id: p.project_id,
        run_id: p.run_id,
        produced_by: p.produced_by,
        scope_kind: p.scope_kind,
        scope_ref: p.scope_ref,
        title: p.title,
        under_heading: p.under_heading,
        insert_lines: p.insert_lines,
        rationale: p.rationale,
        evidence: p.evidence,
        visibility: p.visibility,
        sensitivity: p.sensitivity,
        context_pack_id: p.context_pack_id,
    };
    let header = governance::propose_memory_delta(&ws, &ctx.clock.iso_now(), &proposal)
        .map_err(governance_error)?;
    ok(json!({
        "artifact_id": header.id.as_str(),
        "target_file": header.target_file,
        "patch_file": header.patch_file,
    }))
}

pub fn memory_approve(
    ctx: &ServerContext,
    p: MemoryApproveParams,
) -> Result<serde_json::Value, RpcError> {
    let ws = Workspace::new(&p.workspace_dir);
    let review = governance::approve_memory_delta(
        &ws,
        &ctx.log,
        &ctx.clock.iso_now(),
        &p.project_id,
        &p.artifact_id,
        &p.actor.actor_id,
        p.actor.actor_role,
        p.actor.actor_team_id,
        p.notes.as_deref(),
    )
    .map_err(governance_error)?;
    ok(json!({ "review_id": review.id.as_str(), "decision": "approved" }))
}

pub fn milestone_approve(
    ctx: &ServerContext,
    p: MilestoneApproveParams,
) -> Result<serde_json::Value, RpcError> {
    let ws = Workspace::new(&p.workspace_dir);
    let review = governance::approve_milestone(
        &ws,
        &ctx.log,
        &ctx.clock.iso_now(),
        &p.project_id,
        &p.artifact_id,
        &p.actor.actor_id,
        p.actor.actor_role,
        p.actor.actor_team_id,
        p.notes.as_deref(),
    )
    .map_err(governance_error)?;
    ok(json!({ "review_id": review.id.as_str(), "decision": "approved" }))
}

pub fn inbox_resolve(
    ctx: &ServerContext,
    p: InboxResolveParams,
) -> Result<serde_json::Value, RpcError> {
    let ws = Workspace::new(&p.workspace_dir);
    let executor = ctx.heartbeat.executor();
    let resolution = governance::resolve_inbox_item(
        &ws,
        &ctx.log,
        executor.as_ref(),
        &ctx.clock.iso_now(),
        &p.project_id,
        &p.artifact_id,
        p.decision,
        &p.actor.actor_id,
        p.actor.actor_role,
        p.actor.actor_team_id,
        p.notes.as_deref(),
    )
    .map_err(governance_error)?;
    ok(resolution)
}

/// `artifact.read`: policy-gated read returning header + body.
pub fn artifact_read(
    ctx: &ServerContext,
    p: ArtifactReadParams,
) -> Result<serde_json::Value, RpcError> {
    let ws = Workspace::new(&p.workspace_dir);
    let (header, body) =
        records::read_artifact(&ws, &p.project_id, &p.artifact_id).map_err(store_error)?;

    let project_team = records::read_project(&ws, &p.project_id).ok().and_then(|pr| pr.team_id);
    let request = PolicyRequest {
        actor_id: p.actor.actor_id.clone(),
        actor_role: p.actor.actor_role,
        actor_team_id: p.actor.actor_team_id,
        action: PolicyAction::Read,
        resource: PolicyResource {
            resource_id: p.artifact_id.to_string(),
            visibility: header.visibility,
            kind: header.kind.as_str().to_string(),
            team_id: project_team,
            sensitivity: header.sensitivity,
            produced_by: Some(header.produced_by.to_string()),
        },
        run_id: p.run_id,
    };
    let decision = governance::enforce_policy(&ws, &ctx.log, &p.project_id, &request)
        .map_err(governance_error)?;
    if !decision.allowed {
        return Err(governance_error(
            guild_governance::GovernanceError::PolicyDenied(decision),
        ));
    }

    ok(json!({ "header": header, "body": body }))
}

/// `pm.apply_allocations`: write schedule fields onto tasks.
pub fn apply_allocations(
    _ctx: &ServerContext,
    p: ApplyAllocationsParams,
) -> Result<serde_json::Value, RpcError> {
    let ws = Workspace::new(&p.workspace_dir);
    let mut updated = 0;
    for allocation in &p.allocations {
        let (mut task, body) =
            records::read_task(&ws, &p.project_id, &allocation.task_id).map_err(store_error)?;
        if let Some(start) = &allocation.planned_start {
            task.schedule.planned_start = Some(start.clone());
        }
        if let Some(end) = &allocation.planned_end {
            task.schedule.planned_end = Some(end.clone());
        }
        if let Some(assignee) = &allocation.assignee_agent_id {
            task.assignee_agent_id = Some(guild_core::AgentId::from_string(assignee));
        }
        records::write_task(&ws, &task, &body).map_err(store_error)?;
        updated += 1;
    }
    ok(json!({ "updated": updated }))
}
