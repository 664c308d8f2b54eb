// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Policy evaluation.
//!
//! `evaluate_policy` is pure; `enforce_policy` additionally writes the
//! decision events into the actor's run when one is in scope: every
//! denial appends `policy.denied` plus `policy.decision {allowed:false}`,
//! and every allowed approval appends `policy.decision {allowed:true}`.

use crate::error::GovernanceError;
use guild_core::{
    event_types, ActorRole, EventEnvelope, PolicyAction, PolicyDecision, PolicyRequest,
    PolicyRule, ProjectId, Sensitivity, Visibility,
};
use guild_store::{EventLog, Workspace};
use serde_json::json;

/// Pure rule evaluation with a structured trace.
pub fn evaluate_policy(request: &PolicyRequest) -> PolicyDecision {
    let mut trace = Vec::new();
    let role = request.actor_role;

    // Restricted content needs director-or-above for read and compose.
    if request.resource.sensitivity == Some(Sensitivity::Restricted)
        && matches!(request.action, PolicyAction::Read | PolicyAction::Compose)
    {
        trace.push(PolicyRule::SensitivityRestricted);
        if role.rank() < ActorRole::Director.rank() {
            return PolicyDecision::deny(
                request,
                trace,
                "restricted content requires director or above",
            );
        }
    }

    // Approvals have per-kind role floors.
    if request.action == PolicyAction::Approve {
        let (rule, floor) = match request.resource.kind.as_str() {
            "memory_delta" => (PolicyRule::ApproveMemoryDelta, ActorRole::Director),
            "milestone_report" => (PolicyRule::ApproveMilestone, ActorRole::Manager),
            "heartbeat_action_proposal" => {
                (PolicyRule::ApproveHeartbeatAction, ActorRole::Manager)
            }
            _ => (PolicyRule::ApproveMilestone, ActorRole::Manager),
        };
        trace.push(rule);
        if role.rank() < floor.rank() {
            return PolicyDecision::deny(
                request,
                trace,
                format!("approving {} requires {} or above", request.resource.kind, floor),
            );
        }
    }

    // Visibility gate applies to every action.
    match request.resource.visibility {
        Visibility::Org => {
            trace.push(PolicyRule::VisibilityOrg);
        }
        Visibility::Managers => {
            trace.push(PolicyRule::VisibilityManagers);
            if !role.is_managerial() {
                return PolicyDecision::deny(request, trace, "managers-scoped resource");
            }
        }
        Visibility::Team => {
            trace.push(PolicyRule::VisibilityTeam);
            let same_team = request.actor_team_id.is_some()
                && request.actor_team_id == request.resource.team_id;
            if !same_team && !role.is_managerial() {
                return PolicyDecision::deny(request, trace, "team-scoped resource");
            }
        }
        Visibility::PrivateAgent => {
            trace.push(PolicyRule::VisibilityPrivateAgent);
            let is_producer =
                request.resource.produced_by.as_deref() == Some(request.actor_id.as_str());
            if !is_producer && role != ActorRole::Human {
                return PolicyDecision::deny(request, trace, "private to producing agent");
            }
        }
    }

    PolicyDecision::allow(request, trace)
}

/// Evaluate and record the decision on the actor's run.
pub fn enforce_policy(
    ws: &Workspace,
    log: &EventLog,
    project_id: &ProjectId,
    request: &PolicyRequest,
) -> Result<PolicyDecision, GovernanceError> {
    let decision = evaluate_policy(request);

    if let Some(run_id) = request.run_id {
        let events_path = ws.events_jsonl(project_id, &run_id);
        if !decision.allowed {
            log.append(
                &events_path,
                EventEnvelope::new(
                    run_id,
                    "",
                    request.actor_id.clone(),
                    event_types::POLICY_DENIED,
                    json!({
                        "action": decision.action,
                        "resource_id": decision.resource_id,
                        "reason": decision.reason,
                    }),
                ),
            )?;
            log.append(
                &events_path,
                EventEnvelope::new(
                    run_id,
                    "",
                    request.actor_id.clone(),
                    event_types::POLICY_DECISION,
                    serde_json::to_value(&decision).unwrap_or_default(),
                ),
            )?;
        } else if request.action == PolicyAction::Approve {
            log.append(
                &events_path,
                EventEnvelope::new(
                    run_id,
                    "",
                    request.actor_id.clone(),
                    event_types::POLICY_DECISION,
                    serde_json::to_value(&decision).unwrap_or_default(),
                ),
            )?;
        }
    }

    Ok(decision)
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
