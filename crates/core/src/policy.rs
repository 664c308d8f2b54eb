// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Policy request/decision types.
//!
//! Evaluation lives in guild-governance; the types live here so the wire
//! layer and the review records can carry decision traces without a
//! governance dependency.

use crate::actor::{ActorRole, Sensitivity, Visibility};
use crate::id::{RunId, TeamId};
use serde::{Deserialize, Serialize};

/// The action an actor is attempting against a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    Read,
    Approve,
    Compose,
}

impl PolicyAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyAction::Read => "read",
            PolicyAction::Approve => "approve",
            PolicyAction::Compose => "compose",
        }
    }
}

/// The resource side of a policy check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyResource {
    pub resource_id: String,
    pub visibility: Visibility,
    /// Artifact type string or other resource class.
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<Sensitivity>,
    /// Producing agent, for `private_agent` visibility checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub produced_by: Option<String>,
}

/// A complete policy question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRequest {
    pub actor_id: String,
    pub actor_role: ActorRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_team_id: Option<TeamId>,
    pub action: PolicyAction,
    pub resource: PolicyResource,
    /// Run to receive denial events, when one is in scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
}

/// Which rule produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyRule {
    VisibilityOrg,
    VisibilityManagers,
    VisibilityTeam,
    VisibilityPrivateAgent,
    ApproveMemoryDelta,
    ApproveMilestone,
    ApproveHeartbeatAction,
    SensitivityRestricted,
}

/// The structured outcome of a policy evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub allowed: bool,
    pub action: PolicyAction,
    pub resource_id: String,
    /// Rules consulted, in evaluation order.
    pub trace: Vec<PolicyRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PolicyDecision {
    pub fn allow(request: &PolicyRequest, trace: Vec<PolicyRule>) -> Self {
        Self {
            allowed: true,
            action: request.action,
            resource_id: request.resource.resource_id.clone(),
            trace,
            reason: None,
        }
    }

    pub fn deny(request: &PolicyRequest, trace: Vec<PolicyRule>, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            action: request.action,
            resource_id: request.resource.resource_id.clone(),
            trace,
            reason: Some(reason.into()),
        }
    }
}
