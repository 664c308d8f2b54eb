// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use guild_core::{PolicyResource, RunId, TeamId};
use yare::parameterized;

fn request(
    role: ActorRole,
    actor_team: Option<&str>,
    action: PolicyAction,
    visibility: Visibility,
    resource_team: Option<&str>,
    kind: &str,
) -> PolicyRequest {
    PolicyRequest {
        actor_id: "agt-reader".to_string(),
        actor_role: role,
        actor_team_id: actor_team.map(TeamId::from_string),
        action,
        resource: PolicyResource {
            resource_id: "art-1".to_string(),
            visibility,
            kind: kind.to_string(),
            team_id: resource_team.map(TeamId::from_string),
            sensitivity: None,
            produced_by: Some("agt-producer".to_string()),
        },
        run_id: None,
    }
}

#[parameterized(
    worker = { ActorRole::Worker },
    manager = { ActorRole::Manager },
    human = { ActorRole::Human },
)]
fn org_visibility_allows_everyone(role: ActorRole) {
    let req = request(role, None, PolicyAction::Read, Visibility::Org, None, "proposal");
    assert!(evaluate_policy(&req).allowed);
}

#[test]
fn managers_visibility_blocks_workers() {
    let req = request(ActorRole::Worker, None, PolicyAction::Read, Visibility::Managers, None, "proposal");
    let decision = evaluate_policy(&req);
    assert!(!decision.allowed);
    assert!(decision.trace.contains(&PolicyRule::VisibilityManagers));
}

#[test]
fn team_visibility_requires_matching_team() {
    let same = request(
        ActorRole::Worker,
        Some("team-a"),
        PolicyAction::Read,
        Visibility::Team,
        Some("team-a"),
        "proposal",
    );
    assert!(evaluate_policy(&same).allowed);

    let cross = request(
        ActorRole::Worker,
        Some("team-b"),
        PolicyAction::Read,
        Visibility::Team,
        Some("team-a"),
        "proposal",
    );
    assert!(!evaluate_policy(&cross).allowed);
}

#[test]
fn managers_cross_team_boundaries() {
    let req = request(
        ActorRole::Director,
        Some("team-b"),
        PolicyAction::Read,
        Visibility::Team,
        Some("team-a"),
        "proposal",
    );
    assert!(evaluate_policy(&req).allowed);
}

#[test]
fn private_agent_only_producer_or_human() {
    let mut req = request(
        ActorRole::Manager,
        None,
        PolicyAction::Read,
        Visibility::PrivateAgent,
        None,
        "proposal",
    );
    assert!(!evaluate_policy(&req).allowed);

    req.actor_id = "agt-producer".to_string();
    assert!(evaluate_policy(&req).allowed);

    req.actor_id = "human:op".to_string();
    req.actor_role = ActorRole::Human;
    assert!(evaluate_policy(&req).allowed);
}

#[parameterized(
    manager_denied = { ActorRole::Manager, false },
    director_allowed = { ActorRole::Director, true },
    ceo_allowed = { ActorRole::Ceo, true },
)]
fn memory_delta_approval_floor_is_director(role: ActorRole, expected: bool) {
    let req = request(role, None, PolicyAction::Approve, Visibility::Org, None, "memory_delta");
    assert_eq!(evaluate_policy(&req).allowed, expected);
}

#[parameterized(
    worker_denied = { ActorRole::Worker, false },
    manager_allowed = { ActorRole::Manager, true },
)]
fn milestone_approval_floor_is_manager(role: ActorRole, expected: bool) {
    let req = request(role, None, PolicyAction::Approve, Visibility::Org, None, "milestone_report");
    assert_eq!(evaluate_policy(&req).allowed, expected);
}

#[test]
fn heartbeat_action_approval_floor_is_manager() {
    let req = request(
        ActorRole::Manager,
        None,
        PolicyAction::Approve,
        Visibility::Org,
        None,
        "heartbeat_action_proposal",
    );
    assert!(evaluate_policy(&req).allowed);
}

#[test]
fn restricted_read_requires_director() {
    let mut req = request(ActorRole::Manager, None, PolicyAction::Read, Visibility::Org, None, "proposal");
    req.resource.sensitivity = Some(Sensitivity::Restricted);
    let decision = evaluate_policy(&req);
    assert!(!decision.allowed);
    assert!(decision.trace.contains(&PolicyRule::SensitivityRestricted));

    req.actor_role = ActorRole::Director;
    assert!(evaluate_policy(&req).allowed);
}

#[test]
fn denial_emits_two_events_on_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    let log = EventLog::system();
    let project_id = ProjectId::from_string("prj-1");
    let mut req = request(ActorRole::Worker, None, PolicyAction::Read, Visibility::Managers, None, "proposal");
    req.run_id = Some(RunId::from_string("run-1"));

    let decision = enforce_policy(&ws, &log, &project_id, &req).unwrap();
    assert!(!decision.allowed);

    let report = guild_store::replay_run(
        &ws.events_jsonl(&project_id, &RunId::from_string("run-1")),
        guild_store::ReplayMode::Raw,
    )
    .unwrap();
    let types: Vec<_> = report
        .events
        .iter()
        .filter_map(|e| e.get("type").and_then(|t| t.as_str()))
        .collect();
    assert_eq!(types, vec!["policy.denied", "policy.decision"]);
    let payload = &report.events[1]["payload"];
    assert_eq!(payload["allowed"], false);
}

#[test]
fn allowed_approval_emits_decision_event() {
    let dir = tempfile::tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    let log = EventLog::system();
    let project_id = ProjectId::from_string("prj-1");
    let mut req =
        request(ActorRole::Director, None, PolicyAction::Approve, Visibility::Org, None, "memory_delta");
    req.run_id = Some(RunId::from_string("run-1"));

    let decision = enforce_policy(&ws, &log, &project_id, &req).unwrap();
    assert!(decision.allowed);

    let report = guild_store::replay_run(
        &ws.events_jsonl(&project_id, &RunId::from_string("run-1")),
        guild_store::ReplayMode::Raw,
    )
    .unwrap();
    assert_eq!(report.events.len(), 1);
    assert_eq!(report.events[0]["payload"]["allowed"], true);
}

#[test]
fn allowed_read_emits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    let log = EventLog::system();
    let project_id = ProjectId::from_string("prj-1");
    let mut req = request(ActorRole::Human, None, PolicyAction::Read, Visibility::Org, None, "proposal");
    req.run_id = Some(RunId::from_string("run-1"));

    enforce_policy(&ws, &log, &project_id, &req).unwrap();

    assert!(!ws.events_jsonl(&project_id, &RunId::from_string("run-1")).exists());
}
