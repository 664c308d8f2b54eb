// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use guild_core::test_support::sample_artifact;
use guild_core::{CompanyRecord, HeartbeatActionKind, Risk};
use guild_store::records::{
    create_project_with_defaults, init_workspace, list_reviews, write_artifact,
};
use parking_lot::Mutex;
use tempfile::tempdir;

fn seeded_ws(dir: &std::path::Path) -> Workspace {
    let ws = Workspace::new(dir);
    init_workspace(
        &ws,
        &CompanyRecord {
            id: "acme".to_string(),
            name: "Acme".to_string(),
            created_at: "2026-01-05T10:00:00Z".to_string(),
            schema_version: 1,
        },
    )
    .unwrap();
    create_project_with_defaults(
        &ws,
        &guild_core::ProjectRecord {
            id: ProjectId::from_string("prj-1"),
            name: "Site".to_string(),
            created_at: "2026-01-05T10:00:00Z".to_string(),
            team_id: None,
            budget: None,
        },
    )
    .unwrap();
    ws
}

/// Records executions instead of doing anything.
#[derive(Default)]
struct RecordingExecutor {
    executed: Mutex<Vec<String>>,
}

impl ActionExecutor for RecordingExecutor {
    fn execute(
        &self,
        _ws: &Workspace,
        action: &HeartbeatAction,
        _approved_by: &str,
    ) -> Result<(), String> {
        self.executed.lock().push(action.idempotency_key.clone());
        Ok(())
    }
}

fn proposal_artifact(ws: &Workspace) -> guild_core::ArtifactHeader {
    let mut header = sample_artifact(ArtifactKind::HeartbeatActionProposal, "art-hb", "prj-1");
    header.action = Some(
        serde_json::to_value(HeartbeatAction {
            idempotency_key: "hb-key-1".to_string(),
            risk: Risk::Medium,
            needs_approval: true,
            kind: HeartbeatActionKind::AddComment {
                project_id: ProjectId::from_string("prj-1"),
                task_id: None,
                body: "nudging the task along".to_string(),
            },
        })
        .unwrap(),
    );
    write_artifact(ws, &header, "proposed action\n").unwrap();
    header
}

#[test]
fn approving_heartbeat_proposal_executes_action_once() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let log = EventLog::system();
    let executor = RecordingExecutor::default();
    let header = proposal_artifact(&ws);

    let resolution = resolve_inbox_item(
        &ws,
        &log,
        &executor,
        "2026-01-05T12:00:00Z",
        &ProjectId::from_string("prj-1"),
        &header.id,
        ReviewDecision::Approved,
        "agt-mgr",
        ActorRole::Manager,
        None,
        None,
    )
    .unwrap();

    assert_eq!(resolution.decision, ReviewDecision::Approved);
    assert_eq!(resolution.artifact_type, "heartbeat_action_proposal");
    assert_eq!(*executor.executed.lock(), vec!["hb-key-1".to_string()]);
    assert_eq!(list_reviews(&ws).len(), 1);
}

#[test]
fn denial_writes_review_and_executes_nothing() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let log = EventLog::system();
    let executor = RecordingExecutor::default();
    let header = proposal_artifact(&ws);

    let resolution = resolve_inbox_item(
        &ws,
        &log,
        &executor,
        "2026-01-05T12:00:00Z",
        &ProjectId::from_string("prj-1"),
        &header.id,
        ReviewDecision::Denied,
        "agt-mgr",
        ActorRole::Manager,
        None,
        Some("not now"),
    )
    .unwrap();

    assert_eq!(resolution.decision, ReviewDecision::Denied);
    assert!(executor.executed.lock().is_empty());
    let reviews = list_reviews(&ws);
    assert_eq!(reviews.len(), 1);
    let review = guild_store::records::read_review(&ws, &reviews[0]).unwrap();
    assert_eq!(review.decision, ReviewDecision::Denied);
    assert_eq!(review.notes.as_deref(), Some("not now"));
}

#[test]
fn secret_in_notes_aborts_before_any_write() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let log = EventLog::system();
    let executor = RecordingExecutor::default();
    let header = proposal_artifact(&ws);
    let secret_notes = format!("approved, token sk-{}", "a1b2c3d4e5".repeat(3));

    let err = resolve_inbox_item(
        &ws,
        &log,
        &executor,
        "2026-01-05T12:00:00Z",
        &ProjectId::from_string("prj-1"),
        &header.id,
        ReviewDecision::Approved,
        "agt-mgr",
        ActorRole::Manager,
        None,
        Some(&secret_notes),
    )
    .unwrap_err();

    assert!(matches!(err, GovernanceError::SecretDetected { .. }));
    assert!(list_reviews(&ws).is_empty());
    assert!(executor.executed.lock().is_empty());
    // No approval.decided event either.
    let events_path = ws.events_jsonl(&ProjectId::from_string("prj-1"), &header.run_id);
    assert!(!events_path.exists());
}

#[test]
fn worker_cannot_approve_heartbeat_proposal() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let log = EventLog::system();
    let executor = RecordingExecutor::default();
    let header = proposal_artifact(&ws);

    let err = resolve_inbox_item(
        &ws,
        &log,
        &executor,
        "2026-01-05T12:00:00Z",
        &ProjectId::from_string("prj-1"),
        &header.id,
        ReviewDecision::Approved,
        "agt-worker",
        ActorRole::Worker,
        None,
        None,
    )
    .unwrap_err();

    assert!(matches!(err, GovernanceError::PolicyDenied(_)));
    assert!(executor.executed.lock().is_empty());
}

#[test]
fn unknown_artifact_is_not_found() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let log = EventLog::system();
    let executor = RecordingExecutor::default();

    let err = resolve_inbox_item(
        &ws,
        &log,
        &executor,
        "t",
        &ProjectId::from_string("prj-1"),
        &ArtifactId::from_string("art-ghost"),
        ReviewDecision::Approved,
        "human:op",
        ActorRole::Human,
        None,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, GovernanceError::NotFound(_)));
}

#[test]
fn plain_proposal_type_is_not_resolvable() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let log = EventLog::system();
    let executor = RecordingExecutor::default();
    let header = sample_artifact(ArtifactKind::Proposal, "art-plain", "prj-1");
    write_artifact(&ws, &header, "body\n").unwrap();

    let err = resolve_inbox_item(
        &ws,
        &log,
        &executor,
        "t",
        &ProjectId::from_string("prj-1"),
        &header.id,
        ReviewDecision::Approved,
        "human:op",
        ActorRole::Human,
        None,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, GovernanceError::Conflict(_)));
}
