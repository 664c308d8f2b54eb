// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use guild_core::test_support::{sample_artifact, sample_task};
use guild_core::{CompanyRecord, TaskStatus};
use guild_store::records::{
    create_project_with_defaults, init_workspace, list_reviews, read_task, write_artifact,
    write_task,
};
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

/// Task with one coding milestone, a report artifact, and optionally the
/// evidence siblings the milestone demands.
fn seed_report(ws: &Workspace, with_patch: bool, with_tests: bool) -> ArtifactHeader {
    let pid = ProjectId::from_string("prj-1");
    let task = sample_task("tsk-1", "prj-1");
    write_task(ws, &task, "## Contract\nx\n\n## Milestones\n- m1\n").unwrap();

    let evidence = sample_artifact(ArtifactKind::Proposal, "art-ev", "prj-1");
    write_artifact(ws, &evidence, "evidence body\n").unwrap();
    if with_patch {
        guild_store::atomic_write(
            &ws.artifact_sibling(&pid, &evidence.id, "patch"),
            b"--- a/x\n+++ b/x\n",
        )
        .unwrap();
    }
    let tests = sample_artifact(ArtifactKind::Proposal, "art-tests", "prj-1");
    write_artifact(ws, &tests, "tests body\n").unwrap();
    if with_tests {
        guild_store::atomic_write(
            &ws.artifact_sibling(&pid, &tests.id, "txt"),
            b"all tests passed\n",
        )
        .unwrap();
    }

    let mut report = sample_artifact(ArtifactKind::MilestoneReport, "art-report", "prj-1");
    report.task_id = Some(guild_core::TaskId::from_string("tsk-1"));
    report.milestone_id = Some("m1".to_string());
    report.evidence_artifacts = vec![evidence.id];
    report.tests_artifacts = vec![tests.id];
    write_artifact(ws, &report, "done, see evidence\n").unwrap();
    report
}

fn approve(
    ws: &Workspace,
    log: &EventLog,
    report: &ArtifactHeader,
    role: ActorRole,
) -> Result<Review, GovernanceError> {
    approve_milestone(
        ws,
        log,
        "2026-01-05T12:00:00Z",
        &ProjectId::from_string("prj-1"),
        &report.id,
        "human:op",
        role,
        None,
        None,
    )
}

#[test]
fn approval_marks_done_and_promotes_task() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let log = EventLog::system();
    let report = seed_report(&ws, true, true);

    let review = approve(&ws, &log, &report, ActorRole::Manager).unwrap();

    assert_eq!(review.decision, ReviewDecision::Approved);
    let (task, _) =
        read_task(&ws, &ProjectId::from_string("prj-1"), &guild_core::TaskId::from_string("tsk-1"))
            .unwrap();
    assert_eq!(task.milestones[0].status, MilestoneStatus::Done);
    assert_eq!(task.status, TaskStatus::Done);
    assert_eq!(list_reviews(&ws).len(), 1);
}

#[test]
fn missing_patch_evidence_conflicts_and_leaves_task_alone() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let log = EventLog::system();
    let report = seed_report(&ws, false, true);

    let err = approve(&ws, &log, &report, ActorRole::Manager).unwrap_err();

    assert!(matches!(err, GovernanceError::Conflict(_)), "{err}");
    let (task, _) =
        read_task(&ws, &ProjectId::from_string("prj-1"), &guild_core::TaskId::from_string("tsk-1"))
            .unwrap();
    assert_eq!(task.status, TaskStatus::Ready);
    assert_eq!(task.milestones[0].status, MilestoneStatus::Pending);
    assert!(list_reviews(&ws).is_empty());
}

#[test]
fn missing_tests_evidence_conflicts() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let log = EventLog::system();
    let report = seed_report(&ws, true, false);

    let err = approve(&ws, &log, &report, ActorRole::Manager).unwrap_err();
    assert!(matches!(err, GovernanceError::Conflict(_)));
}

#[test]
fn worker_cannot_approve() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let log = EventLog::system();
    let report = seed_report(&ws, true, true);

    let err = approve(&ws, &log, &report, ActorRole::Worker).unwrap_err();
    assert!(matches!(err, GovernanceError::PolicyDenied(_)));
}

#[test]
fn double_approval_conflicts() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let log = EventLog::system();
    let report = seed_report(&ws, true, true);

    approve(&ws, &log, &report, ActorRole::Manager).unwrap();
    let err = approve(&ws, &log, &report, ActorRole::Manager).unwrap_err();
    assert!(matches!(err, GovernanceError::Conflict(_)));
}

#[test]
fn report_for_missing_milestone_is_not_found() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let log = EventLog::system();
    let mut report = seed_report(&ws, true, true);
    report.milestone_id = Some("m-ghost".to_string());
    write_artifact(&ws, &report, "body\n").unwrap();

    let err = approve(&ws, &log, &report, ActorRole::Manager).unwrap_err();
    assert!(matches!(err, GovernanceError::NotFound(_)));
}

#[test]
fn wrong_artifact_kind_conflicts() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let log = EventLog::system();
    let plain = sample_artifact(ArtifactKind::Proposal, "art-x", "prj-1");
    write_artifact(&ws, &plain, "body\n").unwrap();

    let err = approve(&ws, &log, &plain, ActorRole::Manager).unwrap_err();
    assert!(matches!(err, GovernanceError::Conflict(_)));
}
