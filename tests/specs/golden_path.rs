// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Golden path: task → run → evidence → milestone approval → done.

use super::support::{event_types, seeded_workspace};
use guild_core::test_support::{sample_artifact, sample_run, sample_task};
use guild_core::{ActorRole, ArtifactKind, ProjectId, TaskId, TaskStatus};
use guild_store::records;
use tempfile::tempdir;

#[tokio::test]
async fn coding_milestone_approval_promotes_task_to_done() {
    let dir = tempdir().unwrap();
    let ws = seeded_workspace(dir.path());
    let pid = ProjectId::from_string("prj-1");
    let log = guild_store::EventLog::system();

    // Task with one coding milestone.
    let task = sample_task("tsk-1", "prj-1");
    records::write_task(&ws, &task, "## Contract\nBuild it.\n\n## Milestones\n- m1\n").unwrap();

    // A run that "produced" the evidence: a patch artifact and a test
    // log artifact, as their sibling files.
    let mut run = sample_run("run-1", "prj-1");
    run.status = guild_core::RunStatus::Ended;
    records::create_run(&ws, &run).unwrap();

    let patch_artifact = sample_artifact(ArtifactKind::Proposal, "art-patch", "prj-1");
    records::write_artifact(&ws, &patch_artifact, "implementation diff attached\n").unwrap();
    guild_store::atomic_write(
        &ws.artifact_sibling(&pid, &patch_artifact.id, "patch"),
        b"--- a/src/lib.rs\n+++ b/src/lib.rs\n@@ -1 +1 @@\n-old\n+new\n",
    )
    .unwrap();

    let tests_artifact = sample_artifact(ArtifactKind::Proposal, "art-tests", "prj-1");
    records::write_artifact(&ws, &tests_artifact, "test transcript attached\n").unwrap();
    guild_store::atomic_write(
        &ws.artifact_sibling(&pid, &tests_artifact.id, "txt"),
        b"running 12 tests\ntest result: ok\n",
    )
    .unwrap();

    // The milestone report citing both.
    let mut report = sample_artifact(ArtifactKind::MilestoneReport, "art-report", "prj-1");
    report.task_id = Some(TaskId::from_string("tsk-1"));
    report.milestone_id = Some("m1".to_string());
    report.evidence_artifacts = vec![patch_artifact.id];
    report.tests_artifacts = vec![tests_artifact.id];
    records::write_artifact(&ws, &report, "milestone m1 is complete\n").unwrap();

    // Approve.
    let review = guild_governance::approve_milestone(
        &ws,
        &log,
        "2026-01-05T12:00:00Z",
        &pid,
        &report.id,
        "human:op",
        ActorRole::Manager,
        None,
        Some("verified locally"),
    )
    .unwrap();

    // Task auto-promoted to done.
    let (task, _) = records::read_task(&ws, &pid, &TaskId::from_string("tsk-1")).unwrap();
    assert_eq!(task.status, TaskStatus::Done);

    // Review YAML exists and is the one returned.
    let reviews = records::list_reviews(&ws);
    assert_eq!(reviews, vec![review.id]);
    let stored = records::read_review(&ws, &review.id).unwrap();
    assert_eq!(stored.subject.milestone_id.as_deref(), Some("m1"));

    // approval.decided landed on the proposing run's log.
    let types = event_types(&ws, "prj-1", report.run_id.as_str());
    assert!(types.contains(&"approval.decided".to_string()), "{types:?}");
}
