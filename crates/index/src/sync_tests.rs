// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::queries;
use guild_core::test_support::{sample_artifact, sample_run, sample_task};
use guild_core::{ArtifactKind, CompanyRecord, EventEnvelope, RunId};
use guild_store::records::{
    create_project_with_defaults, create_run, init_workspace, write_artifact, write_task,
};
use guild_store::EventLog;
use serde_json::json;
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

fn append_events(ws: &Workspace, run_id: &str, types: &[&str]) {
    let log = EventLog::system();
    let path = ws.events_jsonl(&ProjectId::from_string("prj-1"), &RunId::from_string(run_id));
    for t in types {
        log.append(
            &path,
            EventEnvelope::new(RunId::from_string(run_id), "ses-1", "agt-1", *t, json!({})),
        )
        .unwrap();
    }
}

#[test]
fn rebuild_projects_all_entities() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    create_run(&ws, &sample_run("run-1", "prj-1")).unwrap();
    append_events(&ws, "run-1", &["run.started", "run.executing"]);
    write_task(&ws, &sample_task("tsk-1", "prj-1"), "## Contract\nx\n\n## Milestones\n- m1\n")
        .unwrap();
    write_artifact(&ws, &sample_artifact(ArtifactKind::MemoryDelta, "art-1", "prj-1"), "body\n")
        .unwrap();

    rebuild_sqlite_index(&ws).unwrap();

    assert_eq!(queries::list_runs(&ws).unwrap().len(), 1);
    let events = queries::events_for_run(&ws, "prj-1", "run-1", 0, 100, true).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type.as_deref(), Some("run.started"));
    assert_eq!(queries::tasks_for_project(&ws, "prj-1").unwrap().len(), 1);
    assert_eq!(queries::milestones_for_task(&ws, "tsk-1").unwrap().len(), 1);
    // A memory_delta with no review is a pending approval.
    assert_eq!(queries::pending_approvals(&ws).unwrap().len(), 1);
}

#[test]
fn rebuild_then_sync_is_a_row_count_no_op() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    create_run(&ws, &sample_run("run-1", "prj-1")).unwrap();
    append_events(&ws, "run-1", &["run.started", "run.ended"]);
    write_task(&ws, &sample_task("tsk-1", "prj-1"), "## Contract\nx\n\n## Milestones\n- m1\n")
        .unwrap();

    rebuild_sqlite_index(&ws).unwrap();
    let before = queries::total_row_count(&ws).unwrap();

    let outcome = sync_sqlite_index(&ws).unwrap();

    assert_eq!(queries::total_row_count(&ws).unwrap(), before);
    assert_eq!(outcome.files_updated, 0);
    assert_eq!(outcome.events_appended, 0);
}

#[test]
fn sync_resumes_events_from_cursor() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    create_run(&ws, &sample_run("run-1", "prj-1")).unwrap();
    append_events(&ws, "run-1", &["run.started"]);
    sync_sqlite_index(&ws).unwrap();

    append_events(&ws, "run-1", &["provider.raw", "run.ended"]);
    let outcome = sync_sqlite_index(&ws).unwrap();

    assert_eq!(outcome.events_appended, 2);
    let events = queries::events_for_run(&ws, "prj-1", "run-1", 0, 100, true).unwrap();
    assert_eq!(events.len(), 3);
}

#[test]
fn malformed_event_lines_become_parse_error_rows() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    create_run(&ws, &sample_run("run-1", "prj-1")).unwrap();
    append_events(&ws, "run-1", &["run.started"]);
    let path = ws.events_jsonl(&ProjectId::from_string("prj-1"), &RunId::from_string("run-1"));
    let mut content = std::fs::read_to_string(&path).unwrap();
    content.push_str("this line is garbage\n");
    std::fs::write(&path, content).unwrap();

    sync_sqlite_index(&ws).unwrap();

    assert_eq!(queries::parse_error_count(&ws, "prj-1", "run-1").unwrap(), 1);
    let errors = queries::parse_errors_for_run(&ws, "prj-1", "run-1").unwrap();
    assert_eq!(errors[0].raw_line.as_deref(), Some("this line is garbage"));
}

#[test]
fn vanished_run_directory_deletes_rows() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    create_run(&ws, &sample_run("run-1", "prj-1")).unwrap();
    append_events(&ws, "run-1", &["run.started"]);
    sync_sqlite_index(&ws).unwrap();
    assert_eq!(queries::list_runs(&ws).unwrap().len(), 1);

    std::fs::remove_dir_all(ws.run_dir(&ProjectId::from_string("prj-1"), &RunId::from_string("run-1")))
        .unwrap();
    let outcome = sync_sqlite_index(&ws).unwrap();

    assert!(outcome.rows_deleted > 0);
    assert!(queries::list_runs(&ws).unwrap().is_empty());
    assert!(queries::events_for_run(&ws, "prj-1", "run-1", 0, 100, true).unwrap().is_empty());
}

#[test]
fn run_status_change_reprojects_row() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let mut run = sample_run("run-1", "prj-1");
    create_run(&ws, &run).unwrap();
    sync_sqlite_index(&ws).unwrap();
    assert_eq!(queries::list_runs(&ws).unwrap()[0].status, "running");

    run.transition(guild_core::RunStatus::Ended);
    guild_store::records::write_run(&ws, &run).unwrap();
    sync_sqlite_index(&ws).unwrap();

    assert_eq!(queries::list_runs(&ws).unwrap()[0].status, "ended");
}

#[test]
fn review_clears_pending_approval() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    write_artifact(&ws, &sample_artifact(ArtifactKind::MemoryDelta, "art-1", "prj-1"), "body\n")
        .unwrap();
    sync_sqlite_index(&ws).unwrap();
    assert_eq!(queries::pending_approvals(&ws).unwrap().len(), 1);

    let review = guild_core::Review {
        id: guild_core::ReviewId::from_string("rev-1"),
        created_at: "2026-01-05T12:00:00Z".to_string(),
        actor_id: "human:op".to_string(),
        actor_role: guild_core::ActorRole::Human,
        decision: guild_core::ReviewDecision::Approved,
        subject: guild_core::ReviewSubject {
            kind: "memory_delta".to_string(),
            artifact_id: guild_core::ArtifactId::from_string("art-1"),
            project_id: None,
            task_id: None,
            milestone_id: None,
        },
        policy: guild_core::PolicyDecision {
            allowed: true,
            action: guild_core::PolicyAction::Approve,
            resource_id: "art-1".to_string(),
            trace: vec![],
            reason: None,
        },
        notes: None,
    };
    guild_store::records::write_review(&ws, &review).unwrap();
    sync_sqlite_index(&ws).unwrap();

    assert!(queries::pending_approvals(&ws).unwrap().is_empty());
    let decisions = queries::recent_decisions(&ws, 10).unwrap();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].artifact_type.as_deref(), Some("memory_delta"));
}

#[test]
fn agent_counters_track_runs() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    create_run(&ws, &sample_run("run-1", "prj-1")).unwrap();
    let mut ended = sample_run("run-2", "prj-1");
    ended.status = guild_core::RunStatus::Ended;
    create_run(&ws, &ended).unwrap();

    sync_sqlite_index(&ws).unwrap();

    let counters = queries::agent_counters(&ws).unwrap();
    assert_eq!(counters.len(), 1);
    assert_eq!(counters[0].active_runs, 1);
    assert_eq!(counters[0].total_runs, 2);
}
