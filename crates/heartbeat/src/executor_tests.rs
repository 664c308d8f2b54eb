// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use guild_core::{AgentId, CompanyRecord, HeartbeatState, ProjectId};
use guild_store::records::{
    create_project_with_defaults, init_workspace, list_artifacts,
};
use std::sync::Arc;
use tempfile::tempdir;

const NOW_MS: u64 = 1_767_607_200_000; // 2026-01-05T10:00:00Z
const NOW_ISO: &str = "2026-01-05T10:00:00Z";

fn seeded_ws(dir: &std::path::Path) -> Workspace {
    let ws = Workspace::new(dir);
    init_workspace(
        &ws,
        &CompanyRecord {
            id: "acme".to_string(),
            name: "Acme".to_string(),
            created_at: NOW_ISO.to_string(),
            schema_version: 1,
        },
    )
    .unwrap();
    create_project_with_defaults(
        &ws,
        &guild_core::ProjectRecord {
            id: ProjectId::from_string("prj-1"),
            name: "Site".to_string(),
            created_at: NOW_ISO.to_string(),
            team_id: None,
            budget: None,
        },
    )
    .unwrap();
    ws
}

fn comment_action(key: &str, risk: Risk, needs_approval: bool) -> HeartbeatAction {
    HeartbeatAction {
        idempotency_key: key.to_string(),
        risk,
        needs_approval,
        kind: HeartbeatActionKind::AddComment {
            project_id: ProjectId::from_string("prj-1"),
            task_id: None,
            body: "checking in on progress".to_string(),
        },
    }
}

fn report(actions: Vec<HeartbeatAction>) -> HeartbeatWorkerReport {
    HeartbeatWorkerReport {
        worker_agent_id: AgentId::from_string("agt-w"),
        status: if actions.is_empty() { ReportStatus::Ok } else { ReportStatus::Actions },
        actions,
    }
}

fn executor() -> HeartbeatExecutor {
    HeartbeatExecutor::new(Arc::new(NoopJobLauncher))
}

fn comments_dir_count(ws: &Workspace) -> usize {
    std::fs::read_dir(ws.comments_dir(&ProjectId::from_string("prj-1")))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

#[test]
fn low_risk_action_executes_and_writes_comment() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let mut state = HeartbeatState::default();

    let outcome = executor()
        .apply_report(
            &ws,
            &HeartbeatConfig::default(),
            &mut state,
            &report(vec![comment_action("k1", Risk::Low, false)]),
            NOW_MS,
            NOW_ISO,
            false,
        )
        .unwrap();

    assert_eq!(outcome.executed, 1);
    assert_eq!(comments_dir_count(&ws), 1);
    let record = state.idempotency.get("k1").unwrap();
    assert_eq!(record.status, IdempotencyStatus::Executed);
    assert_eq!(record.execution_count, 1);
}

#[test]
fn replayed_report_is_deduped_until_ttl() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let mut state = HeartbeatState::default();
    let config = HeartbeatConfig::default();
    let the_report = report(vec![comment_action("k1", Risk::Low, false)]);
    let exec = executor();

    let first = exec
        .apply_report(&ws, &config, &mut state, &the_report, NOW_MS, NOW_ISO, false)
        .unwrap();
    let second = exec
        .apply_report(&ws, &config, &mut state, &the_report, NOW_MS + 1000, NOW_ISO, false)
        .unwrap();

    assert_eq!(first.executed, 1);
    assert_eq!(second.executed, 0);
    assert_eq!(second.deduped, 1);
    assert_eq!(comments_dir_count(&ws), 1);
    assert_eq!(state.idempotency.get("k1").unwrap().execution_count, 1);
}

#[test]
fn expired_idempotency_key_executes_again() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let mut state = HeartbeatState::default();
    let config = HeartbeatConfig::default();
    let the_report = report(vec![comment_action("k1", Risk::Low, false)]);
    let exec = executor();

    exec.apply_report(&ws, &config, &mut state, &the_report, NOW_MS, NOW_ISO, false).unwrap();
    // Jump past the 24h TTL.
    let later_ms = NOW_MS + 25 * 3_600_000;
    let outcome = exec
        .apply_report(&ws, &config, &mut state, &the_report, later_ms, "2026-01-06T11:00:00Z", false)
        .unwrap();

    assert_eq!(outcome.executed, 1);
    assert_eq!(comments_dir_count(&ws), 2);
}

#[test]
fn medium_risk_becomes_proposal_not_comment() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let mut state = HeartbeatState::default();

    let outcome = executor()
        .apply_report(
            &ws,
            &HeartbeatConfig::default(),
            &mut state,
            &report(vec![comment_action("k1", Risk::Medium, false)]),
            NOW_MS,
            NOW_ISO,
            false,
        )
        .unwrap();

    assert_eq!(outcome.proposals_created, 1);
    assert_eq!(outcome.executed, 0);
    assert_eq!(comments_dir_count(&ws), 0);
    let artifacts = list_artifacts(&ws, &ProjectId::from_string("prj-1"));
    assert_eq!(artifacts.len(), 1);
    let (header, _) = guild_store::records::read_artifact(
        &ws,
        &ProjectId::from_string("prj-1"),
        &artifacts[0],
    )
    .unwrap();
    assert_eq!(header.kind, guild_core::ArtifactKind::HeartbeatActionProposal);
    assert!(header.action.is_some());
}

#[test]
fn needs_approval_flag_forces_proposal() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let mut state = HeartbeatState::default();

    let outcome = executor()
        .apply_report(
            &ws,
            &HeartbeatConfig::default(),
            &mut state,
            &report(vec![comment_action("k1", Risk::Low, true)]),
            NOW_MS,
            NOW_ISO,
            false,
        )
        .unwrap();
    assert_eq!(outcome.proposals_created, 1);
}

#[test]
fn quiet_hours_force_proposals() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let mut state = HeartbeatState::default();

    let outcome = executor()
        .apply_report(
            &ws,
            &HeartbeatConfig::default(),
            &mut state,
            &report(vec![comment_action("k1", Risk::Low, false)]),
            NOW_MS,
            NOW_ISO,
            true,
        )
        .unwrap();
    assert_eq!(outcome.proposals_created, 1);
    assert_eq!(outcome.executed, 0);
}

#[test]
fn per_tick_rate_limit_applies() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let mut state = HeartbeatState::default();
    let mut config = HeartbeatConfig::default();
    config.max_auto_actions_per_tick = 2;

    let actions = (0..4)
        .map(|i| comment_action(&format!("k{i}"), Risk::Low, false))
        .collect();
    let outcome = executor()
        .apply_report(&ws, &config, &mut state, &report(actions), NOW_MS, NOW_ISO, false)
        .unwrap();

    assert_eq!(outcome.executed, 2);
    assert_eq!(outcome.rate_limited, 2);
}

#[test]
fn hourly_rate_limit_spans_reports() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let mut state = HeartbeatState::default();
    let mut config = HeartbeatConfig::default();
    config.max_auto_actions_per_hour = 1;
    let exec = executor();

    exec.apply_report(
        &ws,
        &config,
        &mut state,
        &report(vec![comment_action("k1", Risk::Low, false)]),
        NOW_MS,
        NOW_ISO,
        false,
    )
    .unwrap();
    let second = exec
        .apply_report(
            &ws,
            &config,
            &mut state,
            &report(vec![comment_action("k2", Risk::Low, false)]),
            NOW_MS + 60_000,
            NOW_ISO,
            false,
        )
        .unwrap();

    assert_eq!(second.rate_limited, 1);
    assert_eq!(comments_dir_count(&ws), 1);
}

#[test]
fn ok_report_records_last_ok_and_does_nothing() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let mut state = HeartbeatState::default();

    let outcome = executor()
        .apply_report(
            &ws,
            &HeartbeatConfig::default(),
            &mut state,
            &report(vec![]),
            NOW_MS,
            NOW_ISO,
            false,
        )
        .unwrap();

    assert_eq!(outcome, ReportOutcome::default());
    let worker = state.worker_state.get(&AgentId::from_string("agt-w")).unwrap();
    assert_eq!(worker.last_ok_at.as_deref(), Some(NOW_ISO));
    assert_eq!(worker.last_report_status, Some(ReportStatus::Ok));
}

#[test]
fn secret_comment_body_fails_the_action() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let mut state = HeartbeatState::default();
    let action = HeartbeatAction {
        idempotency_key: "k1".to_string(),
        risk: Risk::Low,
        needs_approval: false,
        kind: HeartbeatActionKind::AddComment {
            project_id: ProjectId::from_string("prj-1"),
            task_id: None,
            body: "token sk-abcdefghijklmnopqrstuvwxyz1234".to_string(),
        },
    };

    let outcome = executor()
        .apply_report(
            &ws,
            &HeartbeatConfig::default(),
            &mut state,
            &report(vec![action]),
            NOW_MS,
            NOW_ISO,
            false,
        )
        .unwrap();

    assert_eq!(outcome.failed, 1);
    assert_eq!(comments_dir_count(&ws), 0);
}

#[test]
fn hour_bucket_format() {
    assert_eq!(hour_bucket(NOW_MS), "2026010510");
}
