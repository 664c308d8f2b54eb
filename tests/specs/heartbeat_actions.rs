// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Risky heartbeat actions become proposals, not direct effects.

use super::support::seeded_workspace;
use guild_core::{
    AgentId, ArtifactKind, HeartbeatAction, HeartbeatActionKind, HeartbeatWorkerReport,
    ProjectId, ReportStatus, Risk,
};
use guild_heartbeat::{HeartbeatService, NoopJobLauncher};
use guild_store::records;
use std::sync::Arc;
use tempfile::tempdir;

#[tokio::test]
async fn medium_risk_comment_yields_exactly_one_proposal() {
    let dir = tempdir().unwrap();
    let ws = seeded_workspace(dir.path());
    let pid = ProjectId::from_string("prj-1");

    // Quiet hours disabled by default config (start == end == 0).
    let service = HeartbeatService::new(
        Arc::new(guild_core::SystemClock),
        Arc::new(NoopJobLauncher),
    );

    let report = HeartbeatWorkerReport {
        worker_agent_id: AgentId::from_string("agt-w1"),
        status: ReportStatus::Actions,
        actions: vec![HeartbeatAction {
            idempotency_key: "comment-on-tsk-1".to_string(),
            risk: Risk::Medium,
            needs_approval: false,
            kind: HeartbeatActionKind::AddComment {
                project_id: pid,
                task_id: None,
                body: "this task looks stalled".to_string(),
            },
        }],
    };

    let outcome = service.handle_report(ws.root(), &report).unwrap();
    assert_eq!(outcome.proposals_created, 1);
    assert_eq!(outcome.executed, 0);

    // Exactly one heartbeat_action_proposal artifact; no comment.
    let artifacts = records::list_artifacts(&ws, &pid);
    assert_eq!(artifacts.len(), 1);
    let (header, _) = records::read_artifact(&ws, &pid, &artifacts[0]).unwrap();
    assert_eq!(header.kind, ArtifactKind::HeartbeatActionProposal);
    assert!(!ws.comments_dir(&pid).exists());

    // The inbox sees one pending item.
    guild_index::sync_sqlite_index(&ws).unwrap();
    let inbox = guild_daemon::snapshots::review_inbox_snapshot(&ws).unwrap();
    assert_eq!(inbox.pending.len(), 1);
    assert_eq!(inbox.pending[0].artifact_type, "heartbeat_action_proposal");
}

#[tokio::test]
async fn replayed_report_executes_once() {
    let dir = tempdir().unwrap();
    let ws = seeded_workspace(dir.path());
    let pid = ProjectId::from_string("prj-1");
    let service = HeartbeatService::new(
        Arc::new(guild_core::SystemClock),
        Arc::new(NoopJobLauncher),
    );

    let report = HeartbeatWorkerReport {
        worker_agent_id: AgentId::from_string("agt-w1"),
        status: ReportStatus::Actions,
        actions: vec![HeartbeatAction {
            idempotency_key: "low-risk-note".to_string(),
            risk: Risk::Low,
            needs_approval: false,
            kind: HeartbeatActionKind::AddComment {
                project_id: pid,
                task_id: None,
                body: "status note".to_string(),
            },
        }],
    };

    let first = service.handle_report(ws.root(), &report).unwrap();
    let second = service.handle_report(ws.root(), &report).unwrap();

    assert_eq!(first.executed, 1);
    assert_eq!(second.executed, 0);
    assert_eq!(second.deduped, 1);
    let comments = std::fs::read_dir(ws.comments_dir(&pid)).unwrap().count();
    assert_eq!(comments, 1);
}
