// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret-detected denial: nothing persists, the error is structured.

use super::support::seeded_workspace;
use guild_core::test_support::sample_artifact;
use guild_core::{ActorRole, ArtifactKind, ProjectId, ReviewDecision};
use guild_governance::{resolve_inbox_item, ActionExecutor, GovernanceError};
use guild_store::records;
use tempfile::tempdir;

struct PanicExecutor;

impl ActionExecutor for PanicExecutor {
    fn execute(
        &self,
        _ws: &guild_store::Workspace,
        _action: &guild_core::HeartbeatAction,
        _approved_by: &str,
    ) -> Result<(), String> {
        Err("must never run".to_string())
    }
}

#[tokio::test]
async fn inbox_notes_with_sk_token_abort_resolution() {
    let dir = tempdir().unwrap();
    let ws = seeded_workspace(dir.path());
    let pid = ProjectId::from_string("prj-1");
    let log = guild_store::EventLog::system();

    let mut report = sample_artifact(ArtifactKind::MilestoneReport, "art-1", "prj-1");
    report.task_id = Some(guild_core::TaskId::from_string("tsk-1"));
    report.milestone_id = Some("m1".to_string());
    records::write_artifact(&ws, &report, "claiming done\n").unwrap();

    // sk- followed by 30 alphanumerics.
    let notes = format!("lgtm, used sk-{}", "a1b2c3d4e5".repeat(3));
    let err = resolve_inbox_item(
        &ws,
        &log,
        &PanicExecutor,
        "2026-01-05T12:00:00Z",
        &pid,
        &report.id,
        ReviewDecision::Approved,
        "human:op",
        ActorRole::Human,
        None,
        Some(&notes),
    )
    .unwrap_err();

    // Structured error with the reason code payload.
    match &err {
        GovernanceError::SecretDetected { report, .. } => {
            assert!(report.total_matches >= 1);
            assert!(report.matches_by_kind.contains_key("provider_api_key"));
        }
        other => panic!("expected SecretDetected, got {other}"),
    }

    // Nothing was written: no review YAML, no approval event.
    assert!(records::list_reviews(&ws).is_empty());
    assert!(!ws.events_jsonl(&pid, &report.run_id).exists());

    // And the RPC mapping carries reason_code SECRET_DETECTED.
    let rpc = guild_daemon::handlers::governance_error(err);
    assert_eq!(rpc.code, -32000);
    assert_eq!(rpc.data.unwrap().reason_code.as_deref(), Some("SECRET_DETECTED"));
}
