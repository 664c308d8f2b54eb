// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replay modes: deterministic on canonical appends, degraded on legacy
//! lines.

use super::support::seeded_workspace;
use guild_core::{EventEnvelope, ProjectId, RunId};
use guild_store::{replay_run, EventLog, ReplayMode, VerifyIssueCode};
use std::io::Write as _;
use tempfile::tempdir;

#[tokio::test]
async fn canonical_appends_replay_deterministically() {
    let dir = tempdir().unwrap();
    let ws = seeded_workspace(dir.path());
    let log = EventLog::system();
    let path = ws.events_jsonl(&ProjectId::from_string("prj-1"), &RunId::from_string("run-1"));

    for event_type in ["run.started", "run.executing", "provider.raw", "usage.estimated", "run.ended"]
    {
        log.append(
            &path,
            EventEnvelope::new(
                RunId::from_string("run-1"),
                "ses-1",
                "agt-1",
                event_type,
                serde_json::json!({ "step": event_type }),
            ),
        )
        .unwrap();
    }

    let report = replay_run(&path, ReplayMode::Deterministic).unwrap();
    assert_eq!(report.deterministic_ok, Some(true), "issues: {:?}", report.issues);
    assert_eq!(report.events.len(), 5);
    assert!(report.parse_errors.is_empty());

    // Appending a legacy line without hash fields breaks determinism
    // with a missing_key issue.
    {
        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(
            f,
            "{}",
            serde_json::json!({
                "event_id": "evt-legacy",
                "run_id": "run-1",
                "type": "note.legacy",
                "ts_monotonic_ms": 99_999_999_999_999u64,
            })
        )
        .unwrap();
    }

    let degraded = replay_run(&path, ReplayMode::Verified).unwrap();
    assert_eq!(degraded.deterministic_ok, Some(false));
    assert!(degraded
        .issues
        .iter()
        .any(|i| i.code == VerifyIssueCode::MissingKey));
}

#[tokio::test]
async fn raw_mode_skips_verification() {
    let dir = tempdir().unwrap();
    let ws = seeded_workspace(dir.path());
    let path = ws.events_jsonl(&ProjectId::from_string("prj-1"), &RunId::from_string("run-1"));
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{\"type\":\"whatever\"}\nnot even json\n").unwrap();

    let report = replay_run(&path, ReplayMode::Raw).unwrap();
    assert_eq!(report.events.len(), 1);
    assert_eq!(report.parse_errors.len(), 1);
    assert!(report.issues.is_empty());
    assert_eq!(report.deterministic_ok, None);
}
