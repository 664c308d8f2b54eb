// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::eventlog::{replay_run, EventLog, ReplayMode, VerifyIssueCode};
use crate::records::{create_run, init_workspace};
use guild_core::test_support::sample_run;
use guild_core::CompanyRecord;
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
    ws
}

fn write_legacy_log(ws: &Workspace) -> std::path::PathBuf {
    let run = sample_run("run-1", "prj-1");
    create_run(ws, &run).unwrap();
    let path = ws.events_jsonl(&run.project_id, &run.run_id);
    let legacy = "\
{\"schema_version\":1,\"ts_wallclock\":\"t1\",\"ts_monotonic_ms\":1,\"run_id\":\"run-1\",\"type\":\"run.started\",\"payload\":{}}
{\"schema_version\":1,\"ts_wallclock\":\"t2\",\"ts_monotonic_ms\":2,\"run_id\":\"run-1\",\"type\":\"run.ended\",\"payload\":{}}
";
    std::fs::write(&path, legacy).unwrap();
    path
}

#[test]
fn backfill_assigns_ids_and_rechains() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let path = write_legacy_log(&ws);

    let outcome = backfill_event_envelopes(&ws, "2026-01-05T11:00:00Z", false).unwrap();
    assert!(outcome.applied);
    assert_eq!(outcome.files_rewritten, 1);
    assert_eq!(outcome.lines_backfilled, 2);

    let report = replay_run(&path, ReplayMode::Verified).unwrap();
    // Chain and ids are now valid; only wallclock-style keys were legacy.
    let chain_issues: Vec<_> = report
        .issues
        .iter()
        .filter(|i| {
            matches!(
                i.code,
                VerifyIssueCode::InvalidEventHash | VerifyIssueCode::PrevHashChainMismatch
            )
        })
        .collect();
    assert!(chain_issues.is_empty(), "{chain_issues:?}");
}

#[test]
fn rerun_is_a_no_op_unless_forced() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    write_legacy_log(&ws);

    let first = backfill_event_envelopes(&ws, "2026-01-05T11:00:00Z", false).unwrap();
    assert!(first.applied);

    let second = backfill_event_envelopes(&ws, "2026-01-05T12:00:00Z", false).unwrap();
    assert!(!second.applied);
    assert_eq!(second.files_rewritten, 0);

    let forced = backfill_event_envelopes(&ws, "2026-01-05T13:00:00Z", true).unwrap();
    assert!(forced.applied);
    // Already enveloped: nothing left to backfill.
    assert_eq!(forced.lines_backfilled, 0);
}

#[test]
fn already_enveloped_files_are_untouched() {
    let dir = tempdir().unwrap();
    let ws = seeded_ws(dir.path());
    let run = sample_run("run-2", "prj-1");
    create_run(&ws, &run).unwrap();
    let path = ws.events_jsonl(&run.project_id, &run.run_id);

    let log = EventLog::system();
    log.append(
        &path,
        guild_core::EventEnvelope::new(
            run.run_id,
            "ses-1",
            "agt-1",
            "run.started",
            serde_json::json!({}),
        ),
    )
    .unwrap();
    let before = std::fs::read_to_string(&path).unwrap();

    backfill_event_envelopes(&ws, "2026-01-05T11:00:00Z", false).unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}
