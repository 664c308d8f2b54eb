// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared scenario fixtures.

use guild_core::{CompanyRecord, ProjectId, ProjectRecord};
use guild_store::{records, Workspace};

/// Initialize a workspace with one project (`prj-1`).
pub fn seeded_workspace(dir: &std::path::Path) -> Workspace {
    let ws = Workspace::new(dir);
    records::init_workspace(
        &ws,
        &CompanyRecord {
            id: "acme".to_string(),
            name: "Acme".to_string(),
            created_at: "2026-01-05T10:00:00Z".to_string(),
            schema_version: 1,
        },
    )
    .unwrap();
    records::create_project_with_defaults(
        &ws,
        &ProjectRecord {
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

/// All event type strings of one run, in order.
pub fn event_types(ws: &Workspace, project_id: &str, run_id: &str) -> Vec<String> {
    let report = guild_store::replay_run(
        &ws.events_jsonl(
            &ProjectId::from_string(project_id),
            &guild_core::RunId::from_string(run_id),
        ),
        guild_store::ReplayMode::Raw,
    )
    .unwrap();
    report
        .events
        .iter()
        .filter_map(|e| e.get("type").and_then(|t| t.as_str()).map(str::to_string))
        .collect()
}
