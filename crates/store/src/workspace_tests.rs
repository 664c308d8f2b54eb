// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn ws() -> Workspace {
    Workspace::new("/ws")
}

#[parameterized(
    absolute = { "/etc/passwd" },
    parent_escape = { "../outside" },
    nested_escape = { "work/../../outside" },
)]
fn resolve_rel_rejects_escapes(rel: &str) {
    assert!(matches!(ws().resolve_rel(rel), Err(StoreError::PathEscape(_))));
}

#[test]
fn resolve_rel_joins_under_root() {
    let path = ws().resolve_rel("work/projects/prj-1/memory.md").unwrap();
    assert_eq!(path, PathBuf::from("/ws/work/projects/prj-1/memory.md"));
}

#[test]
fn rel_of_inverts_resolve() {
    let w = ws();
    let abs = w.resolve_rel("org/agents/agt-1/AGENTS.md").unwrap();
    assert_eq!(w.rel_of(&abs).unwrap(), "org/agents/agt-1/AGENTS.md");
}

#[test]
fn rel_of_rejects_foreign_paths() {
    assert!(ws().rel_of(Path::new("/elsewhere/file")).is_err());
}

#[test]
fn layout_paths() {
    let w = ws();
    let pid = ProjectId::from_string("prj-1");
    let rid = RunId::from_string("run-1");
    assert_eq!(w.company_yaml(), PathBuf::from("/ws/company/company.yaml"));
    assert_eq!(
        w.events_jsonl(&pid, &rid),
        PathBuf::from("/ws/work/projects/prj-1/runs/run-1/events.jsonl")
    );
    assert_eq!(w.index_db(), PathBuf::from("/ws/.local/index.db"));
    assert_eq!(
        w.artifact_sibling(&pid, &ArtifactId::from_string("art-1"), "patch"),
        PathBuf::from("/ws/work/projects/prj-1/artifacts/art-1.patch")
    );
}
