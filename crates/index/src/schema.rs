// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Projection schema.
//!
//! All tables are derived data. `file_fingerprints` and `event_cursors`
//! are the sync bookkeeping; everything else mirrors canonical files.

use rusqlite::Connection;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS file_fingerprints (
    path TEXT PRIMARY KEY,
    fingerprint TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS event_cursors (
    project_id TEXT NOT NULL,
    run_id TEXT NOT NULL,
    last_seq INTEGER NOT NULL,
    PRIMARY KEY (project_id, run_id)
);

CREATE TABLE IF NOT EXISTS runs (
    run_id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    agent_id TEXT NOT NULL,
    provider TEXT NOT NULL,
    created_at TEXT,
    status TEXT NOT NULL,
    usage_total_tokens INTEGER,
    usage_cost_usd REAL,
    task_id TEXT
);

CREATE TABLE IF NOT EXISTS events (
    project_id TEXT NOT NULL,
    run_id TEXT NOT NULL,
    seq INTEGER NOT NULL,
    event_id TEXT,
    ts_wallclock TEXT,
    ts_monotonic_ms INTEGER,
    type TEXT,
    actor TEXT,
    visibility TEXT,
    payload TEXT,
    PRIMARY KEY (project_id, run_id, seq)
);
CREATE INDEX IF NOT EXISTS idx_events_type ON events (project_id, run_id, type);

CREATE TABLE IF NOT EXISTS event_parse_errors (
    project_id TEXT NOT NULL,
    run_id TEXT NOT NULL,
    seq INTEGER NOT NULL,
    raw_line TEXT,
    error TEXT,
    PRIMARY KEY (project_id, run_id, seq)
);

CREATE TABLE IF NOT EXISTS artifacts (
    artifact_id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    type TEXT NOT NULL,
    title TEXT,
    created_at TEXT,
    visibility TEXT,
    sensitivity TEXT,
    produced_by TEXT,
    run_id TEXT,
    task_id TEXT,
    milestone_id TEXT,
    header_json TEXT
);

CREATE TABLE IF NOT EXISTS reviews (
    review_id TEXT PRIMARY KEY,
    created_at TEXT,
    actor_id TEXT,
    actor_role TEXT,
    decision TEXT,
    subject_kind TEXT,
    artifact_id TEXT,
    notes TEXT
);

CREATE TABLE IF NOT EXISTS pending_approvals (
    artifact_id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    type TEXT NOT NULL,
    title TEXT,
    created_at TEXT,
    produced_by TEXT
);

CREATE TABLE IF NOT EXISTS review_decisions (
    review_id TEXT PRIMARY KEY,
    decided_at TEXT,
    decision TEXT,
    actor_id TEXT,
    artifact_id TEXT,
    artifact_type TEXT,
    run_id TEXT
);

CREATE TABLE IF NOT EXISTS tasks (
    task_id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    title TEXT,
    status TEXT,
    visibility TEXT,
    assignee_agent_id TEXT,
    planned_start TEXT,
    planned_end TEXT,
    duration_days REAL,
    depends_on_json TEXT,
    header_json TEXT
);

CREATE TABLE IF NOT EXISTS task_milestones (
    task_id TEXT NOT NULL,
    milestone_id TEXT NOT NULL,
    title TEXT,
    kind TEXT,
    status TEXT,
    requires_patch INTEGER,
    requires_tests INTEGER,
    PRIMARY KEY (task_id, milestone_id)
);

CREATE TABLE IF NOT EXISTS help_requests (
    help_request_id TEXT PRIMARY KEY,
    project_id TEXT,
    created_at TEXT,
    body TEXT
);

CREATE TABLE IF NOT EXISTS conversations (
    conversation_id TEXT PRIMARY KEY,
    project_id TEXT,
    created_at TEXT,
    title TEXT
);

CREATE TABLE IF NOT EXISTS messages (
    conversation_id TEXT NOT NULL,
    seq INTEGER NOT NULL,
    author TEXT,
    created_at TEXT,
    body TEXT,
    PRIMARY KEY (conversation_id, seq)
);

CREATE TABLE IF NOT EXISTS agent_counters (
    agent_id TEXT PRIMARY KEY,
    active_runs INTEGER NOT NULL DEFAULT 0,
    total_runs INTEGER NOT NULL DEFAULT 0,
    pending_reviews INTEGER NOT NULL DEFAULT 0,
    last_seen TEXT
);
";

/// Open the workspace database, applying pragmas and schema.
pub fn open(db_path: &std::path::Path) -> Result<Connection, rusqlite::Error> {
    if let Some(parent) = db_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let conn = Connection::open(db_path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}
