// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! guild-store: the canonical filesystem layer.
//!
//! Two disciplines rule this crate: state files are written atomically
//! (tmp + rename) and run logs are append-only JSONL. Everything else in
//! the system is a projection of what this crate persists.

pub mod atomic;
pub mod error;
pub mod eventlog;
pub mod frontmatter;
pub mod migrate;
pub mod records;
pub mod workspace;

pub use atomic::{atomic_write, ensure_dir};
pub use error::StoreError;
pub use eventlog::{
    read_events_jsonl, replay_run, EventLine, EventLog, LogEvent, ReplayMode, ReplayReport,
    RuntimeEventBus, SharedClock, VerifyIssue, VerifyIssueCode,
};
pub use frontmatter::{parse_frontmatter, render_frontmatter, split_frontmatter};
pub use migrate::backfill_event_envelopes;
pub use workspace::Workspace;
