// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! guild-index: the SQLite projection cache.
//!
//! One database per workspace at `.local/index.db`. Every row derives
//! from a canonical file plus its content fingerprint; the database owns
//! no truth and can be deleted and rebuilt at any time. Rebuild and sync
//! are serialized per workspace.

pub mod error;
pub mod fingerprint;
pub mod queries;
pub mod schema;
pub mod sync;
pub mod worker;

pub use error::IndexError;
pub use fingerprint::Fingerprint;
pub use queries::{
    AgentCounterRow, ArtifactRow, DecisionRow, EventRow, MilestoneRow, ParseErrorRow,
    PendingApprovalRow, ReviewRow, RunRow, TaskRow,
};
pub use sync::{rebuild_sqlite_index, sync_sqlite_index, SyncOutcome};
pub use worker::{SyncWorker, SyncWorkerStatus};
