// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only snapshot views composed from the projection index with
//! fallback to canonical files. Nothing here mutates state.

pub mod colleagues;
pub mod inbox;
pub mod monitor;
pub mod pm;
pub mod reconcile;
pub mod resources;

pub use colleagues::{colleagues_snapshot, ColleagueRow};
pub use inbox::{review_inbox_snapshot, ReviewInboxSnapshot};
pub use monitor::{run_monitor_snapshot, MonitorRow};
pub use pm::{pm_snapshot, CpmStatus, GanttBar, PmSnapshot};
pub use reconcile::{reconciliation_snapshot, ReconciliationRow};
pub use resources::{resources_snapshot, ResourcesSnapshot};
