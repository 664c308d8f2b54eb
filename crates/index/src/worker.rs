// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Always-on debounced sync worker.
//!
//! `notify` coalesces bursts for one workspace into a single
//! `sync_sqlite_index` call after `debounce_ms`; `min_interval_ms`
//! throttles back-to-back syncs of the same workspace. `flush` runs all
//! pending work immediately; `close` flushes once and then refuses
//! further notifications.

use crate::error::IndexError;
use crate::sync::sync_sqlite_index;
use guild_store::Workspace;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct SyncWorkerStatus {
    pub enabled: bool,
    pub running: bool,
    pub pending_workspaces: Vec<PathBuf>,
    pub total_notify_calls: u64,
    pub total_workspace_sync_errors: u64,
    pub last_error: Option<String>,
    pub last_error_workspace: Option<PathBuf>,
}

struct WorkerState {
    enabled: bool,
    running: bool,
    /// Workspace → earliest time it may sync.
    pending: HashMap<PathBuf, Instant>,
    last_synced: HashMap<PathBuf, Instant>,
    total_notify_calls: u64,
    total_workspace_sync_errors: u64,
    last_error: Option<String>,
    last_error_workspace: Option<PathBuf>,
}

pub struct SyncWorker {
    state: Arc<Mutex<WorkerState>>,
    debounce: Duration,
    min_interval: Duration,
    wake: Arc<tokio::sync::Notify>,
}

impl SyncWorker {
    pub fn new(debounce_ms: u64, min_interval_ms: u64) -> Arc<Self> {
        let worker = Arc::new(Self {
            state: Arc::new(Mutex::new(WorkerState {
                enabled: true,
                running: false,
                pending: HashMap::new(),
                last_synced: HashMap::new(),
                total_notify_calls: 0,
                total_workspace_sync_errors: 0,
                last_error: None,
                last_error_workspace: None,
            })),
            debounce: Duration::from_millis(debounce_ms),
            min_interval: Duration::from_millis(min_interval_ms),
            wake: Arc::new(tokio::sync::Notify::new()),
        });
        let looper = Arc::clone(&worker);
        tokio::spawn(async move { looper.run().await });
        worker
    }

    /// Coalesce a sync request for one workspace.
    pub fn notify(&self, workspace_dir: &std::path::Path) -> Result<(), IndexError> {
        let mut state = self.state.lock();
        if !state.enabled {
            return Err(IndexError::WorkerClosed);
        }
        state.total_notify_calls += 1;
        let mut due = Instant::now() + self.debounce;
        if let Some(last) = state.last_synced.get(workspace_dir) {
            let throttle_until = *last + self.min_interval;
            if throttle_until > due {
                due = throttle_until;
            }
        }
        // A burst keeps the earliest due time rather than pushing it out.
        state
            .pending
            .entry(workspace_dir.to_path_buf())
            .and_modify(|existing| {
                if due < *existing {
                    *existing = due;
                }
            })
            .or_insert(due);
        drop(state);
        self.wake.notify_waiters();
        Ok(())
    }

    /// Run all pending work now, regardless of debounce.
    pub fn flush(&self) {
        let pending: Vec<PathBuf> = {
            let mut state = self.state.lock();
            state.pending.drain().map(|(ws, _)| ws).collect()
        };
        for ws in pending {
            self.sync_one(&ws);
        }
    }

    /// Flush once, then refuse further notifications.
    pub fn close(&self) {
        {
            let mut state = self.state.lock();
            state.enabled = false;
        }
        self.flush();
        self.wake.notify_waiters();
    }

    pub fn status(&self) -> SyncWorkerStatus {
        let state = self.state.lock();
        SyncWorkerStatus {
            enabled: state.enabled,
            running: state.running,
            pending_workspaces: state.pending.keys().cloned().collect(),
            total_notify_calls: state.total_notify_calls,
            total_workspace_sync_errors: state.total_workspace_sync_errors,
            last_error: state.last_error.clone(),
            last_error_workspace: state.last_error_workspace.clone(),
        }
    }

    async fn run(self: Arc<Self>) {
        loop {
            let (due_now, next_due, enabled) = {
                let now = Instant::now();
                let mut state = self.state.lock();
                let due_now: Vec<PathBuf> = state
                    .pending
                    .iter()
                    .filter(|(_, due)| **due <= now)
                    .map(|(ws, _)| ws.clone())
                    .collect();
                for ws in &due_now {
                    state.pending.remove(ws);
                }
                let next_due = state.pending.values().min().copied();
                (due_now, next_due, state.enabled)
            };

            for ws in due_now {
                self.sync_one(&ws);
            }

            if !enabled {
                return;
            }

            match next_due {
                Some(due) => {
                    let wait = due.saturating_duration_since(Instant::now());
                    tokio::select! {
                        _ = self.wake.notified() => {}
                        _ = tokio::time::sleep(wait) => {}
                    }
                }
                None => self.wake.notified().await,
            }
        }
    }

    fn sync_one(&self, workspace_dir: &std::path::Path) {
        {
            let mut state = self.state.lock();
            state.running = true;
        }
        let result = sync_sqlite_index(&Workspace::new(workspace_dir));
        let mut state = self.state.lock();
        state.running = false;
        state.last_synced.insert(workspace_dir.to_path_buf(), Instant::now());
        if let Err(e) = result {
            tracing::warn!(ws = %workspace_dir.display(), error = %e, "index sync failed");
            state.total_workspace_sync_errors += 1;
            state.last_error = Some(e.to_string());
            state.last_error_workspace = Some(workspace_dir.to_path_buf());
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
