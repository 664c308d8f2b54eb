// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The launch lane: the only admission point in front of session spawn.
//!
//! Admission requires the workspace's in-flight count and the
//! `(workspace, provider)` pair count to be under their limits, and no
//! active provider cooldown. High-priority launches jump ahead of queued
//! normal waiters but never preempt anything already running. A waiter
//! dropped while queued frees its slot immediately.

use guild_core::Provider;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchPriority {
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneLimits {
    pub workspace_limit: usize,
    pub provider_limit: usize,
}

impl Default for LaneLimits {
    fn default() -> Self {
        Self { workspace_limit: 4, provider_limit: 2 }
    }
}

#[derive(Debug, Clone, Copy)]
struct Cooldown {
    until: Instant,
    current_ms: u64,
}

#[derive(Default)]
struct WorkspaceLane {
    running: usize,
    provider_running: HashMap<Provider, usize>,
    pending_high: usize,
    pending_normal: usize,
    cooldowns: HashMap<Provider, Cooldown>,
}

struct LaneInner {
    lanes: Mutex<HashMap<PathBuf, WorkspaceLane>>,
    notify: Notify,
}

/// Observability snapshot for one workspace.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct LaneStats {
    pub pending: usize,
    pub running: usize,
    /// Provider → remaining cooldown in ms.
    pub provider_cooldowns: Vec<(Provider, u64)>,
}

#[derive(Clone)]
pub struct LaunchLane {
    inner: Arc<LaneInner>,
}

impl Default for LaunchLane {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements a pending counter if the waiter is dropped before running.
struct PendingGuard {
    inner: Arc<LaneInner>,
    ws: PathBuf,
    high: bool,
    armed: bool,
}

impl PendingGuard {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut lanes = self.inner.lanes.lock();
        if let Some(lane) = lanes.get_mut(&self.ws) {
            if self.high {
                lane.pending_high = lane.pending_high.saturating_sub(1);
            } else {
                lane.pending_normal = lane.pending_normal.saturating_sub(1);
            }
        }
        self.inner.notify.notify_waiters();
    }
}

/// Releases a running slot on drop.
struct RunPermit {
    inner: Arc<LaneInner>,
    ws: PathBuf,
    provider: Option<Provider>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        let mut lanes = self.inner.lanes.lock();
        if let Some(lane) = lanes.get_mut(&self.ws) {
            lane.running = lane.running.saturating_sub(1);
            if let Some(provider) = self.provider {
                if let Some(count) = lane.provider_running.get_mut(&provider) {
                    *count = count.saturating_sub(1);
                }
            }
        }
        self.inner.notify.notify_waiters();
    }
}

impl LaunchLane {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(LaneInner { lanes: Mutex::new(HashMap::new()), notify: Notify::new() }),
        }
    }

    /// Run `f` once admitted; the slot frees when the future settles or
    /// is dropped.
    pub async fn with_launch_lane<F, T>(
        &self,
        workspace_dir: &Path,
        provider: Option<Provider>,
        priority: LaunchPriority,
        limits: LaneLimits,
        f: F,
    ) -> T
    where
        F: Future<Output = T>,
    {
        let high = priority == LaunchPriority::High;
        let mut pending = PendingGuard {
            inner: Arc::clone(&self.inner),
            ws: workspace_dir.to_path_buf(),
            high,
            armed: true,
        };
        {
            let mut lanes = self.inner.lanes.lock();
            let lane = lanes.entry(workspace_dir.to_path_buf()).or_default();
            if high {
                lane.pending_high += 1;
            } else {
                lane.pending_normal += 1;
            }
        }

        let permit = loop {
            let wait = {
                let mut lanes = self.inner.lanes.lock();
                let lane = lanes.entry(workspace_dir.to_path_buf()).or_default();
                match Self::admissible(lane, provider, high, limits) {
                    Admission::Admit => {
                        if high {
                            lane.pending_high -= 1;
                        } else {
                            lane.pending_normal -= 1;
                        }
                        pending.disarm();
                        lane.running += 1;
                        if let Some(provider) = provider {
                            *lane.provider_running.entry(provider).or_default() += 1;
                        }
                        break RunPermit {
                            inner: Arc::clone(&self.inner),
                            ws: workspace_dir.to_path_buf(),
                            provider,
                        };
                    }
                    Admission::Wait(duration) => duration,
                }
            };
            tokio::select! {
                _ = self.inner.notify.notified() => {}
                _ = tokio::time::sleep(wait) => {}
            }
        };

        let result = f.await;
        drop(permit);
        result
    }

    fn admissible(
        lane: &WorkspaceLane,
        provider: Option<Provider>,
        high: bool,
        limits: LaneLimits,
    ) -> Admission {
        if lane.running >= limits.workspace_limit {
            return Admission::Wait(Duration::from_millis(250));
        }
        if !high && lane.pending_high > 0 {
            return Admission::Wait(Duration::from_millis(250));
        }
        if let Some(provider) = provider {
            let in_flight = lane.provider_running.get(&provider).copied().unwrap_or(0);
            if in_flight >= limits.provider_limit {
                return Admission::Wait(Duration::from_millis(250));
            }
            if let Some(cooldown) = lane.cooldowns.get(&provider) {
                let now = Instant::now();
                if cooldown.until > now {
                    return Admission::Wait(cooldown.until - now);
                }
            }
        }
        Admission::Admit
    }

    /// Record provider backpressure, doubling the cooldown up to the cap.
    pub fn report_provider_backpressure(
        &self,
        workspace_dir: &Path,
        provider: Provider,
        reason: &str,
        base_cooldown_ms: u64,
        max_cooldown_ms: u64,
    ) {
        let mut lanes = self.inner.lanes.lock();
        let lane = lanes.entry(workspace_dir.to_path_buf()).or_default();
        let current_ms = lane
            .cooldowns
            .get(&provider)
            .map(|c| (c.current_ms * 2).min(max_cooldown_ms))
            .unwrap_or(base_cooldown_ms.min(max_cooldown_ms));
        tracing::warn!(%provider, reason, cooldown_ms = current_ms, "provider backpressure");
        lane.cooldowns.insert(
            provider,
            Cooldown { until: Instant::now() + Duration::from_millis(current_ms), current_ms },
        );
    }

    pub fn clear_provider_cooldown(&self, workspace_dir: &Path, provider: Provider) {
        let mut lanes = self.inner.lanes.lock();
        if let Some(lane) = lanes.get_mut(&workspace_dir.to_path_buf()) {
            lane.cooldowns.remove(&provider);
        }
        self.inner.notify.notify_waiters();
    }

    pub fn stats_for_workspace(&self, workspace_dir: &Path) -> LaneStats {
        let lanes = self.inner.lanes.lock();
        match lanes.get(workspace_dir) {
            Some(lane) => {
                let now = Instant::now();
                LaneStats {
                    pending: lane.pending_high + lane.pending_normal,
                    running: lane.running,
                    provider_cooldowns: lane
                        .cooldowns
                        .iter()
                        .filter(|(_, c)| c.until > now)
                        .map(|(p, c)| (*p, (c.until - now).as_millis() as u64))
                        .collect(),
                }
            }
            None => LaneStats { pending: 0, running: 0, provider_cooldowns: Vec::new() },
        }
    }
}

enum Admission {
    Admit,
    Wait(Duration),
}

#[cfg(test)]
#[path = "lane_tests.rs"]
mod tests;
