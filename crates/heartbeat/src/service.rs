// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The heartbeat service: per-workspace loops and the tick.
//!
//! Off by default; a workspace is observed when any method call first
//! references it. At most one tick runs per workspace — an overlapping
//! call returns `skipped_due_to_running` immediately, without waiting.

use crate::error::HeartbeatError;
use crate::executor::{HeartbeatExecutor, JobLauncher, ReportOutcome};
use crate::triage::{context_fingerprint, parse_iso_ms, score, triage_worker};
use guild_core::{
    ActorRole, AgentId, HeartbeatConfig, HeartbeatMode, HeartbeatState, HeartbeatWorkerReport,
    ProjectId,
};
use guild_store::{records, SharedClock, Workspace};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::hash_map::RandomState;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WakeTarget {
    pub agent_id: AgentId,
    pub score: i32,
    pub jitter_seconds: u32,
    pub project_id: Option<ProjectId>,
    pub counts: crate::triage::TriageCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickOutcome {
    pub skipped_due_to_running: bool,
    pub dry_run: bool,
    pub candidates: usize,
    pub wake_targets: Vec<WakeTarget>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeartbeatStatus {
    pub observed_workspaces: Vec<PathBuf>,
    pub configs: BTreeMap<String, HeartbeatConfig>,
}

struct ObservedWorkspace {
    tick_running: Arc<AtomicBool>,
}

pub struct HeartbeatService {
    clock: Arc<dyn SharedClock>,
    executor: Arc<HeartbeatExecutor>,
    observed: Mutex<HashMap<PathBuf, ObservedWorkspace>>,
    closed: AtomicBool,
    jitter_seed: RandomState,
}

impl HeartbeatService {
    pub fn new(clock: Arc<dyn SharedClock>, launcher: Arc<dyn JobLauncher>) -> Arc<Self> {
        Arc::new(Self {
            clock,
            executor: Arc::new(HeartbeatExecutor::new(launcher)),
            observed: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
            jitter_seed: RandomState::new(),
        })
    }

    pub fn executor(&self) -> Arc<HeartbeatExecutor> {
        Arc::clone(&self.executor)
    }

    /// Start observing a workspace (idempotent). When its config enables
    /// the heartbeat, a periodic loop drives ticks.
    pub fn observe_workspace(self: &Arc<Self>, workspace_dir: &Path) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let mut observed = self.observed.lock();
        if observed.contains_key(workspace_dir) {
            return;
        }
        observed.insert(
            workspace_dir.to_path_buf(),
            ObservedWorkspace { tick_running: Arc::new(AtomicBool::new(false)) },
        );
        drop(observed);

        let service = Arc::clone(self);
        let ws_dir = workspace_dir.to_path_buf();
        tokio::spawn(async move {
            loop {
                if service.closed.load(Ordering::SeqCst) {
                    return;
                }
                let ws = Workspace::new(&ws_dir);
                let config = records::read_heartbeat_config(&ws).unwrap_or_default();
                let interval_ms = u64::from(config.interval_minutes.max(1)) * 60_000;
                if config.enabled {
                    if let Err(e) = service.tick_workspace(&ws_dir, false, "interval") {
                        tracing::warn!(ws = %ws_dir.display(), error = %e, "tick failed");
                    }
                }
                tokio::time::sleep(std::time::Duration::from_millis(interval_ms)).await;
            }
        });
        tracing::debug!(ws = %workspace_dir.display(), "workspace observed");
    }

    pub fn set_config(
        &self,
        workspace_dir: &Path,
        config: &HeartbeatConfig,
    ) -> Result<(), HeartbeatError> {
        records::write_heartbeat_config(&Workspace::new(workspace_dir), config)?;
        Ok(())
    }

    pub fn get_status(&self) -> HeartbeatStatus {
        let observed = self.observed.lock();
        let mut configs = BTreeMap::new();
        for path in observed.keys() {
            let ws = Workspace::new(path);
            if let Ok(config) = records::read_heartbeat_config(&ws) {
                configs.insert(path.display().to_string(), config);
            }
        }
        HeartbeatStatus { observed_workspaces: observed.keys().cloned().collect(), configs }
    }

    /// Run one tick now. Overlapping calls short-circuit.
    pub fn tick_workspace(
        &self,
        workspace_dir: &Path,
        dry_run: bool,
        reason: &str,
    ) -> Result<TickOutcome, HeartbeatError> {
        let tick_flag = {
            let mut observed = self.observed.lock();
            let entry = observed.entry(workspace_dir.to_path_buf()).or_insert_with(|| {
                ObservedWorkspace { tick_running: Arc::new(AtomicBool::new(false)) }
            });
            Arc::clone(&entry.tick_running)
        };
        if tick_flag.swap(true, Ordering::SeqCst) {
            return Ok(TickOutcome { skipped_due_to_running: true, dry_run, ..Default::default() });
        }
        let result = self.tick_inner(workspace_dir, dry_run, reason);
        tick_flag.store(false, Ordering::SeqCst);
        result
    }

    fn tick_inner(
        &self,
        workspace_dir: &Path,
        dry_run: bool,
        reason: &str,
    ) -> Result<TickOutcome, HeartbeatError> {
        let ws = Workspace::new(workspace_dir);
        let config = records::read_heartbeat_config(&ws)?;
        let mut state = records::read_heartbeat_state(&ws)?;
        let now_ms = self.clock.epoch_ms();
        let now_iso = self.clock.iso_now();
        let quiet = config.quiet_hours.contains(local_hour(now_ms));

        let mut candidates: Vec<WakeTarget> = Vec::new();
        let mut all_cursors = state.run_event_cursors.clone();

        for agent in records::list_agents(&ws) {
            let eligible = match config.mode {
                HeartbeatMode::WorkersOnly => agent.role == ActorRole::Worker,
                HeartbeatMode::EnterpriseV1 => {
                    matches!(agent.role, ActorRole::Worker | ActorRole::Director)
                }
            };
            if !eligible {
                continue;
            }

            let triage =
                triage_worker(&ws, &agent.id, &state.run_event_cursors, &config, now_ms);
            let fingerprint = context_fingerprint(
                &agent.id,
                agent.role.as_str(),
                &triage.counts,
                &triage.observed_cursors,
            );

            let worker_state = state.worker_state.entry(agent.id).or_default();

            // Suppression window still active?
            if let Some(until) = worker_state.suppressed_until.as_deref().and_then(parse_iso_ms) {
                if until > now_ms {
                    worker_state.last_context_hash = Some(fingerprint);
                    all_cursors.extend(triage.observed_cursors);
                    continue;
                }
            }

            let recent_ok = worker_state
                .last_ok_at
                .as_deref()
                .and_then(parse_iso_ms)
                .map_or(false, |ok_ms| {
                    now_ms.saturating_sub(ok_ms)
                        <= u64::from(config.ok_suppression_minutes) * 60_000
                });
            let unchanged = worker_state.last_context_hash.as_deref() == Some(&fingerprint);
            if unchanged && recent_ok {
                // Settled context: suppress until the ok window ends.
                worker_state.suppressed_until = Some(iso_from_ms(
                    now_ms + u64::from(config.ok_suppression_minutes) * 60_000,
                ));
            }

            let worker_score = score(&triage.counts, unchanged && recent_ok, quiet);
            worker_state.last_context_hash = Some(fingerprint);

            if worker_score >= config.min_wake_score {
                let project_id =
                    select_project(&triage.project_signals, triage.latest_project.as_deref(), &config);
                candidates.push(WakeTarget {
                    agent_id: agent.id,
                    score: worker_score,
                    jitter_seconds: self.jitter(&agent.id, now_ms, config.jitter_max_seconds),
                    project_id,
                    counts: triage.counts,
                });
            }
            all_cursors.extend(triage.observed_cursors);
        }

        // Score desc, agent_id asc; take the top K.
        candidates.sort_by(|a, b| {
            b.score.cmp(&a.score).then_with(|| a.agent_id.as_str().cmp(b.agent_id.as_str()))
        });
        let candidate_count = candidates.len();
        let wake_targets: Vec<WakeTarget> =
            candidates.into_iter().take(config.top_k_workers).collect();

        if !dry_run {
            state.run_event_cursors = all_cursors;
            for target in &wake_targets {
                if let Some(ws_state) = state.worker_state.get_mut(&target.agent_id) {
                    ws_state.last_wake_at = Some(now_iso.clone());
                }
            }
            state.stats.ticks += 1;
            state.stats.wakes += wake_targets.len() as u64;
            records::write_heartbeat_state(&ws, &state)?;
        }

        tracing::debug!(
            ws = %workspace_dir.display(),
            reason,
            candidates = candidate_count,
            wakes = wake_targets.len(),
            "tick complete"
        );
        Ok(TickOutcome {
            skipped_due_to_running: false,
            dry_run,
            candidates: candidate_count,
            wake_targets,
        })
    }

    /// Apply a worker's report through the execution pipeline.
    pub fn handle_report(
        &self,
        workspace_dir: &Path,
        report: &HeartbeatWorkerReport,
    ) -> Result<ReportOutcome, HeartbeatError> {
        let ws = Workspace::new(workspace_dir);
        let config = records::read_heartbeat_config(&ws)?;
        let mut state = records::read_heartbeat_state(&ws)?;
        let now_ms = self.clock.epoch_ms();
        let now_iso = self.clock.iso_now();
        let quiet = config.quiet_hours.contains(local_hour(now_ms));

        let outcome = self.executor.apply_report(
            &ws,
            &config,
            &mut state,
            report,
            now_ms,
            &now_iso,
            quiet,
        )?;
        records::write_heartbeat_state(&ws, &state)?;
        Ok(outcome)
    }

    /// Stop observing; loops exit on their next wake.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.observed.lock().clear();
    }

    /// Mark a tick in flight without running one (test seam).
    #[cfg(test)]
    pub(crate) fn hold_tick_flag(&self, workspace_dir: &Path) -> Arc<AtomicBool> {
        let mut observed = self.observed.lock();
        let entry = observed
            .entry(workspace_dir.to_path_buf())
            .or_insert_with(|| ObservedWorkspace { tick_running: Arc::new(AtomicBool::new(false)) });
        entry.tick_running.store(true, Ordering::SeqCst);
        Arc::clone(&entry.tick_running)
    }

    /// Deterministic-per-process jitter in `0..=max`.
    fn jitter(&self, agent_id: &AgentId, now_ms: u64, max_seconds: u32) -> u32 {
        if max_seconds == 0 {
            return 0;
        }
        let mut hasher = self.jitter_seed.build_hasher();
        agent_id.as_str().hash(&mut hasher);
        now_ms.hash(&mut hasher);
        (hasher.finish() % u64::from(max_seconds + 1)) as u32
    }
}

/// Highest project-signal score wins; ties prefer the worker's latest
/// project, then lexical order; fall back to the configured default.
fn select_project(
    project_signals: &BTreeMap<String, u64>,
    latest_project: Option<&str>,
    config: &HeartbeatConfig,
) -> Option<ProjectId> {
    project_signals
        .iter()
        .max_by(|(a_id, a_sig), (b_id, b_sig)| {
            a_sig
                .cmp(b_sig)
                .then_with(|| {
                    let a_latest = Some(a_id.as_str()) == latest_project;
                    let b_latest = Some(b_id.as_str()) == latest_project;
                    a_latest.cmp(&b_latest)
                })
                .then_with(|| b_id.cmp(a_id))
        })
        .map(|(id, _)| ProjectId::from_string(id))
        .or(config.default_project_id)
}

fn local_hour(now_ms: u64) -> u8 {
    use chrono::Timelike;
    chrono::DateTime::from_timestamp_millis(now_ms as i64)
        .map(|utc| utc.with_timezone(&chrono::Local).hour() as u8)
        .unwrap_or(0)
}

fn iso_from_ms(ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(ms as i64)
        .unwrap_or_default()
        .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
