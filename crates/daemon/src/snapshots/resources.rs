// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource totals with per-provider and per-model rollups, read from
//! canonical run records.

use guild_store::{records, StoreError, Workspace};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Rollup {
    pub runs: u64,
    pub total_tokens: u64,
    pub cost_usd: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourcesSnapshot {
    pub totals: Rollup,
    pub by_provider: BTreeMap<String, Rollup>,
    pub by_model: BTreeMap<String, Rollup>,
}

pub fn resources_snapshot(ws: &Workspace) -> Result<ResourcesSnapshot, StoreError> {
    let mut snapshot = ResourcesSnapshot::default();
    for project_id in records::list_projects(ws) {
        for run_id in records::list_runs(ws, &project_id) {
            let Ok(run) = records::read_run(ws, &project_id, &run_id) else {
                continue;
            };
            let tokens = run.usage.as_ref().map(|u| u.total_tokens).unwrap_or(0);
            let cost = run.usage.as_ref().and_then(|u| u.cost_usd).unwrap_or(0.0);

            snapshot.totals.runs += 1;
            snapshot.totals.total_tokens += tokens;
            snapshot.totals.cost_usd += cost;

            let provider = snapshot.by_provider.entry(run.provider.to_string()).or_default();
            provider.runs += 1;
            provider.total_tokens += tokens;
            provider.cost_usd += cost;

            if let Some(model) = &run.model {
                let entry = snapshot.by_model.entry(model.clone()).or_default();
                entry.runs += 1;
                entry.total_tokens += tokens;
                entry.cost_usd += cost;
            }
        }
    }
    Ok(snapshot)
}
