// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Colleagues view: per-agent presence derived from monitor counters
//! and the review inbox.

use guild_core::ActorRole;
use guild_index::{queries, IndexError};
use guild_store::{records, Workspace};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColleagueStatus {
    Active,
    NeedsReview,
    Idle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColleagueRow {
    pub agent_id: String,
    pub name: Option<String>,
    pub role: Option<ActorRole>,
    pub status: ColleagueStatus,
    pub active_runs: i64,
    pub total_runs: i64,
    pub pending_reviews: i64,
    pub last_seen: Option<String>,
}

/// Sorted: active runs desc, pending reviews desc, last seen desc, role
/// rank desc, name asc.
pub fn colleagues_snapshot(ws: &Workspace) -> Result<Vec<ColleagueRow>, IndexError> {
    let counters = queries::agent_counters(ws)?;
    let org_agents: std::collections::HashMap<String, guild_core::AgentRecord> =
        records::list_agents(ws).into_iter().map(|a| (a.id.to_string(), a)).collect();

    let mut rows: Vec<ColleagueRow> = Vec::new();
    let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();

    for counter in counters {
        seen.insert(counter.agent_id.clone());
        let org = org_agents.get(&counter.agent_id);
        let status = if counter.active_runs > 0 {
            ColleagueStatus::Active
        } else if counter.pending_reviews > 0 {
            ColleagueStatus::NeedsReview
        } else {
            ColleagueStatus::Idle
        };
        rows.push(ColleagueRow {
            agent_id: counter.agent_id,
            name: org.map(|a| a.name.clone()),
            role: org.map(|a| a.role),
            status,
            active_runs: counter.active_runs,
            total_runs: counter.total_runs,
            pending_reviews: counter.pending_reviews,
            last_seen: counter.last_seen,
        });
    }

    // Org agents with no runs yet still appear, idle.
    for (agent_id, record) in org_agents {
        if seen.contains(&agent_id) {
            continue;
        }
        rows.push(ColleagueRow {
            agent_id,
            name: Some(record.name.clone()),
            role: Some(record.role),
            status: ColleagueStatus::Idle,
            active_runs: 0,
            total_runs: 0,
            pending_reviews: 0,
            last_seen: None,
        });
    }

    rows.sort_by(|a, b| {
        b.active_runs
            .cmp(&a.active_runs)
            .then_with(|| b.pending_reviews.cmp(&a.pending_reviews))
            .then_with(|| b.last_seen.cmp(&a.last_seen))
            .then_with(|| {
                let rank = |r: Option<ActorRole>| r.map(|r| r.rank()).unwrap_or(0);
                rank(b.role).cmp(&rank(a.role))
            })
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(rows)
}
