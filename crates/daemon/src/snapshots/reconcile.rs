// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Usage reconciliation: internal rollups joined with imported billing
//! statements inside a period window.

use guild_heartbeat::triage::parse_iso_ms;
use guild_store::{records, StoreError, Workspace};
use serde::{Deserialize, Serialize};

/// One imported statement from
/// `.local/billing/reconciliation_statements.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingStatement {
    pub provider: String,
    pub period_start: String,
    pub period_end: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    pub total_cost_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationRow {
    pub provider: String,
    pub period_start: String,
    pub period_end: String,
    pub internal_tokens: u64,
    pub internal_cost_usd: f64,
    pub statement_tokens: Option<u64>,
    pub statement_cost_usd: f64,
    /// Null when the statement carries no token figure.
    pub token_delta: Option<i64>,
    pub cost_delta_usd: f64,
    /// Null when the statement cost is zero.
    pub cost_delta_pct: Option<f64>,
}

pub fn reconciliation_snapshot(ws: &Workspace) -> Result<Vec<ReconciliationRow>, StoreError> {
    let statements_path = ws.billing_statements_json();
    let statements: Vec<BillingStatement> = match std::fs::read_to_string(&statements_path) {
        Ok(text) => serde_json::from_str(&text)
            .map_err(|e| StoreError::Yaml { path: statements_path, message: e.to_string() })?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(StoreError::io(statements_path, e)),
    };

    let mut rows = Vec::with_capacity(statements.len());
    for statement in statements {
        let start_ms = parse_iso_ms(&statement.period_start).unwrap_or(0);
        let end_ms = parse_iso_ms(&statement.period_end).unwrap_or(u64::MAX);

        let mut internal_tokens = 0u64;
        let mut internal_cost = 0.0f64;
        for project_id in records::list_projects(ws) {
            for run_id in records::list_runs(ws, &project_id) {
                let Ok(run) = records::read_run(ws, &project_id, &run_id) else {
                    continue;
                };
                if run.provider.to_string() != statement.provider {
                    continue;
                }
                let Some(created_ms) = parse_iso_ms(&run.created_at) else {
                    continue;
                };
                if created_ms < start_ms || created_ms >= end_ms {
                    continue;
                }
                if let Some(usage) = &run.usage {
                    internal_tokens += usage.total_tokens;
                    internal_cost += usage.cost_usd.unwrap_or(0.0);
                }
            }
        }

        let token_delta = statement
            .total_tokens
            .map(|statement_tokens| statement_tokens as i64 - internal_tokens as i64);
        let cost_delta_usd = statement.total_cost_usd - internal_cost;
        let cost_delta_pct = if statement.total_cost_usd.abs() > f64::EPSILON {
            Some(cost_delta_usd / statement.total_cost_usd * 100.0)
        } else {
            None
        };

        rows.push(ReconciliationRow {
            provider: statement.provider,
            period_start: statement.period_start,
            period_end: statement.period_end,
            internal_tokens,
            internal_cost_usd: internal_cost,
            statement_tokens: statement.total_tokens,
            statement_cost_usd: statement.total_cost_usd,
            token_delta,
            cost_delta_usd,
            cost_delta_pct,
        });
    }
    Ok(rows)
}
