// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Review inbox: pending approvals plus recent decisions, with parse
//! error visibility so warnings never hide silently.

use guild_index::{queries, IndexError, PendingApprovalRow};
use guild_store::Workspace;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseErrorSummary {
    pub has_parse_errors: bool,
    pub pending_with_errors: u64,
    pub decisions_with_errors: u64,
    pub max_parse_error_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewInboxSnapshot {
    pub pending: Vec<PendingApprovalRow>,
    pub recent_decisions: Vec<queries::DecisionRow>,
    pub parse_errors: ParseErrorSummary,
    pub index_synced: bool,
}

pub fn review_inbox_snapshot(ws: &Workspace) -> Result<ReviewInboxSnapshot, IndexError> {
    let pending = queries::pending_approvals(ws)?;
    let recent_decisions = queries::recent_decisions(ws, 50)?;

    let mut summary = ParseErrorSummary::default();
    // Pending items trace back to their producing run through the
    // artifact row; count parse errors on those runs.
    for item in &pending {
        if let Some(artifact) = queries::artifact_by_id(ws, &item.artifact_id)? {
            if let Some(run_id) = artifact.run_id {
                let count = queries::parse_error_count(ws, &item.project_id, &run_id)?;
                if count > 0 {
                    summary.pending_with_errors += 1;
                    summary.max_parse_error_count = summary.max_parse_error_count.max(count);
                }
            }
        }
    }
    for decision in &recent_decisions {
        if let (Some(artifact_id), Some(run_id)) = (&decision.artifact_id, &decision.run_id) {
            if let Some(artifact) = queries::artifact_by_id(ws, artifact_id)? {
                let count = queries::parse_error_count(ws, &artifact.project_id, run_id)?;
                if count > 0 {
                    summary.decisions_with_errors += 1;
                    summary.max_parse_error_count = summary.max_parse_error_count.max(count);
                }
            }
        }
    }
    summary.has_parse_errors =
        summary.pending_with_errors > 0 || summary.decisions_with_errors > 0;

    Ok(ReviewInboxSnapshot {
        pending,
        recent_decisions,
        parse_errors: summary,
        index_synced: true,
    })
}
