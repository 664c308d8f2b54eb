// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Governance error taxonomy.

use crate::redact::SecretReport;
use guild_core::PolicyDecision;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error(transparent)]
    Store(#[from] guild_store::StoreError),

    #[error("policy denied: {}", .0.reason.as_deref().unwrap_or("no reason"))]
    PolicyDenied(PolicyDecision),

    #[error("secret detected in {label}: {} match(es)", report.total_matches)]
    SecretDetected { label: String, report: SecretReport },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid: {0}")]
    Invalid(String),
}
