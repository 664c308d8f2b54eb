// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HeartbeatError {
    #[error(transparent)]
    Store(#[from] guild_store::StoreError),

    #[error(transparent)]
    Governance(#[from] guild_governance::GovernanceError),

    #[error("invalid: {0}")]
    Invalid(String),
}
