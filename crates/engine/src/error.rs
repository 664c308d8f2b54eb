// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Store(#[from] guild_store::StoreError),

    #[error("spawn failed: {0}")]
    Spawn(String),

    #[error("session not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("launch blocked by execution policy: {0}")]
    Guard(String),

    #[error("worktree preparation failed: {0}")]
    Worktree(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
