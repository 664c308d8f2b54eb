// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment knobs for the daemon. Everything has a default; nothing
//! here affects core semantics.

use guild_engine::LaneLimits;

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Launch-lane limits, overridable per deployment.
pub fn lane_limits() -> LaneLimits {
    LaneLimits {
        workspace_limit: env_usize("GUILD_WORKSPACE_LAUNCH_LIMIT", 4),
        provider_limit: env_usize("GUILD_PROVIDER_LAUNCH_LIMIT", 2),
    }
}

/// Sync-worker debounce window in ms.
pub fn sync_debounce_ms() -> u64 {
    env_u64("GUILD_INDEX_DEBOUNCE_MS", 200)
}

/// Minimum interval between successive syncs of one workspace.
pub fn sync_min_interval_ms() -> u64 {
    env_u64("GUILD_INDEX_MIN_INTERVAL_MS", 500)
}
