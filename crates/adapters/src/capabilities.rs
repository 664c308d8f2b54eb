// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static capability records per provider.

use guild_core::Provider;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorktreeSupport {
    Unsupported,
    Recommended,
    Required,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub supports_streaming_events: bool,
    pub supports_resumable_session: bool,
    pub supports_structured_output: bool,
    pub supports_token_usage: bool,
    pub supports_patch_export: bool,
    pub supports_interactive_approval_callbacks: bool,
    pub supports_worktree_isolation: WorktreeSupport,
}

/// What each allowlisted provider can do.
pub fn provider_capabilities(provider: Provider) -> Capabilities {
    match provider {
        Provider::Claude => Capabilities {
            supports_streaming_events: true,
            supports_resumable_session: true,
            supports_structured_output: true,
            supports_token_usage: true,
            supports_patch_export: true,
            supports_interactive_approval_callbacks: false,
            supports_worktree_isolation: WorktreeSupport::Recommended,
        },
        Provider::Codex => Capabilities {
            supports_streaming_events: true,
            supports_resumable_session: false,
            supports_structured_output: true,
            supports_token_usage: true,
            supports_patch_export: true,
            supports_interactive_approval_callbacks: false,
            supports_worktree_isolation: WorktreeSupport::Recommended,
        },
        Provider::CodexAppServer => Capabilities {
            supports_streaming_events: true,
            supports_resumable_session: true,
            supports_structured_output: true,
            supports_token_usage: true,
            supports_patch_export: true,
            supports_interactive_approval_callbacks: true,
            supports_worktree_isolation: WorktreeSupport::Required,
        },
        Provider::Gemini => Capabilities {
            supports_streaming_events: false,
            supports_resumable_session: false,
            supports_structured_output: false,
            supports_token_usage: true,
            supports_patch_export: false,
            supports_interactive_approval_callbacks: false,
            supports_worktree_isolation: WorktreeSupport::Unsupported,
        },
    }
}
