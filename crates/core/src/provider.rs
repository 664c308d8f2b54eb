// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The official provider allowlist.

use serde::{Deserialize, Serialize};

/// A worker CLI provider the control plane knows how to launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Codex,
    CodexAppServer,
    Claude,
    Gemini,
}

impl Provider {
    pub const ALL: [Provider; 4] =
        [Provider::Codex, Provider::CodexAppServer, Provider::Claude, Provider::Gemini];

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Codex => "codex",
            Provider::CodexAppServer => "codex_app_server",
            Provider::Claude => "claude",
            Provider::Gemini => "gemini",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "codex" => Some(Provider::Codex),
            "codex_app_server" => Some(Provider::CodexAppServer),
            "claude" => Some(Provider::Claude),
            "gemini" => Some(Provider::Gemini),
            _ => None,
        }
    }

    /// Expected base name of the provider binary.
    pub fn expected_bin_name(self) -> &'static str {
        match self {
            Provider::Codex | Provider::CodexAppServer => "codex",
            Provider::Claude => "claude",
            Provider::Gemini => "gemini",
        }
    }

    /// Subscription-channel providers must NOT carry an API key in the
    /// environment; API-channel providers must.
    pub fn is_subscription_only(self) -> bool {
        matches!(self, Provider::Codex | Provider::CodexAppServer | Provider::Claude)
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
