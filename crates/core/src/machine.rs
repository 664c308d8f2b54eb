// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Machine-local configuration (`.local/machine.yaml`).
//!
//! Everything here is host-specific and never synced: provider binary
//! paths, repository roots for worktree isolation, and the pricing card.

use crate::provider::Provider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// USD per 1000 tokens for one provider. Missing rates leave cost null.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderPricing {
    pub input: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_input: Option<f64>,
    pub output: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_output: Option<f64>,
}

impl ProviderPricing {
    /// Cost of a run given input/output token counts. Config-only; no
    /// network involved.
    pub fn cost_usd(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / 1000.0) * self.input + (output_tokens as f64 / 1000.0) * self.output
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Provider → absolute binary path.
    #[serde(default)]
    pub provider_bins: BTreeMap<Provider, PathBuf>,
    /// Repo id → absolute path, for worktree isolation.
    #[serde(default)]
    pub repo_roots: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub provider_pricing_usd_per_1k_tokens: BTreeMap<Provider, ProviderPricing>,
}

impl MachineConfig {
    pub fn pricing_for(&self, provider: Provider) -> Option<&ProviderPricing> {
        self.provider_pricing_usd_per_1k_tokens.get(&provider)
    }
}

#[cfg(test)]
#[path = "machine_tests.rs"]
mod tests;
