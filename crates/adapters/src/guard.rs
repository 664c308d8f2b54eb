// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscription execution policy.
//!
//! Before any real provider launch, three checks run in order: the
//! resolved binary's base name must match the allowlist for the declared
//! provider; subscription-only providers must NOT have an API key in the
//! environment and must pass a login-status probe; API-channel providers
//! must have a key present. Any failure aborts the launch with a reason.

use guild_core::{MachineConfig, Provider};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardReason {
    UnapprovedWorkerBinary,
    ApiKeyPresent,
    AuthProbeFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardOutcome {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<GuardReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl GuardOutcome {
    fn pass() -> Self {
        Self { ok: true, reason: None, detail: None }
    }

    fn fail(reason: GuardReason, detail: impl Into<String>) -> Self {
        Self { ok: false, reason: Some(reason), detail: Some(detail.into()) }
    }
}

/// Login-status probe contract.
///
/// The real probe shells out to the provider CLI; tests inject a fake.
/// `probe` returns the recognized subscription mode string, or an error
/// description when the account is not on a subscription channel.
pub trait LoginProbe: Send + Sync {
    fn probe(&self, provider: Provider, bin: &Path) -> Result<String, String>;
}

/// Probe that always reports a subscription. Useful for tests and for
/// deployments that pre-verify login out of band.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionProbe {
    pub mode: Option<String>,
}

impl LoginProbe for SubscriptionProbe {
    fn probe(&self, _provider: Provider, _bin: &Path) -> Result<String, String> {
        match &self.mode {
            Some(mode) => Ok(mode.clone()),
            None => Err("no subscription".to_string()),
        }
    }
}

/// Modes the probe recognizes in a login-status transcript.
const RECOGNIZED_MODES: [&str; 5] = ["subscription", "pro", "plus", "max", "logged in"];

/// Real probe: shells out to the provider CLI's login-status command and
/// scans for a recognized subscription mode.
#[derive(Debug, Clone, Default)]
pub struct CliLoginProbe;

impl LoginProbe for CliLoginProbe {
    fn probe(&self, provider: Provider, bin: &Path) -> Result<String, String> {
        let args: &[&str] = match provider {
            Provider::Codex | Provider::CodexAppServer => &["login", "status"],
            Provider::Claude => &["auth", "status"],
            // API-channel providers never reach the probe.
            Provider::Gemini => return Ok("api".to_string()),
        };
        let output = std::process::Command::new(bin)
            .args(args)
            .output()
            .map_err(|e| format!("login probe spawn failed: {e}"))?;
        if !output.status.success() {
            return Err(format!("login probe exited {:?}", output.status.code()));
        }
        let text = String::from_utf8_lossy(&output.stdout).to_lowercase();
        for mode in RECOGNIZED_MODES {
            if text.contains(mode) {
                return Ok(mode.to_string());
            }
        }
        Err("login status did not report a subscription mode".to_string())
    }
}

/// Resolve the provider binary from machine config, enforcing the base
/// name allowlist.
pub fn resolve_provider_bin(
    provider: Provider,
    machine: &MachineConfig,
) -> Result<PathBuf, GuardOutcome> {
    let bin = machine.provider_bins.get(&provider).cloned().ok_or_else(|| {
        GuardOutcome::fail(
            GuardReason::UnapprovedWorkerBinary,
            format!("no provider_bins entry for {provider}"),
        )
    })?;
    let base = bin.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if base != provider.expected_bin_name() {
        return Err(GuardOutcome::fail(
            GuardReason::UnapprovedWorkerBinary,
            format!("binary {base:?} does not match allowlist for {provider}"),
        ));
    }
    Ok(bin)
}

/// API-key variables per provider channel.
fn api_key_vars(provider: Provider) -> &'static [&'static str] {
    match provider {
        Provider::Codex | Provider::CodexAppServer => &["OPENAI_API_KEY"],
        Provider::Claude => &["ANTHROPIC_API_KEY"],
        Provider::Gemini => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
    }
}

fn has_vertex_triple(env: &BTreeMap<String, String>) -> bool {
    env.get("GOOGLE_GENAI_USE_VERTEXAI").map(|v| v == "true" || v == "1").unwrap_or(false)
        && env.contains_key("GOOGLE_CLOUD_PROJECT")
        && env.contains_key("GOOGLE_CLOUD_LOCATION")
}

/// Evaluate the execution policy against an explicit environment map.
pub fn check_execution_policy(
    provider: Provider,
    bin: &Path,
    env: &BTreeMap<String, String>,
    probe: &dyn LoginProbe,
) -> GuardOutcome {
    let base = bin.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if base != provider.expected_bin_name() {
        return GuardOutcome::fail(
            GuardReason::UnapprovedWorkerBinary,
            format!("binary {base:?} not allowlisted for {provider}"),
        );
    }

    if provider.is_subscription_only() {
        for var in api_key_vars(provider) {
            if env.get(*var).map(|v| !v.is_empty()).unwrap_or(false) {
                return GuardOutcome::fail(
                    GuardReason::ApiKeyPresent,
                    format!("{var} must be absent for subscription provider {provider}"),
                );
            }
        }
        match probe.probe(provider, bin) {
            Ok(mode) => {
                tracing::debug!(%provider, mode, "login probe recognized subscription");
                GuardOutcome::pass()
            }
            Err(detail) => GuardOutcome::fail(GuardReason::AuthProbeFailed, detail),
        }
    } else {
        let has_key = api_key_vars(provider)
            .iter()
            .any(|var| env.get(*var).map(|v| !v.is_empty()).unwrap_or(false));
        if has_key || has_vertex_triple(env) {
            GuardOutcome::pass()
        } else {
            GuardOutcome::fail(
                GuardReason::AuthProbeFailed,
                format!("no API key or Vertex environment for {provider}"),
            )
        }
    }
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
