// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret redaction gate.
//!
//! `detect` is a pure pattern scan; `assert_no_sensitive_text` turns any
//! match into a hard error the caller must not persist past. The
//! `redact_*` helpers produce sanitized copies for share bundles, where
//! the content still ships but with secrets masked.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const MASK: &str = "[REDACTED]";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretMatch {
    pub kind: &'static str,
    pub start: usize,
    pub end: usize,
}

/// Aggregate match report carried on the error and over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretReport {
    pub total_matches: usize,
    pub matches_by_kind: BTreeMap<String, usize>,
}

fn patterns() -> &'static [(&'static str, Regex)] {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        // Each pattern compiles or the process is unusable, so failures
        // collapse to a never-matching placeholder.
        let compile = |p: &str| Regex::new(p).unwrap_or_else(|_| never_match());
        vec![
            ("provider_api_key", compile(r"sk-[A-Za-z0-9_-]{16,}")),
            ("aws_access_key", compile(r"\bAKIA[0-9A-Z]{16}\b")),
            ("github_token", compile(r"\bgh[pousr]_[A-Za-z0-9]{30,}\b")),
            ("bearer_token", compile(r"(?i)\bbearer\s+[A-Za-z0-9._~+/=-]{20,}")),
            ("private_key_block", compile(r"-----BEGIN [A-Z ]*PRIVATE KEY-----")),
            (
                "credential_assignment",
                compile(r#"(?i)\b(api_key|apikey|secret|token|password)\b\s*[:=]\s*['"]?[A-Za-z0-9_/+-]{16,}"#),
            ),
        ]
    })
}

fn never_match() -> Regex {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\z\A").unwrap()
}

/// Scan text for secret-shaped spans.
pub fn detect(text: &str) -> Vec<SecretMatch> {
    let mut matches = Vec::new();
    for (kind, regex) in patterns() {
        for found in regex.find_iter(text) {
            matches.push(SecretMatch { kind, start: found.start(), end: found.end() });
        }
    }
    matches.sort_by_key(|m| m.start);
    matches
}

/// Gate a governed write. `label` names the field for the error message.
pub fn assert_no_sensitive_text(
    text: &str,
    label: &str,
) -> Result<(), crate::error::GovernanceError> {
    let matches = detect(text);
    if matches.is_empty() {
        return Ok(());
    }
    let mut by_kind: BTreeMap<String, usize> = BTreeMap::new();
    for m in &matches {
        *by_kind.entry(m.kind.to_string()).or_default() += 1;
    }
    tracing::warn!(label, total = matches.len(), "secret detected; write aborted");
    Err(crate::error::GovernanceError::SecretDetected {
        label: label.to_string(),
        report: SecretReport { total_matches: matches.len(), matches_by_kind: by_kind },
    })
}

/// Sanitized copy with every match replaced by the mask.
pub fn redact_sensitive_text(text: &str) -> String {
    let matches = detect(text);
    if matches.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for m in matches {
        if m.start < cursor {
            continue;
        }
        out.push_str(&text[cursor..m.start]);
        out.push_str(MASK);
        cursor = m.end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Recursively redact every string in a JSON value.
pub fn redact_json_value(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::String(s) => serde_json::Value::String(redact_sensitive_text(s)),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(redact_json_value).collect())
        }
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter().map(|(k, v)| (k.clone(), redact_json_value(v))).collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
#[path = "redact_tests.rs"]
mod tests;
