// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Usage extraction from provider output.
//!
//! A pure function over output lines. Providers disagree on shape, so
//! every known shape is tried per line; when several usage lines appear
//! in one run (streaming totals), the figures with the highest total win.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UsageFigures {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

/// Try the known usage shapes on one JSON value.
fn figures_from_value(value: &Value) -> Option<UsageFigures> {
    // Shape 1: tokenUsage { input_tokens, output_tokens,
    // cached_input_tokens?, reasoning_output_tokens?, total_tokens? }
    if let Some(tu) = find_key(value, "tokenUsage") {
        let input = tu.get("input_tokens").and_then(Value::as_u64).unwrap_or(0)
            + tu.get("cached_input_tokens").and_then(Value::as_u64).unwrap_or(0);
        let output = tu.get("output_tokens").and_then(Value::as_u64).unwrap_or(0)
            + tu.get("reasoning_output_tokens").and_then(Value::as_u64).unwrap_or(0);
        let total = tu.get("total_tokens").and_then(Value::as_u64).unwrap_or(input + output);
        if total > 0 {
            return Some(UsageFigures { input_tokens: input, output_tokens: output, total_tokens: total });
        }
    }

    // Shape 2: usage { prompt_tokens, completion_tokens, total_tokens }
    // or usage { input_tokens, output_tokens } (Anthropic style).
    if let Some(usage) = find_key(value, "usage") {
        let input = usage
            .get("prompt_tokens")
            .or_else(|| usage.get("input_tokens"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let output = usage
            .get("completion_tokens")
            .or_else(|| usage.get("output_tokens"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let total = usage.get("total_tokens").and_then(Value::as_u64).unwrap_or(input + output);
        if total > 0 {
            return Some(UsageFigures { input_tokens: input, output_tokens: output, total_tokens: total });
        }
    }

    None
}

/// Depth-limited search for an object-valued key.
fn find_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            if let Some(found) = map.get(key) {
                if found.is_object() {
                    return Some(found);
                }
            }
            for child in map.values() {
                if child.is_object() {
                    if let Some(found) = find_key(child, key) {
                        return Some(found);
                    }
                }
            }
            None
        }
        _ => None,
    }
}

/// Scan output lines for usage figures, keeping the highest total seen.
pub fn extract_usage_figures<'a, I>(lines: I) -> Option<UsageFigures>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<UsageFigures> = None;
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || !trimmed.starts_with('{') {
            continue;
        }
        let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
            continue;
        };
        if let Some(figures) = figures_from_value(&value) {
            let better = best.map_or(true, |b| figures.total_tokens > b.total_tokens);
            if better {
                best = Some(figures);
            }
        }
    }
    best
}

#[cfg(test)]
#[path = "usage_tests.rs"]
mod tests;
