// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claude stream-JSON collection.
//!
//! `claude -p --output-format stream-json` emits one JSON object per
//! line. The final assistant text is taken from the `result` message when
//! one appears; otherwise the concatenated assistant deltas stand in.

use serde_json::Value;

#[derive(Debug, Default)]
pub struct StreamJsonCollector {
    result_text: Option<String>,
    deltas: String,
}

impl StreamJsonCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one stdout line. Non-JSON lines are ignored.
    pub fn feed_line(&mut self, line: &str) {
        let trimmed = line.trim();
        if !trimmed.starts_with('{') {
            return;
        }
        let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
            return;
        };

        match value.get("type").and_then(Value::as_str) {
            Some("result") => {
                if let Some(text) = value.get("result").and_then(Value::as_str) {
                    self.result_text = Some(text.to_string());
                }
            }
            Some("assistant") => {
                // message.content[] text blocks
                if let Some(content) =
                    value.pointer("/message/content").and_then(Value::as_array)
                {
                    for block in content {
                        if block.get("type").and_then(Value::as_str) == Some("text") {
                            if let Some(text) = block.get("text").and_then(Value::as_str) {
                                self.deltas.push_str(text);
                            }
                        }
                    }
                }
            }
            Some("content_block_delta") => {
                if let Some(text) = value.pointer("/delta/text").and_then(Value::as_str) {
                    self.deltas.push_str(text);
                }
            }
            _ => {}
        }
    }

    /// The final assistant text, if any content was seen.
    pub fn final_text(&self) -> Option<String> {
        if let Some(result) = &self.result_text {
            return Some(result.clone());
        }
        if self.deltas.is_empty() {
            None
        } else {
            Some(self.deltas.clone())
        }
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
