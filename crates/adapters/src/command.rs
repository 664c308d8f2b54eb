// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure per-provider command builders.
//!
//! Given a binary, a prompt, and an outputs directory, each builder
//! returns the argv/env/stdin to launch plus where the final assistant
//! text will land. No filesystem or process access happens here.

use guild_core::Provider;
use std::path::PathBuf;

/// Parser tag for Claude's `--output-format stream-json` lines.
pub const CLAUDE_STREAM_JSON: &str = "claude_stream_json";

#[derive(Debug, Clone, PartialEq)]
pub struct BuildCommandInput {
    pub bin: PathBuf,
    pub prompt: String,
    pub model: Option<String>,
    pub outputs_dir_abs: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuiltCommand {
    pub argv: Vec<String>,
    pub env: Vec<(String, String)>,
    pub stdin_text: Option<String>,
    pub final_text_file_abs: Option<PathBuf>,
    pub final_text_parser: Option<String>,
}

/// Build the launch command for one provider.
pub fn build_command(provider: Provider, input: &BuildCommandInput) -> BuiltCommand {
    let bin = input.bin.display().to_string();
    match provider {
        Provider::Claude => {
            let mut argv = vec![
                bin,
                "-p".to_string(),
                input.prompt.clone(),
                "--output-format".to_string(),
                "stream-json".to_string(),
                "--verbose".to_string(),
            ];
            if let Some(model) = &input.model {
                argv.push("--model".to_string());
                argv.push(model.clone());
            }
            BuiltCommand {
                argv,
                env: Vec::new(),
                stdin_text: None,
                final_text_file_abs: Some(input.outputs_dir_abs.join("last_message.md")),
                final_text_parser: Some(CLAUDE_STREAM_JSON.to_string()),
            }
        }
        Provider::Codex => {
            let mut argv = vec![bin, "exec".to_string(), "--json".to_string()];
            if let Some(model) = &input.model {
                argv.push("-m".to_string());
                argv.push(model.clone());
            }
            argv.push(input.prompt.clone());
            BuiltCommand {
                argv,
                env: Vec::new(),
                stdin_text: None,
                final_text_file_abs: Some(input.outputs_dir_abs.join("last_message.md")),
                final_text_parser: None,
            }
        }
        Provider::CodexAppServer => {
            // The app-server speaks JSON on stdin; the prompt is the first
            // message rather than an argv element.
            BuiltCommand {
                argv: vec![bin, "app-server".to_string()],
                env: Vec::new(),
                stdin_text: Some(input.prompt.clone()),
                final_text_file_abs: Some(input.outputs_dir_abs.join("last_message.md")),
                final_text_parser: None,
            }
        }
        Provider::Gemini => {
            let mut argv = vec![bin, "-p".to_string(), input.prompt.clone()];
            if let Some(model) = &input.model {
                argv.push("-m".to_string());
                argv.push(model.clone());
            }
            BuiltCommand {
                argv,
                env: Vec::new(),
                stdin_text: None,
                final_text_file_abs: Some(input.outputs_dir_abs.join("last_message.md")),
                final_text_parser: None,
            }
        }
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
