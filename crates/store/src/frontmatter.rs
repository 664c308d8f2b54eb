// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Markdown-with-frontmatter codec.
//!
//! The on-disk format is `---\n<YAML>\n---\n<body>`. The frontmatter
//! block must be the first bytes of the file; a missing or unterminated
//! fence is a classified error, never a silent empty header.

use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Split a document into (yaml, body). The body keeps its own leading
/// newlines trimmed to at most one blank line.
pub fn split_frontmatter(text: &str) -> Result<(&str, &str), String> {
    let rest = text
        .strip_prefix("---\n")
        .ok_or_else(|| "missing frontmatter open fence".to_string())?;
    let end = rest
        .find("\n---\n")
        .ok_or_else(|| "missing frontmatter close fence".to_string())?;
    let yaml = &rest[..end];
    let body = &rest[end + 5..];
    Ok((yaml, body))
}

/// Parse a document's frontmatter into `T`, returning the body alongside.
pub fn parse_frontmatter<T: DeserializeOwned>(
    path: &Path,
    text: &str,
) -> Result<(T, String), StoreError> {
    let (yaml, body) = split_frontmatter(text)
        .map_err(|message| StoreError::Frontmatter { path: path.to_path_buf(), message })?;
    let header: T = serde_yaml::from_str(yaml)
        .map_err(|e| StoreError::Frontmatter { path: path.to_path_buf(), message: e.to_string() })?;
    Ok((header, body.to_string()))
}

/// Render a header + body back into the on-disk format.
pub fn render_frontmatter<T: Serialize>(header: &T, body: &str) -> Result<String, StoreError> {
    let yaml = serde_yaml::to_string(header)
        .map_err(|e| StoreError::Invalid(format!("frontmatter serialize: {e}")))?;
    let mut out = String::with_capacity(yaml.len() + body.len() + 16);
    out.push_str("---\n");
    out.push_str(&yaml);
    if !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("---\n");
    out.push_str(body);
    if !body.is_empty() && !body.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
#[path = "frontmatter_tests.rs"]
mod tests;
