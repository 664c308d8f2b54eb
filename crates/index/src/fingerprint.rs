// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content fingerprints.
//!
//! A row is stale when its source file's fingerprint (size + mtime +
//! sha256) changed. The sha guards against same-size same-mtime rewrites,
//! which atomic rename can produce on coarse filesystems.

use sha2::{Digest, Sha256};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub size: u64,
    pub mtime_ms: u64,
    pub sha256: String,
}

impl Fingerprint {
    /// Fingerprint a file; `None` when it does not exist.
    pub fn of(path: &Path) -> Option<Self> {
        let meta = std::fs::metadata(path).ok()?;
        let bytes = std::fs::read(path).ok()?;
        let mtime_ms = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Some(Self { size: meta.len(), mtime_ms, sha256: format!("{:x}", hasher.finalize()) })
    }

    pub fn encode(&self) -> String {
        format!("{}:{}:{}", self.size, self.mtime_ms, self.sha256)
    }
}

#[cfg(test)]
#[path = "fingerprint_tests.rs"]
mod tests;
