// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic file writes.
//!
//! Every state file in the workspace goes through [`atomic_write`]: the
//! bytes land in a `.tmp-<pid>` sibling first, then rename into place.
//! Readers therefore never observe a half-written file. Run logs are the
//! one exception — they are append-only and owned by the event log.

use crate::error::StoreError;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Create a directory and all parents.
pub fn ensure_dir(path: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(path).map_err(|e| StoreError::io(path, e))
}

/// Write `bytes` to `path` atomically (tmp sibling + rename).
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let parent = path
        .parent()
        .ok_or_else(|| StoreError::Invalid(format!("no parent directory: {}", path.display())))?;
    ensure_dir(parent)?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StoreError::Invalid(format!("bad file name: {}", path.display())))?;
    let tmp = parent.join(format!(".tmp-{}-{}", std::process::id(), file_name));

    let result = (|| -> std::io::Result<()> {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(e) = result {
        // Leave no tmp litter behind on failure.
        let _ = fs::remove_file(&tmp);
        return Err(StoreError::io(path, e));
    }
    Ok(())
}

#[cfg(test)]
#[path = "atomic_tests.rs"]
mod tests;
