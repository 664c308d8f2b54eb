// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git worktree preparation for coding milestones.
//!
//! When a task milestone is `coding` and the machine config maps its
//! `repo_id` to a repository root, the session's cwd becomes a fresh
//! worktree under the run directory. All mutations land there; the
//! source repo stays clean. Worktrees are orphaned on session end —
//! collection is an operator concern, not the runtime's.

use crate::error::RuntimeError;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedWorktree {
    pub worktree_dir: PathBuf,
    pub branch: String,
}

/// Create a worktree for `run_id` off the repo's current HEAD.
pub fn prepare_worktree(
    repo_root: &Path,
    worktree_dir: &Path,
    run_id: &str,
) -> Result<PreparedWorktree, RuntimeError> {
    if !repo_root.join(".git").exists() {
        return Err(RuntimeError::Worktree(format!(
            "{} is not a git repository",
            repo_root.display()
        )));
    }
    if let Some(parent) = worktree_dir.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| RuntimeError::Worktree(format!("create parent: {e}")))?;
    }

    let branch = format!("guild/{run_id}");
    let output = Command::new("git")
        .arg("-C")
        .arg(repo_root)
        .args(["worktree", "add", "-b", &branch])
        .arg(worktree_dir)
        .arg("HEAD")
        .output()
        .map_err(|e| RuntimeError::Worktree(format!("git spawn: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RuntimeError::Worktree(format!(
            "git worktree add failed: {}",
            stderr.trim()
        )));
    }

    tracing::info!(run_id, branch, dir = %worktree_dir.display(), "worktree prepared");
    Ok(PreparedWorktree { worktree_dir: worktree_dir.to_path_buf(), branch })
}

#[cfg(test)]
#[path = "worktree_tests.rs"]
mod tests;
