// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn init_repo(dir: &Path) {
    let run = |args: &[&str]| {
        let status = Command::new("git").arg("-C").arg(dir).args(args).status().unwrap();
        assert!(status.success(), "git {args:?} failed");
    };
    run(&["init", "-q"]);
    run(&["config", "user.email", "test@example.com"]);
    run(&["config", "user.name", "Test"]);
    std::fs::write(dir.join("README.md"), "seed\n").unwrap();
    run(&["add", "."]);
    run(&["commit", "-q", "-m", "seed"]);
}

#[test]
fn prepares_worktree_and_leaves_repo_clean() {
    let repo = tempdir().unwrap();
    init_repo(repo.path());
    let runs = tempdir().unwrap();
    let worktree_dir = runs.path().join("run-1/worktree");

    let prepared = prepare_worktree(repo.path(), &worktree_dir, "run-1").unwrap();

    assert_eq!(prepared.branch, "guild/run-1");
    assert!(worktree_dir.join("README.md").exists());

    // Mutations in the worktree do not dirty the source repo.
    std::fs::write(worktree_dir.join("new.txt"), "change\n").unwrap();
    let status = Command::new("git")
        .arg("-C")
        .arg(repo.path())
        .args(["status", "--porcelain"])
        .output()
        .unwrap();
    assert!(String::from_utf8_lossy(&status.stdout).trim().is_empty());
}

#[test]
fn non_repo_is_rejected() {
    let not_repo = tempdir().unwrap();
    let target = tempdir().unwrap();
    let err = prepare_worktree(not_repo.path(), &target.path().join("wt"), "run-1").unwrap_err();
    assert!(matches!(err, RuntimeError::Worktree(_)));
}
