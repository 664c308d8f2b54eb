// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn missing_file_has_no_fingerprint() {
    let dir = tempdir().unwrap();
    assert!(Fingerprint::of(&dir.path().join("absent")).is_none());
}

#[test]
fn content_change_changes_fingerprint() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("f.yaml");
    std::fs::write(&path, "one").unwrap();
    let first = Fingerprint::of(&path).unwrap();
    std::fs::write(&path, "two").unwrap();
    let second = Fingerprint::of(&path).unwrap();
    assert_ne!(first.sha256, second.sha256);
}

#[test]
fn unchanged_file_is_stable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("f.yaml");
    std::fs::write(&path, "same").unwrap();
    assert_eq!(Fingerprint::of(&path), Fingerprint::of(&path));
}

#[test]
fn encode_is_composite() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("f.yaml");
    std::fs::write(&path, "x").unwrap();
    let fp = Fingerprint::of(&path).unwrap();
    let encoded = fp.encode();
    assert!(encoded.contains(&fp.sha256));
    assert!(encoded.starts_with("1:"));
}
