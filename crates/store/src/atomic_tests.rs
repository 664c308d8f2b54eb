// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn writes_bytes_and_creates_parents() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a/b/c.yaml");

    atomic_write(&path, b"hello: world\n").unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "hello: world\n");
}

#[test]
fn replaces_existing_content() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("file.txt");

    atomic_write(&path, b"one").unwrap();
    atomic_write(&path, b"two").unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "two");
}

#[test]
fn leaves_no_tmp_files() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("file.txt");

    atomic_write(&path, b"data").unwrap();

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["file.txt".to_string()]);
}
