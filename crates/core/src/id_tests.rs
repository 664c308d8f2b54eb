// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn generate_has_prefix_and_fills_capacity() {
    let id = RunId::generate();
    assert!(id.as_str().starts_with("run-"));
    assert_eq!(id.as_str().len(), ID_CAPACITY);
}

#[test]
fn generate_is_unique() {
    let a = RunId::generate();
    let b = RunId::generate();
    assert_ne!(a, b);
}

#[parameterized(
    run = { RunId::PREFIX, "run-" },
    event = { EventId::PREFIX, "evt-" },
    task = { TaskId::PREFIX, "tsk-" },
    artifact = { ArtifactId::PREFIX, "art-" },
    review = { ReviewId::PREFIX, "rev-" },
)]
fn prefixes(actual: &str, expected: &str) {
    assert_eq!(actual, expected);
}

#[test]
fn from_string_round_trips() {
    let id = TaskId::from_string("tsk-abc123");
    assert_eq!(id.as_str(), "tsk-abc123");
    assert_eq!(id, "tsk-abc123");
}

#[test]
fn short_strips_prefix() {
    let id = RunId::from_string("run-abcdefgh");
    assert_eq!(id.short(4), "abcd");
    assert_eq!(id.short(100), "abcdefgh");
}

#[test]
fn serde_transparent() {
    let id = ArtifactId::from_string("art-xyz");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"art-xyz\"");
    let back: ArtifactId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn deserialize_rejects_oversize() {
    let long = format!("\"{}\"", "x".repeat(ID_CAPACITY + 1));
    assert!(serde_json::from_str::<RunId>(&long).is_err());
}

#[test]
fn idbuf_hash_matches_str() {
    use std::collections::HashMap;
    let mut map: HashMap<RunId, u32> = HashMap::new();
    map.insert(RunId::from_string("run-a"), 1);
    // Borrow<str> lookup must hit the same bucket.
    assert_eq!(map.get("run-a"), Some(&1));
}
