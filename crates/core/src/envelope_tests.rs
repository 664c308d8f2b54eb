// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn sample() -> EventEnvelope {
    let mut env = EventEnvelope::new(
        RunId::from_string("run-test1"),
        "ses-1",
        "agt-worker1",
        "run.started",
        json!({"argv": ["claude", "-p"]}),
    );
    env.ts_wallclock = "2026-01-05T10:00:00Z".to_string();
    env.ts_monotonic_ms = 42;
    env
}

#[test]
fn hash_is_deterministic() {
    let env = sample();
    let value = serde_json::to_value(&env).unwrap();
    assert_eq!(canonical_event_hash(&value), canonical_event_hash(&value));
}

#[test]
fn hash_ignores_existing_event_hash_key() {
    let env = sample();
    let without = serde_json::to_value(&env).unwrap();
    let mut with = without.clone();
    with.as_object_mut()
        .unwrap()
        .insert("event_hash".into(), json!("deadbeef"));
    assert_eq!(canonical_event_hash(&without), canonical_event_hash(&with));
}

#[test]
fn hash_covers_unknown_keys() {
    let env = sample();
    let plain = serde_json::to_value(&env).unwrap();
    let mut extended = plain.clone();
    extended.as_object_mut().unwrap().insert("x_vendor".into(), json!(1));
    assert_ne!(canonical_event_hash(&plain), canonical_event_hash(&extended));
}

#[test]
fn round_trip_preserves_hash() {
    // Serialize → parse → re-hash must agree, since serde_json orders map
    // keys canonically.
    let env = sample();
    let mut value = serde_json::to_value(&env).unwrap();
    let hash = canonical_event_hash(&value);
    value.as_object_mut().unwrap().insert("event_hash".into(), json!(hash.clone()));

    let line = value.to_string();
    let reparsed: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(canonical_event_hash(&reparsed), hash);
}

#[test]
fn unknown_envelope_keys_survive_envelope_parse() {
    let line = r#"{"schema_version":1,"event_id":"evt-1","ts_wallclock":"t","ts_monotonic_ms":1,"run_id":"run-1","session_ref":"s","correlation_id":"c","actor":"a","visibility":"org","type":"run.started","payload":{},"prev_event_hash":null,"future_field":true}"#;
    let env: EventEnvelope = serde_json::from_str(line).unwrap();
    assert_eq!(env.event_type, "run.started");
}

#[test]
fn correlation_defaults_to_run_id() {
    let env = sample();
    assert_eq!(env.correlation_id, env.run_id.to_string());
}
