// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    disabled_always_false = { 0, 0, 12, false },
    inside_simple_window = { 9, 17, 12, true },
    below_simple_window = { 9, 17, 8, false },
    at_end_exclusive = { 9, 17, 17, false },
    at_start_inclusive = { 9, 17, 9, true },
    wraps_midnight_late = { 22, 7, 23, true },
    wraps_midnight_early = { 22, 7, 3, true },
    wraps_midnight_day = { 22, 7, 12, false },
)]
fn quiet_hours(start: u8, end: u8, hour: u8, expected: bool) {
    let q = QuietHours { start_hour: start, end_hour: end };
    assert_eq!(q.contains(hour), expected);
}

#[test]
fn config_defaults_are_off() {
    let cfg = HeartbeatConfig::default();
    assert!(!cfg.enabled);
    assert_eq!(cfg.min_wake_score, 5);
    assert_eq!(cfg.top_k_workers, 2);
}

#[test]
fn partial_config_yaml_fills_defaults() {
    let cfg: HeartbeatConfig = serde_yaml::from_str("enabled: true\ntop_k_workers: 5\n").unwrap();
    assert!(cfg.enabled);
    assert_eq!(cfg.top_k_workers, 5);
    assert_eq!(cfg.interval_minutes, 15);
}

#[test]
fn action_kind_tag_round_trips() {
    let action = HeartbeatAction {
        idempotency_key: "k1".to_string(),
        risk: Risk::Low,
        needs_approval: false,
        kind: HeartbeatActionKind::AddComment {
            project_id: ProjectId::from_string("prj-1"),
            task_id: None,
            body: "looks stuck".to_string(),
        },
    };
    let json = serde_json::to_value(&action).unwrap();
    assert_eq!(json["kind"], "add_comment");
    let back: HeartbeatAction = serde_json::from_value(json).unwrap();
    assert_eq!(back, action);
}

#[test]
fn risk_orders_low_to_high() {
    assert!(Risk::Low < Risk::Medium);
    assert!(Risk::Medium < Risk::High);
}

#[test]
fn state_round_trips_through_yaml() {
    let mut state = HeartbeatState::default();
    state.run_event_cursors.insert("prj-1::run-1".to_string(), 17);
    state.idempotency.insert(
        "k1".to_string(),
        IdempotencyRecord {
            first_seen_at: "2026-01-05T00:00:00Z".to_string(),
            last_seen_at: "2026-01-05T00:00:00Z".to_string(),
            expires_at: "2026-01-06T00:00:00Z".to_string(),
            status: IdempotencyStatus::Executed,
            execution_count: 1,
        },
    );
    let yaml = serde_yaml::to_string(&state).unwrap();
    let back: HeartbeatState = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(back, state);
}
