// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn running_run() -> Run {
    Run {
        run_id: RunId::from_string("run-1"),
        project_id: ProjectId::from_string("prj-1"),
        agent_id: AgentId::from_string("agt-1"),
        provider: Provider::Claude,
        model: None,
        created_at: "2026-01-05T10:00:00Z".to_string(),
        status: RunStatus::Running,
        spec: RunSpec::default(),
        usage: None,
    }
}

#[parameterized(
    ended = { RunStatus::Ended },
    failed = { RunStatus::Failed },
    stopped = { RunStatus::Stopped },
)]
fn running_transitions_to_terminal(next: RunStatus) {
    let mut run = running_run();
    assert!(run.transition(next));
    assert_eq!(run.status, next);
}

#[test]
fn terminal_states_are_sticky() {
    let mut run = running_run();
    run.transition(RunStatus::Ended);
    assert!(!run.transition(RunStatus::Running));
    assert!(!run.transition(RunStatus::Failed));
    assert_eq!(run.status, RunStatus::Ended);
}

#[test]
fn stop_preempts_default_terminal() {
    // A stop that races the child's exit wins over ended/failed.
    let mut run = running_run();
    run.transition(RunStatus::Ended);
    assert!(run.transition(RunStatus::Stopped));
    assert_eq!(run.status, RunStatus::Stopped);
}

#[test]
fn self_transition_is_a_no_op() {
    let mut run = running_run();
    assert!(run.transition(RunStatus::Running));
    assert_eq!(run.status, RunStatus::Running);
}

#[test]
fn estimate_floors_at_one_token() {
    let usage = Usage::estimate_from_chars(0, 0);
    assert_eq!(usage.total_tokens, 1);
    assert_eq!(usage.source, UsageSource::EstimatedChars);
    assert_eq!(usage.confidence, UsageConfidence::Low);
}

#[test]
fn estimate_divides_by_four() {
    let usage = Usage::estimate_from_chars(1000, 200);
    assert_eq!(usage.output_tokens, 300);
    assert_eq!(usage.total_tokens, 300);
}

#[test]
fn run_yaml_round_trip() {
    let run = running_run();
    let yaml = serde_yaml::to_string(&run).unwrap();
    let back: Run = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(back, run);
}
