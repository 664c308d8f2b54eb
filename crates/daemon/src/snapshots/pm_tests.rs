// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn task(task_id: &str, duration: f64, depends_on: &[&str]) -> TaskRow {
    TaskRow {
        task_id: task_id.to_string(),
        project_id: "prj-1".to_string(),
        title: Some(task_id.to_string()),
        status: Some("ready".to_string()),
        assignee_agent_id: None,
        planned_start: None,
        planned_end: None,
        duration_days: Some(duration),
        depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
    }
}

fn bar<'a>(gantt: &'a Gantt, task_id: &str) -> &'a GanttBar {
    gantt.bars.iter().find(|b| b.task_id == task_id).unwrap()
}

#[test]
fn linear_chain_is_all_critical() {
    let tasks =
        vec![task("a", 2.0, &[]), task("b", 3.0, &["a"]), task("c", 1.0, &["b"])];
    let gantt = compute_gantt(&tasks);

    assert_eq!(gantt.cpm_status, CpmStatus::Ok);
    assert_eq!(gantt.span_days, 6.0);
    assert_eq!(bar(&gantt, "b").earliest_start, 2.0);
    assert_eq!(bar(&gantt, "c").earliest_finish, 6.0);
    assert!(gantt.bars.iter().all(|b| b.critical));
}

#[test]
fn slack_branch_is_not_critical() {
    // a(4) → c(1); b(1) → c. b has 3 days of slack.
    let tasks =
        vec![task("a", 4.0, &[]), task("b", 1.0, &[]), task("c", 1.0, &["a", "b"])];
    let gantt = compute_gantt(&tasks);

    assert!(bar(&gantt, "a").critical);
    assert!(!bar(&gantt, "b").critical);
    assert!(bar(&gantt, "c").critical);
    assert_eq!(bar(&gantt, "b").latest_start, 3.0);
}

#[test]
fn self_reference_is_ignored() {
    let tasks = vec![task("a", 1.0, &["a"])];
    let gantt = compute_gantt(&tasks);
    assert_eq!(gantt.cpm_status, CpmStatus::Ok);
    assert_eq!(gantt.span_days, 1.0);
}

#[test]
fn edge_to_missing_task_is_dropped() {
    let tasks = vec![task("a", 1.0, &["ghost"]), task("b", 1.0, &["a"])];
    let gantt = compute_gantt(&tasks);
    assert_eq!(gantt.cpm_status, CpmStatus::Ok);
    assert_eq!(bar(&gantt, "a").earliest_start, 0.0);
    assert_eq!(bar(&gantt, "b").earliest_start, 1.0);
}

#[test]
fn cycle_reports_and_still_emits_bars_in_input_order() {
    let tasks = vec![task("a", 1.0, &["b"]), task("b", 1.0, &["a"]), task("c", 1.0, &[])];
    let gantt = compute_gantt(&tasks);

    assert_eq!(gantt.cpm_status, CpmStatus::DependencyCycle);
    let ids: Vec<&str> = gantt.bars.iter().map(|b| b.task_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert!(gantt.bars.iter().all(|b| !b.critical));
}

#[test]
fn duration_falls_back_to_planned_dates_then_one() {
    let mut dated = task("a", 0.0, &[]);
    dated.duration_days = None;
    dated.planned_start = Some("2026-01-05".to_string());
    dated.planned_end = Some("2026-01-08".to_string());
    assert_eq!(duration_of(&dated), 3.0);

    let mut bare = task("b", 0.0, &[]);
    bare.duration_days = None;
    assert_eq!(duration_of(&bare), 1.0);
}

#[test]
fn empty_project_has_empty_gantt() {
    let gantt = compute_gantt(&[]);
    assert_eq!(gantt.span_days, 0.0);
    assert!(gantt.bars.is_empty());
}
