// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn missing_file_reads_empty() {
    let dir = tempdir().unwrap();
    let lines = read_events_jsonl(&dir.path().join("absent.jsonl")).unwrap();
    assert!(lines.is_empty());
}

#[test]
fn malformed_lines_are_errors_not_aborts() {
    let content = b"{\"a\":1}\nnot json at all\n{\"b\":2}\n";
    let lines = parse_complete_lines(content);

    assert_eq!(lines.len(), 3);
    assert!(matches!(&lines[0], EventLine::Ok { seq: 1, .. }));
    match &lines[1] {
        EventLine::Err { seq, raw_line, .. } => {
            assert_eq!(*seq, 2);
            assert_eq!(raw_line, "not json at all");
        }
        other => panic!("expected Err line, got {other:?}"),
    }
    assert!(matches!(&lines[2], EventLine::Ok { seq: 3, .. }));
}

#[test]
fn non_object_json_is_an_error_line() {
    let lines = parse_complete_lines(b"[1,2,3]\n");
    assert!(matches!(&lines[0], EventLine::Err { .. }));
}

#[test]
fn trailing_partial_line_is_invisible() {
    let content = b"{\"a\":1}\n{\"torn\":";
    let lines = parse_complete_lines(content);
    assert_eq!(lines.len(), 1);
}

#[test]
fn empty_lines_are_skipped_without_seq() {
    let content = b"{\"a\":1}\n\n{\"b\":2}\n";
    let lines = parse_complete_lines(content);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1].seq(), 2);
}

#[test]
fn binary_garbage_is_an_error_line() {
    let content = b"\x80\x81\xff\n{\"ok\":1}\n";
    let lines = parse_complete_lines(content);
    assert_eq!(lines.len(), 2);
    assert!(matches!(&lines[0], EventLine::Err { .. }));
    assert!(matches!(&lines[1], EventLine::Ok { .. }));
}
