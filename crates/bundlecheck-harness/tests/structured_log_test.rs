//! Integration test: structured event log contract
//!
//! Validates that:
//! 1. LogEmitter writes JSONL that `validate_log_file` accepts.
//! 2. A full audit run emits one event per diagnostic plus summaries.
//! 3. The validator catches schema violations with line numbers.
//!
//! Run: cargo test -p bundlecheck-harness --test structured_log_test

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use bundlecheck_harness::AuditRunner;
use bundlecheck_harness::artifacts::write_events;
use bundlecheck_harness::structured_log::{
    LogEmitter, LogEntry, LogLevel, Outcome, validate_log_file, validate_log_line,
};

fn unique_tmp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after UNIX_EPOCH")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}-{}-{nanos}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

#[test]
fn emitter_writes_valid_jsonl_file() {
    let dir = unique_tmp_dir("bundlecheck-log-emit");
    let path = dir.join("events.jsonl");

    let mut emitter = LogEmitter::to_file(&path, "emit-1").unwrap();
    emitter.emit(LogLevel::Info, "run_start").unwrap();
    emitter
        .emit_entry(
            LogEntry::new("", LogLevel::Error, "record_violation")
                .with_kthread(3)
                .with_entry(12, 0)
                .with_outcome(Outcome::Fail)
                .with_violation("record.used_exceeds_size", "used (5) > size (4)"),
        )
        .unwrap();
    emitter
        .emit_entry(
            LogEntry::new("", LogLevel::Info, "owner_summary")
                .with_kthread(3)
                .with_outcome(Outcome::Pass),
        )
        .unwrap();
    emitter.flush().unwrap();

    let (lines, errors) = validate_log_file(&path).unwrap();
    assert_eq!(lines, 3);
    assert!(errors.is_empty(), "{errors:?}");

    let content = std::fs::read_to_string(&path).unwrap();
    let first: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
    assert_eq!(first["trace_id"], "bundlecheck::emit-1::001");
    assert_eq!(first["run_id"], "emit-1");
}

#[test]
fn audit_run_events_match_report() {
    let dir = unique_tmp_dir("bundlecheck-log-run");
    let path = dir.join("events.jsonl");
    let input = "\
[LAME][BUNDLE][kthread:1][size:2][used:3][bundle:<0x1,0x2]
[LAME][BUNDLE][kthread:1][size:2][used:1][bundle:<0x1,(nil)]
[LAME][BUNDLE][kthread:5][size:2][used:0][bundle:<(nil),(nil)]
[LAME][BUNDLE][kthread:5][size:oops][used:0]
";
    let run = AuditRunner::new("run-events")
        .run(input.as_bytes(), "mem")
        .unwrap();
    write_events(&path, &run).unwrap();

    let (count, errors) = validate_log_file(&path).unwrap();
    assert!(errors.is_empty(), "{errors:?}");

    let content = std::fs::read_to_string(&path).unwrap();
    let entries: Vec<LogEntry> = content
        .lines()
        .enumerate()
        .map(|(i, line)| validate_log_line(line, i + 1).unwrap())
        .collect();
    assert_eq!(entries.len(), count);

    let events: Vec<&str> = entries.iter().map(|e| e.event.as_str()).collect();
    assert_eq!(events.first(), Some(&"run_start"));
    assert_eq!(events.last(), Some(&"run_summary"));
    assert_eq!(events.iter().filter(|e| **e == "record_skipped").count(), 1);
    assert_eq!(events.iter().filter(|e| **e == "owner_summary").count(), 2);

    // Line 1: used > size and two occupied slots against used=3.
    let record_violations: Vec<&LogEntry> = entries
        .iter()
        .filter(|e| e.event == "record_violation")
        .collect();
    assert_eq!(record_violations.len(), 2);
    assert!(record_violations.iter().all(|e| e.line_number == Some(1)));

    // kthread 1 ends at used=1.
    let lifecycle: Vec<&LogEntry> = entries
        .iter()
        .filter(|e| e.event == "lifecycle_violation")
        .collect();
    assert_eq!(lifecycle.len(), 1);
    assert_eq!(lifecycle[0].kthread, Some(1));
    assert_eq!(lifecycle[0].entry_index, Some(1));
    assert_eq!(lifecycle[0].line_number, Some(2));
    assert_eq!(
        lifecycle[0].violation.as_deref(),
        Some("lifecycle.not_terminally_empty")
    );

    let summary = entries.last().unwrap();
    assert_eq!(summary.outcome, Some(Outcome::Fail));
    let details = summary.details.as_ref().unwrap();
    assert_eq!(details["total_records"], 3);
    assert_eq!(details["owner_count"], 2);
}

#[test]
fn validator_reports_line_numbers_for_bad_entries() {
    let dir = unique_tmp_dir("bundlecheck-log-bad");
    let path = dir.join("events.jsonl");
    let good = LogEntry::new("bundlecheck::r::001", LogLevel::Info, "run_start")
        .to_jsonl()
        .unwrap();
    let bad = r#"{"timestamp":"2026-01-01T00:00:00Z","trace_id":"bundlecheck::r::002","level":"error","event":"lifecycle_violation","kthread":1,"entry_index":0,"violation":"record.used_exceeds_size"}"#;
    std::fs::write(&path, format!("{good}\n\n{bad}\n")).unwrap();

    let (lines, errors) = validate_log_file(&path).unwrap();
    assert_eq!(lines, 2);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].line_number, 3);
    assert_eq!(errors[0].field, "violation");
    assert!(errors[0].to_string().starts_with("line 3: field 'violation'"));
}
