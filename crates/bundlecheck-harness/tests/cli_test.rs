//! Integration test: `bundlecheck` CLI
//!
//! Validates that:
//! 1. A consistent log exits 0 and renders a passing summary.
//! 2. Violations exit non-zero unless `--allow-failures` is given.
//! 3. Empty input is reported explicitly and is not a failure.
//! 4. `--out-dir` writes a bundle that `check-events` accepts.
//! 5. Standard input works as the default source.
//!
//! Run: cargo test -p bundlecheck-harness --test cli_test

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

const PASSING_LOG: &str = "\
[  0.001] CPU 00| <5> runtime: starting
[LAME][BUNDLE][kthread:1][size:4][used:1][active:0][enabled:1][bundle:<0x7f01,(nil),(nil),(nil)]
[LAME][BUNDLE][kthread:2][size:4][used:1][active:0][enabled:1][bundle:<0x7f02,(nil),(nil),(nil)]
[LAME][BUNDLE][kthread:1][size:4][used:0][active:0][enabled:1][bundle:<(nil),(nil),(nil),(nil)]
[LAME][BUNDLE][kthread:2][size:4][used:0][active:0][enabled:1][bundle:<(nil),(nil),(nil),(nil)]
";

const FAILING_LOG: &str = "\
[LAME][BUNDLE][kthread:2][size:4][used:0][bundle:<(nil),(nil),(nil),(nil)]
[LAME][BUNDLE][kthread:2][size:4][used:1][bundle:<0x1,(nil),(nil),(nil)]
[LAME][BUNDLE][kthread:2][size:4][used:2][bundle:<0x1,0x2,(nil),(nil)]
[LAME][BUNDLE][kthread:2][size:4][used:3][bundle:<0x1,0x2,0x3,(nil)]
[LAME][BUNDLE][kthread:2][size:4][used:0][bundle:<(nil),(nil),(nil),(nil)]
";

fn unique_tmp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after UNIX_EPOCH")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}-{}-{nanos}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_input(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("runtime.log");
    std::fs::write(&path, body).expect("write input log");
    path
}

fn bundlecheck(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bundlecheck"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("bundlecheck should run")
}

#[test]
fn passing_log_exits_zero() {
    let dir = unique_tmp_dir("bundlecheck-cli-pass");
    let input = write_input(&dir, PASSING_LOG);

    let out = bundlecheck(&["validate", "--input", input.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout.contains("Total KTHREADs: 2"));
    assert!(stdout.contains("=== KTHREAD 1 ==="));
    assert!(stdout.contains("=== KTHREAD 2 ==="));
    assert!(stdout.contains("status: PASS"));
    assert!(!stdout.contains("ERROR"));
}

#[test]
fn failing_log_exits_nonzero_unless_allowed() {
    let dir = unique_tmp_dir("bundlecheck-cli-fail");
    let input = write_input(&dir, FAILING_LOG);
    let input = input.to_str().unwrap();

    let out = bundlecheck(&["validate", "--input", input]);
    assert!(!out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains(
        "ERROR kthread 2: bundle grew for 3 consecutive times (entry 4)"
    ));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Bundle validation failed"));

    let allowed = bundlecheck(&["validate", "--input", input, "--allow-failures"]);
    assert!(allowed.status.success());
}

#[test]
fn empty_input_reports_no_records() {
    let dir = unique_tmp_dir("bundlecheck-cli-empty");
    let input = write_input(&dir, "runtime noise only\n");

    let out = bundlecheck(&["validate", "--input", input.to_str().unwrap()]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("no bundle records found"));
}

#[test]
fn json_format_writes_output_file() {
    let dir = unique_tmp_dir("bundlecheck-cli-json");
    let input = write_input(&dir, PASSING_LOG);
    let report = dir.join("out/report.json");

    let out = bundlecheck(&[
        "validate",
        "--input",
        input.to_str().unwrap(),
        "--format",
        "json",
        "--output",
        report.to_str().unwrap(),
        "--run-id",
        "cli-json",
        "--timestamp",
        "2026-01-01T00:00:00Z",
    ]);
    assert!(out.status.success());
    assert!(out.stdout.is_empty());

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["meta"]["run_id"], "cli-json");
    assert_eq!(json["meta"]["generated_utc"], "2026-01-01T00:00:00Z");
    assert_eq!(json["report"]["status"], "all_passed");
    assert_eq!(json["report"]["total_lines"], 5);
    assert_eq!(json["report"]["owner_count"], 2);
}

#[test]
fn unsupported_format_is_rejected() {
    let dir = unique_tmp_dir("bundlecheck-cli-badfmt");
    let input = write_input(&dir, PASSING_LOG);
    let out = bundlecheck(&[
        "validate",
        "--input",
        input.to_str().unwrap(),
        "--format",
        "yaml",
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("yaml"));
}

#[test]
fn out_dir_bundle_passes_check_events() {
    let dir = unique_tmp_dir("bundlecheck-cli-bundle");
    let input = write_input(&dir, FAILING_LOG);
    let bundle = dir.join("bundle");

    let out = bundlecheck(&[
        "validate",
        "--input",
        input.to_str().unwrap(),
        "--out-dir",
        bundle.to_str().unwrap(),
        "--run-id",
        "cli-bundle",
        "--allow-failures",
    ]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    for name in ["report.json", "report.txt", "events.jsonl", "artifact_index.json"] {
        assert!(bundle.join(name).exists(), "{name} missing");
    }

    let events = bundle.join("events.jsonl");
    let index = bundle.join("artifact_index.json");
    let check = bundlecheck(&[
        "check-events",
        "--events",
        events.to_str().unwrap(),
        "--artifact-index",
        index.to_str().unwrap(),
    ]);
    assert!(check.status.success(), "stderr: {}", String::from_utf8_lossy(&check.stderr));
    assert!(String::from_utf8_lossy(&check.stdout).contains("0 schema error(s)"));

    let body = std::fs::read_to_string(&events).unwrap();
    assert!(body.contains("\"event\":\"lifecycle_violation\""));
    assert!(body.contains("\"violation\":\"lifecycle.growth_run\""));
}

#[test]
fn check_events_rejects_malformed_log() {
    let dir = unique_tmp_dir("bundlecheck-cli-badlog");
    let events = dir.join("events.jsonl");
    std::fs::write(
        &events,
        "{\"timestamp\":\"2026-01-01T00:00:00Z\",\"trace_id\":\"x\",\"level\":\"info\"}\n",
    )
    .unwrap();

    let out = bundlecheck(&["check-events", "--events", events.to_str().unwrap()]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("field 'event'"));
    assert!(stderr.contains("field 'trace_id'"));
}

#[test]
fn reads_stdin_by_default() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_bundlecheck"))
        .arg("validate")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn bundlecheck");
    child
        .stdin
        .take()
        .expect("stdin handle")
        .write_all(PASSING_LOG.as_bytes())
        .expect("write stdin");
    let out = child.wait_with_output().expect("wait bundlecheck");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("source=-"));
    assert!(stdout.contains("records: 4 passed, 0 failed (100.0%)"));
}
