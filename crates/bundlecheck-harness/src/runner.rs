//! Audit execution engine.
//!
//! Reads raw runtime output line by line, hashes what it consumed, and feeds
//! each line to a [`BundleAudit`]. Nothing is buffered beyond the current line.

use std::io::BufRead;
use std::path::Path;

use bundlecheck_core::{BundleAudit, ValidationReport};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::artifacts::hex_lower;
use crate::error::HarnessError;
use crate::structured_log::now_utc;

/// Provenance attached to every rendered report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportMeta {
    pub tool: String,
    pub version: String,
    pub run_id: String,
    /// Input path, or `-` for standard input.
    pub source: String,
    pub input_sha256: String,
    pub input_bytes: u64,
    pub generated_utc: String,
}

/// A finished audit and its provenance.
#[derive(Debug, Clone)]
pub struct AuditRun {
    pub report: ValidationReport,
    pub meta: ReportMeta,
}

impl AuditRun {
    /// Exit code policy: failures are fatal unless explicitly allowed.
    #[must_use]
    pub fn exit_code(&self, allow_failures: bool) -> i32 {
        if self.report.all_passed() || allow_failures {
            0
        } else {
            1
        }
    }
}

/// Drives one input stream through the core validator.
pub struct AuditRunner {
    /// Identifier stamped on the report and every emitted event.
    pub run_id: String,
    /// Fixed report timestamp; wall clock when `None`.
    pub timestamp: Option<String>,
}

impl AuditRunner {
    #[must_use]
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            timestamp: None,
        }
    }

    /// Pin the report timestamp for reproducible output.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Audit every line of `reader`. `source` names the input in diagnostics.
    pub fn run<R: BufRead>(&self, mut reader: R, source: &str) -> Result<AuditRun, HarnessError> {
        let mut audit = BundleAudit::new();
        let mut hasher = Sha256::new();
        let mut input_bytes = 0u64;
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|source_err| HarnessError::Input {
                    source_name: source.to_string(),
                    source: source_err,
                })?;
            if read == 0 {
                break;
            }
            hasher.update(&buf);
            input_bytes += read as u64;

            let mut line: &[u8] = &buf;
            if let Some(rest) = line.strip_suffix(b"\n") {
                line = rest;
            }
            if let Some(rest) = line.strip_suffix(b"\r") {
                line = rest;
            }
            audit.ingest_line(&String::from_utf8_lossy(line));
        }

        let report = audit.finish();
        tracing::info!(
            run_id = %self.run_id,
            source,
            lines = report.total_lines,
            records = report.total_records,
            status = ?report.status,
            "audit complete"
        );

        Ok(AuditRun {
            report,
            meta: ReportMeta {
                tool: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                run_id: self.run_id.clone(),
                source: source.to_string(),
                input_sha256: hex_lower(&hasher.finalize()),
                input_bytes,
                generated_utc: self.timestamp.clone().unwrap_or_else(now_utc),
            },
        })
    }

    /// Audit a file, or standard input when `path` is `-`.
    pub fn run_path(&self, path: &Path) -> Result<AuditRun, HarnessError> {
        if path.as_os_str() == "-" {
            let stdin = std::io::stdin();
            return self.run(stdin.lock(), "-");
        }
        let source = path.display().to_string();
        let file = std::fs::File::open(path).map_err(|err| HarnessError::Input {
            source_name: source.clone(),
            source: err,
        })?;
        self.run(std::io::BufReader::new(file), &source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundlecheck_core::ReportStatus;

    const PASSING: &str = "[LAME][BUNDLE][kthread:1][size:2][used:1][bundle:<0x1,(nil)]\n\
                           [LAME][BUNDLE][kthread:1][size:2][used:0][bundle:<(nil),(nil)]\n";

    #[test]
    fn run_counts_lines_and_hashes_input() {
        let runner = AuditRunner::new("t1").with_timestamp("2026-01-01T00:00:00Z");
        let run = runner.run(PASSING.as_bytes(), "mem").unwrap();
        assert_eq!(run.report.total_lines, 2);
        assert_eq!(run.report.status, ReportStatus::AllPassed);
        assert_eq!(run.meta.input_bytes, PASSING.len() as u64);
        assert_eq!(run.meta.input_sha256.len(), 64);
        assert_eq!(run.meta.generated_utc, "2026-01-01T00:00:00Z");
        assert_eq!(run.meta.tool, "bundlecheck-harness");
        assert_eq!(run.exit_code(false), 0);
    }

    #[test]
    fn crlf_and_missing_final_newline_are_tolerated() {
        let input = "[LAME][BUNDLE][kthread:4][size:1][used:1][bundle:<0x9]\r\n\
                     [LAME][BUNDLE][kthread:4][size:1][used:0][bundle:<(nil)]";
        let run = AuditRunner::new("t2").run(input.as_bytes(), "mem").unwrap();
        assert_eq!(run.report.total_lines, 2);
        assert!(run.report.records.iter().all(|r| r.ok));
    }

    #[test]
    fn non_utf8_bytes_are_decoded_lossily() {
        let mut input = b"\xff\xfe garbage\n".to_vec();
        input.extend_from_slice(b"[LAME][BUNDLE][kthread:1][size:1][used:0][bundle:<(nil)]\n");
        let run = AuditRunner::new("t3").run(input.as_slice(), "mem").unwrap();
        assert_eq!(run.report.total_lines, 2);
        assert_eq!(run.report.total_records, 1);
    }

    #[test]
    fn failures_drive_exit_code_unless_allowed() {
        let input = "[LAME][BUNDLE][kthread:1][size:1][used:2][bundle:<0x1,0x2]\n";
        let run = AuditRunner::new("t4").run(input.as_bytes(), "mem").unwrap();
        assert_eq!(run.report.status, ReportStatus::Failures);
        assert_eq!(run.exit_code(false), 1);
        assert_eq!(run.exit_code(true), 0);
    }

    #[test]
    fn empty_input_is_not_a_failure() {
        let run = AuditRunner::new("t5").run(&b""[..], "mem").unwrap();
        assert!(run.report.no_records_found());
        assert_eq!(run.exit_code(false), 0);
        assert_eq!(
            run.meta.input_sha256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let err = AuditRunner::new("t6")
            .run_path(Path::new("/nonexistent/bundlecheck/input.log"))
            .unwrap_err();
        assert!(matches!(err, HarnessError::Input { .. }));
    }
}
