//! Single-pass ingestion of a log stream.
//!
//! [`BundleAudit`] owns the history map for one stream. Each line is parsed
//! and its record checked immediately; lifecycle checks run only in
//! [`BundleAudit::finish`], once the stream is known to be complete. Dropping
//! an audit without finishing it discards the partial histories.

use crate::history::{HistoryTracker, TrackedRecord};
use crate::lifecycle::validate_lifecycle;
use crate::parse::{SkipReason, parse_line_detailed};
use crate::record::OwnerKey;
use crate::report::{OwnerReport, RecordOutcome, ReportBuilder, ValidationReport};
use crate::validate::{RecordCheck, validate_record};

/// What happened to one ingested line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// No bundle marker; not counted anywhere but `total_lines`.
    Ignored,
    /// Marker present but a mandatory field was unusable.
    Skipped(SkipReason),
    /// Appended to `owner`'s history at `entry_index`.
    Recorded {
        owner: OwnerKey,
        entry_index: usize,
        check: RecordCheck,
    },
}

/// Streaming validator for one input.
#[derive(Debug, Default)]
pub struct BundleAudit {
    tracker: HistoryTracker,
    report: ReportBuilder,
    lines: usize,
}

impl BundleAudit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the next physical line of input.
    pub fn ingest_line(&mut self, line: &str) -> LineOutcome {
        self.lines += 1;
        let line_number = self.lines;

        let parsed = match parse_line_detailed(line) {
            Ok(parsed) => parsed,
            Err(SkipReason::NotBundleLine) => return LineOutcome::Ignored,
            Err(reason) => {
                tracing::debug!(line_number, %reason, "skipping malformed bundle line");
                self.report.skipped(line_number, reason.clone());
                return LineOutcome::Skipped(reason);
            }
        };

        let owner = parsed.owner;
        let check = validate_record(&parsed.record);
        if !check.ok() {
            tracing::debug!(
                line_number,
                kthread = owner,
                violations = check.violations.len(),
                "bundle record failed consistency check"
            );
        }

        let entry_index = self.tracker.append(
            owner,
            TrackedRecord {
                line_number,
                record: parsed.record,
                check: check.clone(),
            },
        );
        self.report
            .record(RecordOutcome::new(line_number, owner, entry_index, &check));

        LineOutcome::Recorded {
            owner,
            entry_index,
            check,
        }
    }

    /// Lines consumed so far.
    #[must_use]
    pub fn lines_seen(&self) -> usize {
        self.lines
    }

    /// Read access to the histories gathered so far.
    #[must_use]
    pub fn tracker(&self) -> &HistoryTracker {
        &self.tracker
    }

    /// Close the stream: run lifecycle checks on every complete history and
    /// build the report.
    #[must_use]
    pub fn finish(self) -> ValidationReport {
        let Self {
            tracker,
            mut report,
            lines,
        } = self;

        for history in tracker.iter() {
            let verdict = validate_lifecycle(history);
            report.owner(OwnerReport::new(history, verdict));
        }

        let report = report.build(lines);
        tracing::debug!(
            lines = report.total_lines,
            records = report.total_records,
            kthreads = report.owner_count,
            status = ?report.status,
            "bundle audit finished"
        );
        report
    }
}

/// Audit a complete sequence of lines.
pub fn audit_lines<I, S>(lines: I) -> ValidationReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut audit = BundleAudit::new();
    for line in lines {
        audit.ingest_line(line.as_ref());
    }
    audit.finish()
}
