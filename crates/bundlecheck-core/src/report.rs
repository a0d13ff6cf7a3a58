//! Aggregate validation report.
//!
//! This is the hand-off structure to whatever presents results. It is built
//! once from the per-record outcomes gathered during ingestion and the
//! per-kthread lifecycle verdicts computed at end of stream, and is read-only
//! afterwards. Formatting lives with the consumer.

use serde::Serialize;

use crate::history::OwnerHistory;
use crate::lifecycle::{LifecycleVerdict, LifecycleViolation};
use crate::parse::SkipReason;
use crate::record::{BundleRecord, OwnerKey};
use crate::validate::{RecordCheck, RecordViolation};

/// Overall classification of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// The input held no bundle records at all.
    NoRecords,
    AllPassed,
    /// At least one record or kthread failed.
    Failures,
}

/// A marker-bearing line that did not yield a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    pub line_number: usize,
    pub reason: SkipReason,
}

/// Intra-record result for one ingested record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordOutcome {
    pub line_number: usize,
    pub owner: OwnerKey,
    /// Zero-based position within the owner's history.
    pub entry_index: usize,
    pub ok: bool,
    pub violations: Vec<RecordViolation>,
    pub messages: Vec<String>,
}

impl RecordOutcome {
    #[must_use]
    pub fn new(line_number: usize, owner: OwnerKey, entry_index: usize, check: &RecordCheck) -> Self {
        Self {
            line_number,
            owner,
            entry_index,
            ok: check.ok(),
            violations: check.violations.clone(),
            messages: check.messages(),
        }
    }
}

/// A history entry singled out by the lifecycle check, with its full fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlaggedEntry {
    pub index: usize,
    pub line_number: usize,
    pub record: BundleRecord,
}

/// Lifecycle result for one kthread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerReport {
    pub owner: OwnerKey,
    pub entry_count: usize,
    pub ok: bool,
    pub violations: Vec<LifecycleViolation>,
    pub messages: Vec<String>,
    /// Flagged entries in ascending index order.
    pub flagged: Vec<FlaggedEntry>,
    /// Entries whose intra-record check failed. Does not affect `ok`.
    pub invalid_entries: Vec<usize>,
}

impl OwnerReport {
    #[must_use]
    pub fn new(history: &OwnerHistory, verdict: LifecycleVerdict) -> Self {
        let entries = history.entries();
        let flagged = verdict
            .flagged
            .iter()
            .filter_map(|&index| {
                entries.get(index).map(|entry| FlaggedEntry {
                    index,
                    line_number: entry.line_number,
                    record: entry.record.clone(),
                })
            })
            .collect();
        Self {
            owner: history.owner,
            entry_count: history.len(),
            ok: verdict.ok(),
            messages: verdict.violations.iter().map(ToString::to_string).collect(),
            violations: verdict.violations,
            flagged,
            invalid_entries: history.invalid_entries(),
        }
    }

    #[must_use]
    pub fn flagged_indices(&self) -> Vec<usize> {
        self.flagged.iter().map(|entry| entry.index).collect()
    }
}

/// Pass/fail counts for both validation layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub owners_passed: usize,
    pub owners_failed: usize,
    /// Percentage of passing kthreads; `None` when there are none.
    pub owner_pass_pct: Option<f64>,
    pub records_passed: usize,
    pub records_failed: usize,
    /// Percentage of passing records; `None` when there are none.
    pub record_pass_pct: Option<f64>,
}

fn pass_pct(passed: usize, total: usize) -> Option<f64> {
    (total > 0).then(|| passed as f64 * 100.0 / total as f64)
}

/// Final aggregate of one input stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub status: ReportStatus,
    /// Physical lines consumed, record or not.
    pub total_lines: usize,
    pub total_records: usize,
    pub owner_count: usize,
    pub skipped: Vec<SkippedLine>,
    /// Record outcomes in arrival order.
    pub records: Vec<RecordOutcome>,
    /// Kthread outcomes in ascending kthread order.
    pub owners: Vec<OwnerReport>,
    pub summary: Summary,
}

impl ValidationReport {
    #[must_use]
    pub fn no_records_found(&self) -> bool {
        self.status == ReportStatus::NoRecords
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.status != ReportStatus::Failures
    }

    #[must_use]
    pub fn owner(&self, owner: OwnerKey) -> Option<&OwnerReport> {
        self.owners.iter().find(|report| report.owner == owner)
    }

    /// Failed record outcomes in arrival order.
    pub fn failed_records(&self) -> impl Iterator<Item = &RecordOutcome> {
        self.records.iter().filter(|outcome| !outcome.ok)
    }
}

/// Collects outcomes while the stream is consumed.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    skipped: Vec<SkippedLine>,
    records: Vec<RecordOutcome>,
    owners: Vec<OwnerReport>,
}

impl ReportBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skipped(&mut self, line_number: usize, reason: SkipReason) {
        self.skipped.push(SkippedLine {
            line_number,
            reason,
        });
    }

    pub fn record(&mut self, outcome: RecordOutcome) {
        self.records.push(outcome);
    }

    pub fn owner(&mut self, report: OwnerReport) {
        self.owners.push(report);
    }

    #[must_use]
    pub fn build(mut self, total_lines: usize) -> ValidationReport {
        self.owners.sort_by_key(|report| report.owner);

        let records_passed = self.records.iter().filter(|r| r.ok).count();
        let records_failed = self.records.len() - records_passed;
        let owners_passed = self.owners.iter().filter(|o| o.ok).count();
        let owners_failed = self.owners.len() - owners_passed;

        let status = if self.records.is_empty() {
            ReportStatus::NoRecords
        } else if records_failed == 0 && owners_failed == 0 {
            ReportStatus::AllPassed
        } else {
            ReportStatus::Failures
        };

        ValidationReport {
            status,
            total_lines,
            total_records: self.records.len(),
            owner_count: self.owners.len(),
            summary: Summary {
                owners_passed,
                owners_failed,
                owner_pass_pct: pass_pct(owners_passed, self.owners.len()),
                records_passed,
                records_failed,
                record_pass_pct: pass_pct(records_passed, self.records.len()),
            },
            skipped: self.skipped,
            records: self.records,
            owners: self.owners,
        }
    }
}
