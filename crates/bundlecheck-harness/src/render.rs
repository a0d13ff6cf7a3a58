//! Deterministic rendering of a finished audit.
//!
//! The primary artifact is JSON (report plus provenance). The plain render is
//! a stable text layout for humans and diffs.

use std::fmt::Write as _;

use bundlecheck_core::ValidationReport;
use bundlecheck_core::report::OwnerReport;
use serde::Serialize;

use crate::error::HarnessError;
use crate::runner::ReportMeta;

/// Output format for the rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Plain,
    Json,
}

impl ReportFormat {
    #[must_use]
    pub fn from_str_loose(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "plain" | "text" | "txt" => Some(Self::Plain),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

fn opt(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.1}%"))
}

fn render_owner(out: &mut String, owner: &OwnerReport) {
    writeln!(out).ok();
    writeln!(out, "=== KTHREAD {} ===", owner.owner).ok();
    writeln!(out, "Total Bundle Entries: {}", owner.entry_count).ok();
    writeln!(
        out,
        "Validation Status: {}",
        if owner.ok { "PASSED" } else { "FAILED" }
    )
    .ok();
    if !owner.invalid_entries.is_empty() {
        let entries: Vec<String> = owner
            .invalid_entries
            .iter()
            .map(|i| (i + 1).to_string())
            .collect();
        writeln!(out, "Inconsistent Entries: {}", entries.join(", ")).ok();
    }
    if !owner.flagged.is_empty() {
        writeln!(out, "Bundle History with Errors:").ok();
        for entry in &owner.flagged {
            let record = &entry.record;
            writeln!(
                out,
                "  {:2}: size={} used={} active={} enabled={} bundle={} (line {}) [ERROR]",
                entry.index + 1,
                record.size,
                record.used,
                opt(record.active),
                opt(record.enabled),
                record.raw_bundle_text,
                entry.line_number,
            )
            .ok();
        }
    }
    writeln!(out, "==================").ok();
}

/// Render the report as stable plain text.
#[must_use]
pub fn render_plain(report: &ValidationReport, meta: &ReportMeta) -> String {
    let mut out = String::new();

    writeln!(out, "LAME bundle validation report").ok();
    writeln!(
        out,
        "run={} source={} sha256={} generated={}",
        meta.run_id, meta.source, meta.input_sha256, meta.generated_utc
    )
    .ok();
    writeln!(
        out,
        "lines={} records={} skipped={}",
        report.total_lines,
        report.total_records,
        report.skipped.len()
    )
    .ok();

    if report.no_records_found() {
        writeln!(out).ok();
        writeln!(out, "no bundle records found").ok();
        return out;
    }

    let has_record_errors = report.failed_records().next().is_some();
    if has_record_errors || !report.skipped.is_empty() {
        writeln!(out).ok();
        writeln!(out, "=== BUNDLE CONSISTENCY ===").ok();
        for skipped in &report.skipped {
            writeln!(
                out,
                "SKIP line {}: {}",
                skipped.line_number, skipped.reason
            )
            .ok();
        }
        for record in report.failed_records() {
            for message in &record.messages {
                writeln!(out, "ERROR line {}: {message}", record.line_number).ok();
            }
        }
    }

    writeln!(out).ok();
    writeln!(out, "=== BUNDLE LIFECYCLE VALIDATION ===").ok();
    for owner in &report.owners {
        for message in &owner.messages {
            writeln!(out, "ERROR kthread {}: {message}", owner.owner).ok();
        }
    }

    writeln!(out).ok();
    writeln!(out, "=== BUNDLE SUMMARY ===").ok();
    writeln!(out, "Total KTHREADs: {}", report.owner_count).ok();
    for owner in &report.owners {
        render_owner(&mut out, owner);
    }

    let summary = &report.summary;
    writeln!(out).ok();
    writeln!(
        out,
        "kthreads: {} passed, {} failed ({})",
        summary.owners_passed,
        summary.owners_failed,
        pct(summary.owner_pass_pct)
    )
    .ok();
    writeln!(
        out,
        "records: {} passed, {} failed ({})",
        summary.records_passed,
        summary.records_failed,
        pct(summary.record_pass_pct)
    )
    .ok();
    writeln!(
        out,
        "status: {}",
        if report.all_passed() { "PASS" } else { "FAIL" }
    )
    .ok();

    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    meta: &'a ReportMeta,
    report: &'a ValidationReport,
}

/// Render the report and its provenance as pretty JSON.
pub fn render_json(report: &ValidationReport, meta: &ReportMeta) -> Result<String, HarnessError> {
    Ok(serde_json::to_string_pretty(&JsonReport { meta, report })?)
}

/// Render in the requested format.
pub fn render(
    format: ReportFormat,
    report: &ValidationReport,
    meta: &ReportMeta,
) -> Result<String, HarnessError> {
    match format {
        ReportFormat::Plain => Ok(render_plain(report, meta)),
        ReportFormat::Json => render_json(report, meta),
    }
}
