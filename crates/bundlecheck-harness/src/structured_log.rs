//! Structured event log contract for bundle validation runs.
//!
//! Provides:
//! - [`LogEntry`]: canonical JSONL record with required + optional fields.
//! - [`ArtifactIndex`]: links a run's outputs with SHA-256 integrity.
//! - [`LogEmitter`]: writes JSONL lines to a file or an in-memory buffer.
//! - [`emit_report_events`]: the event sequence for one finished report.
//! - [`validate_log_line`] / [`validate_log_file`]: schema checks for emitted logs.

use std::io::Write;
use std::path::Path;

use bundlecheck_core::ValidationReport;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Log entry
// ---------------------------------------------------------------------------

/// Severity level for log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Validation outcome attached to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
    Skip,
}

/// Event names this harness emits.
pub const EVENTS: [&str; 6] = [
    "run_start",
    "record_skipped",
    "record_violation",
    "lifecycle_violation",
    "owner_summary",
    "run_summary",
];

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const OUTCOMES: [&str; 3] = ["pass", "fail", "skip"];

/// Canonical structured log entry.
///
/// Required fields: `timestamp`, `trace_id`, `level`, `event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    // Required
    pub timestamp: String,
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,

    // Optional
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kthread: Option<u64>,
    /// 1-based input line the event refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,
    /// Zero-based index in the kthread's history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    /// Stable violation code, e.g. `lifecycle.growth_run`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_refs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    /// Create a new log entry with required fields only.
    #[must_use]
    pub fn new(trace_id: impl Into<String>, level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc(),
            trace_id: trace_id.into(),
            level,
            event: event.into(),
            run_id: None,
            kthread: None,
            line_number: None,
            entry_index: None,
            outcome: None,
            violation: None,
            message: None,
            artifact_refs: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_kthread(mut self, kthread: u64) -> Self {
        self.kthread = Some(kthread);
        self
    }

    /// Set the input line and history position.
    #[must_use]
    pub fn with_entry(mut self, line_number: usize, entry_index: usize) -> Self {
        self.line_number = Some(line_number);
        self.entry_index = Some(entry_index);
        self
    }

    #[must_use]
    pub fn with_line(mut self, line_number: usize) -> Self {
        self.line_number = Some(line_number);
        self
    }

    #[must_use]
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Set the violation code and its human-readable message.
    #[must_use]
    pub fn with_violation(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.violation = Some(code.into());
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_artifacts(mut self, refs: Vec<String>) -> Self {
        self.artifact_refs = Some(refs);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Serialize to a single JSONL line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Artifact index
// ---------------------------------------------------------------------------

/// A single artifact entry in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub path: String,
    pub kind: String,
    pub sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

/// Artifact index linking a run's event log to its other outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactIndex {
    pub index_version: u32,
    pub run_id: String,
    pub generated_utc: String,
    pub artifacts: Vec<ArtifactEntry>,
}

impl ArtifactIndex {
    #[must_use]
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            index_version: 1,
            run_id: run_id.into(),
            generated_utc: now_utc(),
            artifacts: Vec::new(),
        }
    }

    /// Add an artifact entry.
    pub fn add(
        &mut self,
        path: impl Into<String>,
        kind: impl Into<String>,
        sha256: impl Into<String>,
        size_bytes: Option<u64>,
    ) -> &mut Self {
        self.artifacts.push(ArtifactEntry {
            path: path.into(),
            kind: kind.into(),
            sha256: sha256.into(),
            size_bytes,
        });
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// ---------------------------------------------------------------------------
// Log emitter
// ---------------------------------------------------------------------------

/// Writes structured JSONL log entries to a file or a buffer.
pub struct LogEmitter {
    writer: Box<dyn Write>,
    seq: u64,
    run_id: String,
}

impl LogEmitter {
    /// Create an emitter that writes to a file.
    pub fn to_file(path: &Path, run_id: &str) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self {
            writer: Box::new(std::io::BufWriter::new(file)),
            seq: 0,
            run_id: run_id.to_string(),
        })
    }

    /// Create an emitter over any writer (buffers in tests, stdout).
    #[must_use]
    pub fn to_writer(writer: Box<dyn Write>, run_id: &str) -> Self {
        Self {
            writer,
            seq: 0,
            run_id: run_id.to_string(),
        }
    }

    /// Number of entries emitted so far.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.seq
    }

    fn next_trace_id(&mut self) -> String {
        self.seq += 1;
        format!("bundlecheck::{}::{:03}", self.run_id, self.seq)
    }

    /// Emit a log entry with auto-generated trace_id.
    pub fn emit(&mut self, level: LogLevel, event: &str) -> std::io::Result<LogEntry> {
        let entry = LogEntry::new(String::new(), level, event);
        self.emit_entry(entry)
    }

    /// Emit a fully-populated log entry, filling trace_id and run_id when unset.
    pub fn emit_entry(&mut self, mut entry: LogEntry) -> std::io::Result<LogEntry> {
        if entry.trace_id.is_empty() {
            entry.trace_id = self.next_trace_id();
        } else {
            self.seq += 1;
        }
        if entry.run_id.is_none() {
            entry.run_id = Some(self.run_id.clone());
        }
        let line = serde_json::to_string(&entry).map_err(std::io::Error::other)?;
        writeln!(self.writer, "{line}")?;
        Ok(entry)
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// Emit the event sequence describing one finished report.
///
/// Order: `run_start`, skipped lines, record violations (arrival order),
/// then per kthread its lifecycle violations followed by `owner_summary`,
/// and finally `run_summary`.
pub fn emit_report_events(
    emitter: &mut LogEmitter,
    report: &ValidationReport,
    source: &str,
) -> std::io::Result<()> {
    emitter.emit_entry(
        LogEntry::new("", LogLevel::Info, "run_start")
            .with_details(serde_json::json!({ "source": source })),
    )?;

    for skipped in &report.skipped {
        emitter.emit_entry(
            LogEntry::new("", LogLevel::Warn, "record_skipped")
                .with_line(skipped.line_number)
                .with_outcome(Outcome::Skip)
                .with_message(skipped.reason.to_string())
                .with_details(serde_json::json!({ "reason": skipped.reason.code() })),
        )?;
    }

    for record in report.failed_records() {
        for violation in &record.violations {
            emitter.emit_entry(
                LogEntry::new("", LogLevel::Error, "record_violation")
                    .with_kthread(record.owner)
                    .with_entry(record.line_number, record.entry_index)
                    .with_outcome(Outcome::Fail)
                    .with_violation(violation.code(), violation.to_string())
                    .with_details(serde_json::to_value(violation).map_err(std::io::Error::other)?),
            )?;
        }
    }

    for owner in &report.owners {
        for violation in &owner.violations {
            let index = violation.index();
            let line_number = owner
                .flagged
                .iter()
                .find(|entry| entry.index == index)
                .map_or(0, |entry| entry.line_number);
            emitter.emit_entry(
                LogEntry::new("", LogLevel::Error, "lifecycle_violation")
                    .with_kthread(owner.owner)
                    .with_entry(line_number, index)
                    .with_outcome(Outcome::Fail)
                    .with_violation(violation.code(), violation.to_string())
                    .with_details(serde_json::to_value(violation).map_err(std::io::Error::other)?),
            )?;
        }

        let (level, outcome) = if owner.ok {
            (LogLevel::Info, Outcome::Pass)
        } else {
            (LogLevel::Warn, Outcome::Fail)
        };
        emitter.emit_entry(
            LogEntry::new("", level, "owner_summary")
                .with_kthread(owner.owner)
                .with_outcome(outcome)
                .with_details(serde_json::json!({
                    "entry_count": owner.entry_count,
                    "flagged": owner.flagged_indices(),
                    "invalid_entries": owner.invalid_entries,
                })),
        )?;
    }

    let outcome = if report.all_passed() {
        Outcome::Pass
    } else {
        Outcome::Fail
    };
    emitter.emit_entry(
        LogEntry::new("", LogLevel::Info, "run_summary")
            .with_outcome(outcome)
            .with_details(serde_json::json!({
                "status": report.status,
                "total_lines": report.total_lines,
                "total_records": report.total_records,
                "owner_count": report.owner_count,
                "summary": report.summary,
            })),
    )?;
    emitter.flush()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validation error for a log line.
#[derive(Debug)]
pub struct LogValidationError {
    pub line_number: usize,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for LogValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}: field '{}': {}",
            self.line_number, self.field, self.message
        )
    }
}

/// Validate a single JSONL line against the schema.
pub fn validate_log_line(
    line: &str,
    line_number: usize,
) -> Result<LogEntry, Vec<LogValidationError>> {
    let mut errors = Vec::new();
    let mut push = |field: &str, message: String| {
        errors.push(LogValidationError {
            line_number,
            field: field.to_string(),
            message,
        });
    };

    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            push("<json>", format!("invalid JSON: {e}"));
            return Err(errors);
        }
    };

    let Some(obj) = value.as_object() else {
        push("<root>", "expected JSON object".to_string());
        return Err(errors);
    };

    for field in ["timestamp", "trace_id", "level", "event"] {
        if !obj.contains_key(field) {
            push(field, "required field missing".to_string());
        }
    }

    if let Some(level) = obj.get("level").and_then(|v| v.as_str())
        && !LEVELS.contains(&level)
    {
        push("level", format!("invalid level: '{level}'"));
    }

    if let Some(outcome) = obj.get("outcome").and_then(|v| v.as_str())
        && !OUTCOMES.contains(&outcome)
    {
        push("outcome", format!("invalid outcome: '{outcome}'"));
    }

    let event = obj.get("event").and_then(|v| v.as_str());
    if let Some(event) = event
        && !EVENTS.contains(&event)
    {
        push("event", format!("unknown event: '{event}'"));
    }

    // Violation events must say what broke, where.
    if let Some(event) = event
        && event.ends_with("_violation")
    {
        let family = event.trim_end_matches("_violation");
        match obj.get("violation").and_then(|v| v.as_str()) {
            Some(code) if code.starts_with(&format!("{family}.")) => {}
            Some(code) => push(
                "violation",
                format!("violation code '{code}' does not belong to event '{event}'"),
            ),
            None => push(
                "violation",
                "violation events must include a violation code".to_string(),
            ),
        }
        for field in ["kthread", "entry_index"] {
            if !obj.get(field).is_some_and(serde_json::Value::is_u64) {
                push(
                    field,
                    format!("violation events must include unsigned '{field}'"),
                );
            }
        }
    }

    if event == Some("owner_summary") && !obj.get("kthread").is_some_and(serde_json::Value::is_u64)
    {
        push(
            "kthread",
            "owner_summary events must include unsigned 'kthread'".to_string(),
        );
    }

    if let Some(trace_id) = obj.get("trace_id").and_then(|v| v.as_str())
        && !trace_id.contains("::")
    {
        push(
            "trace_id",
            format!("trace_id should follow <tool>::<run_id>::<seq> format, got: '{trace_id}'"),
        );
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    match serde_json::from_value::<LogEntry>(value) {
        Ok(entry) => Ok(entry),
        Err(e) => {
            errors.push(LogValidationError {
                line_number,
                field: "<deserialization>".to_string(),
                message: format!("failed to deserialize: {e}"),
            });
            Err(errors)
        }
    }
}

/// Validate an entire JSONL file.
///
/// Returns the non-empty line count and any validation errors found.
pub fn validate_log_file(path: &Path) -> Result<(usize, Vec<LogValidationError>), std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    let mut all_errors = Vec::new();
    let mut line_count = 0;

    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        line_count += 1;
        if let Err(errs) = validate_log_line(line, i + 1) {
            all_errors.extend(errs);
        }
    }

    Ok((line_count, all_errors))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Current UTC time, RFC 3339 with millisecond precision.
#[must_use]
pub fn now_utc() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
