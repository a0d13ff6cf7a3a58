//! Bundle-lifecycle validation for LAME runtime logs.
//!
//! The runtime under test logs a `[LAME][BUNDLE]` line every time a kthread's
//! uthread bundle changes. This crate checks those lines without any access to
//! the runtime itself:
//! - [`parse`]: turn a raw line into a [`BundleRecord`] keyed by kthread id.
//! - [`validate`]: intra-record checks (`used <= size`, occupancy matches `used`).
//! - [`history`]: ordered per-kthread history, append-only.
//! - [`lifecycle`]: temporal checks over a complete history (bounded growth
//!   runs, terminal emptiness).
//! - [`report`]: the aggregate [`ValidationReport`] handed to presenters.
//! - [`audit`]: the streaming driver tying the above together.
//!
//! Nothing here performs I/O or aborts on bad input; every violation is
//! collected into the report.

#![forbid(unsafe_code)]

pub mod audit;
pub mod history;
pub mod lifecycle;
pub mod parse;
pub mod record;
pub mod report;
pub mod validate;

pub use audit::{BundleAudit, LineOutcome, audit_lines};
pub use history::{HistoryTracker, OwnerHistory, TrackedRecord};
pub use lifecycle::{LifecycleVerdict, LifecycleViolation, validate_lifecycle};
pub use parse::{SkipReason, parse_line, parse_line_detailed};
pub use record::{BundleRecord, OwnerKey, Slot};
pub use report::{OwnerReport, RecordOutcome, ReportStatus, ValidationReport};
pub use validate::{RecordCheck, RecordViolation, validate_record};
