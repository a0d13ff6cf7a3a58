//! Log-driven validation harness for LAME bundle lifecycles.
//!
//! This crate provides:
//! - An audit runner that streams runtime output into `bundlecheck-core`.
//! - Plain-text and JSON report rendering.
//! - A structured JSONL event log with schema validation.
//! - Artifact bundles indexed by SHA-256.
//! - Operational logging setup for the `bundlecheck` binary.

#![forbid(unsafe_code)]

pub mod artifacts;
pub mod error;
pub mod logging;
pub mod render;
pub mod runner;
pub mod structured_log;

pub use error::HarnessError;
pub use render::{ReportFormat, render, render_json, render_plain};
pub use runner::{AuditRun, AuditRunner, ReportMeta};
