//! Run artifact bundles and their SHA-256 index.
//!
//! `write_artifact_bundle` lays out one run as:
//! - `report.json` / `report.txt`: the rendered report.
//! - `events.jsonl`: the structured event log.
//! - `artifact_index.json`: every file above with its digest and size.

use std::path::{Path, PathBuf};

use sha2::Digest;

use crate::error::HarnessError;
use crate::render::{render_json, render_plain};
use crate::runner::AuditRun;
use crate::structured_log::{ArtifactIndex, LogEmitter, emit_report_events};

pub const REPORT_JSON: &str = "report.json";
pub const REPORT_TEXT: &str = "report.txt";
pub const EVENTS_JSONL: &str = "events.jsonl";
pub const ARTIFACT_INDEX: &str = "artifact_index.json";

#[must_use]
pub fn hex_lower(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

pub fn sha256_hex(path: &Path) -> std::io::Result<String> {
    let data = std::fs::read(path)?;
    Ok(hex_lower(&sha2::Sha256::digest(&data)))
}

/// Write the structured event log for `run` to `path`.
pub fn write_events(path: &Path, run: &AuditRun) -> Result<(), HarnessError> {
    let mut emitter =
        LogEmitter::to_file(path, &run.meta.run_id).map_err(HarnessError::output(path))?;
    emit_report_events(&mut emitter, &run.report, &run.meta.source)
        .map_err(HarnessError::output(path))?;
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<(), HarnessError> {
    std::fs::write(path, contents).map_err(HarnessError::output(path))
}

/// Write every artifact of `run` under `out_dir` and return the index path.
pub fn write_artifact_bundle(out_dir: &Path, run: &AuditRun) -> Result<PathBuf, HarnessError> {
    std::fs::create_dir_all(out_dir).map_err(HarnessError::output(out_dir))?;

    write_file(
        &out_dir.join(REPORT_JSON),
        &render_json(&run.report, &run.meta)?,
    )?;
    write_file(
        &out_dir.join(REPORT_TEXT),
        &render_plain(&run.report, &run.meta),
    )?;
    write_events(&out_dir.join(EVENTS_JSONL), run)?;

    let mut index = ArtifactIndex::new(run.meta.run_id.clone());
    index.generated_utc = run.meta.generated_utc.clone();
    for (name, kind) in [
        (REPORT_JSON, "report_json"),
        (REPORT_TEXT, "report_text"),
        (EVENTS_JSONL, "event_log"),
    ] {
        let path = out_dir.join(name);
        let sha = sha256_hex(&path).map_err(HarnessError::output(&path))?;
        let size = std::fs::metadata(&path)
            .map_err(HarnessError::output(&path))?
            .len();
        index.add(name, kind, sha, Some(size));
    }

    let index_path = out_dir.join(ARTIFACT_INDEX);
    write_file(&index_path, &index.to_json()?)?;
    tracing::info!(
        out_dir = %out_dir.display(),
        artifacts = index.artifacts.len(),
        "artifact bundle written"
    );
    Ok(index_path)
}

/// Verify every artifact listed in an index against its recorded SHA-256.
///
/// Paths resolve relative to the index's directory. Returns one message per
/// missing or mismatched artifact.
pub fn verify_artifact_index(index_path: &Path) -> Result<Vec<String>, HarnessError> {
    let raw = std::fs::read_to_string(index_path).map_err(|source| HarnessError::Input {
        source_name: index_path.display().to_string(),
        source,
    })?;
    let index: ArtifactIndex = serde_json::from_str(&raw)?;
    let root = index_path.parent().unwrap_or_else(|| Path::new("."));

    let mut problems = Vec::new();
    if index.index_version != 1 {
        problems.push(format!(
            "unsupported index_version {}",
            index.index_version
        ));
    }
    for artifact in &index.artifacts {
        let path = root.join(&artifact.path);
        match sha256_hex(&path) {
            Ok(actual) if actual == artifact.sha256 => {}
            Ok(actual) => problems.push(format!(
                "{}: sha256 mismatch (expected {}, actual {actual})",
                artifact.path, artifact.sha256
            )),
            Err(err) => problems.push(format!("{}: unreadable: {err}", artifact.path)),
        }
    }
    Ok(problems)
}
