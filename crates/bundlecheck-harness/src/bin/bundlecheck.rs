//! CLI entrypoint for the bundle lifecycle validator.

use std::path::PathBuf;

use bundlecheck_harness::artifacts::{verify_artifact_index, write_artifact_bundle, write_events};
use bundlecheck_harness::logging::{LogConfig, LogError, LogFormat, init_logging};
use bundlecheck_harness::structured_log::validate_log_file;
use bundlecheck_harness::{AuditRunner, HarnessError, ReportFormat, render};
use clap::{Parser, Subcommand};

/// Validate `[LAME][BUNDLE]` lines in LAME runtime output.
#[derive(Debug, Parser)]
#[command(name = "bundlecheck", version)]
#[command(about = "Bundle lifecycle validator for LAME runtime logs")]
struct Cli {
    /// Diagnostic level on stderr (trace, debug, info, warn, error). `RUST_LOG` wins.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    /// Diagnostic format on stderr: `pretty` or `json`.
    #[arg(long, global = true, default_value = "pretty")]
    log_format: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Audit a runtime log and report record and lifecycle violations.
    Validate {
        /// Input log path, `-` for stdin.
        #[arg(long, default_value = "-")]
        input: PathBuf,
        /// Report format: `plain` (default) or `json`.
        #[arg(long, default_value = "plain")]
        format: String,
        /// Output file path (if omitted, prints to stdout).
        #[arg(long)]
        output: Option<PathBuf>,
        /// Structured JSONL event log path.
        #[arg(long)]
        events: Option<PathBuf>,
        /// Directory for the full artifact bundle (reports, events, index).
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Run identifier stamped on reports and events.
        #[arg(long)]
        run_id: Option<String>,
        /// Optional fixed timestamp string for deterministic report generation.
        #[arg(long)]
        timestamp: Option<String>,
        /// Exit 0 even when violations are found.
        #[arg(long)]
        allow_failures: bool,
    },
    /// Check a structured event log (and optionally its artifact index).
    CheckEvents {
        /// Structured JSONL log path.
        #[arg(long)]
        events: PathBuf,
        /// Artifact index JSON path to verify digests against.
        #[arg(long)]
        artifact_index: Option<PathBuf>,
    },
}

fn default_run_id() -> String {
    format!(
        "run-{}-{}",
        chrono::Utc::now().format("%Y%m%dT%H%M%SZ"),
        std::process::id()
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let format = LogFormat::from_str_loose(&cli.log_format)
        .ok_or_else(|| LogError::InvalidFormat(cli.log_format.clone()))?;
    init_logging(&LogConfig {
        level: cli.log_level.clone(),
        format,
    })?;

    match cli.command {
        Command::Validate {
            input,
            format,
            output,
            events,
            out_dir,
            run_id,
            timestamp,
            allow_failures,
        } => {
            let report_format = ReportFormat::from_str_loose(&format)
                .ok_or_else(|| HarnessError::UnsupportedFormat(format.clone()))?;

            let mut runner = AuditRunner::new(run_id.unwrap_or_else(default_run_id));
            if let Some(ts) = timestamp {
                runner = runner.with_timestamp(ts);
            }
            let run = runner.run_path(&input)?;

            let body = render(report_format, &run.report, &run.meta)?;
            if let Some(path) = output {
                if let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&path, body)?;
            } else {
                print!("{body}");
            }

            if let Some(path) = events {
                write_events(&path, &run)?;
            }
            if let Some(dir) = out_dir {
                let index = write_artifact_bundle(&dir, &run)?;
                eprintln!("Artifacts written to {}", index.display());
            }

            if run.exit_code(allow_failures) != 0 {
                let summary = &run.report.summary;
                return Err(format!(
                    "Bundle validation failed: {} record(s) and {} kthread(s) failed",
                    summary.records_failed, summary.owners_failed
                )
                .into());
            }
        }
        Command::CheckEvents {
            events,
            artifact_index,
        } => {
            let (lines, errors) = validate_log_file(&events)?;
            for error in &errors {
                eprintln!("{error}");
            }

            let mut problems = 0;
            if let Some(index) = artifact_index {
                for problem in verify_artifact_index(&index)? {
                    eprintln!("artifact: {problem}");
                    problems += 1;
                }
            }

            println!(
                "{}: {lines} event(s), {} schema error(s), {problems} artifact problem(s)",
                events.display(),
                errors.len()
            );
            if !errors.is_empty() || problems > 0 {
                return Err(format!(
                    "Event log check failed: {} schema error(s), {problems} artifact problem(s)",
                    errors.len()
                )
                .into());
            }
        }
    }

    Ok(())
}
