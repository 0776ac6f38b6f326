#![forbid(unsafe_code)]

use std::path::Path;

use llpipe_driver::{PipelineReport, RunOutcome};
use miette::IntoDiagnostic;
use serde::Serialize;

pub const RUN_REPORT_SCHEMA: &str = "llpipe.run.v1";

#[derive(Debug, Clone, Serialize)]
pub struct RunReport<'a> {
    pub schema: &'static str,
    pub work_dir: String,
    pub ok: bool,
    pub exit_code: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub pipeline: &'a PipelineReport,
}

impl<'a> RunReport<'a> {
    pub fn new(outcome: &'a RunOutcome, work_dir: &Path) -> Self {
        Self {
            schema: RUN_REPORT_SCHEMA,
            work_dir: absolute_path(work_dir),
            ok: outcome.ok(),
            exit_code: outcome.exit_code(),
            error: outcome.result.as_ref().err().map(|e| e.to_string()),
            pipeline: &outcome.report,
        }
    }
}

pub fn write_run_report(outcome: &RunOutcome, work_dir: &Path, out_path: &Path) -> miette::Result<()> {
    let report = RunReport::new(outcome, work_dir);

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).into_diagnostic()?;
    }
    let json = serde_json::to_string_pretty(&report).into_diagnostic()?;
    std::fs::write(out_path, json).into_diagnostic()?;
    Ok(())
}

/// Canonical absolute form of `path`. Falls back to
/// joining onto the current directory when the path cannot be canonicalized.
fn absolute_path(path: &Path) -> String {
    let p = path.canonicalize().unwrap_or_else(|_| {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    });
    p.to_string_lossy().into_owned()
}
