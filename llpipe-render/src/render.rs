use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use llpipe_driver::{ToolCommand, ToolRunner};
use serde::Serialize;

use crate::error::RenderError;
use crate::stale::{Freshness, freshness};

pub const SOURCE_EXT: &str = "dot";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderConfig {
    /// Graphviz binary.
    pub dot: String,
    /// Output format, passed as `-T<format>` and used as the output extension.
    pub format: String,
    pub dir: PathBuf,
}

impl RenderConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dot: "dot".to_string(),
            format: "pdf".to_string(),
            dir: dir.into(),
        }
    }
}

/// One `.dot` source and the output it maps to, both bare file names inside
/// [`RenderConfig::dir`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RenderJob {
    pub source: String,
    pub target: String,
    pub freshness: Freshness,
}

impl RenderJob {
    pub fn command(&self, cfg: &RenderConfig) -> ToolCommand {
        ToolCommand::new(&cfg.dot)
            .arg(&self.source)
            .arg(format!("-T{}", cfg.format))
            .args(["-o", self.target.as_str()])
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RenderSummary {
    pub rendered: Vec<String>,
    pub up_to_date: Vec<String>,
    /// Sources whose render exited unsuccessfully, with the exit code.
    pub failed: Vec<(String, Option<i32>)>,
}

impl RenderSummary {
    pub fn ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Lists every `*.dot` in `cfg.dir`, sorted by name, with its freshness.
pub fn plan_dir(cfg: &RenderConfig) -> Result<Vec<RenderJob>, RenderError> {
    let read_dir_err = |source| RenderError::ReadDir {
        dir: cfg.dir.clone(),
        source,
    };

    let mut sources = Vec::new();
    for ent in fs::read_dir(&cfg.dir).map_err(read_dir_err)? {
        let ent = ent.map_err(read_dir_err)?;
        if ent.file_type().map(|t| t.is_dir()).unwrap_or(true) {
            continue;
        }
        let p = ent.path();
        if p.extension().is_some_and(|e| e == SOURCE_EXT) {
            if let Some(name) = p.file_name().and_then(|n| n.to_str()) {
                sources.push(name.to_string());
            }
        }
    }
    sources.sort();

    sources
        .into_iter()
        .map(|source| -> Result<RenderJob, RenderError> {
            let target = target_name(&source, &cfg.format);
            let freshness = freshness(&cfg.dir.join(&source), &cfg.dir.join(&target))?;
            Ok(RenderJob {
                source,
                target,
                freshness,
            })
        })
        .collect()
}

/// Regenerates every missing or stale output in `cfg.dir`.
///
/// A stale output is deleted first; failing to delete it is ignored. A `dot`
/// that exits unsuccessfully is recorded and the pass moves on. A `dot` that
/// cannot be launched at all aborts the pass.
pub fn render_dir<R, W>(cfg: &RenderConfig, runner: &mut R, echo: &mut W) -> Result<RenderSummary, RenderError>
where
    R: ToolRunner + ?Sized,
    W: Write + ?Sized,
{
    let mut summary = RenderSummary::default();

    for job in plan_dir(cfg)? {
        if !job.freshness.needs_render() {
            summary.up_to_date.push(job.source);
            continue;
        }

        if job.freshness == Freshness::Stale {
            if let Err(e) = fs::remove_file(cfg.dir.join(&job.target)) {
                log::debug!("could not remove stale {}: {e}", job.target);
            }
        }

        let cmd = job.command(cfg);
        // Echo errors are dropped; the render itself still runs.
        let _ = writeln!(echo, "{cmd}");
        let _ = echo.flush();

        let status = runner.run(&cmd, &cfg.dir)?;
        if status.success() {
            summary.rendered.push(job.target);
        } else {
            log::warn!("{} failed to render ({:?})", job.source, status.code);
            summary.failed.push((job.source, status.code));
        }
    }

    Ok(summary)
}

fn target_name(source: &str, format: &str) -> String {
    let stem = Path::new(source)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(source);
    format!("{stem}.{format}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_swaps_extension() {
        assert_eq!(target_name("cfg.main.dot", "pdf"), "cfg.main.pdf");
        assert_eq!(target_name("g.dot", "svg"), "g.svg");
    }

    #[test]
    fn command_shape() {
        let cfg = RenderConfig::new(".");
        let job = RenderJob {
            source: "g.dot".into(),
            target: "g.pdf".into(),
            freshness: Freshness::Missing,
        };
        assert_eq!(job.command(&cfg).to_string(), "dot g.dot -Tpdf -o g.pdf");
    }
}
