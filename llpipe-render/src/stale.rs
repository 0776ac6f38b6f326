use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;

use crate::error::RenderError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Freshness {
    Missing,
    /// Output exists but is not newer than its source.
    Stale,
    UpToDate,
}

impl Freshness {
    pub fn needs_render(self) -> bool {
        !matches!(self, Freshness::UpToDate)
    }
}

/// Compares modification times. Equal timestamps count as stale, so an output
/// written within the same clock tick as its source is regenerated.
pub fn freshness(source: &Path, target: &Path) -> Result<Freshness, RenderError> {
    let src_time = fs::metadata(source)
        .and_then(|m| m.modified())
        .map_err(|e| RenderError::Metadata {
            path: source.to_path_buf(),
            source: e,
        })?;

    let dst_time = match fs::metadata(target).and_then(|m| m.modified()) {
        Ok(t) => t,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Freshness::Missing),
        Err(e) => {
            return Err(RenderError::Metadata {
                path: target.to_path_buf(),
                source: e,
            });
        }
    };

    Ok(if src_time >= dst_time {
        Freshness::Stale
    } else {
        Freshness::UpToDate
    })
}
