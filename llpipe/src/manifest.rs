#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use llpipe_driver::args::OPT_LEVEL_PREFIX;
use llpipe_driver::{CleanPolicy, PassSyntax, Toolchain};
use miette::Diagnostic;
use thiserror::Error;

pub const MANIFEST_NAME: &str = "llpipe.toml";

#[derive(Debug, Error, Diagnostic)]
#[error("config error: {message}")]
#[diagnostic(code(llpipe::config))]
pub struct ConfigError {
    pub message: String,
}

/// Effective settings after merging `llpipe.toml` and `LLPIPE_*` overrides.
/// CLI flags are applied on top by the caller.
#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub manifest_path: Option<PathBuf>,
    pub toolchain: Toolchain,
    pub dot: String,
    pub clean: CleanPolicy,
    pub opt_level: Option<String>,
    pub render_format: String,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            manifest_path: None,
            toolchain: Toolchain::default(),
            dot: "dot".to_string(),
            clean: CleanPolicy::default(),
            opt_level: None,
            render_format: "pdf".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
struct Manifest {
    #[serde(default)]
    toolchain: Option<ToolchainSection>,

    #[serde(default)]
    pipeline: Option<PipelineSection>,

    #[serde(default)]
    render: Option<RenderSection>,
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
struct ToolchainSection {
    #[serde(default)]
    clang: Option<String>,

    #[serde(default)]
    opt: Option<String>,

    #[serde(default)]
    dot: Option<String>,

    #[serde(default)]
    pass_syntax: Option<PassSyntax>,
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
struct PipelineSection {
    #[serde(default)]
    clean: Option<CleanPolicy>,

    // Same shape as a command-line `-O` token, e.g. "-O1".
    #[serde(default)]
    opt_level: Option<String>,
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
struct RenderSection {
    #[serde(default)]
    format: Option<String>,
}

pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    let mut cur = if start.is_file() {
        start.parent()?.to_path_buf()
    } else {
        start.to_path_buf()
    };

    loop {
        let candidate = cur.join(MANIFEST_NAME);
        if candidate.exists() {
            return Some(candidate);
        }
        match cur.parent() {
            Some(p) => cur = p.to_path_buf(),
            None => return None,
        }
    }
}

/// Loads `explicit` if given, otherwise the nearest `llpipe.toml` at or above
/// `start`, then applies environment overrides.
pub fn load_resolved_config(start: &Path, explicit: Option<&Path>) -> Result<ResolvedConfig, ConfigError> {
    let manifest_path = match explicit {
        Some(p) => {
            if !p.is_file() {
                return Err(ConfigError {
                    message: format!("{} does not exist", p.display()),
                });
            }
            Some(p.to_path_buf())
        }
        None => find_manifest(start),
    };

    let mut out = match manifest_path {
        Some(path) => {
            let raw = fs::read_to_string(&path).map_err(|e| ConfigError {
                message: format!("failed to read {}: {e}", path.display()),
            })?;
            let mut cfg = parse_manifest(&raw).map_err(|e| ConfigError {
                message: format!("failed to parse {}: {}", path.display(), e.message),
            })?;
            cfg.manifest_path = Some(path);
            cfg
        }
        None => ResolvedConfig::default(),
    };

    apply_env_overrides(&mut out, |k| std::env::var(k).ok());
    match &out.manifest_path {
        Some(p) => log::debug!("using {}", p.display()),
        None => log::debug!("no {MANIFEST_NAME} found; using defaults"),
    }
    Ok(out)
}

pub fn parse_manifest(raw: &str) -> Result<ResolvedConfig, ConfigError> {
    let parsed: Manifest = toml::from_str(raw).map_err(|e| ConfigError {
        message: e.to_string(),
    })?;

    let mut out = ResolvedConfig::default();

    if let Some(tc) = parsed.toolchain {
        if let Some(clang) = tc.clang {
            out.toolchain.clang = clang;
        }
        if let Some(opt) = tc.opt {
            out.toolchain.opt = opt;
        }
        if let Some(dot) = tc.dot {
            out.dot = dot;
        }
        if let Some(syntax) = tc.pass_syntax {
            out.toolchain.pass_syntax = syntax;
        }
    }

    if let Some(p) = parsed.pipeline {
        if let Some(clean) = p.clean {
            out.clean = clean;
        }
        if let Some(level) = p.opt_level {
            if !level.starts_with(OPT_LEVEL_PREFIX) {
                return Err(ConfigError {
                    message: format!(
                        "pipeline.opt_level must look like `-O2`, got `{level}`"
                    ),
                });
            }
            out.opt_level = Some(level);
        }
    }

    if let Some(r) = parsed.render {
        if let Some(format) = r.format {
            out.render_format = format;
        }
    }

    Ok(out)
}

/// `LLPIPE_CLANG`, `LLPIPE_OPT` and `LLPIPE_DOT` replace the configured
/// binaries. Empty values are ignored.
pub fn apply_env_overrides<F>(cfg: &mut ResolvedConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(v) = get("LLPIPE_CLANG") {
        cfg.toolchain.clang = v;
    }
    if let Some(v) = get("LLPIPE_OPT") {
        cfg.toolchain.opt = v;
    }
    if let Some(v) = get("LLPIPE_DOT") {
        cfg.dot = v;
    }
}
