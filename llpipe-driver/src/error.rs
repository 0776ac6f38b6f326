use std::io;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::args::USAGE;
use crate::pipeline::Stage;
use crate::tool::ToolError;

/// Exit status used when a tool binary cannot be located (shell convention).
pub const EXIT_NOT_FOUND: u8 = 127;

#[derive(Debug, Error, Diagnostic)]
pub enum DriverError {
    #[error("usage: {}", USAGE)]
    #[diagnostic(code(llpipe::driver::usage))]
    Usage,

    #[error("no C source file among the arguments")]
    #[diagnostic(
        code(llpipe::driver::no_source),
        help("pass exactly one path ending in `.c`")
    )]
    NoSource,

    #[error("more than one C source file: {}", .candidates.join(", "))]
    #[diagnostic(
        code(llpipe::driver::ambiguous_source),
        help("the pipeline compiles a single translation unit per run")
    )]
    AmbiguousSource { candidates: Vec<String> },

    #[error("source path `{path}` has no usable file name")]
    #[diagnostic(code(llpipe::driver::bad_source))]
    BadSourcePath { path: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Tool(#[from] ToolError),

    #[error("{stage} stage failed ({})", describe_code(.code))]
    #[diagnostic(
        code(llpipe::driver::stage_failed),
        help("later stages were not run; the tool's own output is above")
    )]
    StageFailed { stage: Stage, code: Option<i32> },

    #[error("failed to list {}", .dir.display())]
    #[diagnostic(code(llpipe::driver::cleanup))]
    ReadDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove {}", .path.display())]
    #[diagnostic(code(llpipe::driver::cleanup))]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DriverError {
    /// Process exit status this error maps to.
    ///
    /// A failed stage propagates the tool's own exit code; everything else is 1,
    /// apart from a missing tool binary which follows the shell's 127.
    pub fn exit_code(&self) -> u8 {
        match self {
            DriverError::StageFailed { code: Some(c), .. } => match u8::try_from(*c) {
                Ok(0) | Err(_) => 1,
                Ok(c) => c,
            },
            DriverError::Tool(ToolError::NotFound { .. }) => EXIT_NOT_FOUND,
            _ => 1,
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit status {c}"),
        None => "terminated by signal".to_string(),
    }
}
