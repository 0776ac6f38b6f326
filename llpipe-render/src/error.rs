use std::io;
use std::path::PathBuf;

use llpipe_driver::ToolError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum RenderError {
    #[error("failed to list {}", .dir.display())]
    #[diagnostic(code(llpipe::render::read_dir))]
    ReadDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to stat {}", .path.display())]
    #[diagnostic(code(llpipe::render::metadata))]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Tool(#[from] ToolError),

    #[error("failed to watch {}", .dir.display())]
    #[diagnostic(code(llpipe::render::watch))]
    Watch {
        dir: PathBuf,
        #[source]
        source: notify::Error,
    },
}
