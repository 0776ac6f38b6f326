//! External tool invocation.
//!
//! Every stage of the pipeline (and every render job) is a [`ToolCommand`]
//! handed to a [`ToolRunner`]. The system runner spawns real processes; tests
//! swap in a runner that records commands instead.

use std::fmt;
use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus};

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ToolError {
    #[error("could not find `{program}`")]
    #[diagnostic(
        code(llpipe::tool::not_found),
        help("install it, put it on PATH, or point llpipe.toml / LLPIPE_* at it")
    )]
    NotFound {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to launch `{program}`")]
    #[diagnostic(code(llpipe::tool::spawn))]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// A program plus its ordered argument list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Space-joined command line, program first. This is exactly what gets echoed.
impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for a in &self.args {
            write!(f, " {a}")?;
        }
        Ok(())
    }
}

/// How a finished tool exited. `code` is `None` when it was killed by a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ToolStatus {
    pub code: Option<i32>,
}

impl ToolStatus {
    pub const SUCCESS: ToolStatus = ToolStatus { code: Some(0) };

    pub fn exited(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for ToolStatus {
    fn from(s: ExitStatus) -> Self {
        Self { code: s.code() }
    }
}

pub trait ToolRunner {
    /// Run `command` to completion with `work_dir` as its working directory.
    fn run(&mut self, command: &ToolCommand, work_dir: &Path) -> Result<ToolStatus, ToolError>;
}

impl<R: ToolRunner + ?Sized> ToolRunner for &mut R {
    fn run(&mut self, command: &ToolCommand, work_dir: &Path) -> Result<ToolStatus, ToolError> {
        (**self).run(command, work_dir)
    }
}

/// Spawns real processes, inheriting stdio, and blocks until they exit.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&mut self, command: &ToolCommand, work_dir: &Path) -> Result<ToolStatus, ToolError> {
        let status = Command::new(&command.program)
            .args(&command.args)
            .current_dir(work_dir)
            .status()
            .map_err(|source| {
                let program = command.program.clone();
                if source.kind() == io::ErrorKind::NotFound {
                    ToolError::NotFound { program, source }
                } else {
                    ToolError::Spawn { program, source }
                }
            })?;

        log::debug!("`{}` exited with {status}", command.program);
        Ok(status.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_program_and_args_with_spaces() {
        let cmd = ToolCommand::new("opt")
            .arg("-mem2reg")
            .args(["foo.ll", "-S", "-o", "m2r-foo.ll"]);
        assert_eq!(cmd.to_string(), "opt -mem2reg foo.ll -S -o m2r-foo.ll");
    }

    #[test]
    fn display_without_args_is_just_the_program() {
        assert_eq!(ToolCommand::new("dot").to_string(), "dot");
    }

    #[test]
    fn missing_binary_maps_to_not_found() {
        let dir = std::env::temp_dir();
        let cmd = ToolCommand::new("llpipe-definitely-not-a-real-tool");
        let err = SystemRunner.run(&cmd, &dir).unwrap_err();
        assert!(matches!(err, ToolError::NotFound { .. }), "{err:?}");
    }
}
