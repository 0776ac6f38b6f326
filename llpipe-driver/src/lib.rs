#![forbid(unsafe_code)]

//! clang -> mem2reg -> opt pipeline driver.
//!
//! Given `foo.c` and a list of optimizer flags this emits `foo.ll`, promotes
//! locals into `m2r-foo.ll`, runs the requested passes into `opt-foo.ll`, and
//! removes `foo.ll` again. The driver never reads the files it produces.

pub mod args;
pub mod artifacts;
pub mod cleanup;
pub mod error;
pub mod pipeline;
pub mod tool;

pub use args::{Invocation, USAGE};
pub use artifacts::Artifacts;
pub use cleanup::CleanPolicy;
pub use error::DriverError;
pub use pipeline::{
    DriverConfig, PassSyntax, PipelineReport, Plan, RunOutcome, Stage, StageRecord, Toolchain,
    execute, run,
};
pub use tool::{SystemRunner, ToolCommand, ToolError, ToolRunner, ToolStatus};
