//! The three-stage clang/opt pipeline.

use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::args::Invocation;
use crate::artifacts::Artifacts;
use crate::cleanup::{self, CleanPolicy, SWEPT_SUFFIXES};
use crate::error::DriverError;
use crate::tool::{ToolCommand, ToolRunner};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// `clang -emit-llvm`
    Emit,
    /// `opt` with only `mem2reg`
    Mem2Reg,
    /// `opt` with the user's passes
    Optimize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Emit => "emit",
            Stage::Mem2Reg => "mem2reg",
            Stage::Optimize => "optimize",
        })
    }
}

/// Which `opt` command-line pass syntax to speak.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassSyntax {
    /// `-mem2reg` (legacy pass manager, LLVM <= 16).
    #[default]
    Legacy,
    /// `-passes=mem2reg` (new pass manager).
    New,
}

impl PassSyntax {
    pub fn mem2reg_flag(self) -> &'static str {
        match self {
            PassSyntax::Legacy => "-mem2reg",
            PassSyntax::New => "-passes=mem2reg",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toolchain {
    pub clang: String,
    pub opt: String,
    pub pass_syntax: PassSyntax,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            clang: "clang".to_string(),
            opt: "opt".to_string(),
            pass_syntax: PassSyntax::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DriverConfig {
    pub toolchain: Toolchain,
    pub clean: CleanPolicy,
    /// Used when the arguments carry no `-O` token.
    pub default_opt_level: Option<String>,
    /// Where tools run and where every derived file is written.
    pub work_dir: PathBuf,
}

impl DriverConfig {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            toolchain: Toolchain::default(),
            clean: CleanPolicy::default(),
            default_opt_level: None,
            work_dir: work_dir.into(),
        }
    }
}

/// A classified invocation with its file names and the commands to run.
#[derive(Clone, Debug)]
pub struct Plan {
    pub invocation: Invocation,
    pub artifacts: Artifacts,
    pub stages: Vec<(Stage, ToolCommand)>,
}

impl Plan {
    pub fn new(
        invocation: Invocation,
        toolchain: &Toolchain,
        default_opt_level: Option<&str>,
    ) -> Result<Self, DriverError> {
        let artifacts = Artifacts::derive(&invocation.source)?;

        let mut emit = ToolCommand::new(&toolchain.clang).arg("-emit-llvm");
        if let Some(level) = invocation.opt_level.as_deref().or(default_opt_level) {
            emit = emit.arg(level);
        }
        let emit = emit
            .arg(&invocation.source)
            .args(["-S", "-o"])
            .arg(&artifacts.ir);

        let mem2reg = ToolCommand::new(&toolchain.opt)
            .arg(toolchain.pass_syntax.mem2reg_flag())
            .arg(&artifacts.ir)
            .args(["-S", "-o"])
            .arg(&artifacts.mem2reg);

        let optimize = ToolCommand::new(&toolchain.opt)
            .args(invocation.pass_options.iter().cloned())
            .arg(&artifacts.mem2reg)
            .args(["-S", "-o"])
            .arg(&artifacts.optimized);

        Ok(Self {
            invocation,
            artifacts,
            stages: vec![
                (Stage::Emit, emit),
                (Stage::Mem2Reg, mem2reg),
                (Stage::Optimize, optimize),
            ],
        })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub command: ToolCommand,
    /// `None` when the tool could not be launched or was killed by a signal.
    pub code: Option<i32>,
    pub duration_ms: u64,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct PipelineReport {
    pub source: Option<String>,
    pub artifacts: Option<Artifacts>,
    pub stages: Vec<StageRecord>,
    pub removed: Vec<PathBuf>,
    pub failed_stage: Option<Stage>,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub report: PipelineReport,
    pub result: Result<(), DriverError>,
}

impl RunOutcome {
    pub fn ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn exit_code(&self) -> u8 {
        match &self.result {
            Ok(()) => 0,
            Err(e) => e.exit_code(),
        }
    }
}

/// Classifies `tokens`, cleans, runs every stage in order and cleans up.
///
/// Each command line is written to `echo` before it runs. Nothing is removed
/// or launched when classification fails.
pub fn run<I, S, R, W>(tokens: I, config: &DriverConfig, runner: &mut R, echo: &mut W) -> RunOutcome
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    R: ToolRunner + ?Sized,
    W: Write + ?Sized,
{
    let mut report = PipelineReport::default();
    let result = Invocation::classify(tokens)
        .and_then(|inv| {
            Plan::new(
                inv,
                &config.toolchain,
                config.default_opt_level.as_deref(),
            )
        })
        .and_then(|plan| execute(&plan, config, runner, echo, &mut report));

    RunOutcome { report, result }
}

/// Runs an already built plan, recording progress into `report`.
pub fn execute<R, W>(
    plan: &Plan,
    config: &DriverConfig,
    runner: &mut R,
    echo: &mut W,
    report: &mut PipelineReport,
) -> Result<(), DriverError>
where
    R: ToolRunner + ?Sized,
    W: Write + ?Sized,
{
    let work_dir = &config.work_dir;
    report.source = Some(plan.invocation.source.clone());
    report.artifacts = Some(plan.artifacts.clone());

    let removed = match config.clean {
        CleanPolicy::Directory => cleanup::sweep_dir(work_dir, &SWEPT_SUFFIXES)?,
        CleanPolicy::Derived => cleanup::remove_paths(plan.artifacts.paths_in(work_dir))?,
        CleanPolicy::Skip => Vec::new(),
    };
    report.removed.extend(removed);

    for (stage, cmd) in &plan.stages {
        // A closed or broken stdout must not stop the toolchain; echo errors are dropped.
        let _ = writeln!(echo, "{cmd}");
        let _ = echo.flush();

        let started = Instant::now();
        let status = runner.run(cmd, work_dir);
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let code = status.as_ref().ok().and_then(|s| s.code);
        report.stages.push(StageRecord {
            stage: *stage,
            command: cmd.clone(),
            code,
            duration_ms,
        });

        let status = status.inspect_err(|_| report.failed_stage = Some(*stage))?;
        if !status.success() {
            report.failed_stage = Some(*stage);
            log::debug!("{stage} stage failed; skipping the rest");
            return Err(DriverError::StageFailed {
                stage: *stage,
                code: status.code,
            });
        }
    }

    let ir = work_dir.join(&plan.artifacts.ir);
    report.removed.extend(cleanup::remove_paths([ir])?);

    Ok(())
}
