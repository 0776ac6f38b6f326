#![forbid(unsafe_code)]

use std::{
    io,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;

use llpipe_driver::{CleanPolicy, DriverConfig, SystemRunner};
use llpipe_render::{RenderConfig, RenderSummary};

mod manifest;
mod report;

#[derive(Parser, Debug)]
#[command(
    name = "llpipe",
    version,
    about = "clang -> mem2reg -> opt pipeline driver, plus a Graphviz re-renderer"
)]
struct Cli {
    /// Explicit `llpipe.toml`. Otherwise the nearest one at or above the working directory is used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log cleanup, config resolution and tool exits (same as RUST_LOG=debug).
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum CleanArg {
    /// Every *.ll / *.bc in the working directory
    Directory,
    /// Only this run's derived files
    Derived,
    /// Nothing
    None,
}

impl From<CleanArg> for CleanPolicy {
    fn from(v: CleanArg) -> Self {
        match v {
            CleanArg::Directory => CleanPolicy::Directory,
            CleanArg::Derived => CleanPolicy::Derived,
            CleanArg::None => CleanPolicy::Skip,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Emit IR for a C file, promote locals with mem2reg, then run the given opt passes
    Run {
        /// Pre-run cleanup: `directory`, `derived`, or `none` (default from llpipe.toml, else `directory`)
        #[arg(long, value_enum)]
        clean: Option<CleanArg>,

        /// Write a machine-readable run report (JSON)
        #[arg(long)]
        report: Option<PathBuf>,

        /// `<source.c>`, an optional clang `-O` level and opt flags, in any order
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
        tokens: Vec<String>,
    },

    /// Regenerate Graphviz outputs that are missing or older than their `.dot`
    Render {
        /// Directory holding the `.dot` files
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Output format passed to `dot -T` (default from llpipe.toml, else `pdf`)
        #[arg(long)]
        format: Option<String>,

        /// Keep running and re-render whenever a `.dot` file changes
        #[arg(long, default_value_t = false)]
        watch: bool,
    },
}

fn main() -> miette::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.cmd {
        Cmd::Run {
            clean,
            report,
            tokens,
        } => {
            let work_dir = std::env::current_dir().into_diagnostic()?;
            let resolved = manifest::load_resolved_config(&work_dir, cli.config.as_deref())?;
            run_pipeline(&work_dir, &resolved, clean, report.as_deref(), &tokens)
        }

        Cmd::Render { dir, format, watch } => {
            let resolved = manifest::load_resolved_config(&dir, cli.config.as_deref())?;
            let cfg = RenderConfig {
                dot: resolved.dot,
                format: format.unwrap_or(resolved.render_format),
                dir,
            };
            if watch {
                render_watch(&cfg)
            } else {
                render_once(&cfg)
            }
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn run_pipeline(
    work_dir: &Path,
    resolved: &manifest::ResolvedConfig,
    clean: Option<CleanArg>,
    report_path: Option<&Path>,
    tokens: &[String],
) -> miette::Result<ExitCode> {
    let cfg = DriverConfig {
        toolchain: resolved.toolchain.clone(),
        clean: clean.map(Into::into).unwrap_or(resolved.clean),
        default_opt_level: resolved.opt_level.clone(),
        work_dir: work_dir.to_path_buf(),
    };

    let outcome = llpipe_driver::run(tokens, &cfg, &mut SystemRunner, &mut io::stdout());

    if let Some(path) = report_path {
        report::write_run_report(&outcome, work_dir, path)?;
    }

    match outcome.result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            let code = e.exit_code();
            eprintln!("{:?}", miette::Report::new(e));
            Ok(ExitCode::from(code))
        }
    }
}

fn render_once(cfg: &RenderConfig) -> miette::Result<ExitCode> {
    let summary = llpipe_render::render_dir(cfg, &mut SystemRunner, &mut io::stdout())?;
    report_render_failures(&summary);
    Ok(if summary.ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn render_watch(cfg: &RenderConfig) -> miette::Result<ExitCode> {
    println!("watching {} (ctrl-c to stop)", cfg.dir.display());
    llpipe_render::watch_dir(cfg, &mut SystemRunner, &mut io::stdout(), report_render_failures)?;
    Ok(ExitCode::SUCCESS)
}

fn report_render_failures(summary: &RenderSummary) {
    for (source, code) in &summary.failed {
        match code {
            Some(c) => eprintln!("render failed: {source} (exit {c})"),
            None => eprintln!("render failed: {source} (terminated by signal)"),
        }
    }
}
