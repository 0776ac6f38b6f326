//! `render --watch`: re-render whenever a `.dot` file in the directory changes.

use std::io::Write;
use std::sync::mpsc::{self, Receiver};

use llpipe_driver::ToolRunner;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::RenderError;
use crate::render::{RenderConfig, RenderSummary, SOURCE_EXT, render_dir};

/// Watches `cfg.dir` (non-recursively) and runs a render pass up front and
/// after every batch of `.dot` changes. Returns when the watcher goes away.
pub fn watch_dir<R, W, F>(cfg: &RenderConfig, runner: &mut R, echo: &mut W, on_pass: F) -> Result<(), RenderError>
where
    R: ToolRunner + ?Sized,
    W: Write + ?Sized,
    F: FnMut(&RenderSummary),
{
    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();

    let watch_err = |source| RenderError::Watch {
        dir: cfg.dir.clone(),
        source,
    };
    let mut watcher: RecommendedWatcher =
        RecommendedWatcher::new(tx, notify::Config::default()).map_err(watch_err)?;
    watcher
        .watch(&cfg.dir, RecursiveMode::NonRecursive)
        .map_err(watch_err)?;

    log::info!("watching {} for .{SOURCE_EXT} changes", cfg.dir.display());

    run_passes(cfg, runner, echo, &rx, on_pass)
}

/// Drives render passes off an event channel. Split out from [`watch_dir`] so
/// the loop can be fed without a real watcher.
///
/// Filesystem errors during a pass are logged and the loop keeps waiting. A
/// `dot` that cannot be launched ends it.
pub fn run_passes<R, W, F>(
    cfg: &RenderConfig,
    runner: &mut R,
    echo: &mut W,
    rx: &Receiver<notify::Result<Event>>,
    mut on_pass: F,
) -> Result<(), RenderError>
where
    R: ToolRunner + ?Sized,
    W: Write + ?Sized,
    F: FnMut(&RenderSummary),
{
    loop {
        match render_dir(cfg, runner, echo) {
            Ok(summary) => on_pass(&summary),
            // Editors that save by rename can make a file vanish mid-pass;
            // the next event triggers another try.
            Err(e @ (RenderError::ReadDir { .. } | RenderError::Metadata { .. })) => {
                log::warn!("render pass skipped: {e}");
            }
            Err(e) => return Err(e),
        }

        // Wait for a relevant change, then swallow whatever else queued up
        // behind it so one save triggers one pass.
        loop {
            match rx.recv() {
                Ok(Ok(evt)) if touches_source(&evt) => break,
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => log::warn!("watch error: {e}"),
                Err(_) => return Ok(()),
            }
        }
        while rx.try_recv().is_ok() {}
    }
}

/// Whether `evt` changed a `.dot` file. Reads are ignored: `dot` itself opens
/// the sources during a pass.
pub fn touches_source(evt: &Event) -> bool {
    if matches!(evt.kind, EventKind::Access(_)) {
        return false;
    }
    evt.paths
        .iter()
        .any(|p| p.extension().is_some_and(|e| e == SOURCE_EXT))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use notify::event::{AccessKind, CreateKind, ModifyKind};

    use super::*;

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn dot_writes_are_relevant() {
        assert!(touches_source(&event(
            EventKind::Modify(ModifyKind::Any),
            "/g/cfg.dot"
        )));
        assert!(touches_source(&event(
            EventKind::Create(CreateKind::File),
            "/g/new.dot"
        )));
    }

    #[test]
    fn outputs_and_reads_are_not() {
        assert!(!touches_source(&event(
            EventKind::Create(CreateKind::File),
            "/g/cfg.pdf"
        )));
        assert!(!touches_source(&event(
            EventKind::Access(AccessKind::Any),
            "/g/cfg.dot"
        )));
    }
}
