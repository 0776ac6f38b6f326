#![forbid(unsafe_code)]

//! Keeps Graphviz renders in step with their `.dot` sources.

pub mod error;
pub mod render;
pub mod stale;
pub mod watch;

pub use error::RenderError;
pub use render::{RenderConfig, RenderJob, RenderSummary, plan_dir, render_dir};
pub use stale::{Freshness, freshness};
pub use watch::{run_passes, touches_source, watch_dir};
