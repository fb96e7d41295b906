//! User-facing output
//!
//! Diagnostics for developers go through `tracing`; everything a user is
//! meant to read goes through these helpers so that `--quiet` and
//! `--verbose` behave the same across the orchestrator and the walker.

mod context;
mod output;

pub use context::UiContext;
pub use output::{banner, error, notice, say, vsay, warn};
