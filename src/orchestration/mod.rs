//! Subprocess execution
//!
//! Everything Strata does to the outside world goes through a
//! [`CommandRunner`]: lifecycle steps of a project, batch commands of the
//! walker, and self-description queries. Tests substitute a recording
//! runner.

mod process;
mod runtime;

pub use process::ProcessRunner;
pub use runtime::{CommandRunner, Invocation};
