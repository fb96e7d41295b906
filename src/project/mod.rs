//! A single project: its manifest, command words and build orchestration
//!
//! ```text
//! strata.toml ──> Manifest ──> Project::open ──> Project::run
//!                                  │                  │
//!                    OptionBag + Dependencies    BuildPaths ──> CommandRunner
//!                                  │
//!                           Cache (configure.json)
//! ```

mod command;
mod manifest;
mod orchestrator;
mod paths;

pub use command::Command;
pub use manifest::{BuildSection, DependencyDecl, Manifest, PackageSection, ProjectSection, MANIFEST_FILE};
pub use orchestrator::{Project, CACHE_FILE};
pub use paths::{join_paths, BuildPaths};
