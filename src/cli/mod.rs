//! Command-line front ends

pub mod args;
pub mod project;

pub use args::WalkCli;
pub use project::{apply_matches, command_words, has_switch, project_command};
