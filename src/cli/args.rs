//! CLI argument definitions for the batch walker using clap derive

use crate::walk::WalkOptions;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Run strata commands across a tree of sibling projects
///
/// Projects are ordered so that every project comes after the projects it
/// depends on. Each listed command is run in every project that supports
/// it; the built-in commands debinstall, debremove and debpurge manage the
/// Debian packages the projects produce.
#[derive(Parser, Debug)]
#[command(name = "strata-walk")]
#[command(author, version, about, long_about = None)]
pub struct WalkCli {
    /// Track projects that have already been worked on
    #[arg(short, long, value_name = "FILE")]
    pub track: Option<PathBuf>,

    /// Run only for these comma-separated projects and their dependencies
    #[arg(short, long, value_name = "NAMES")]
    pub projects: Option<String>,

    /// Base path to projects
    #[arg(short, long, value_name = "PATH", default_value = ".")]
    pub base: PathBuf,

    /// Reverse dependency order
    #[arg(short, long)]
    pub reverse: bool,

    /// Do not pass --with-<name> for dependent projects
    #[arg(short = 'n', long = "no-deps")]
    pub no_deps: bool,

    /// Carry on even if the dependency resolver fails
    #[arg(short, long)]
    pub force: bool,

    /// Force dpkg install even if dependency problems are reported
    #[arg(short = 'F', long)]
    pub force_install: bool,

    /// Do not actually run the commands
    #[arg(long)]
    pub dry_run: bool,

    /// Program run in each project directory
    #[arg(long, value_name = "PROGRAM", env = "STRATA_DRIVER", default_value = "strata")]
    pub driver: String,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Commands to run in each project
    #[arg(value_name = "COMMANDS")]
    pub commands: Vec<String>,
}

impl WalkCli {
    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            track: self.track.clone(),
            projects: self.projects.clone(),
            reverse: self.reverse,
            nodeps: self.no_deps,
            force: self.force,
            force_install: self.force_install,
            dry_run: self.dry_run,
        }
    }
}
