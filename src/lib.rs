//! Strata - build orchestration for trees of sibling projects
//!
//! Each project carries a `strata.toml` describing its build commands and
//! the projects it depends on. The `strata` binary runs one project's
//! lifecycle commands with dependency paths resolved and options cached;
//! `strata-walk` runs commands across every project below a directory in
//! dependency order.

pub mod cache;
pub mod cli;
pub mod config;
pub mod dependency;
pub mod error;
pub mod options;
pub mod orchestration;
pub mod project;
pub mod ui;
pub mod walk;

pub use error::{StrataError, StrataResult};
