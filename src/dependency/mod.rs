//! Dependency declarations and their routing into option groups
//!
//! A project declares requirements by name. Each requirement becomes a
//! [`Dependency`] of some [`DependencyKind`] and is routed to the most
//! specific registered [`GroupSpec`] that can manage it. Groups contribute
//! the `--with-<name>` switches and apply resolved paths to the consuming
//! project.

mod group;
mod kind;
mod model;
mod set;

pub use group::{DependencyGroup, GroupRegistry, GroupSpec};
pub use kind::DependencyKind;
pub use model::{isdir, validated_path, Dependency, DependencyTarget};
pub use set::{Dependencies, DependencySpec};
