//! Sibling project discovery and batch walking
//!
//! A search root is scanned for directories holding a `strata.toml`. Each
//! one becomes a [`ProjectHandle`] whose self-description is fetched at
//! most once per walk through a [`ProjectProbe`]. The resulting
//! [`ProjectIndex`] serves two consumers:
//!
//! - dependency auto-resolution, which only needs name to path locations,
//! - the [`Walker`], which orders projects by their declared dependencies
//!   and runs commands in each of them, resumably.

mod index;
mod meta;
mod order;
mod runner;
mod tracker;

pub use index::{project_dirs, ProjectHandle, ProjectIndex, ScanMode};
pub use meta::{DriverProbe, PackageList, ProjectMeta, ProjectProbe};
pub use order::{closure, sort_by_deps};
pub use runner::{WalkOptions, Walker};
pub use tracker::TrackingSet;
