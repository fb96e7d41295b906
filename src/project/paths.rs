//! Search paths collected for a project's build commands

use crate::cache::platform_key;
use crate::dependency::DependencyTarget;
use crate::ui::UiContext;
use std::path::{Path, PathBuf};

/// Where the project builds, and the paths handed to its build commands
#[derive(Debug, Clone)]
pub struct BuildPaths {
    include: Vec<PathBuf>,
    library: Vec<PathBuf>,
    schema: Vec<PathBuf>,
    out_of_source: bool,
    oos_dir: PathBuf,
    schema_aware: bool,
    ui: UiContext,
}

impl BuildPaths {
    pub fn new(ui: UiContext) -> Self {
        Self {
            include: Vec::new(),
            library: Vec::new(),
            schema: Vec::new(),
            out_of_source: false,
            oos_dir: oos_dir(None),
            schema_aware: false,
            ui,
        }
    }

    /// Select in- or out-of-source building for `configuration`
    pub fn set_layout(&mut self, out_of_source: bool, configuration: Option<&str>) {
        self.out_of_source = out_of_source;
        self.oos_dir = oos_dir(configuration);
    }

    pub fn set_schema_aware(&mut self, schema_aware: bool) {
        self.schema_aware = schema_aware;
    }

    pub fn is_out_of_source(&self) -> bool {
        self.out_of_source
    }

    /// Directory the build commands work in, relative to the project
    pub fn build_dir(&self) -> &Path {
        if self.out_of_source {
            &self.oos_dir
        } else {
            Path::new(".")
        }
    }

    pub fn include_paths(&self) -> &[PathBuf] {
        &self.include
    }

    pub fn library_paths(&self) -> &[PathBuf] {
        &self.library
    }

    pub fn schema_paths(&self) -> &[PathBuf] {
        &self.schema
    }
}

fn oos_dir(configuration: Option<&str>) -> PathBuf {
    PathBuf::from("build")
        .join(platform_key())
        .join(configuration.unwrap_or("default"))
}

fn push_unique(paths: &mut Vec<PathBuf>, path: PathBuf) {
    if !paths.contains(&path) {
        paths.push(path);
    }
}

impl DependencyTarget for BuildPaths {
    fn add_include_path(&mut self, path: PathBuf) {
        push_unique(&mut self.include, path);
    }

    fn add_library_path(&mut self, path: PathBuf) {
        push_unique(&mut self.library, path);
    }

    fn accepts_schema_paths(&self) -> bool {
        self.schema_aware
    }

    fn add_schema_path(&mut self, path: PathBuf) {
        push_unique(&mut self.schema, path);
    }

    fn out_of_source(&self) -> bool {
        self.out_of_source
    }

    fn oos_build_dir(&self) -> PathBuf {
        self.oos_dir.clone()
    }

    fn ui(&self) -> &UiContext {
        &self.ui
    }
}

/// Join paths with the platform separator
pub fn join_paths(paths: &[PathBuf]) -> String {
    std::env::join_paths(paths)
        .map(|joined| joined.to_string_lossy().into_owned())
        .unwrap_or_else(|_| {
            paths
                .iter()
                .map(|p| p.to_string_lossy())
                .collect::<Vec<_>>()
                .join(":")
        })
}
