//! Discovery of sibling projects below a search root

use super::meta::{ProjectMeta, ProjectProbe};
use crate::error::{StrataError, StrataResult};
use crate::project::MANIFEST_FILE;
use crate::ui::{self, UiContext};
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// How a discovered project directory is named
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Directory basename, no subprocess
    Fast,
    /// Name reported by the project's own self-description
    Thorough,
}

impl ScanMode {
    /// Split a `[slow:]PATH` search path into its mode and directory
    pub fn from_search_path(search_path: &str) -> (Self, &str) {
        match search_path.strip_prefix("slow:") {
            Some(path) => (Self::Thorough, path),
            None => (Self::Fast, search_path),
        }
    }
}

/// A project directory with lazily fetched metadata
pub struct ProjectHandle<'p> {
    name: String,
    dir: PathBuf,
    probe: &'p dyn ProjectProbe,
    meta: OnceCell<ProjectMeta>,
}

impl<'p> ProjectHandle<'p> {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>, probe: &'p dyn ProjectProbe) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            probe,
            meta: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Self-description, fetched on first use and kept for the rest of the walk
    pub fn meta(&self) -> StrataResult<&ProjectMeta> {
        if let Some(meta) = self.meta.get() {
            return Ok(meta);
        }
        let meta = self.probe.describe(&self.dir)?;
        Ok(self.meta.get_or_init(|| meta))
    }

    pub fn dependencies(&self) -> StrataResult<&[String]> {
        Ok(&self.meta()?.dependencies)
    }

    pub fn supports(&self, command: &str) -> StrataResult<bool> {
        Ok(self.meta()?.supports(command))
    }
}

/// Directories below `root` holding a project manifest.
///
/// Hidden directories are skipped, and a project directory is never
/// descended into. Entries come in file-name order.
pub fn project_dirs(root: &Path) -> impl Iterator<Item = StrataResult<PathBuf>> {
    let mut entries = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    std::iter::from_fn(move || loop {
        let entry = match entries.next()? {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Some(Err(StrataError::Walk(e))),
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }

        if entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.') {
            entries.skip_current_dir();
            continue;
        }

        if entry.path().join(MANIFEST_FILE).is_file() {
            entries.skip_current_dir();
            return Some(Ok(entry.into_path()));
        }
    })
}

/// Projects found below a search root, keyed by name
#[derive(Default)]
pub struct ProjectIndex<'p> {
    projects: BTreeMap<String, ProjectHandle<'p>>,
}

impl<'p> ProjectIndex<'p> {
    pub fn new() -> Self {
        Self {
            projects: BTreeMap::new(),
        }
    }

    /// Scan `root` and name every project found according to `mode`
    pub fn scan(
        root: &Path,
        mode: ScanMode,
        probe: &'p dyn ProjectProbe,
        ui: &UiContext,
    ) -> StrataResult<Self> {
        let root = dunce::canonicalize(root)
            .map_err(|e| StrataError::io(format!("reading {}", root.display()), e))?;

        let mut index = Self::new();

        for dir in project_dirs(&root) {
            let dir = dir?;
            let handle = match mode {
                ScanMode::Fast => {
                    let name = dir
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    ProjectHandle::new(name, dir, probe)
                }
                ScanMode::Thorough => {
                    let mut handle = ProjectHandle::new(String::new(), dir, probe);
                    handle.name = handle.meta()?.project.clone();
                    handle
                }
            };
            index.insert(handle, ui);
        }

        Ok(index)
    }

    /// Add a project; a name seen before keeps its first location
    pub fn insert(&mut self, handle: ProjectHandle<'p>, ui: &UiContext) {
        if let Some(existing) = self.projects.get(handle.name()) {
            ui::warn(
                ui,
                &format!(
                    "Ignoring {}: project {} already found in {}",
                    handle.dir().display(),
                    handle.name(),
                    existing.dir().display()
                ),
            );
            return;
        }
        debug!("found {}", handle.name());
        self.projects.insert(handle.name().to_string(), handle);
    }

    pub fn get(&self, name: &str) -> Option<&ProjectHandle<'p>> {
        self.projects.get(name)
    }

    /// All projects, ordered by name
    pub fn projects(&self) -> impl Iterator<Item = &ProjectHandle<'p>> {
        self.projects.values()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Name to directory mapping used for auto-resolution
    pub fn locations(&self) -> BTreeMap<String, PathBuf> {
        self.projects
            .iter()
            .map(|(name, handle)| (name.clone(), handle.dir.clone()))
            .collect()
    }
}
