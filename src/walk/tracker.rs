//! Persisted record of projects a batch run has completed

use crate::error::{StrataError, StrataResult};
use crate::ui::{self, UiContext};
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Names of the projects already processed, optionally backed by a file
#[derive(Debug, Clone, Default)]
pub struct TrackingSet {
    file: Option<PathBuf>,
    names: BTreeSet<String>,
}

impl TrackingSet {
    /// Read `file` if given. A missing file is an empty set; an unreadable
    /// one is reported and treated as empty.
    pub fn load(file: Option<&Path>, ui: &UiContext) -> Self {
        let mut set = Self {
            file: file.map(Path::to_path_buf),
            names: BTreeSet::new(),
        };

        let Some(path) = file else {
            return set;
        };

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<Vec<String>>(&content) {
                Ok(names) => {
                    debug!("Tracking {} project(s) from {}", names.len(), path.display());
                    set.names = names.into_iter().collect();
                }
                Err(e) => ui::warn(
                    ui,
                    &format!("ignoring malformed tracking file {}: {}", path.display(), e),
                ),
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => ui::warn(
                ui,
                &format!("cannot read tracking file {}: {}", path.display(), e),
            ),
        }
        set
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Rewrite the backing file, if any
    pub fn save(&self) -> StrataResult<()> {
        let Some(path) = &self.file else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(&self.names)?;
        fs::write(path, content + "\n")
            .map_err(|e| StrataError::io(format!("writing tracking file {}", path.display()), e))
    }

    /// Remove the backing file after a complete pass
    pub fn clear(&mut self) -> StrataResult<()> {
        self.names.clear();
        let Some(path) = &self.file else {
            return Ok(());
        };
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StrataError::io(
                format!("removing tracking file {}", path.display()),
                e,
            )),
        }
    }
}
