//! Self-description of a project, and the probe that obtains it

use crate::error::{StrataError, StrataResult};
use crate::orchestration::{CommandRunner, Invocation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Packages produced for one packaging format
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageList {
    #[serde(default)]
    pub package: Vec<String>,
}

/// What `strata -q meta` prints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMeta {
    pub project: String,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub packaging: BTreeMap<String, PackageList>,
}

impl ProjectMeta {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            ..Self::default()
        }
    }

    /// Names of the Debian packages the project builds
    pub fn debian_packages(&self) -> &[String] {
        self.packaging
            .get("debian")
            .map(|list| list.package.as_slice())
            .unwrap_or_default()
    }

    /// True if `command` names one of the project's commands exactly or is
    /// a prefix of exactly one of them
    pub fn supports(&self, command: &str) -> bool {
        self.commands.iter().any(|c| c == command)
            || self
                .commands
                .iter()
                .filter(|c| c.starts_with(command))
                .count()
                == 1
    }
}

/// Obtains a project's self-description
pub trait ProjectProbe {
    fn describe(&self, dir: &Path) -> StrataResult<ProjectMeta>;
}

/// Asks the project itself by running `<driver> -q meta` in its directory
pub struct DriverProbe<'r> {
    driver: String,
    runner: &'r dyn CommandRunner,
}

impl<'r> DriverProbe<'r> {
    pub fn new(driver: impl Into<String>, runner: &'r dyn CommandRunner) -> Self {
        Self {
            driver: driver.into(),
            runner,
        }
    }
}

impl ProjectProbe for DriverProbe<'_> {
    fn describe(&self, dir: &Path) -> StrataResult<ProjectMeta> {
        debug!("Querying meta information in {}", dir.display());

        let invocation = Invocation::new(&self.driver)
            .args(["-q", "meta"])
            .current_dir(dir);

        let describe_error = |reason: String| StrataError::ProjectDescribe {
            path: dir.to_path_buf(),
            reason,
        };

        let output = self
            .runner
            .output(&invocation)
            .map_err(|e| describe_error(e.to_string()))?;

        serde_json::from_str(&output).map_err(|e| describe_error(e.to_string()))
    }
}
