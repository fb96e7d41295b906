//! Layered configuration for Strata
//!
//! Configuration is read from, most specific first:
//! 1. `.strata.toml` in the working directory and each of its ancestors
//! 2. `~/.config/strata/config.toml`
//! 3. `/etc/strata.toml`
//!
//! A key set by a more specific file is never overridden by a farther one.

use crate::error::{StrataError, StrataResult};
use std::fs;
use std::path::{Path, PathBuf};
use toml::{Table, Value};
use tracing::debug;

/// Name of the per-directory configuration file
pub const LOCAL_CONFIG_NAME: &str = ".strata.toml";

/// Merged view over all configuration layers
#[derive(Debug, Clone, Default)]
pub struct Settings {
    sections: Table,
    sources: Vec<PathBuf>,
}

impl Settings {
    /// Settings with no layers at all (`--noconfig`)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Discover and merge every layer that applies to `cwd`
    pub fn discover(cwd: &Path) -> StrataResult<Self> {
        let mut files = Self::find_local_configs(cwd);
        files.push(Self::user_config_path());
        files.push(PathBuf::from("/etc/strata.toml"));
        Self::from_files(&files)
    }

    /// Merge the given files, first file winning; missing files are skipped
    pub fn from_files(files: &[PathBuf]) -> StrataResult<Self> {
        let mut settings = Self::empty();
        for path in files {
            if !path.is_file() {
                continue;
            }
            let layer = Self::read_layer(path)?;
            settings.merge_layer(layer);
            settings.sources.push(path.clone());
            debug!("Read configuration from {}", path.display());
        }
        Ok(settings)
    }

    /// Parse a single configuration layer
    pub fn parse(content: &str) -> StrataResult<Self> {
        let mut settings = Self::empty();
        settings.merge_layer(content.parse::<Table>()?);
        Ok(settings)
    }

    fn read_layer(path: &Path) -> StrataResult<Table> {
        let content = fs::read_to_string(path).map_err(|e| {
            StrataError::io(format!("reading config from {}", path.display()), e)
        })?;

        content
            .parse::<Table>()
            .map_err(|e| StrataError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// Add a weaker layer: only keys not yet present are taken
    fn merge_layer(&mut self, layer: Table) {
        for (section, values) in layer {
            let Value::Table(values) = values else {
                continue;
            };
            let target = self
                .sections
                .entry(section)
                .or_insert_with(|| Value::Table(Table::new()));
            if let Value::Table(target) = target {
                for (key, value) in values {
                    target.entry(key).or_insert(value);
                }
            }
        }
    }

    /// `.strata.toml` files from `cwd` up to the filesystem root
    pub fn find_local_configs(cwd: &Path) -> Vec<PathBuf> {
        cwd.ancestors()
            .map(|dir| dir.join(LOCAL_CONFIG_NAME))
            .filter(|path| path.is_file())
            .collect()
    }

    /// Get the user-global config file path
    pub fn user_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("strata")
            .join("config.toml")
    }

    pub fn section(&self, section: &str) -> Option<&Table> {
        self.sections.get(section).and_then(Value::as_table)
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&Value> {
        self.section(section).and_then(|s| s.get(key))
    }

    /// Value rendered as a string; integers and booleans are accepted too
    pub fn get_string(&self, section: &str, key: &str) -> Option<String> {
        match self.get(section, key)? {
            Value::String(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Boolean(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// A path list, either as a TOML array or a path-separator-joined string
    pub fn get_paths(&self, section: &str, key: &str) -> Vec<String> {
        match self.get(section, key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Some(Value::String(joined)) => split_paths(joined),
            _ => Vec::new(),
        }
    }

    /// Program to run for `name`, honouring `[tools]` overrides
    pub fn tool(&self, name: &str) -> String {
        self.get_string("tools", name)
            .unwrap_or_else(|| name.to_string())
    }

    /// Files that contributed to these settings, most specific first
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }
}

/// Split a path-separator-joined list, dropping empty entries
pub fn split_paths(joined: &str) -> Vec<String> {
    std::env::split_paths(joined)
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_string_lossy().into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_files_are_skipped() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::from_files(&[temp.path().join("nope.toml")]).unwrap();
        assert!(settings.sources().is_empty());
        assert!(settings.section("build").is_none());
    }

    #[test]
    fn closer_layer_wins() {
        let temp = TempDir::new().unwrap();
        let near = temp.path().join("near.toml");
        let far = temp.path().join("far.toml");
        fs::write(&near, "[build]\nprefix = \"/near\"\n").unwrap();
        fs::write(
            &far,
            "[build]\nprefix = \"/far\"\nparallel = 4\n[tools]\nmake = \"gmake\"\n",
        )
        .unwrap();

        let settings = Settings::from_files(&[near, far]).unwrap();
        assert_eq!(settings.get_string("build", "prefix").as_deref(), Some("/near"));
        assert_eq!(settings.get_string("build", "parallel").as_deref(), Some("4"));
        assert_eq!(settings.tool("make"), "gmake");
        assert_eq!(settings.tool("cmake"), "cmake");
        assert_eq!(settings.sources().len(), 2);
    }

    #[test]
    fn finds_local_configs_up_the_tree() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp.path().join(LOCAL_CONFIG_NAME), "").unwrap();
        fs::write(nested.join(LOCAL_CONFIG_NAME), "").unwrap();

        let found = Settings::find_local_configs(&nested);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], nested.join(LOCAL_CONFIG_NAME));
        assert_eq!(found[1], temp.path().join(LOCAL_CONFIG_NAME));
    }

    #[test]
    fn malformed_file_names_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        fs::write(&path, "[build\nprefix = ").unwrap();

        let err = Settings::from_files(&[path.clone()]).unwrap_err();
        assert!(matches!(err, StrataError::ConfigInvalid { path: p, .. } if p == path));
    }

    #[test]
    fn path_lists() {
        let settings = Settings::parse(
            r#"
            [build]
            include_path = ["/a", "", "/b"]
            library_path = "/x:/y"
            "#,
        )
        .unwrap();
        assert_eq!(settings.get_paths("build", "include_path"), vec!["/a", "/b"]);
        #[cfg(unix)]
        assert_eq!(settings.get_paths("build", "library_path"), vec!["/x", "/y"]);
        assert!(settings.get_paths("build", "missing").is_empty());
    }
}
