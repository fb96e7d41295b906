//! A single declared dependency and how it applies to a project

use super::kind::DependencyKind;
use crate::cache::Cache;
use crate::error::StrataResult;
use crate::options::{OptionBag, OptionSpec, SharedOptions};
use crate::ui::{self, UiContext};
use std::path::{Path, PathBuf};
use tracing::debug;

/// The project a dependency's paths are injected into
pub trait DependencyTarget {
    fn add_include_path(&mut self, path: PathBuf);

    fn add_library_path(&mut self, path: PathBuf);

    /// Whether the project compiles interface definitions itself
    fn accepts_schema_paths(&self) -> bool {
        false
    }

    fn add_schema_path(&mut self, _path: PathBuf) {}

    /// True when building out of source
    fn out_of_source(&self) -> bool;

    /// Out-of-source build directory, relative to a project root
    fn oos_build_dir(&self) -> PathBuf;

    fn ui(&self) -> &UiContext;
}

fn expand_home(base: &str) -> PathBuf {
    match base.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => dirs::home_dir()
            .map(|home| home.join(rest.trim_start_matches('/')))
            .unwrap_or_else(|| PathBuf::from(base)),
        _ => PathBuf::from(base),
    }
}

fn resolve(base: &str, parts: &[&Path]) -> PathBuf {
    let mut path = expand_home(base);
    for part in parts {
        path.push(part);
    }
    dunce::canonicalize(&path).unwrap_or(path)
}

/// `base` joined with `parts`, expanded and canonicalized.
///
/// With a UI context, a missing directory is reported as a warning. The
/// path is returned either way.
pub fn validated_path(base: &str, parts: &[&Path], ui: Option<&UiContext>) -> PathBuf {
    let path = resolve(base, parts);
    if let Some(ctx) = ui {
        if !path.is_dir() {
            ui::warn(ctx, &format!("{} not found.", path.display()));
        }
    }
    path
}

/// Whether `base` joined with `parts` is an existing directory
pub fn isdir(base: &str, parts: &[&Path]) -> bool {
    resolve(base, parts).is_dir()
}

/// One named requirement of a project
#[derive(Debug, Clone)]
pub struct Dependency {
    name: String,
    kind: DependencyKind,
    options: Option<SharedOptions>,
}

impl Dependency {
    pub fn new(name: impl Into<String>, kind: DependencyKind) -> Self {
        let name = name.into();
        let options = kind
            .is_path_based()
            .then(|| OptionBag::new(name.clone()).shared());
        Self {
            name,
            kind,
            options,
        }
    }

    pub fn marker(name: impl Into<String>) -> Self {
        Self::new(name, DependencyKind::Marker)
    }

    pub fn c_library(name: impl Into<String>) -> Self {
        Self::new(name, DependencyKind::CLibrary)
    }

    pub fn runtime(name: impl Into<String>) -> Self {
        Self::new(name, DependencyKind::Runtime)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, DependencyKind::Interface)
    }

    pub fn script_interface(name: impl Into<String>) -> Self {
        Self::new(name, DependencyKind::ScriptInterface)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DependencyKind {
        self.kind
    }

    /// Whether the dependency exposes a `--with-<name>` switch
    pub fn has_options(&self) -> bool {
        self.options.is_some()
    }

    /// Bag holding the `path` value, for path-based variants
    pub fn options(&self) -> Option<&SharedOptions> {
        self.options.as_ref()
    }

    /// Resolved location, if any
    pub fn path(&self) -> Option<String> {
        self.options
            .as_ref()
            .and_then(|bag| bag.borrow().get_str("path").map(str::to_string))
    }

    pub fn is_satisfied(&self) -> bool {
        !self.kind.is_path_based() || self.path().is_some()
    }

    /// Offer a path without overriding one that is already set
    pub fn state_merge(&self, path: &str) {
        if let Some(bag) = &self.options {
            bag.borrow_mut().state_merge([("path", path)]);
        }
    }

    pub fn set_cache(&self, cache: &mut Cache) -> StrataResult<()> {
        match &self.options {
            Some(bag) => cache.register(bag.clone()),
            None => Ok(()),
        }
    }

    /// Declare the `--with-<name>=PATH` switch under `heading`
    pub fn add_options(&self, heading: &str) {
        if let Some(bag) = &self.options {
            bag.borrow_mut().add_option(
                OptionSpec::value(&format!("--with-{}", self.name), "path")
                    .metavar("PATH")
                    .help(format!("use {} includes/libraries from this path", self.name))
                    .heading(heading),
            );
        }
    }

    /// Inject the resolved paths into `target`
    pub fn apply(&self, target: &mut dyn DependencyTarget) {
        let Some(path) = self.path() else {
            return;
        };

        match self.kind {
            DependencyKind::Marker | DependencyKind::Runtime => {}
            DependencyKind::CLibrary => apply_c_library(&path, target),
            DependencyKind::Interface => {
                apply_schemas(&path, target);
                apply_c_library(&path, target);
            }
            DependencyKind::ScriptInterface => {
                apply_schemas(&path, target);
                let lib = validated_path(&path, &[], None);
                debug!("Added lib-path: {}", lib.display());
                target.add_library_path(lib);
            }
        }
    }
}

fn apply_c_library(path: &str, target: &mut dyn DependencyTarget) {
    let ui = *target.ui();

    let include = validated_path(path, &[Path::new("include")], Some(&ui));
    debug!("Added inc-path: {}", include.display());
    target.add_include_path(include);

    // The dependency may have been built in or out of source; pick the
    // layout that matches ours when it exists, else whichever one does.
    let in_tree = PathBuf::from("lib");
    let out_of_tree = target.oos_build_dir().join("lib");
    let in_tree_exists = isdir(path, &[&in_tree]);
    let out_of_tree_exists = isdir(path, &[&out_of_tree]);

    let chosen = if target.out_of_source() {
        if out_of_tree_exists || !in_tree_exists {
            out_of_tree
        } else {
            in_tree
        }
    } else if !in_tree_exists && out_of_tree_exists {
        out_of_tree
    } else {
        in_tree
    };

    let lib = validated_path(path, &[&chosen], Some(&ui));
    debug!("Added lib-path: {}", lib.display());
    target.add_library_path(lib);
}

fn apply_schemas(path: &str, target: &mut dyn DependencyTarget) {
    if !target.accepts_schema_paths() {
        return;
    }

    let in_tree = validated_path(path, &[Path::new("schemas")], None);
    let schemas = if in_tree.is_dir() {
        in_tree
    } else {
        let ui = *target.ui();
        validated_path(path, &[Path::new("share"), Path::new("schemas")], Some(&ui))
    };
    debug!("Added schema-path: {}", schemas.display());
    target.add_schema_path(schemas);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cache::Cacheable;
    use std::fs;
    use tempfile::TempDir;

    /// Consuming project that records injected paths
    #[derive(Default)]
    pub struct RecordingTarget {
        pub includes: Vec<PathBuf>,
        pub libraries: Vec<PathBuf>,
        pub schemas: Vec<PathBuf>,
        pub out_of_source: bool,
        pub schema_aware: bool,
        pub ui: UiContext,
    }

    impl DependencyTarget for RecordingTarget {
        fn add_include_path(&mut self, path: PathBuf) {
            self.includes.push(path);
        }

        fn add_library_path(&mut self, path: PathBuf) {
            self.libraries.push(path);
        }

        fn accepts_schema_paths(&self) -> bool {
            self.schema_aware
        }

        fn add_schema_path(&mut self, path: PathBuf) {
            self.schemas.push(path);
        }

        fn out_of_source(&self) -> bool {
            self.out_of_source
        }

        fn oos_build_dir(&self) -> PathBuf {
            PathBuf::from("build").join("linux").join("release")
        }

        fn ui(&self) -> &UiContext {
            &self.ui
        }
    }

    fn canonical(path: &Path) -> PathBuf {
        dunce::canonicalize(path).unwrap()
    }

    #[test]
    fn marker_is_always_satisfied() {
        let dep = Dependency::marker("pthread");
        assert!(dep.is_satisfied());
        assert!(!dep.has_options());
        assert!(dep.path().is_none());
    }

    #[test]
    fn path_based_needs_a_path() {
        let dep = Dependency::c_library("libbar");
        assert!(!dep.is_satisfied());
        dep.state_merge("/opt/libbar");
        assert!(dep.is_satisfied());
        dep.state_merge("/elsewhere");
        assert_eq!(dep.path().as_deref(), Some("/opt/libbar"));
    }

    #[test]
    fn cached_path_is_persisted() {
        let dep = Dependency::runtime("pyutil");
        let mut cache = Cache::new("dependencies");
        dep.set_cache(&mut cache).unwrap();
        dep.add_options("Runtime Dependency Options");
        dep.state_merge("/src/pyutil");
        assert_eq!(
            cache.state(),
            serde_json::json!({"pyutil": {"path": "/src/pyutil"}})
        );
    }

    #[test]
    fn c_library_prefers_in_tree_when_building_in_source() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("include")).unwrap();
        fs::create_dir_all(temp.path().join("lib")).unwrap();
        fs::create_dir_all(temp.path().join("build/linux/release/lib")).unwrap();

        let dep = Dependency::c_library("libbar");
        dep.state_merge(temp.path().to_str().unwrap());

        let mut target = RecordingTarget::default();
        dep.apply(&mut target);

        assert_eq!(target.includes, vec![canonical(&temp.path().join("include"))]);
        assert_eq!(target.libraries, vec![canonical(&temp.path().join("lib"))]);
    }

    #[test]
    fn c_library_prefers_out_of_tree_when_building_out_of_source() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("lib")).unwrap();
        fs::create_dir_all(temp.path().join("build/linux/release/lib")).unwrap();

        let dep = Dependency::c_library("libbar");
        dep.state_merge(temp.path().to_str().unwrap());

        let mut target = RecordingTarget {
            out_of_source: true,
            ..Default::default()
        };
        dep.apply(&mut target);

        assert_eq!(
            target.libraries,
            vec![canonical(&temp.path().join("build/linux/release/lib"))]
        );
    }

    #[test]
    fn c_library_falls_back_to_the_existing_layout() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("build/linux/release/lib")).unwrap();

        let dep = Dependency::c_library("libbar");
        dep.state_merge(temp.path().to_str().unwrap());

        let mut target = RecordingTarget::default();
        dep.apply(&mut target);
        assert_eq!(
            target.libraries,
            vec![canonical(&temp.path().join("build/linux/release/lib"))]
        );

        let only_in_tree = TempDir::new().unwrap();
        fs::create_dir_all(only_in_tree.path().join("lib")).unwrap();
        let dep = Dependency::c_library("libbaz");
        dep.state_merge(only_in_tree.path().to_str().unwrap());

        let mut target = RecordingTarget {
            out_of_source: true,
            ..Default::default()
        };
        dep.apply(&mut target);
        assert_eq!(target.libraries, vec![canonical(&only_in_tree.path().join("lib"))]);
    }

    #[test]
    fn runtime_applies_nothing() {
        let dep = Dependency::runtime("pyutil");
        dep.state_merge("/src/pyutil");
        let mut target = RecordingTarget::default();
        dep.apply(&mut target);
        assert!(target.includes.is_empty());
        assert!(target.libraries.is_empty());
    }

    #[test]
    fn interface_adds_installed_schemas() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("share/schemas")).unwrap();

        let dep = Dependency::interface("api");
        dep.state_merge(temp.path().to_str().unwrap());

        let mut target = RecordingTarget {
            schema_aware: true,
            ..Default::default()
        };
        dep.apply(&mut target);

        assert_eq!(target.schemas, vec![canonical(&temp.path().join("share/schemas"))]);
        assert_eq!(target.includes.len(), 1);
        assert_eq!(target.libraries.len(), 1);
    }

    #[test]
    fn script_interface_prefers_in_tree_schemas() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("schemas")).unwrap();
        fs::create_dir_all(temp.path().join("share/schemas")).unwrap();

        let dep = Dependency::script_interface("api");
        dep.state_merge(temp.path().to_str().unwrap());

        let mut target = RecordingTarget {
            schema_aware: true,
            ..Default::default()
        };
        dep.apply(&mut target);

        assert_eq!(target.schemas, vec![canonical(&temp.path().join("schemas"))]);
        assert_eq!(target.libraries, vec![canonical(temp.path())]);
        assert!(target.includes.is_empty());
    }

    #[test]
    fn validated_path_keeps_missing_paths() {
        let path = validated_path("/definitely/not/here", &[Path::new("include")], None);
        assert_eq!(path, PathBuf::from("/definitely/not/here/include"));
        assert!(!isdir("/definitely/not/here", &[]));
    }
}
