//! The `strata.toml` project manifest

use crate::dependency::{Dependency, DependencyKind, DependencySpec};
use crate::error::{StrataError, StrataResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the file marking a project directory
pub const MANIFEST_FILE: &str = "strata.toml";

/// A declared dependency, either bare or with an explicit kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyDecl {
    Name(String),
    Typed { name: String, kind: DependencyKind },
}

impl DependencyDecl {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Typed { name, .. } => name,
        }
    }
}

impl From<&DependencyDecl> for DependencySpec {
    fn from(decl: &DependencyDecl) -> Self {
        match decl {
            DependencyDecl::Name(name) => DependencySpec::Name(name.clone()),
            DependencyDecl::Typed { name, kind } => {
                DependencySpec::Typed(Dependency::new(name.clone(), *kind))
            }
        }
    }
}

/// `[project]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default = "default_dependency_kind")]
    pub default_dependency: DependencyKind,
    #[serde(default = "default_prefix")]
    pub default_prefix: String,
    #[serde(default)]
    pub depends: Vec<DependencyDecl>,
}

fn default_dependency_kind() -> DependencyKind {
    DependencyKind::CLibrary
}

fn default_prefix() -> String {
    "/usr/local".to_string()
}

/// `[build]`: command lines run for each lifecycle step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSection {
    pub configurations: Vec<String>,
    pub configure: Option<Vec<String>>,
    pub build: Option<Vec<String>>,
    pub test: Option<Vec<String>>,
    pub install: Option<Vec<String>>,
    pub clean: Option<Vec<String>>,
    pub package: Option<Vec<String>>,
}

/// `[package]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageSection {
    pub debian: Vec<String>,
}

/// Parsed `strata.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub project: ProjectSection,
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default)]
    pub package: Option<PackageSection>,
}

impl Manifest {
    /// Load the manifest of the project in `dir`
    pub fn load(dir: &Path) -> StrataResult<Self> {
        let path = Self::manifest_path(dir);
        if !path.is_file() {
            return Err(StrataError::ManifestNotFound(path));
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| StrataError::io(format!("reading {}", path.display()), e))?;
        Self::parse(&content, &path)
    }

    pub fn parse(content: &str, path: &Path) -> StrataResult<Self> {
        let manifest: Self = toml::from_str(content).map_err(|e| StrataError::ManifestInvalid {
            path: path.to_path_buf(),
            reason: e.message().to_string(),
        })?;
        manifest.validate(path)?;
        Ok(manifest)
    }

    fn validate(&self, path: &Path) -> StrataResult<()> {
        let invalid = |reason: String| StrataError::ManifestInvalid {
            path: path.to_path_buf(),
            reason,
        };

        if self.project.name.trim().is_empty() {
            return Err(invalid("project.name must not be empty".to_string()));
        }

        let steps = [
            ("configure", &self.build.configure),
            ("build", &self.build.build),
            ("test", &self.build.test),
            ("install", &self.build.install),
            ("clean", &self.build.clean),
            ("package", &self.build.package),
        ];
        for (step, command) in steps {
            if matches!(command, Some(words) if words.is_empty()) {
                return Err(invalid(format!("build.{} must not be an empty command", step)));
            }
        }

        let mut seen = std::collections::BTreeSet::new();
        for decl in &self.project.depends {
            if !seen.insert(decl.name()) {
                return Err(invalid(format!("dependency '{}' declared twice", decl.name())));
            }
        }
        Ok(())
    }

    pub fn has_packaging(&self) -> bool {
        self.package.is_some()
    }

    /// Names of the Debian packages the project builds
    pub fn debian_packages(&self) -> &[String] {
        self.package
            .as_ref()
            .map(|p| p.debian.as_slice())
            .unwrap_or_default()
    }

    pub fn manifest_path(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> StrataResult<Manifest> {
        Manifest::parse(content, Path::new("strata.toml"))
    }

    #[test]
    fn minimal_manifest() {
        let manifest = parse("[project]\nname = \"tool\"\n").unwrap();
        assert_eq!(manifest.project.name, "tool");
        assert_eq!(manifest.project.default_dependency, DependencyKind::CLibrary);
        assert_eq!(manifest.project.default_prefix, "/usr/local");
        assert!(manifest.build.configurations.is_empty());
        assert!(!manifest.has_packaging());
    }

    #[test]
    fn full_manifest() {
        let manifest = parse(
            r#"
[project]
name = "libfoo"
version = "1.4.0"
default_dependency = "runtime"
depends = ["pyutil", { name = "schemas", kind = "interface" }]

[build]
configurations = ["debug", "release"]
configure = ["cmake", "-S", ".", "-B", "{build_dir}"]
build = ["make", "-C", "{build_dir}", "-j{jobs}"]

[package]
debian = ["libfoo", "libfoo-dev"]
"#,
        )
        .unwrap();

        assert_eq!(manifest.project.version.as_deref(), Some("1.4.0"));
        assert_eq!(
            manifest.project.depends,
            vec![
                DependencyDecl::Name("pyutil".into()),
                DependencyDecl::Typed {
                    name: "schemas".into(),
                    kind: DependencyKind::Interface,
                },
            ]
        );
        assert_eq!(manifest.build.configurations, vec!["debug", "release"]);
        assert!(manifest.build.test.is_none());
        assert_eq!(manifest.debian_packages(), ["libfoo", "libfoo-dev"]);
    }

    #[test]
    fn rejects_unknown_keys_and_kinds() {
        assert!(matches!(
            parse("[project]\nname = \"x\"\nflavour = \"y\"\n"),
            Err(StrataError::ManifestInvalid { .. })
        ));
        assert!(matches!(
            parse("[project]\nname = \"x\"\ndefault_dependency = \"fortran\"\n"),
            Err(StrataError::ManifestInvalid { .. })
        ));
    }

    #[test]
    fn rejects_empty_commands_and_duplicates() {
        assert!(parse("[project]\nname = \"x\"\n[build]\nbuild = []\n").is_err());
        assert!(parse("[project]\nname = \"x\"\ndepends = [\"a\", \"a\"]\n").is_err());
        assert!(parse("[project]\nname = \"\"\n").is_err());
    }

    #[test]
    fn missing_manifest() {
        let temp = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            Manifest::load(temp.path()),
            Err(StrataError::ManifestNotFound(_))
        ));
    }
}
