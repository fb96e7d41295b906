//! Error types for Strata
//!
//! All modules use `StrataResult<T>` as their return type.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Strata operations
pub type StrataResult<T> = Result<T, StrataError>;

/// A project the dependency sorter could not place, with the names it is waiting on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StuckProject {
    pub project: String,
    pub missing: Vec<String>,
}

impl fmt::Display for StuckProject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "project '{}' depends on unknown project{} {}",
            self.project,
            if self.missing.len() == 1 { "" } else { "s" },
            self.missing.join(", ")
        )
    }
}

/// All errors that can occur in Strata
#[derive(Error, Debug)]
pub enum StrataError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Invalid project manifest at {path}: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },

    #[error("No project manifest found: {0}")]
    ManifestNotFound(PathBuf),

    #[error("Invalid build configuration \"{0}\".")]
    InvalidBuildConfiguration(String),

    #[error("Invalid command \"{0}\".")]
    InvalidCommand(String),

    #[error("Ambiguous command \"{0}\".")]
    AmbiguousCommand(String),

    #[error("Invalid value for number of parallel jobs (\"{0}\")")]
    InvalidJobs(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("{0}")]
    Cli(#[from] clap::Error),

    // Cache errors
    #[error("Corrupt cache file {path}: {reason}")]
    CacheCorrupt { path: PathBuf, reason: String },

    #[error("Cache registration failed: {0}")]
    CacheRegistration(String),

    #[error("No cache file configured")]
    CacheNoFile,

    // Dependency errors
    #[error("No group found that can manage {kind} dependency '{name}'")]
    UnmanagedDependency { name: String, kind: String },

    #[error("Dependency name '{0}' clashes with the --with-{0} switch")]
    ReservedDependencyName(String),

    #[error("No such project: {0}")]
    ProjectNotFound(String),

    #[error("Dependency resolver failed for: {}", .stuck.iter().map(|s| s.project.as_str()).collect::<Vec<_>>().join(", "))]
    DependencyResolution { stuck: Vec<StuckProject> },

    #[error("Failed to get meta information from {path}: {reason}")]
    ProjectDescribe { path: PathBuf, reason: String },

    // Process errors
    #[error("Command \"{0}\" not found.")]
    CommandNotFound(String),

    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed ({code}).")]
    CommandStatus { command: String, code: i32 },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("{0}")]
    User(String),
}

impl StrataError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error, mapping a missing executable to `CommandNotFound`
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        let command = command.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::CommandNotFound(command);
        }
        Self::CommandFailed { command, source }
    }

    /// Create a non-zero exit status error
    pub fn command_status(command: impl Into<String>, code: Option<i32>) -> Self {
        Self::CommandStatus {
            command: command.into(),
            code: code.unwrap_or(-1),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::CacheCorrupt { .. } => Some("Remove configure.json or run: strata realclean"),
            Self::ManifestNotFound(_) => Some("Run strata from a directory containing strata.toml"),
            Self::DependencyResolution { .. } => {
                Some("Check the declared dependencies, or pass --force to skip stuck projects")
            }
            Self::ProjectNotFound(_) => Some("Check --base and the project names passed to --projects"),
            Self::AmbiguousCommand(_) => Some("Type more characters of the command name"),
            Self::ReservedDependencyName(_) => {
                Some("Rename the dependency or declare it with kind = \"marker\"")
            }
            _ => None,
        }
    }
}
