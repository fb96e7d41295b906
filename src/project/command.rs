//! Command words understood by the orchestrator

use crate::error::{StrataError, StrataResult};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Command {
    Build,
    Clean,
    Configure,
    Distclean,
    Has,
    Install,
    Meta,
    Package,
    Realclean,
    Test,
}

impl Command {
    const ALWAYS: [Command; 9] = [
        Self::Build,
        Self::Clean,
        Self::Configure,
        Self::Distclean,
        Self::Has,
        Self::Install,
        Self::Meta,
        Self::Realclean,
        Self::Test,
    ];

    /// Commands a project offers, sorted by name
    pub fn available(packaging: bool) -> Vec<Command> {
        let mut commands = Self::ALWAYS.to_vec();
        if packaging {
            commands.push(Self::Package);
        }
        commands.sort_by_key(|c| c.as_str());
        commands
    }

    /// Resolve a command word, accepting any unique prefix
    pub fn expand(raw: &str, available: &[Command]) -> StrataResult<Command> {
        if let Some(exact) = available.iter().find(|c| c.as_str() == raw) {
            return Ok(*exact);
        }

        let candidates: Vec<Command> = available
            .iter()
            .filter(|c| c.as_str().starts_with(raw))
            .copied()
            .collect();

        match candidates.as_slice() {
            [single] => Ok(*single),
            [] => Err(StrataError::InvalidCommand(raw.to_string())),
            _ => Err(StrataError::AmbiguousCommand(raw.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Clean => "clean",
            Self::Configure => "configure",
            Self::Distclean => "distclean",
            Self::Has => "has",
            Self::Install => "install",
            Self::Meta => "meta",
            Self::Package => "package",
            Self::Realclean => "realclean",
            Self::Test => "test",
        }
    }

    /// Whether include paths and dependencies are resolved before running
    pub fn applies_dependencies(self) -> bool {
        !matches!(
            self,
            Self::Meta | Self::Clean | Self::Realclean | Self::Distclean | Self::Has
        )
    }

    /// Whether the cache is written back before running
    pub fn saves_cache(self) -> bool {
        !matches!(self, Self::Meta | Self::Has)
    }

    /// Whether an unreadable cache only deserves a warning
    pub fn tolerates_corrupt_cache(self) -> bool {
        matches!(
            self,
            Self::Meta | Self::Clean | Self::Realclean | Self::Distclean | Self::Has
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
