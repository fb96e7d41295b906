//! Closed set of dependency variants and their specificity relation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Variant of a declared dependency
///
/// Variants form a small specialization tree:
///
/// ```text
/// Marker
/// ├── CLibrary
/// │   └── Interface
/// ├── Runtime
/// └── ScriptInterface
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyKind {
    /// Always satisfied, exposes no options
    Marker,
    /// Headers and libraries under a path
    CLibrary,
    /// Scripting-language runtime package under a path
    Runtime,
    /// Interface definitions compiled into a C library
    Interface,
    /// Interface definitions consumed by scripting-language bindings
    ScriptInterface,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 5] = [
        Self::Marker,
        Self::CLibrary,
        Self::Runtime,
        Self::Interface,
        Self::ScriptInterface,
    ];

    /// The variant this one specializes
    pub fn parent(self) -> Option<Self> {
        match self {
            Self::Marker => None,
            Self::CLibrary | Self::Runtime | Self::ScriptInterface => Some(Self::Marker),
            Self::Interface => Some(Self::CLibrary),
        }
    }

    /// True if `self` is `other` or specializes it
    pub fn is_a(self, other: Self) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == other {
                return true;
            }
            current = kind.parent();
        }
        false
    }

    /// True if `self` specializes `other` and is not `other` itself
    pub fn is_more_specific_than(self, other: Self) -> bool {
        self != other && self.is_a(other)
    }

    /// Whether the variant resolves to a filesystem path
    pub fn is_path_based(self) -> bool {
        self != Self::Marker
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Marker => "marker",
            Self::CLibrary => "c-library",
            Self::Runtime => "runtime",
            Self::Interface => "interface",
            Self::ScriptInterface => "script-interface",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
