//! Dependency groups and specificity routing

use super::kind::DependencyKind;
use super::model::{Dependency, DependencyTarget};
use crate::cache::Cache;
use crate::error::{StrataError, StrataResult};
use crate::ui::{self, UiContext};
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;

/// A family of dependencies sharing one option section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSpec {
    pub label: &'static str,
    pub managed: &'static [DependencyKind],
}

impl GroupSpec {
    pub const OTHER: GroupSpec = GroupSpec {
        label: "Other",
        managed: &[DependencyKind::Marker],
    };

    pub const C_LIBRARY: GroupSpec = GroupSpec {
        label: "C Library",
        managed: &[DependencyKind::CLibrary],
    };

    pub const RUNTIME: GroupSpec = GroupSpec {
        label: "Runtime",
        managed: &[DependencyKind::Runtime],
    };

    pub const INTERFACE: GroupSpec = GroupSpec {
        label: "Interface",
        managed: &[DependencyKind::Interface],
    };

    pub const SCRIPT_INTERFACE: GroupSpec = GroupSpec {
        label: "Script Interface",
        managed: &[DependencyKind::ScriptInterface],
    };

    pub fn can_manage(&self, kind: DependencyKind) -> bool {
        self.managed.iter().any(|managed| kind.is_a(*managed))
    }
}

/// Group families known to a project, and the order used to route into them
#[derive(Debug, Clone, Default)]
pub struct GroupRegistry {
    specs: Vec<GroupSpec>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in family
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for spec in [
            GroupSpec::OTHER,
            GroupSpec::C_LIBRARY,
            GroupSpec::RUNTIME,
            GroupSpec::INTERFACE,
            GroupSpec::SCRIPT_INTERFACE,
        ] {
            registry.register(spec);
        }
        registry
    }

    /// Register a family; a second family with the same label replaces the first
    pub fn register(&mut self, spec: GroupSpec) {
        match self.specs.iter_mut().find(|s| s.label == spec.label) {
            Some(existing) => *existing = spec,
            None => self.specs.push(spec),
        }
    }

    pub fn specs(&self) -> &[GroupSpec] {
        &self.specs
    }

    /// Families ordered so that a more specific managed kind always comes
    /// before a less specific one.
    ///
    /// Works over a queue of `(managed kind, family)` pairs: a pair is
    /// pushed back while any pair still queued manages a strictly more
    /// specific kind.
    pub fn routing_order(&self) -> Vec<GroupSpec> {
        let mut queue: VecDeque<(DependencyKind, GroupSpec)> = self
            .specs
            .iter()
            .flat_map(|spec| spec.managed.iter().map(move |kind| (*kind, *spec)))
            .collect();

        let mut order: Vec<GroupSpec> = Vec::new();
        while let Some((kind, spec)) = queue.pop_front() {
            if queue
                .iter()
                .any(|(other, _)| other.is_more_specific_than(kind))
            {
                queue.push_back((kind, spec));
                continue;
            }
            if !order.iter().any(|s| s.label == spec.label) {
                order.push(spec);
            }
        }
        order
    }

    /// The most specific family able to manage `kind`
    pub fn route(&self, kind: DependencyKind) -> Option<GroupSpec> {
        self.routing_order()
            .into_iter()
            .find(|spec| spec.can_manage(kind))
    }
}

/// Members of one family, in declaration order
#[derive(Debug, Clone)]
pub struct DependencyGroup {
    spec: GroupSpec,
    members: Vec<Dependency>,
}

impl DependencyGroup {
    pub fn new(spec: GroupSpec) -> Self {
        Self {
            spec,
            members: Vec::new(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.spec.label
    }

    pub fn spec(&self) -> GroupSpec {
        self.spec
    }

    /// Title of the option section listing this family's switches
    pub fn heading(&self) -> String {
        format!("{} Dependency Options", self.spec.label)
    }

    pub fn add(&mut self, dependency: Dependency) -> StrataResult<()> {
        if !self.spec.can_manage(dependency.kind()) {
            return Err(StrataError::UnmanagedDependency {
                name: dependency.name().to_string(),
                kind: dependency.kind().to_string(),
            });
        }
        self.members.push(dependency);
        Ok(())
    }

    pub fn members(&self) -> &[Dependency] {
        &self.members
    }

    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(Dependency::name).collect()
    }

    pub fn set_cache(&self, cache: &mut Cache) -> StrataResult<()> {
        for member in &self.members {
            member.set_cache(cache)?;
        }
        Ok(())
    }

    pub fn add_options(&self) {
        let heading = self.heading();
        for member in &self.members {
            member.add_options(&heading);
        }
    }

    pub fn any_has_options(&self) -> bool {
        self.members.iter().any(Dependency::has_options)
    }

    pub fn any_is_a(&self, kind: DependencyKind) -> bool {
        self.members.iter().any(|m| m.kind().is_a(kind))
    }

    pub fn has_unsatisfied(&self) -> bool {
        self.members.iter().any(|m| !m.is_satisfied())
    }

    /// Give unsatisfied members the location found for them, warning about
    /// those still missing.
    pub fn set_unsatisfied(&self, found: &BTreeMap<String, PathBuf>, ui: &UiContext) {
        for member in self.members.iter().filter(|m| !m.is_satisfied()) {
            match found.get(member.name()) {
                Some(path) => member.state_merge(&path.to_string_lossy()),
                None => ui::warn(
                    ui,
                    &format!("Could not satisfy dependency for {}", member.name()),
                ),
            }
        }
    }

    pub fn apply(&self, target: &mut dyn DependencyTarget) {
        for member in &self.members {
            member.apply(target);
        }
    }
}
