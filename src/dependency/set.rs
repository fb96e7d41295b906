//! All dependencies of a project, routed into their groups

use super::group::{DependencyGroup, GroupRegistry};
use super::kind::DependencyKind;
use super::model::{Dependency, DependencyTarget};
use crate::cache::Cache;
use crate::config::Settings;
use crate::error::{StrataError, StrataResult};
use crate::options::{OptionBag, OptionSpec, SharedOptions};
use crate::ui::{self, UiContext};
use crate::walk::{ProjectIndex, ProjectProbe, ScanMode};
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, warn};

/// A dependency as declared: a bare name takes the project's default kind
#[derive(Debug, Clone)]
pub enum DependencySpec {
    Name(String),
    Typed(Dependency),
}

impl From<&str> for DependencySpec {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for DependencySpec {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<Dependency> for DependencySpec {
    fn from(dependency: Dependency) -> Self {
        Self::Typed(dependency)
    }
}

/// Name behind the general `--with-deps-from` switch
const RESERVED_NAME: &str = "deps-from";

/// Declared dependencies, grouped by family
pub struct Dependencies {
    registry: Rc<GroupRegistry>,
    default_kind: DependencyKind,
    groups: Vec<DependencyGroup>,
    declared: Vec<String>,
    options: SharedOptions,
    ui: UiContext,
}

impl Dependencies {
    pub fn new(registry: Rc<GroupRegistry>, default_kind: DependencyKind, ui: UiContext) -> Self {
        Self {
            registry,
            default_kind,
            groups: Vec::new(),
            declared: Vec::new(),
            options: OptionBag::unkeyed().shared(),
            ui,
        }
    }

    /// Route a dependency into the most specific group able to manage it
    pub fn add(&mut self, spec: impl Into<DependencySpec>) -> StrataResult<()> {
        let dependency = match spec.into() {
            DependencySpec::Name(name) => Dependency::new(name, self.default_kind),
            DependencySpec::Typed(dependency) => dependency,
        };

        if dependency.has_options() && dependency.name() == RESERVED_NAME {
            return Err(StrataError::ReservedDependencyName(RESERVED_NAME.to_string()));
        }

        let route = self.registry.route(dependency.kind()).ok_or_else(|| {
            StrataError::UnmanagedDependency {
                name: dependency.name().to_string(),
                kind: dependency.kind().to_string(),
            }
        })?;

        let position = match self.groups.iter().position(|g| g.label() == route.label) {
            Some(position) => position,
            None => {
                self.groups.push(DependencyGroup::new(route));
                self.groups.len() - 1
            }
        };

        debug!("{} dependency {} -> {}", dependency.kind(), dependency.name(), route.label);
        self.declared.push(dependency.name().to_string());
        self.groups[position].add(dependency)
    }

    pub fn add_all<I, S>(&mut self, specs: I) -> StrataResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<DependencySpec>,
    {
        for spec in specs {
            self.add(spec)?;
        }
        Ok(())
    }

    /// Register every path-based dependency with `cache`.
    ///
    /// A group that fails to register is logged and skipped.
    pub fn set_cache(&self, cache: &mut Cache) {
        for group in &self.groups {
            if let Err(e) = group.set_cache(cache) {
                warn!("{} dependencies: {}", group.label(), e);
            }
        }
    }

    /// Declare the dependency switches and merge configured locations.
    ///
    /// Returns the bags holding the declared switches, the general
    /// dependency options first, then each group ordered by label.
    pub fn add_options(&self, settings: &Settings, nomerge: bool) -> Vec<SharedOptions> {
        if self.groups.is_empty() {
            return Vec::new();
        }

        {
            let mut general = self.options.borrow_mut();
            if !nomerge {
                if let Some(search_path) = settings.get_string("dependencies", "search_path") {
                    general.state_merge([("deps_from", search_path)]);
                }
            }
            general.add_option(
                OptionSpec::value(&format!("--with-{}", RESERVED_NAME), "deps_from")
                    .metavar("PATH")
                    .help("scan this path for dependencies")
                    .heading("General Dependency Options"),
            );
        }

        let mut bags = vec![self.options.clone()];

        let mut groups: Vec<&DependencyGroup> = self.groups.iter().collect();
        groups.sort_by_key(|g| g.label());

        for group in groups.into_iter().filter(|g| g.any_has_options()) {
            if !nomerge {
                for member in group.members() {
                    if let Some(path) = settings.get_string("dependencies", member.name()) {
                        member.state_merge(&path);
                    }
                }
            }
            group.add_options();
            bags.extend(group.members().iter().filter_map(|m| m.options().cloned()));
        }

        bags
    }

    /// Location given by `--with-deps-from`, if any
    pub fn search_path(&self) -> Option<String> {
        self.options.borrow().get_str("deps_from").map(str::to_string)
    }

    pub fn has_unsatisfied_dependencies(&self) -> bool {
        self.groups.iter().any(DependencyGroup::has_unsatisfied)
    }

    /// Fill unresolved locations by scanning the search path
    pub fn autoresolve(&self, probe: &dyn ProjectProbe) -> StrataResult<()> {
        let Some(search_path) = self.search_path() else {
            return Ok(());
        };
        if !self.has_unsatisfied_dependencies() {
            return Ok(());
        }

        ui::say(&self.ui, "Resolving dependencies...");
        let (mode, root) = ScanMode::from_search_path(&search_path);
        let index = ProjectIndex::scan(Path::new(root), mode, probe, &self.ui)?;
        let found = index.locations();

        for group in &self.groups {
            group.set_unsatisfied(&found, &self.ui);
        }
        Ok(())
    }

    /// Resolve what can be resolved, then inject every location into `target`
    pub fn apply(&self, target: &mut dyn DependencyTarget, probe: &dyn ProjectProbe) -> StrataResult<()> {
        if !self.groups.is_empty() {
            self.autoresolve(probe)?;
        }
        for group in &self.groups {
            group.apply(target);
        }
        Ok(())
    }

    /// Declared names, in declaration order
    pub fn meta(&self) -> Vec<String> {
        self.declared.clone()
    }

    pub fn any_is_a(&self, kind: DependencyKind) -> bool {
        self.groups.iter().any(|g| g.any_is_a(kind))
    }

    pub fn group(&self, label: &str) -> Option<&DependencyGroup> {
        self.groups.iter().find(|g| g.label() == label)
    }

    pub fn groups(&self) -> &[DependencyGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
