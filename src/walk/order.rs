//! Dependency closure and topological ordering of projects

use super::index::{ProjectHandle, ProjectIndex};
use crate::error::{StrataError, StrataResult, StuckProject};
use crate::ui::{self, UiContext};
use std::collections::BTreeSet;

/// The named projects plus everything they transitively depend on.
///
/// `names` is comma separated. A root that is not in the index is an
/// error; a transitive dependency that is not in the index is ignored.
pub fn closure<'i, 'p>(
    index: &'i ProjectIndex<'p>,
    names: &str,
) -> StrataResult<Vec<&'i ProjectHandle<'p>>> {
    let mut seen = BTreeSet::new();
    let mut selected = Vec::new();

    for root in names.split(',').map(|n| n.trim().trim_end_matches('/')) {
        if root.is_empty() {
            continue;
        }
        let handle = index
            .get(root)
            .ok_or_else(|| StrataError::ProjectNotFound(root.to_string()))?;

        let mut stack = vec![handle];
        while let Some(project) = stack.pop() {
            if !seen.insert(project.name().to_string()) {
                continue;
            }
            for dep in project.dependencies()? {
                if let Some(dep) = index.get(dep) {
                    stack.push(dep);
                }
            }
            selected.push(project);
        }
    }

    Ok(selected)
}

/// Order projects so that each comes after everything it depends on.
///
/// Ready projects are taken in name order on every pass. When a pass
/// places nothing, the rest are reported; the result is an error unless
/// `force` is set, in which case the stuck projects are left out.
pub fn sort_by_deps<'i, 'p>(
    mut pending: Vec<&'i ProjectHandle<'p>>,
    force: bool,
    ui: &UiContext,
) -> StrataResult<Vec<&'i ProjectHandle<'p>>> {
    pending.sort_by(|a, b| a.name().cmp(b.name()));

    let mut sorted: Vec<&ProjectHandle<'p>> = Vec::with_capacity(pending.len());
    let mut placed: BTreeSet<String> = BTreeSet::new();

    while !pending.is_empty() {
        let before = pending.len();
        let mut deferred = Vec::new();

        for project in pending {
            if project.dependencies()?.iter().all(|d| placed.contains(d)) {
                placed.insert(project.name().to_string());
                sorted.push(project);
            } else {
                deferred.push(project);
            }
        }

        if deferred.len() == before {
            let stuck = stuck_projects(&deferred, &placed)?;
            report(&stuck, ui);
            if !force {
                return Err(StrataError::DependencyResolution { stuck });
            }
            break;
        }
        pending = deferred;
    }

    Ok(sorted)
}

fn stuck_projects(
    deferred: &[&ProjectHandle<'_>],
    placed: &BTreeSet<String>,
) -> StrataResult<Vec<StuckProject>> {
    deferred
        .iter()
        .map(|project| -> StrataResult<StuckProject> {
            let missing = project
                .dependencies()?
                .iter()
                .filter(|d| !placed.contains(*d))
                .cloned()
                .collect();
            Ok(StuckProject {
                project: project.name().to_string(),
                missing,
            })
        })
        .collect()
}

fn report(stuck: &[StuckProject], ui: &UiContext) {
    let names: Vec<&str> = stuck.iter().map(|s| s.project.as_str()).collect();
    ui::warn(
        ui,
        &format!("cannot resolve dependencies for: {}", names.join(", ")),
    );
    for project in stuck {
        eprintln!("  - {}", project);
    }
}
