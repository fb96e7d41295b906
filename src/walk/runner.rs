//! Batch execution of commands across ordered projects

use super::index::{ProjectHandle, ProjectIndex};
use super::order::{closure, sort_by_deps};
use super::tracker::TrackingSet;
use crate::error::{StrataError, StrataResult};
use crate::orchestration::{CommandRunner, Invocation};
use crate::ui::{self, UiContext};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Switches controlling one batch run
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    pub track: Option<PathBuf>,
    pub projects: Option<String>,
    pub reverse: bool,
    pub nodeps: bool,
    pub force: bool,
    pub force_install: bool,
    pub dry_run: bool,
}

/// Commands the walker runs itself instead of forwarding to a project
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    DebInstall,
    DebRemove,
    DebPurge,
}

impl Builtin {
    fn parse(command: &str) -> Option<Self> {
        match command {
            "debinstall" => Some(Self::DebInstall),
            "debremove" => Some(Self::DebRemove),
            "debpurge" => Some(Self::DebPurge),
            _ => None,
        }
    }
}

/// Drives commands over the projects of an index
pub struct Walker<'a> {
    index: ProjectIndex<'a>,
    runner: &'a dyn CommandRunner,
    driver: String,
    ui: UiContext,
}

impl<'a> Walker<'a> {
    pub fn new(
        index: ProjectIndex<'a>,
        runner: &'a dyn CommandRunner,
        driver: impl Into<String>,
        ui: UiContext,
    ) -> Self {
        Self {
            index,
            runner,
            driver: driver.into(),
            ui,
        }
    }

    /// Projects the run covers, in execution order
    pub fn selection(&self, opts: &WalkOptions) -> StrataResult<Vec<&ProjectHandle<'a>>> {
        let selected = match &opts.projects {
            Some(names) => closure(&self.index, names)?,
            None => self.index.projects().collect(),
        };
        let mut ordered = sort_by_deps(selected, opts.force, &self.ui)?;
        if opts.reverse {
            ordered.reverse();
        }
        Ok(ordered)
    }

    /// Run `commands` in every selected project, or list the selection
    /// when there are no commands.
    pub fn walk(&self, commands: &[String], opts: &WalkOptions) -> StrataResult<()> {
        let mut tracked = TrackingSet::load(opts.track.as_deref(), &self.ui);
        let projects = self.selection(opts)?;

        if commands.is_empty() {
            for project in projects {
                ui::notice(project.name());
            }
            return Ok(());
        }

        for project in projects {
            if tracked.contains(project.name()) {
                ui::notice(&format!(
                    "project \"{}\" is already tracked, skipping...",
                    project.name()
                ));
                continue;
            }

            let with_args = if opts.nodeps {
                Vec::new()
            } else {
                self.with_args(project)?
            };

            for command in commands {
                if let Some(builtin) = Builtin::parse(command) {
                    self.run_builtin(builtin, project, opts)?;
                } else if project.supports(command)? {
                    let invocation = Invocation::new(&self.driver)
                        .arg(command)
                        .args(with_args.iter().cloned());
                    self.execute(project.dir(), invocation, opts)?;
                } else {
                    ui::notice(&format!(
                        "project \"{}\" does not support \"{}\" command, skipping...",
                        project.name(),
                        command
                    ));
                }
            }

            if !opts.dry_run {
                tracked.insert(project.name());
                tracked.save()?;
            }
        }

        if !opts.dry_run {
            tracked.clear()?;
        }
        Ok(())
    }

    /// `--with-<dep>=<dir>` for each dependency found in the index
    fn with_args(&self, project: &ProjectHandle<'a>) -> StrataResult<Vec<String>> {
        Ok(project
            .dependencies()?
            .iter()
            .filter_map(|dep| {
                self.index
                    .get(dep)
                    .map(|handle| format!("--with-{}={}", dep, handle.dir().display()))
            })
            .collect())
    }

    fn execute(&self, location: &Path, invocation: Invocation, opts: &WalkOptions) -> StrataResult<()> {
        ui::banner(
            &self.ui,
            &location.display().to_string(),
            &invocation.command_line(),
        );
        if opts.dry_run {
            return Ok(());
        }
        self.runner.run(&invocation.current_dir(location))
    }

    fn run_builtin(
        &self,
        builtin: Builtin,
        project: &ProjectHandle<'a>,
        opts: &WalkOptions,
    ) -> StrataResult<()> {
        let packages = project.meta()?.debian_packages();
        let location = project.dir().parent().unwrap_or(project.dir());

        match builtin {
            Builtin::DebInstall => {
                let debs = self.find_debs(project, location)?;
                if debs.is_empty() {
                    debug!("No packages to install for {}", project.name());
                    return Ok(());
                }
                let mut invocation = Invocation::new("sudo").arg("dpkg");
                if opts.force_install {
                    invocation = invocation.arg("--force-depends");
                }
                invocation = invocation
                    .arg("-i")
                    .args(debs.iter().map(|d| d.to_string_lossy().into_owned()));
                self.execute(location, invocation, opts)
            }
            Builtin::DebRemove | Builtin::DebPurge => {
                if packages.is_empty() {
                    return Ok(());
                }
                let flag = if builtin == Builtin::DebRemove {
                    "-r"
                } else {
                    "--purge"
                };
                let invocation = Invocation::new("sudo")
                    .args(["dpkg", flag])
                    .args(packages.iter().cloned());
                if let Err(e) = self.execute(location, invocation, opts) {
                    ui::warn(&self.ui, &e.to_string());
                }
                Ok(())
            }
        }
    }

    /// Built packages lying next to the project directory
    fn find_debs(&self, project: &ProjectHandle<'a>, location: &Path) -> StrataResult<Vec<PathBuf>> {
        let meta = project.meta()?;
        let version = meta.version.as_deref().unwrap_or_default();
        let base = glob::Pattern::escape(&location.to_string_lossy());

        let mut debs = Vec::new();
        for package in meta.debian_packages() {
            let pattern = format!("{}/{}_{}*.deb", base, package, version);
            let matches: Vec<PathBuf> = glob::glob(&pattern)
                .map_err(|e| StrataError::User(format!("invalid package pattern {}: {}", pattern, e)))?
                .filter_map(Result::ok)
                .collect();

            match matches.as_slice() {
                [] => debug!("No match for {}", pattern),
                [deb] => debs.push(deb.clone()),
                _ => ui::warn(
                    &self.ui,
                    &format!("several packages match {}, skipping", pattern),
                ),
            }
        }
        Ok(debs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walk::index::tests::TableProbe;
    use crate::walk::meta::PackageList;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingRunner {
        fail_in: Option<&'static str>,
        seen: RefCell<Vec<Invocation>>,
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, invocation: &Invocation) -> StrataResult<()> {
            self.seen.borrow_mut().push(invocation.clone());
            let dir = invocation.cwd.as_deref().and_then(Path::file_name);
            match (self.fail_in, dir) {
                (Some(fail), Some(dir)) if dir == fail => {
                    Err(StrataError::command_status(&invocation.program, Some(2)))
                }
                _ => Ok(()),
            }
        }

        fn output(&self, _invocation: &Invocation) -> StrataResult<String> {
            unreachable!("metadata comes from the table probe")
        }
    }

    fn index<'p>(probe: &'p TableProbe, root: &Path) -> ProjectIndex<'p> {
        let mut index = ProjectIndex::new();
        for dir in probe.metas.keys() {
            index.insert(ProjectHandle::new(dir.clone(), root.join(dir), probe), &UiContext::plain());
        }
        index
    }

    fn dirs(runner: &RecordingRunner) -> Vec<String> {
        runner
            .seen
            .borrow()
            .iter()
            .filter_map(|i| i.cwd.as_deref().and_then(Path::file_name))
            .map(|n| n.to_string_lossy().into_owned())
            .collect()
    }

    fn commands(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn injects_dependency_locations() {
        let temp = TempDir::new().unwrap();
        let probe = TableProbe::new(&[("a", "a", &[]), ("b", "b", &["a"])]);
        let runner = RecordingRunner::default();
        let walker = Walker::new(index(&probe, temp.path()), &runner, "strata", UiContext::plain());

        walker.walk(&commands(&["build"]), &WalkOptions::default()).unwrap();

        let seen = runner.seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].args, vec!["build"]);
        assert_eq!(
            seen[1].args,
            vec!["build".to_string(), format!("--with-a={}", temp.path().join("a").display())]
        );
    }

    #[test]
    fn with_args_skips_unindexed_dependencies() {
        let temp = TempDir::new().unwrap();
        let probe = TableProbe::new(&[("a", "a", &[]), ("b", "b", &["elsewhere", "a"])]);
        let runner = RecordingRunner::default();
        let walker = Walker::new(index(&probe, temp.path()), &runner, "strata", UiContext::plain());

        let b = walker.index.get("b").unwrap();
        assert_eq!(
            walker.with_args(b).unwrap(),
            vec![format!("--with-a={}", temp.path().join("a").display())]
        );
    }

    #[test]
    fn tracked_projects_are_skipped_and_file_removed() {
        let temp = TempDir::new().unwrap();
        let track = temp.path().join("track.json");
        fs::write(&track, "[\"a\"]").unwrap();

        let probe = TableProbe::new(&[("a", "a", &[]), ("b", "b", &["a"])]);
        let runner = RecordingRunner::default();
        let walker = Walker::new(index(&probe, temp.path()), &runner, "strata", UiContext::plain());

        let opts = WalkOptions {
            track: Some(track.clone()),
            ..Default::default()
        };
        walker.walk(&commands(&["build", "install"]), &opts).unwrap();

        assert_eq!(dirs(&runner), vec!["b", "b"]);
        assert!(!track.exists());
    }

    #[test]
    fn failure_keeps_completed_projects_tracked() {
        let temp = TempDir::new().unwrap();
        let track = temp.path().join("track.json");

        let probe = TableProbe::new(&[("a", "a", &[]), ("b", "b", &["a"]), ("c", "c", &["b"])]);
        let runner = RecordingRunner {
            fail_in: Some("b"),
            ..Default::default()
        };
        let walker = Walker::new(index(&probe, temp.path()), &runner, "strata", UiContext::plain());

        let opts = WalkOptions {
            track: Some(track.clone()),
            ..Default::default()
        };
        assert!(walker.walk(&commands(&["build"]), &opts).is_err());
        assert_eq!(dirs(&runner), vec!["a", "b"]);

        let tracked: Vec<String> = serde_json::from_str(&fs::read_to_string(&track).unwrap()).unwrap();
        assert_eq!(tracked, vec!["a"]);

        // Resuming runs only what is left.
        let runner = RecordingRunner::default();
        let walker = Walker::new(index(&probe, temp.path()), &runner, "strata", UiContext::plain());
        walker.walk(&commands(&["build"]), &opts).unwrap();
        assert_eq!(dirs(&runner), vec!["b", "c"]);
        assert!(!track.exists());
    }

    #[test]
    fn dry_run_executes_and_tracks_nothing() {
        let temp = TempDir::new().unwrap();
        let track = temp.path().join("track.json");
        let probe = TableProbe::new(&[("a", "a", &[])]);
        let runner = RecordingRunner::default();
        let walker = Walker::new(index(&probe, temp.path()), &runner, "strata", UiContext::plain());

        let opts = WalkOptions {
            track: Some(track.clone()),
            dry_run: true,
            ..Default::default()
        };
        walker.walk(&commands(&["build"]), &opts).unwrap();
        assert!(runner.seen.borrow().is_empty());
        assert!(!track.exists());
    }

    #[test]
    fn unsupported_commands_are_skipped() {
        let temp = TempDir::new().unwrap();
        let probe = TableProbe::new(&[("a", "a", &[])]);
        let runner = RecordingRunner::default();
        let walker = Walker::new(index(&probe, temp.path()), &runner, "strata", UiContext::plain());

        walker
            .walk(&commands(&["package", "conf"]), &WalkOptions::default())
            .unwrap();
        let seen = runner.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].args, vec!["conf"]);
    }

    #[test]
    fn reverse_and_subset_selection() {
        let temp = TempDir::new().unwrap();
        let probe = TableProbe::new(&[("a", "a", &[]), ("b", "b", &["a"]), ("z", "z", &[])]);
        let runner = RecordingRunner::default();
        let walker = Walker::new(index(&probe, temp.path()), &runner, "strata", UiContext::plain());

        let opts = WalkOptions {
            projects: Some("b".into()),
            reverse: true,
            ..Default::default()
        };
        let names: Vec<&str> = walker
            .selection(&opts)
            .unwrap()
            .into_iter()
            .map(ProjectHandle::name)
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn force_applies_to_subsets() {
        let temp = TempDir::new().unwrap();
        let probe = TableProbe::new(&[("a", "a", &["b"]), ("b", "b", &["a"]), ("c", "c", &["a"])]);
        let runner = RecordingRunner::default();
        let walker = Walker::new(index(&probe, temp.path()), &runner, "strata", UiContext::plain());

        let mut opts = WalkOptions {
            projects: Some("c".into()),
            ..Default::default()
        };
        assert!(walker.selection(&opts).is_err());

        opts.force = true;
        assert!(walker.selection(&opts).unwrap().is_empty());
    }

    #[test]
    fn debinstall_picks_matching_packages() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("libfoo")).unwrap();
        for deb in [
            "libfoo_1.4.0-1_amd64.deb",
            "libfoo-dev_1.4.0-1_amd64.deb",
            "libfoo_1.3.0-1_amd64.deb",
        ] {
            fs::write(temp.path().join(deb), "").unwrap();
        }

        let mut probe = TableProbe::new(&[("libfoo", "libfoo", &[])]);
        if let Some(meta) = probe.metas.get_mut("libfoo") {
            meta.version = Some("1.4.0".into());
            meta.packaging.insert(
                "debian".into(),
                PackageList {
                    package: vec!["libfoo".into(), "libfoo-dev".into()],
                },
            );
        }
        let runner = RecordingRunner::default();
        let walker = Walker::new(index(&probe, temp.path()), &runner, "strata", UiContext::plain());

        let opts = WalkOptions {
            force_install: true,
            ..Default::default()
        };
        walker
            .walk(&commands(&["debinstall", "debremove"]), &opts)
            .unwrap();

        let seen = runner.seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].program, "sudo");
        assert_eq!(
            seen[0].args,
            vec![
                "dpkg".to_string(),
                "--force-depends".to_string(),
                "-i".to_string(),
                temp.path().join("libfoo_1.4.0-1_amd64.deb").display().to_string(),
                temp.path().join("libfoo-dev_1.4.0-1_amd64.deb").display().to_string(),
            ]
        );
        assert_eq!(seen[0].cwd.as_deref(), Some(temp.path()));
        assert_eq!(seen[1].args, vec!["dpkg", "-r", "libfoo", "libfoo-dev"]);
    }
}
