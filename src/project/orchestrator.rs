//! Per-project orchestration: options, dependencies and lifecycle commands

use super::command::Command;
use super::manifest::Manifest;
use super::paths::{join_paths, BuildPaths};
use crate::cache::{Cache, LoadOutcome};
use crate::cli;
use crate::config::{split_paths, Settings};
use crate::dependency::{
    validated_path, Dependencies, DependencyKind, DependencyTarget, GroupRegistry,
};
use crate::error::{StrataError, StrataResult};
use crate::options::{OptionBag, OptionSpec, SharedOptions};
use crate::orchestration::{CommandRunner, Invocation};
use crate::ui::{self, UiContext};
use crate::walk::{PackageList, ProjectMeta, ProjectProbe};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

/// File holding the persisted options of a project
pub const CACHE_FILE: &str = "configure.json";

/// Boolean switches honoured before configuration files are read
const SWITCHES: [(&str, &str, &str); 6] = [
    ("-d|--debug", "debug", "show full error details"),
    ("-q|--quiet", "quiet", "be quiet"),
    ("-v|--verbose", "verbose", "verbose build output"),
    ("--nodeps", "nodeps", "don't use dependencies from configuration files"),
    ("--noconfig", "noconfig", "don't use configuration files at all"),
    ("--noenv", "noenv", "don't honour environment variables"),
];

/// Search path switches, their option name and the environment seeding them
const PATH_SWITCHES: [(&str, &str, &str, &[&str]); 2] = [
    (
        "-I|--include-path",
        "include_path",
        "include",
        &["C_INCLUDE_PATH", "CPLUS_INCLUDE_PATH"],
    ),
    ("-L|--library-path", "library_path", "library", &["LIBRARY_PATH"]),
];

/// A project opened from its manifest, ready to run one command
pub struct Project {
    dir: PathBuf,
    manifest: Manifest,
    settings: Settings,
    cache: Cache,
    cache_error: Option<StrataError>,
    general: SharedOptions,
    dependencies: Dependencies,
    dependency_bags: Vec<SharedOptions>,
    paths: BuildPaths,
    ui: UiContext,
}

impl Project {
    /// Read the manifest, cache and configuration of the project in `dir`
    /// and declare every switch `argv` may use.
    pub fn open(dir: &Path, argv: &[String]) -> StrataResult<Self> {
        let manifest = Manifest::load(dir)?;

        let mut cache = Cache::with_file(dir.join(CACHE_FILE));
        let cache_error = match cache.load() {
            Ok(LoadOutcome::Loaded) => None,
            Ok(outcome) => {
                debug!("Starting without cached options ({:?})", outcome);
                None
            }
            Err(e @ StrataError::CacheCorrupt { .. }) => Some(e),
            Err(e) => return Err(e),
        };

        let general = OptionBag::new("general").shared();
        cache.register(general.clone())?;

        for (flags, dest, _) in SWITCHES {
            if cli::has_switch(argv, flags) {
                general.borrow_mut().set_value(dest, true, true);
            }
        }
        let ui = ui_context(&general);

        let settings = if general.borrow().get_bool("noconfig") {
            Settings::empty()
        } else {
            Settings::discover(dir)?
        };
        debug!("Configuration read from {:?}", settings.sources());

        declare_general_options(&general, &manifest, &settings);

        let mut dependencies = Dependencies::new(
            Rc::new(GroupRegistry::builtin()),
            manifest.project.default_dependency,
            ui,
        );
        dependencies.add_all(manifest.project.depends.iter())?;

        let dependency_cache = Cache::new("dependencies").shared();
        dependencies.set_cache(&mut dependency_cache.borrow_mut());
        cache.register(dependency_cache)?;

        let nodeps = general.borrow().get_bool("nodeps");
        let dependency_bags = dependencies.add_options(&settings, nodeps);

        let mut paths = BuildPaths::new(ui);
        paths.set_schema_aware(
            dependencies.any_is_a(DependencyKind::Interface)
                || dependencies.any_is_a(DependencyKind::ScriptInterface),
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
            settings,
            cache,
            cache_error,
            general,
            dependencies,
            dependency_bags,
            paths,
            ui,
        })
    }

    pub fn name(&self) -> &str {
        &self.manifest.project.name
    }

    pub fn options(&self) -> &SharedOptions {
        &self.general
    }

    pub fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    pub fn paths(&self) -> &BuildPaths {
        &self.paths
    }

    fn bags(&self) -> Vec<SharedOptions> {
        std::iter::once(self.general.clone())
            .chain(self.dependency_bags.iter().cloned())
            .collect()
    }

    fn available_commands(&self) -> Vec<Command> {
        Command::available(self.manifest.has_packaging())
    }

    fn configurations(&self) -> &[String] {
        &self.manifest.build.configurations
    }

    /// Explicit choice, else configured, else `release` if offered, else the first
    fn default_configuration(&self) -> Option<String> {
        let configurations = self.configurations();
        if configurations.is_empty() {
            return None;
        }
        if let Some(explicit) = self.general.borrow().get_str("configuration") {
            return Some(explicit.to_string());
        }
        if let Some(configured) = self.settings.get_string("build", "configuration") {
            return Some(configured);
        }
        if configurations.iter().any(|c| c == "release") {
            return Some("release".to_string());
        }
        configurations.first().cloned()
    }

    pub fn configuration(&self) -> Option<String> {
        if self.configurations().is_empty() {
            return None;
        }
        self.general
            .borrow()
            .get_str("configuration")
            .map(str::to_string)
    }

    fn after_help(&self) -> String {
        let commands: Vec<&str> = self
            .available_commands()
            .iter()
            .map(|c| c.as_str())
            .collect();
        let mut text = format!("Commands: {}", commands.join(", "));

        if !self.configurations().is_empty() {
            let default = self.default_configuration();
            let configurations: Vec<String> = self
                .configurations()
                .iter()
                .map(|c| {
                    if default.as_deref() == Some(c.as_str()) {
                        format!("{} [*]", c)
                    } else {
                        c.clone()
                    }
                })
                .collect();
            text.push_str(&format!(
                "\n\nBuild Configurations: {}",
                configurations.join(", ")
            ));
        }
        text
    }

    /// Parse `argv`, resolve dependencies, persist the options and run the
    /// requested command. Returns the process exit status.
    pub fn run(
        mut self,
        argv: &[String],
        runner: &dyn CommandRunner,
        probe: &dyn ProjectProbe,
    ) -> StrataResult<i32> {
        let bags = self.bags();
        let mut command_line = cli::project_command(self.name(), self.after_help(), &bags);
        let matches = command_line.try_get_matches_from_mut(argv)?;
        cli::apply_matches(&matches, &bags);
        let words = cli::command_words(&matches);
        self.ui = ui_context(&self.general);

        if let Some(default) = self.default_configuration() {
            self.general
                .borrow_mut()
                .ensure_value("configuration", default);
        }

        if self.general.borrow().get_bool("help") || words.is_empty() {
            command_line
                .print_help()
                .map_err(|e| StrataError::io("printing help", e))?;
            return Ok(0);
        }

        let configuration = self.configuration();
        if let Some(configuration) = &configuration {
            if !self.configurations().contains(configuration) {
                return Err(StrataError::InvalidBuildConfiguration(configuration.clone()));
            }
        }

        let command = Command::expand(&words[0], &self.available_commands())?;

        let cache_usable = match self.cache_error.take() {
            None => true,
            Some(e) if command.tolerates_corrupt_cache() => {
                ui::warn(&self.ui, &e.to_string());
                false
            }
            Some(e) => return Err(e),
        };

        let out_of_source = self.general.borrow().get_str("build_mode") == Some("out");
        self.paths
            .set_layout(out_of_source, configuration.as_deref());

        if command.applies_dependencies() {
            self.apply_paths();
            self.dependencies.apply(&mut self.paths, probe)?;
        }

        if command.saves_cache() && cache_usable {
            self.cache.save()?;
        }

        ui::vsay(
            &self.ui,
            &format!(
                "******************************\n   Config : {}\n   Action : {}\n******************************",
                configuration.as_deref().unwrap_or("(none)"),
                command
            ),
        );

        self.execute(command, &words[1..], runner)
    }

    fn apply_paths(&mut self) {
        let (include, library) = {
            let general = self.general.borrow();
            (
                general.get_list("include_path"),
                general.get_list("library_path"),
            )
        };
        for path in include {
            let path = validated_path(&path, &[], Some(&self.ui));
            self.paths.add_include_path(path);
        }
        for path in library {
            let path = validated_path(&path, &[], Some(&self.ui));
            self.paths.add_library_path(path);
        }
    }

    fn execute(&self, command: Command, args: &[String], runner: &dyn CommandRunner) -> StrataResult<i32> {
        match command {
            Command::Configure => self.configure(runner)?,
            Command::Build => self.build(runner)?,
            Command::Test => {
                self.build(runner)?;
                self.step("test", self.manifest.build.test.as_deref(), runner)?;
            }
            Command::Install => {
                self.build(runner)?;
                self.step("install", self.manifest.build.install.as_deref(), runner)?;
            }
            Command::Package => self.step("package", self.manifest.build.package.as_deref(), runner)?,
            Command::Clean => self.step("clean", self.manifest.build.clean.as_deref(), runner)?,
            Command::Realclean | Command::Distclean => self.realclean()?,
            Command::Meta => self.print_meta()?,
            Command::Has => return self.has(args),
        }
        Ok(0)
    }

    fn configure(&self, runner: &dyn CommandRunner) -> StrataResult<()> {
        if self.paths.is_out_of_source() {
            let build_dir = self.dir.join(self.paths.build_dir());
            fs::create_dir_all(&build_dir)
                .map_err(|e| StrataError::io(format!("creating {}", build_dir.display()), e))?;
        }
        self.step("configure", self.manifest.build.configure.as_deref(), runner)
    }

    fn build(&self, runner: &dyn CommandRunner) -> StrataResult<()> {
        self.configure(runner)?;
        self.step("build", self.manifest.build.build.as_deref(), runner)
    }

    fn step(&self, name: &str, words: Option<&[String]>, runner: &dyn CommandRunner) -> StrataResult<()> {
        let Some(words) = words else {
            debug!("No {} command configured", name);
            return Ok(());
        };
        let invocation = self.invocation(words)?;
        ui::vsay(&self.ui, &invocation.to_string());
        runner.run(&invocation)
    }

    fn jobs(&self) -> StrataResult<usize> {
        let jobs = self
            .general
            .borrow()
            .get_str("jobs")
            .unwrap_or("auto")
            .to_string();
        if jobs == "auto" {
            return Ok(std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1));
        }
        match jobs.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(StrataError::InvalidJobs(jobs)),
        }
    }

    fn placeholders(&self) -> StrataResult<BTreeMap<&'static str, String>> {
        let general = self.general.borrow();
        Ok(BTreeMap::from([
            ("build_dir", self.paths.build_dir().display().to_string()),
            (
                "configuration",
                self.configuration().unwrap_or_else(|| "default".to_string()),
            ),
            ("jobs", self.jobs()?.to_string()),
            ("prefix", general.get_str("prefix").unwrap_or_default().to_string()),
            (
                "destdir",
                general
                    .get_str("install_destdir")
                    .unwrap_or_default()
                    .to_string(),
            ),
            ("project", self.name().to_string()),
        ]))
    }

    /// Command line for a lifecycle step, placeholders filled and the
    /// program mapped through `[tools]`
    fn invocation(&self, words: &[String]) -> StrataResult<Invocation> {
        let placeholders = self.placeholders()?;
        let mut rendered = words.iter().map(|word| substitute(word, &placeholders));

        let program = match rendered.next() {
            Some(program) => self.settings.tool(&program),
            None => return Err(StrataError::User("empty command".to_string())),
        };

        Ok(Invocation::new(program)
            .args(rendered)
            .current_dir(&self.dir)
            .env("STRATA_INCLUDE_PATH", join_paths(self.paths.include_paths()))
            .env("STRATA_LIBRARY_PATH", join_paths(self.paths.library_paths()))
            .env("STRATA_SCHEMA_PATH", join_paths(self.paths.schema_paths()))
            .env("STRATA_PREFIX", placeholders["prefix"].clone())
            .env("STRATA_JOBS", placeholders["jobs"].clone())
            .env("STRATA_CONFIGURATION", placeholders["configuration"].clone())
            .env("STRATA_BUILD_DIR", placeholders["build_dir"].clone()))
    }

    fn realclean(&self) -> StrataResult<()> {
        let cache_file = self.dir.join(CACHE_FILE);
        match fs::remove_file(&cache_file) {
            Ok(()) => ui::say(&self.ui, &format!("Removed {}", cache_file.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StrataError::io(
                    format!("removing {}", cache_file.display()),
                    e,
                ))
            }
        }

        let build_tree = self.dir.join("build");
        match fs::remove_dir_all(&build_tree) {
            Ok(()) => ui::say(&self.ui, &format!("Removed {}", build_tree.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StrataError::io(
                    format!("removing {}", build_tree.display()),
                    e,
                ))
            }
        }
        Ok(())
    }

    /// Self-description consumed by the walker and auto-resolution
    pub fn meta(&self) -> ProjectMeta {
        let mut meta = ProjectMeta::new(self.name());
        meta.commands = self
            .available_commands()
            .iter()
            .map(|c| c.as_str().to_string())
            .collect();
        meta.dependencies = self.dependencies.meta();
        meta.version = self.manifest.project.version.clone();
        if self.manifest.has_packaging() {
            meta.packaging.insert(
                "debian".to_string(),
                PackageList {
                    package: self.manifest.debian_packages().to_vec(),
                },
            );
        }
        meta
    }

    fn print_meta(&self) -> StrataResult<()> {
        ui::notice(&serde_json::to_string_pretty(&self.meta())?);
        Ok(())
    }

    fn has(&self, args: &[String]) -> StrataResult<i32> {
        let [what, name] = args else {
            return Err(StrataError::InvalidOption(
                "usage: has command|config <NAME>".to_string(),
            ));
        };
        let found = match what.as_str() {
            "command" => self
                .available_commands()
                .iter()
                .any(|c| c.as_str() == name),
            "config" | "configuration" => self.configurations().contains(name),
            _ => return Ok(2),
        };
        Ok(if found { 0 } else { 1 })
    }
}

fn ui_context(general: &SharedOptions) -> UiContext {
    let general = general.borrow();
    UiContext::detect()
        .with_quiet(general.get_bool("quiet"))
        .with_verbose(general.get_bool("verbose"))
        .with_debug(general.get_bool("debug"))
}

fn declare_general_options(general: &SharedOptions, manifest: &Manifest, settings: &Settings) {
    let mut general = general.borrow_mut();

    if !manifest.build.configurations.is_empty() {
        general.add_option(
            OptionSpec::value("-c|--configuration", "configuration")
                .metavar("CFG")
                .hide_default()
                .help("selected build configuration"),
        );
    }

    general.add_option(
        OptionSpec::flag("-h|--help", "help")
            .no_cache()
            .help("show this help message and exit"),
    );
    for (flags, dest, help) in SWITCHES {
        general.add_option(OptionSpec::flag(flags, dest).no_cache().help(help));
    }

    if let Some(prefix) = settings.get_string("build", "prefix") {
        general.state_merge([("prefix", prefix)]);
    }
    general.ensure_value(
        "jobs",
        settings
            .get_string("build", "parallel")
            .unwrap_or_else(|| "auto".to_string()),
    );

    general.add_option(
        OptionSpec::value("-j|--jobs", "jobs")
            .metavar("NUM")
            .no_cache()
            .help("number of parallel jobs to execute if possible"),
    );
    general.add_option(
        OptionSpec::value("--prefix", "prefix")
            .metavar("PATH")
            .default_value(manifest.project.default_prefix.clone())
            .help("install prefix for this project"),
    );
    general.add_option(
        OptionSpec::value("--install-destdir", "install_destdir")
            .metavar("PATH")
            .help("install files to this path"),
    );
    general.add_option(
        OptionSpec::value("-b|--build-mode", "build_mode")
            .metavar("MODE")
            .choices(&["in", "out"])
            .default_value("in")
            .help("[in|out] source build mode"),
    );

    let noenv = general.get_bool("noenv");
    for (flags, dest, kind, variables) in PATH_SWITCHES {
        let mut paths: Vec<String> = Vec::new();
        if !noenv {
            for variable in variables {
                if let Ok(value) = std::env::var(variable) {
                    paths.extend(split_paths(&value));
                }
            }
        }
        paths.extend(settings.get_paths("build", dest));

        general.state_merge([(dest, json!(paths))]);
        general.add_option(
            OptionSpec::value(flags, dest)
                .multi()
                .metavar("PATH")
                .help(format!("use additional {} path", kind)),
        );
    }
}

/// Replace every `{name}` in `word` with its value in a single pass;
/// substituted values are never expanded again
fn substitute(word: &str, placeholders: &BTreeMap<&'static str, String>) -> String {
    let mut out = String::with_capacity(word.len());
    let mut rest = word;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let value = tail
            .find('}')
            .and_then(|close| placeholders.get(&tail[1..close]).map(|v| (close, v)));
        match value {
            Some((close, value)) => {
                out.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
