//! Integration tests for Strata

use std::fs;
use std::path::Path;
use tempfile::TempDir;

const STRATA: &str = env!("CARGO_BIN_EXE_strata");

fn write_project(dir: &Path, name: &str, depends: &[&str]) {
    fs::create_dir_all(dir).unwrap();
    let depends: Vec<String> = depends.iter().map(|d| format!("\"{}\"", d)).collect();
    fs::write(
        dir.join("strata.toml"),
        format!(
            r#"[project]
name = "{}"
version = "0.1.0"
depends = [{}]

[build]
configurations = ["debug", "release"]
build = ["true"]
"#,
            name,
            depends.join(", ")
        ),
    )
    .unwrap();
}

mod strata_tests {
    use super::*;
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn strata(dir: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("strata");
        cmd.current_dir(dir).env("HOME", dir).arg("--noenv");
        cmd
    }

    fn project() -> TempDir {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), "libfoo", &["libbar"]);
        temp
    }

    #[test]
    fn help_lists_commands_and_options() {
        let temp = project();
        strata(temp.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Commands: build, clean, configure"))
            .stdout(predicate::str::contains("release [*]"))
            .stdout(predicate::str::contains("General Options"))
            .stdout(predicate::str::contains("--with-libbar <PATH>"));
    }

    #[test]
    fn no_command_prints_help() {
        let temp = project();
        strata(temp.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("Usage: libfoo [Options] <Command>"));
    }

    #[test]
    fn missing_manifest_fails() {
        let temp = TempDir::new().unwrap();
        strata(temp.path())
            .arg("build")
            .assert()
            .failure()
            .stderr(predicate::str::contains("*** ERROR:"))
            .stderr(predicate::str::contains("No project manifest found"));
    }

    #[test]
    fn meta_prints_json() {
        let temp = project();
        let output = strata(temp.path())
            .args(["-q", "meta"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let meta: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(meta["project"], "libfoo");
        assert_eq!(meta["dependencies"], serde_json::json!(["libbar"]));
        assert_eq!(meta["version"], "0.1.0");
        assert!(!temp.path().join("configure.json").exists());
    }

    #[test]
    fn has_exit_codes() {
        let temp = project();
        strata(temp.path()).args(["has", "command", "install"]).assert().code(0);
        strata(temp.path()).args(["has", "command", "package"]).assert().code(1);
        strata(temp.path()).args(["has", "config", "debug"]).assert().code(0);
        strata(temp.path()).args(["has", "colour", "red"]).assert().code(2);
    }

    #[test]
    fn invalid_and_ambiguous_commands() {
        let temp = project();
        strata(temp.path())
            .arg("frobnicate")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid command \"frobnicate\"."));

        strata(temp.path())
            .arg("c")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Ambiguous command \"c\"."));
    }

    #[test]
    fn invalid_build_mode_is_a_usage_error() {
        let temp = project();
        strata(temp.path())
            .args(["-b", "sideways", "build"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("sideways"));
    }

    #[test]
    fn build_writes_the_cache() {
        let temp = project();
        strata(temp.path())
            .args(["-c", "debug", "--prefix", "/opt/foo", "build"])
            .assert()
            .success();

        let cache = fs::read_to_string(temp.path().join("configure.json")).unwrap();
        assert!(cache.contains("\"/opt/foo\""));
        assert!(cache.contains("\"debug\""));

        strata(temp.path()).arg("realclean").assert().success();
        assert!(!temp.path().join("configure.json").exists());
    }
}

mod walk_tests {
    use super::*;
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn walk(base: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("strata-walk");
        cmd.env("HOME", base)
            .env("STRATA_DRIVER", STRATA)
            .arg("--base")
            .arg(base);
        cmd
    }

    fn tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        write_project(&temp.path().join("app"), "app", &["lib"]);
        write_project(&temp.path().join("lib"), "lib", &["core"]);
        write_project(&temp.path().join("core"), "core", &[]);
        write_project(&temp.path().join("zz-tool"), "tool", &[]);
        temp
    }

    #[test]
    fn lists_projects_in_dependency_order() {
        let temp = tree();
        walk(temp.path())
            .assert()
            .success()
            .stdout("core\nlib\ntool\napp\n");
    }

    #[test]
    fn reverse_and_project_selection() {
        let temp = tree();
        walk(temp.path())
            .args(["-r", "-p", "lib"])
            .assert()
            .success()
            .stdout("lib\ncore\n");
    }

    #[test]
    fn dry_run_shows_each_step() {
        let temp = tree();
        walk(temp.path())
            .args(["--dry-run", "build"])
            .assert()
            .success()
            .stdout(predicate::str::contains("running"))
            .stdout(predicate::str::contains("build --with-core="));
    }

    #[test]
    fn unknown_project_fails() {
        let temp = tree();
        walk(temp.path())
            .args(["-p", "nope"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No such project: nope"));
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("strata-walk")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("--dry-run"));
    }
}
