//! Runner backed by `std::process`

use super::runtime::{CommandRunner, Invocation};
use crate::error::{StrataError, StrataResult};
use std::process::{Command, Stdio};
use tracing::debug;

/// Runs invocations as real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    fn command(invocation: &Invocation) -> Command {
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &invocation.env {
            command.env(key, value);
        }
        command
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> StrataResult<()> {
        debug!("child process {}", invocation);

        let status = Self::command(invocation)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| StrataError::command_failed(&invocation.program, e))?;

        if status.success() {
            Ok(())
        } else {
            Err(StrataError::command_status(&invocation.program, status.code()))
        }
    }

    fn output(&self, invocation: &Invocation) -> StrataResult<String> {
        debug!("child process {}", invocation);

        let output = Self::command(invocation)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| StrataError::command_failed(&invocation.program, e))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(StrataError::command_status(
                &invocation.program,
                output.status.code(),
            ))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout() {
        let out = ProcessRunner::new()
            .output(&Invocation::new("echo").arg("hello"))
            .unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn non_zero_exit_is_an_error() {
        let err = ProcessRunner::new()
            .run(&Invocation::new("false"))
            .unwrap_err();
        assert!(matches!(err, StrataError::CommandStatus { code: 1, .. }));
    }

    #[test]
    fn missing_program_is_not_found() {
        let err = ProcessRunner::new()
            .run(&Invocation::new("strata-definitely-missing-tool"))
            .unwrap_err();
        assert!(matches!(err, StrataError::CommandNotFound(_)));
    }

    #[test]
    fn passes_environment_and_cwd() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = ProcessRunner::new()
            .output(
                &Invocation::new("sh")
                    .args(["-c", "echo $STRATA_TEST_VALUE; pwd"])
                    .env("STRATA_TEST_VALUE", "42")
                    .current_dir(dir.path()),
            )
            .unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("42"));
        let pwd = std::path::PathBuf::from(lines.next().unwrap());
        assert_eq!(
            dunce::canonicalize(pwd).unwrap(),
            dunce::canonicalize(dir.path()).unwrap()
        );
    }
}
