//! Command runner abstraction

use crate::error::StrataResult;
use std::fmt;
use std::path::{Path, PathBuf};

/// A fully described child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Command line without the environment, for messages
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cwd {
            Some(cwd) => write!(f, "[in {}] {}", cwd.display(), self.command_line()),
            None => f.write_str(&self.command_line()),
        }
    }
}

/// Blocking child-process execution
pub trait CommandRunner {
    /// Run with inherited stdio; a non-zero exit is an error
    fn run(&self, invocation: &Invocation) -> StrataResult<()>;

    /// Run capturing stdout; a non-zero exit is an error
    fn output(&self, invocation: &Invocation) -> StrataResult<String>;
}
