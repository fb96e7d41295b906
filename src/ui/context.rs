//! Output verbosity shared by the orchestrator and the walker

use std::io::IsTerminal;

/// UI context that determines output behavior
#[derive(Debug, Clone, Copy, Default)]
pub struct UiContext {
    quiet: bool,
    verbose: bool,
    debug: bool,
    color: bool,
}

impl UiContext {
    /// Detect whether stderr supports styled output
    pub fn detect() -> Self {
        Self {
            color: std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
            ..Self::default()
        }
    }

    /// Plain output, nothing suppressed (for tests)
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Verbose output is shown with `--verbose` or `--debug`
    pub fn is_verbose(&self) -> bool {
        self.verbose || self.debug
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn use_color(&self) -> bool {
        self.color
    }
}
