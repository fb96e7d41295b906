//! Strata - per-project build orchestrator
//!
//! CLI entry point: opens the project in the current directory and runs
//! the requested command.

use std::process::ExitCode;
use strata::cli::has_switch;
use strata::error::{StrataError, StrataResult};
use strata::orchestration::ProcessRunner;
use strata::project::Project;
use strata::ui::{self, UiContext};
use strata::walk::DriverProbe;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let argv: Vec<String> = std::env::args().collect();
    let debug = has_switch(&argv, "-d|--debug");

    // 0 = warn, --verbose = info, --debug = debug
    let level = if debug {
        "strata=debug"
    } else if has_switch(&argv, "-v|--verbose") {
        "strata=info"
    } else {
        "strata=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match run(&argv) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(StrataError::Cli(e)) => e.exit(),
        Err(e) => {
            let ctx = UiContext::detect().with_debug(debug);
            ui::error(&ctx, &e.to_string(), e.hint());
            if debug {
                eprintln!("{:?}", e);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(argv: &[String]) -> StrataResult<i32> {
    let cwd = std::env::current_dir()
        .map_err(|e| StrataError::io("getting current directory", e))?;
    debug!("Project directory: {}", cwd.display());

    let driver = std::env::current_exe()
        .map(|exe| exe.display().to_string())
        .unwrap_or_else(|_| "strata".to_string());

    let runner = ProcessRunner::new();
    let probe = DriverProbe::new(driver, &runner);

    Project::open(&cwd, argv)?.run(argv, &runner, &probe)
}
