//! strata-walk - run strata commands across a tree of projects

use clap::Parser;
use std::process::ExitCode;
use strata::cli::WalkCli;
use strata::error::StrataResult;
use strata::orchestration::ProcessRunner;
use strata::ui::{self, UiContext};
use strata::walk::{DriverProbe, ProjectIndex, ScanMode, Walker};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = WalkCli::parse();

    // 0 = warn, 1 = info, 2+ = debug
    let level = match cli.verbose {
        0 => "strata=warn",
        1 => "strata=info",
        _ => "strata=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let ctx = UiContext::detect().with_verbose(cli.verbose > 0);
    match run(&cli, &ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::error(&ctx, &e.to_string(), e.hint());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &WalkCli, ctx: &UiContext) -> StrataResult<()> {
    let runner = ProcessRunner::new();
    let probe = DriverProbe::new(cli.driver.clone(), &runner);

    debug!("Scanning {} for projects", cli.base.display());
    let index = ProjectIndex::scan(&cli.base, ScanMode::Thorough, &probe, ctx)?;
    debug!("Found {} projects", index.len());

    Walker::new(index, &runner, cli.driver.clone(), *ctx).walk(&cli.commands, &cli.walk_options())
}
