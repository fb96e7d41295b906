//! Output functions for consistent CLI formatting

use super::context::UiContext;
use console::style;

/// Informational line on stdout, suppressed by `--quiet`
pub fn say(ctx: &UiContext, message: &str) {
    if !ctx.is_quiet() {
        println!("{}", message);
    }
}

/// Detail line on stdout, shown only with `--verbose` or `--debug`
pub fn vsay(ctx: &UiContext, message: &str) {
    if ctx.is_verbose() {
        println!("{}", message);
    }
}

/// Notice on stdout that is never suppressed
pub fn notice(message: &str) {
    println!("{}", message);
}

/// Warning on stderr
pub fn warn(ctx: &UiContext, message: &str) {
    if ctx.use_color() {
        eprintln!("{} {}", style("*** WARNING:").yellow().bold(), message);
    } else {
        eprintln!("*** WARNING: {}", message);
    }
}

/// Fatal diagnostic on stderr
pub fn error(ctx: &UiContext, message: &str, hint: Option<&str>) {
    if ctx.use_color() {
        eprintln!("{} {}", style("*** ERROR:").red().bold(), message);
        if let Some(hint) = hint {
            eprintln!("{} {}", style("Hint:").yellow(), hint);
        }
    } else {
        eprintln!("*** ERROR: {}", message);
        if let Some(hint) = hint {
            eprintln!("Hint: {}", hint);
        }
    }
}

/// Header line printed before each batch step
pub fn banner(ctx: &UiContext, location: &str, command: &str) {
    if ctx.use_color() {
        println!(
            "{} running {}",
            style(format!("##### [{}]", location)).cyan().bold(),
            command
        );
    } else {
        println!("##### [{}] running {}", location, command);
    }
}
