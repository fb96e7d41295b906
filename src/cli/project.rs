//! Orchestrator command line, assembled from declared option bags
//!
//! The orchestrator's switches are not known until the manifest has been
//! read: every path-based dependency contributes a `--with-<name>` switch.
//! The clap command is therefore built with the builder API from the
//! [`OptionSpec`]s held by each bag, and parsed values are written back
//! into the bag that declared them.

use crate::options::{OptionKind, OptionSpec, SharedOptions};
use clap::builder::PossibleValuesParser;
use clap::{Arg, ArgAction, ArgMatches, Command};

/// Id of the positional command words
pub const COMMAND_ARG: &str = "command";

/// Section used for switches declared without a heading
pub const GENERAL_HEADING: &str = "General Options";

/// True if `argv` contains any of the `-x|--long` style `flags`
pub fn has_switch(argv: &[String], flags: &str) -> bool {
    flags.split('|').any(|flag| argv.iter().any(|arg| arg == flag))
}

fn to_arg(spec: &OptionSpec) -> Arg {
    let mut arg = Arg::new(spec.long.clone())
        .long(spec.long.clone())
        .help(spec.help.clone())
        .help_heading(
            spec.heading
                .clone()
                .unwrap_or_else(|| GENERAL_HEADING.to_string()),
        );

    if let Some(short) = spec.short {
        arg = arg.short(short);
    }

    match spec.kind {
        OptionKind::Flag => arg.action(ArgAction::SetTrue),
        OptionKind::Value { multi, .. } => {
            arg = arg.action(if multi {
                ArgAction::Append
            } else {
                ArgAction::Set
            });
            if let Some(metavar) = &spec.metavar {
                arg = arg.value_name(metavar.clone());
            }
            if !spec.choices.is_empty() {
                arg = arg.value_parser(PossibleValuesParser::new(spec.choices.clone()));
            }
            arg
        }
    }
}

/// Build the command line of project `name` from every declared switch
pub fn project_command(name: &str, after_help: String, bags: &[SharedOptions]) -> Command {
    let mut command = Command::new(name.to_string())
        .override_usage(format!("{} [Options] <Command>", name))
        .after_help(after_help)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(
            Arg::new(COMMAND_ARG)
                .value_name("COMMAND")
                .action(ArgAction::Append)
                .hide(true),
        );

    for bag in bags {
        for spec in bag.borrow().specs() {
            command = command.arg(to_arg(spec));
        }
    }
    command
}

/// Write the switches given on the command line into their bags
pub fn apply_matches(matches: &ArgMatches, bags: &[SharedOptions]) {
    for bag in bags {
        let specs: Vec<OptionSpec> = bag.borrow().specs().to_vec();
        let mut bag = bag.borrow_mut();

        for spec in &specs {
            match spec.kind {
                OptionKind::Flag => {
                    if matches.get_flag(&spec.long) {
                        bag.set_value(&spec.dest, true, true);
                    }
                }
                OptionKind::Value { multi, unique } => {
                    let Some(values) = matches.get_many::<String>(&spec.long) else {
                        continue;
                    };
                    if multi {
                        for value in values {
                            bag.set_value(&spec.dest, value.as_str(), unique);
                        }
                    } else if let Some(last) = values.last() {
                        bag.set_value(&spec.dest, last.as_str(), unique);
                    }
                }
            }
        }
    }
}

/// Positional command words
pub fn command_words(matches: &ArgMatches) -> Vec<String> {
    matches
        .get_many::<String>(COMMAND_ARG)
        .map(|words| words.cloned().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionBag;

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn bags() -> Vec<SharedOptions> {
        let general = OptionBag::new("general").shared();
        {
            let mut bag = general.borrow_mut();
            bag.add_option(OptionSpec::flag("-q|--quiet", "quiet").no_cache());
            bag.add_option(OptionSpec::value("--prefix", "prefix").metavar("PATH"));
            bag.add_option(
                OptionSpec::value("-I|--include-path", "include_path")
                    .multi()
                    .metavar("PATH"),
            );
            bag.add_option(
                OptionSpec::value("-b|--build-mode", "build_mode")
                    .choices(&["in", "out"])
                    .default_value("in"),
            );
        }

        let libbar = OptionBag::new("libbar").shared();
        libbar.borrow_mut().add_option(
            OptionSpec::value("--with-libbar", "path")
                .metavar("PATH")
                .heading("C Library Dependency Options"),
        );
        vec![general, libbar]
    }

    #[test]
    fn parsed_values_land_in_their_bags() {
        let bags = bags();
        bags[0].borrow_mut().set_value("include_path", "/cached", true);

        let matches = project_command("libfoo", String::new(), &bags)
            .try_get_matches_from(argv(&[
                "strata",
                "-q",
                "--prefix=/opt",
                "-I",
                "/a",
                "-I",
                "/b",
                "--with-libbar",
                "/src/libbar",
                "-b",
                "out",
                "build",
            ]))
            .unwrap();
        apply_matches(&matches, &bags);

        let general = bags[0].borrow();
        assert!(general.get_bool("quiet"));
        assert_eq!(general.get_str("prefix"), Some("/opt"));
        assert_eq!(general.get_list("include_path"), vec!["/cached", "/a", "/b"]);
        assert_eq!(general.get_str("build_mode"), Some("out"));
        assert_eq!(bags[1].borrow().get_str("path"), Some("/src/libbar"));
        assert_eq!(command_words(&matches), vec!["build"]);
    }

    #[test]
    fn absent_switches_keep_existing_values() {
        let bags = bags();
        bags[0].borrow_mut().set_value("prefix", "/from/cache", true);

        let matches = project_command("libfoo", String::new(), &bags)
            .try_get_matches_from(argv(&["strata", "has", "command", "build"]))
            .unwrap();
        apply_matches(&matches, &bags);

        assert_eq!(bags[0].borrow().get_str("prefix"), Some("/from/cache"));
        assert!(!bags[0].borrow().get_bool("quiet"));
        assert_eq!(command_words(&matches), vec!["has", "command", "build"]);
    }

    #[test]
    fn invalid_choice_is_rejected() {
        let bags = bags();
        let result = project_command("libfoo", String::new(), &bags)
            .try_get_matches_from(argv(&["strata", "-b", "sideways", "build"]));
        assert!(result.is_err());
    }

    #[test]
    fn help_lists_sections() {
        let bags = bags();
        let help = project_command("libfoo", "Commands: build".to_string(), &bags)
            .render_help()
            .to_string();
        assert!(help.contains("General Options"));
        assert!(help.contains("C Library Dependency Options"));
        assert!(help.contains("--with-libbar <PATH>"));
        assert!(help.contains("Commands: build"));
    }

    #[test]
    fn switch_prescan() {
        let args = argv(&["strata", "--noconfig", "-d", "build"]);
        assert!(has_switch(&args, "--noconfig"));
        assert!(has_switch(&args, "-d|--debug"));
        assert!(!has_switch(&args, "-q|--quiet"));
    }
}
