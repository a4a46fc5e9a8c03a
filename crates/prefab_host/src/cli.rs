//! Command-line interface handling for the prefab host.
//!
//! This module provides command-line argument parsing using the `clap` crate's
//! builder API.

use clap::{Arg, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

/// Work requested on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    /// Print the identity token for a (name, type, method) tuple
    Hash {
        name: String,
        type_qualifier: String,
        method: String,
    },
    /// Replay a manifest of templates and clone requests through a registry
    Apply { manifest: PathBuf },
}

/// Command line arguments parsed from user input.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// The subcommand to run
    pub command: HostCommand,
}

/// Builds the clap command tree.
pub fn command() -> Command {
    Command::new("Prefab Host")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Clones prefabs and registers them with deterministic network identities")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("prefab_host.toml")
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)")
                .global(true),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("hash")
                .about("Print the identity token a registration would receive")
                .arg(
                    Arg::new("name")
                        .long("name")
                        .value_name("NAME")
                        .help("Display name of the clone")
                        .required(true),
                )
                .arg(
                    Arg::new("type")
                        .long("type")
                        .value_name("TYPE")
                        .help("Fully qualified name of the calling type")
                        .required(true),
                )
                .arg(
                    Arg::new("method")
                        .long("method")
                        .value_name("METHOD")
                        .help("Name of the calling method")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("apply")
                .about("Clone and register everything listed in a manifest")
                .arg(
                    Arg::new("manifest")
                        .value_name("MANIFEST")
                        .help("Path to a TOML manifest")
                        .required(true),
                ),
        )
}

impl CliArgs {
    /// Parses the process arguments, exiting with usage on error.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    /// Parses an explicit argument list.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        command().try_get_matches_from(args).map(|matches| Self::from_matches(&matches))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        let string = |matches: &ArgMatches, id: &str| matches.get_one::<String>(id).cloned().unwrap_or_default();

        let command = match matches.subcommand() {
            Some(("apply", sub)) => HostCommand::Apply {
                manifest: PathBuf::from(string(sub, "manifest")),
            },
            Some(("hash", sub)) => HostCommand::Hash {
                name: string(sub, "name"),
                type_qualifier: string(sub, "type"),
                method: string(sub, "method"),
            },
            // `subcommand_required` rules this out
            _ => unreachable!("clap accepted an unknown subcommand"),
        };

        Self {
            config_path: PathBuf::from(string(matches, "config")),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            command,
        }
    }
}
