// fridactl/src/cli.rs
//! Defines the command-line argument structure using clap.
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use fridactl_common::error::Result;
use fridactl_common::Config;

pub mod clean;
pub mod events;
pub mod paths;
pub mod start;
pub mod status;
pub mod stop;

use crate::cli::clean::Clean;
use crate::cli::paths::Paths;
use crate::cli::start::StartArgs;
use crate::cli::status::Status;
use crate::cli::stop::StopArgs;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "fridactl", bin_name = "fridactl")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Directory the server binary is copied into before launch.
    #[arg(long, global = true, value_name = "DIR")]
    pub staging_dir: Option<PathBuf>,

    /// Binary used to run commands as root.
    #[arg(long, global = true, value_name = "BIN")]
    pub su: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl CliArgs {
    /// Flags win over the environment.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.staging_dir {
            config.staging_dir = dir.clone();
        }
        if let Some(su) = &self.su {
            config.su_binary = su.clone();
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download, stage and launch a frida-server version.
    Start(StartArgs),
    /// Kill the running frida-server.
    Stop(StopArgs),
    /// Show matching entries from the process table.
    Status(Status),
    /// Show where a version's artifacts live and where they come from.
    Paths(Paths),
    /// Remove cached downloads.
    Clean(Clean),
}

impl Command {
    /// Returns `Ok(false)` when the command ran but did not succeed; the
    /// reason has already been printed.
    pub fn run(&self, config: &Config) -> Result<bool> {
        match self {
            Self::Start(command) => command.run(config),
            Self::Stop(command) => command.run(config),
            Self::Status(command) => command.run(config),
            Self::Paths(command) => command.run(config),
            Self::Clean(command) => command.run(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_start_with_global_flags() {
        let args = CliArgs::parse_from([
            "fridactl",
            "-vv",
            "start",
            "16.1.4",
            "--json",
            "--staging-dir",
            "/data/local/tmp/alt",
            "--su",
            "/system/xbin/su",
        ]);
        assert_eq!(args.verbose, 2);
        match &args.command {
            Command::Start(start) => {
                assert_eq!(start.version, "16.1.4");
                assert!(start.json);
            }
            other => panic!("unexpected command {other:?}"),
        }

        let mut config = Config::new("/h");
        args.apply_overrides(&mut config);
        assert_eq!(config.staging_dir, PathBuf::from("/data/local/tmp/alt"));
        assert_eq!(config.su_binary, "/system/xbin/su");
    }

    #[test]
    fn clean_version_is_optional() {
        let args = CliArgs::parse_from(["fridactl", "clean"]);
        assert!(matches!(args.command, Command::Clean(Clean { version: None })));
        let args = CliArgs::parse_from(["fridactl", "clean", "16.1.4"]);
        assert!(matches!(args.command, Command::Clean(Clean { version: Some(ref v) }) if v == "16.1.4"));
    }

    #[test]
    fn start_requires_a_version() {
        assert!(CliArgs::try_parse_from(["fridactl", "start"]).is_err());
    }
}
