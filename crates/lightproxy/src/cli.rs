use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "lightproxy-install",
    version,
    about = "Install the LightProxy root CA and proxy helper"
)]
pub struct Cli {
    /// Config file (default: <data dir>/config.toml)
    #[arg(long, env = "LIGHTPROXY_CONFIG", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "LIGHTPROXY_LOG", default_value = "info", global = true)]
    pub log_level: String,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write logs to file (in addition to stderr)
    #[arg(long, env = "LIGHTPROXY_LOG_FILE", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Output JSON instead of human-readable text
    #[arg(long, global = true)]
    pub json: bool,

    /// Give up on the administrator prompt after N seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    pub prompt_timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Install whatever is missing (default)
    Install,
    /// Show what is installed without changing anything
    Status,
    /// Show version information
    Version,
}

impl Cli {
    /// Log filter directive after applying `-v` / `-vv`.
    pub fn log_directive(&self) -> &str {
        match self.verbose {
            0 => self.log_level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_install() {
        let cli = Cli::parse_from(["lightproxy-install"]);
        assert!(cli.command.is_none());
        assert!(!cli.json);
        assert!(cli.prompt_timeout.is_none());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["lightproxy-install", "status", "--json", "-vv"]);
        assert_eq!(cli.command, Some(Command::Status));
        assert!(cli.json);
        assert_eq!(cli.log_directive(), "trace");
    }

    #[test]
    fn verbosity_overrides_log_level() {
        let cli = Cli::parse_from(["lightproxy-install", "--log-level", "warn"]);
        assert_eq!(cli.log_directive(), "warn");
        let cli = Cli::parse_from(["lightproxy-install", "--log-level", "warn", "-v"]);
        assert_eq!(cli.log_directive(), "debug");
    }

    #[test]
    fn prompt_timeout_parses_seconds() {
        let cli = Cli::parse_from(["lightproxy-install", "install", "--prompt-timeout", "45"]);
        assert_eq!(cli.command, Some(Command::Install));
        assert_eq!(cli.prompt_timeout, Some(45));
    }
}
