//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - watch: monitor continuously until stopped (default)
//! - once: run a single cycle and exit
//! - sites: print the configured sites

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// batwatch - battery connectivity monitor for site dashboards
#[derive(Parser, Debug)]
#[command(name = "batwatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (log to stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Check all sites on an interval until the stop file appears or Ctrl-C
    Watch {
        /// Emit one JSON line per cycle
        #[arg(long)]
        json: bool,
    },

    /// Check all sites once and exit
    Once {
        /// Emit the cycle as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the configured sites
    Sites,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_no_args() {
        // No args should result in None command (watch mode)
        let cli = Cli::try_parse_from(["batwatch"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::try_parse_from(["batwatch", "-v"]).unwrap();
        assert!(cli.is_verbose());
    }

    #[test]
    fn test_cli_config_option() {
        let cli = Cli::try_parse_from(["batwatch", "-c", "/etc/batwatch.yml"]).unwrap();
        assert_eq!(cli.config.as_ref(), Some(&PathBuf::from("/etc/batwatch.yml")));
    }

    #[test]
    fn test_once_json() {
        let cli = Cli::try_parse_from(["batwatch", "once", "--json"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Once { json: true }));
    }

    #[test]
    fn test_watch_defaults() {
        let cli = Cli::try_parse_from(["batwatch", "watch"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Watch { json: false }));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["batwatch", "sites", "-v", "--config", "b.yml"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Sites));
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("b.yml")));
    }

    #[test]
    fn test_unknown_subcommand_fails() {
        assert!(Cli::try_parse_from(["batwatch", "daemon"]).is_err());
    }

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }
}
