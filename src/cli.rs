use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// `retalwatch` - Torn faction retal and enemy travel alerts for Discord.
#[derive(Parser, Debug)]
#[command(name = "retalwatch")]
#[command(version = "0.1.0")]
#[command(about = "Posts Torn retal windows and enemy travel to Discord.", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.retalwatch/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the watchers and the Discord command listener until Ctrl+C
    Run,

    /// Load and validate configuration, then print a redacted summary
    Check,
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
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["retalwatch", "run", "--verbose", "-c", "/tmp/rw.toml"]);
        assert_eq!(cli.command, Commands::Run);
        assert!(cli.verbose);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/rw.toml")));
    }

    #[test]
    fn check_subcommand_parses() {
        let cli = Cli::parse_from(["retalwatch", "check"]);
        assert_eq!(cli.command, Commands::Check);
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
    }
}
