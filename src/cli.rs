/// CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::utils::{DEFAULT_HOST, DEFAULT_PORT};

// Build timestamp injected at compile time
pub const BUILD_TIMESTAMP: &str = env!("BUILD_TIMESTAMP");
pub const VERSION_WITH_BUILD: &str = concat!(env!("CARGO_PKG_VERSION"), " (built: ", env!("BUILD_TIMESTAMP"), ")");

pub fn get_version() -> &'static str {
    VERSION_WITH_BUILD
}

#[derive(Parser)]
#[command(name = "mongo-console")]
#[command(author, version = VERSION_WITH_BUILD, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to the per-user config path)
    #[arg(short, long, global = true, env = "MONGO_CONSOLE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP console (default when no command is given)
    #[cfg(feature = "server")]
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = DEFAULT_HOST)]
        host: String,

        /// Enable CORS for cross-origin requests
        #[arg(long)]
        cors: bool,
    },

    /// Show container status
    Status,

    /// Pull the latest image and start or update the service
    Deploy,

    /// Print the last log lines
    Logs,

    /// Write a gzip archive of the database to a local file
    Backup {
        /// Destination file
        #[arg(short, long, default_value = "mongo_backup.gz")]
        output: PathBuf,
    },

    /// Restore the database from a local gzip archive
    Restore {
        /// Archive to restore
        file: PathBuf,
    },

    /// Allow an IP address or CIDR block to reach the database port
    AddRule {
        /// Source address, e.g. 203.0.113.5 or 10.0.0.0/24
        ip: String,
    },

    /// Check the compose file and credential for the default password
    Check,

    /// Generate a random API token
    GenerateToken,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_backup_output() {
        let cli = Cli::try_parse_from(["mongo-console", "backup", "-o", "/tmp/out.gz"]).unwrap();
        match cli.command {
            Some(Commands::Backup { output }) => assert_eq!(output, PathBuf::from("/tmp/out.gz")),
            _ => panic!("expected backup command"),
        }
    }

    #[test]
    fn test_parse_add_rule() {
        let cli = Cli::try_parse_from(["mongo-console", "add-rule", "10.0.0.0/24"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::AddRule { ip }) if ip == "10.0.0.0/24"));
    }

    #[test]
    fn test_no_command_is_allowed() {
        let cli = Cli::try_parse_from(["mongo-console"]).unwrap();
        assert!(cli.command.is_none());
    }
}
