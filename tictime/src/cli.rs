use clap::{Parser, Subcommand};

/// live time broadcast over websockets, with browser and terminal displays
#[derive(Parser)]
#[command(name = "tictime", version)]
pub struct Cli {
    /// Address to bind (serve) or connect to (client)
    #[arg(short = 'H', long, env = "TICTIME_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind or connect to
    #[arg(short, long, env = "TICTIME_PORT", default_value_t = 3030)]
    pub port: u16,

    /// Full base URL of the server (e.g. https://clock.example.com); wins over host/port
    #[arg(long, env = "TICTIME_URL", global = true)]
    pub url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the time broadcast server
    Serve {
        /// Path to database file or directory (supports `~`)
        #[arg(short, long, default_value = "~/.local/share/tictime")]
        db_path: String,
        /// Run as daemon in background (Unix only)
        #[arg(long)]
        daemon: bool,
        /// Optional shared secret to create root users
        #[arg(long, alias = "rootpass", env = "TICTIME_ROOT_PASS")]
        root_pass: Option<String>,
        /// Path to a TOML configuration file (supports `~`)
        #[arg(short, long)]
        config: Option<String>,
        /// Ticker period in milliseconds (overrides config file)
        #[arg(long)]
        tick_ms: Option<u64>,
        /// strftime pattern for each tick (overrides config file)
        #[arg(long)]
        time_format: Option<String>,
        /// Login session lifetime in hours (overrides config file)
        #[arg(long)]
        session_hours: Option<i64>,
    },

    /// Follow the live time in the terminal
    Watch {
        /// Rewrite a single line instead of printing one line per update
        #[arg(short, long)]
        inline: bool,
        /// Exit after this many updates
        #[arg(short = 'n', long)]
        count: Option<usize>,
        /// Consecutive failed reconnects before giving up (0 = never)
        #[arg(long, default_value_t = 0)]
        max_attempts: usize,
    },

    /// Print the current state a new display would start from
    State,

    /// Check that the server is up
    Health,

    /// User account management (register, login, logout, delete, list)
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
}

#[derive(Subcommand)]
pub enum AccountAction {
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
        /// Supply `--root-pass` (or `--rootpass`) to become root
        #[arg(long, alias = "root-pass")]
        rootpass: Option<String>,
    },
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    Logout,
    Delete {
        #[arg(value_name = "USERNAME")]
        username: String,
    },
    List,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn watch_flags_parse() {
        let cli = Cli::parse_from(["tictime", "watch", "--inline", "-n", "3"]);
        match cli.command {
            Commands::Watch { inline, count, max_attempts } => {
                assert!(inline);
                assert_eq!(count, Some(3));
                assert_eq!(max_attempts, 0);
            }
            _ => panic!("expected watch"),
        }
    }
}
