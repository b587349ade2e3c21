// tictime/src/main.rs

mod cli;
mod logic;

use clap::Parser;
use std::process::ExitCode;
use cli::{AccountAction, Cli, Commands};
use logic::client::{account, error::ClientError, state, url_utils::Endpoint, watch, Outcome};
use logic::config::{ServeConfig, ServeOverrides};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tictime=info,warp=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();

    // Parse command‐line arguments (TICTIME_HOST / TICTIME_PORT / TICTIME_URL are read by clap)
    let args = Cli::parse();
    let endpoint = Endpoint::new(args.url.clone(), args.host.clone(), args.port);

    // Pre‐load token for client commands that need a login
    let token = match &args.command {
        Commands::Serve { .. } | Commands::Health => None,
        Commands::Account { action } => match action {
            AccountAction::Delete { .. } | AccountAction::List => Some(account::read_token()),
            _ => None,
        },
        Commands::Watch { .. } | Commands::State => Some(account::read_token()),
    };
    let token = match token {
        Some(Ok(t)) => Some(t),
        Some(Err(_)) => {
            eprintln!("✗ {}", ClientError::NotLoggedIn);
            return Ok(ExitCode::FAILURE);
        }
        None => None,
    };

    // Dispatch on subcommand
    let outcome = match args.command {
        Commands::Serve {
            db_path,
            daemon,
            root_pass,
            config,
            tick_ms,
            time_format,
            session_hours,
        } => {
            // File first, then env and flags on top
            let base = match config {
                Some(path) => ServeConfig::from_file(path)?,
                None => ServeConfig::default(),
            };
            let serve_config = base.with_env_and_args(ServeOverrides {
                tick_ms,
                time_format,
                session_hours,
            })?;

            logic::serve::run(args.host, args.port, db_path, daemon, root_pass, serve_config).await?;
            Outcome::Done
        }

        Commands::Watch {
            inline,
            count,
            max_attempts,
        } => {
            let options = watch::WatchOptions {
                max_attempts,
                count,
                inline,
            };
            watch::run(endpoint, token.unwrap_or_default(), options).await?
        }

        Commands::State => state::show(&endpoint, token.unwrap_or_default()).await?,

        Commands::Health => state::health(&endpoint).await?,

        Commands::Account { action } => match action {
            AccountAction::Register {
                username,
                password,
                rootpass,
            } => account::register(&endpoint, username, password, rootpass).await?,
            AccountAction::Login { username, password } => {
                account::login(&endpoint, username, password).await?
            }
            AccountAction::Logout => account::logout(&endpoint).await?,
            AccountAction::Delete { username } => {
                account::delete(&endpoint, token.unwrap_or_default(), username).await?
            }
            AccountAction::List => account::list_users(&endpoint, token.unwrap_or_default()).await?,
        },
    };

    Ok(outcome.into())
}
