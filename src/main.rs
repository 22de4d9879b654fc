//! lovenote - session client for the lovenote note-sharing service
//!
#![doc = "lovenote - session client CLI"]
#![doc = "Main entry point for the lovenote command-line client."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lovenote::cli::{Cli, Commands};
use lovenote::commands;
use lovenote::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Login { username, password } => {
            tracing::info!(username = %username, "Starting login");
            commands::session::login(config, username, password).await?;
            Ok(())
        }
        Commands::Register {
            username,
            email,
            password,
            profile_picture,
        } => {
            tracing::info!(username = %username, "Starting registration");
            commands::session::register(config, username, email, password, profile_picture)
                .await?;
            Ok(())
        }
        Commands::Whoami { json } => {
            commands::session::whoami(config, json).await?;
            Ok(())
        }
        Commands::Logout => {
            tracing::info!("Starting logout");
            commands::session::logout(config).await?;
            Ok(())
        }
        Commands::Get { path } => {
            tracing::debug!(path = %path, "Sending GET");
            commands::session::get(config, path).await?;
            Ok(())
        }
        Commands::Shell => {
            tracing::info!("Starting interactive shell");
            commands::shell::run_shell(config).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects debug output for
/// this crate.
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "lovenote=debug" } else { "lovenote=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
