//! Storekeep CLI - Database migrations and seeding.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! sk-cli migrate
//!
//! # Insert the default order status rows
//! sk-cli seed statuses
//! ```
//!
//! # Environment Variables
//!
//! - `STOREKEEP_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sk-cli")]
#[command(author, version, about = "Storekeep CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed reference data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert one status row per order status code (existing codes are kept)
    Statuses,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    let pool = commands::connect().await?;
    match cli.command {
        Commands::Migrate => commands::migrate::run(&pool).await?,
        Commands::Seed { target } => match target {
            SeedTarget::Statuses => {
                commands::seed::statuses(&pool).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_seed_statuses() {
        let cli = Cli::try_parse_from(["sk-cli", "seed", "statuses"])
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::Seed {
                target: SeedTarget::Statuses
            }
        ));
    }
}
