//! CLI for applying database schema migrations

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use server_core::config::Config;
use sqlx::PgPool;

#[derive(Parser)]
#[command(name = "migrate_cli")]
#[command(about = "Schema migration CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply all pending migrations
    Run,

    /// List embedded migrations
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let migrator = sqlx::migrate!("./migrations");

    match cli.command {
        Commands::Run => {
            let config = Config::from_env()?;
            let pool = PgPool::connect(&config.database_url)
                .await
                .context("Failed to connect to database")?;
            migrator
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
            tracing::info!("Migrations applied");
        }
        Commands::Info => {
            for migration in migrator.iter() {
                println!("{} {}", migration.version, migration.description);
            }
        }
    }

    Ok(())
}
