//! # Command Line Interface
//!
//! `serve` runs the HTTP API (the default); `migrate` manages the schema and exits.

use crate::api::{start_api_server, ApiState};
use crate::config::{AppConfig, DatabaseConfig, ObservabilityConfig};
use crate::observability::{init_logging, init_observability, log_config_info};
use crate::storage::{
    create_pool, list_applied_migrations, run_db_migrations, validate_migrations, MigrationInfo,
};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "campus-auth")]
#[command(about = "Credential and session service for the campus learning platform")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Database URL override
    #[arg(long, global = true)]
    pub database_url: Option<String>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP API server
    Serve,

    /// Apply pending migrations and exit
    Migrate {
        /// Only report whether every migration is applied
        #[arg(long, conflicts_with = "list")]
        check: bool,

        /// List applied migrations
        #[arg(long)]
        list: bool,
    },
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    // .env is optional; only a malformed file is worth reporting
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(cli.database_url).await,
        Commands::Migrate { check, list } => migrate(cli.database_url, check, list).await,
    }
}

async fn serve(database_url: Option<String>) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env()?;
    if let Some(url) = database_url {
        config.database.url = url;
    }
    config.validate()?;

    init_observability(&config.observability).await?;
    info!(version = crate::VERSION, "Starting campus auth service");
    log_config_info(&config);

    let pool = create_pool(&config.database).await?;
    let state = ApiState::with_sqlx(pool, &config.auth)?;
    start_api_server(&config.server, state).await?;
    Ok(())
}

async fn migrate(database_url: Option<String>, check: bool, list: bool) -> anyhow::Result<()> {
    init_logging(&ObservabilityConfig::from_env())?;

    let mut database = DatabaseConfig::from_env();
    if let Some(url) = database_url {
        database.url = url;
    }
    database.auto_migrate = false;
    let pool = create_pool(&database).await?;

    if check {
        if validate_migrations(&pool).await? {
            println!("Database schema is up to date");
            return Ok(());
        }
        anyhow::bail!("Database schema has pending migrations");
    }

    if list {
        let migrations = list_applied_migrations(&pool).await?;
        if migrations.is_empty() {
            println!("No migrations have been applied");
        } else {
            print_migrations_table(&migrations);
        }
        return Ok(());
    }

    run_db_migrations(&pool).await?;
    println!("Migrations completed successfully");
    Ok(())
}

/// Print migrations in a formatted table
fn print_migrations_table(migrations: &[MigrationInfo]) {
    println!("{:<15} {:<50} {:<25} {:<10}", "Version", "Description", "Applied On", "Time (ms)");
    println!("{}", "-".repeat(100));

    for migration in migrations {
        println!(
            "{:<15} {:<50} {:<25} {:<10}",
            migration.version,
            truncate_string(&migration.description, 48),
            migration.installed_on.format("%Y-%m-%d %H:%M:%S"),
            migration.execution_time
        );
    }
}

/// Truncate a string to a maximum length
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::try_parse_from(["campus-auth"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["campus-auth", "serve"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Serve));
    }

    #[test]
    fn migrate_flags_parse() {
        let cli = Cli::try_parse_from([
            "campus-auth",
            "migrate",
            "--check",
            "--database-url",
            "postgresql://localhost/campus",
        ])
        .unwrap();
        assert_eq!(cli.command, Some(Commands::Migrate { check: true, list: false }));
        assert_eq!(cli.database_url.as_deref(), Some("postgresql://localhost/campus"));

        assert!(Cli::try_parse_from(["campus-auth", "migrate", "--check", "--list"]).is_err());
    }

    #[test]
    fn truncate_handles_multibyte() {
        assert_eq!(truncate_string("create identity tables", 48), "create identity tables");
        assert_eq!(truncate_string("создать таблицы", 8), "созда...");
    }
}
