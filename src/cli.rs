use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "swap-engine")]
#[command(about = "Swap Engine - listing exchange negotiation and reservation service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Credential helpers for operators and local testing
    #[command(subcommand)]
    Token(TokenCommands),

    /// Configuration validation
    Config,
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Mint a signed bearer token for a user
    Issue {
        #[arg(long)]
        user_id: i64,

        #[arg(long, default_value_t = 24)]
        ttl_hours: i64,
    },
}

pub fn migrations_dir() -> PathBuf {
    std::env::var("MIGRATIONS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./migrations"))
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;

    tracing::info!("Running database migrations...");
    crate::db::run_migrations(&pool, &migrations_dir()).await?;
    println!("✓ Database migrations completed");

    Ok(())
}

pub fn handle_token_issue(config: &Config, user_id: i64, ttl_hours: i64) -> anyhow::Result<()> {
    if user_id <= 0 {
        anyhow::bail!("user id must be positive");
    }
    if ttl_hours <= 0 {
        anyhow::bail!("ttl must be positive");
    }

    let token = crate::auth::issue_token(
        &config.jwt_secret,
        user_id,
        chrono::Duration::hours(ttl_hours),
    )?;
    tracing::info!(user_id, ttl_hours, "issued bearer token");
    println!("{}", token);

    Ok(())
}

pub fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!("  Database URL: {}", mask_password(&config.database_url));
    println!("  DB Max Connections: {}", config.db_max_connections);
    println!("  DB Lock Timeout: {}ms", config.db_lock_timeout_ms);
    println!("  DB Switch Role: {}", config.db_switch_role);
    println!("  List Limit: {}", config.list_limit);
    println!("  CORS Origins: {:?}", config.cors_origins);

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");

    Ok(())
}

fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if let Some(slash_pos) = url[..colon_pos].rfind("//") {
                let prefix = &url[..slash_pos + 2];
                let user_start = slash_pos + 2;
                let user = &url[user_start..colon_pos];
                let suffix = &url[at_pos..];
                return format!("{}{}:****{}", prefix, user, suffix);
            }
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_database_password() {
        assert_eq!(
            mask_password("postgres://swap:s3cret@db:5432/swap"),
            "postgres://swap:****@db:5432/swap"
        );
    }

    #[test]
    fn leaves_url_without_credentials() {
        assert_eq!(mask_password("postgres://db/swap"), "postgres://db/swap");
    }

    #[test]
    fn parses_token_issue() {
        let cli = Cli::parse_from(["swap-engine", "token", "issue", "--user-id", "7"]);
        match cli.command {
            Some(Commands::Token(TokenCommands::Issue { user_id, ttl_hours })) => {
                assert_eq!(user_id, 7);
                assert_eq!(ttl_hours, 24);
            }
            _ => panic!("expected token issue"),
        }
    }
}
