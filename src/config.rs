use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub db_max_connections: u32,
    pub db_lock_timeout_ms: u64,
    pub db_switch_role: bool,
    pub list_limit: i64,
    pub cors_origins: CorsOrigins,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

impl CorsOrigins {
    /// `*.vercel.app` style entries match any subdomain of the suffix.
    pub fn allows(&self, origin: &str) -> bool {
        match self {
            CorsOrigins::Any => true,
            CorsOrigins::List(entries) => entries.iter().any(|entry| {
                match entry.strip_prefix('*') {
                    Some(suffix) if suffix.starts_with('.') => origin.ends_with(suffix),
                    _ => origin == entry,
                }
            }),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        let jwt_secret = env::var("JWT_SECRET")?;
        if jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let list_limit: i64 = env::var("LIST_LIMIT")
            .unwrap_or_else(|_| "100".to_string())
            .parse()?;
        if list_limit <= 0 {
            anyhow::bail!("LIST_LIMIT must be positive");
        }

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL")?,
            jwt_secret,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
            db_lock_timeout_ms: env::var("DB_LOCK_TIMEOUT_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()?,
            db_switch_role: parse_bool(&env::var("DB_SWITCH_ROLE").unwrap_or_default())?,
            list_limit,
            cors_origins: parse_cors_origins(&env::var("CORS_ORIGINS").unwrap_or_default()),
        })
    }
}

fn parse_bool(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        other => anyhow::bail!("expected a boolean, got '{}'", other),
    }
}

fn parse_cors_origins(raw: &str) -> CorsOrigins {
    // Unset or empty allows no cross-origin callers; `*` opts into any.
    let value = raw.trim();
    if value == "*" {
        return CorsOrigins::Any;
    }

    CorsOrigins::List(
        value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect(),
    )
}
