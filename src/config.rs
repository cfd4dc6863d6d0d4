use anyhow::{Context, Result};

pub const MAILERLITE_URL: &str = "https://connect.mailerlite.com/v2/campaigns/send";

/// Settings read from the environment, after loading `.env` if there is one.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub access_token_minutes: i64,
    pub refresh_token_hours: i64,
    pub mailerlite_api_key: Option<String>,
    pub mailerlite_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let _ = dotenv::dotenv();

        Ok(Self {
            database_url: dotenv::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            bind_addr: dotenv::var("BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_owned()),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 16)?,
            jwt_secret: dotenv::var("JWT_SECRET")
                .context("JWT_SECRET must be set")?,
            jwt_issuer: dotenv::var("JWT_ISSUER")
                .unwrap_or_else(|_| "studyrooms".to_owned()),
            access_token_minutes: parse_or("ACCESS_TOKEN_MINUTES", 5)?,
            refresh_token_hours: parse_or("REFRESH_TOKEN_HOURS", 24)?,
            mailerlite_api_key: dotenv::var("MAILERLITE_API_KEY").ok().filter(|k| !k.is_empty()),
            mailerlite_url: dotenv::var("MAILERLITE_URL")
                .unwrap_or_else(|_| MAILERLITE_URL.to_owned()),
        })
    }

    /// Only what the maintenance binary needs.
    pub fn database_url_from_env() -> Result<String> {
        let _ = dotenv::dotenv();
        dotenv::var("DATABASE_URL").context("DATABASE_URL must be set")
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match dotenv::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("{key} must be a valid number")),
        Err(_) => Ok(default),
    }
}
