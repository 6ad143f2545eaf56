use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Process-wide settings, read once at startup and handed to constructors.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub skip_migrations: bool,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub frontend_url: String,
    pub gql_introspection: bool,
    pub payments: PaymentConfig,
}

#[derive(Clone, Debug)]
pub struct PaymentConfig {
    pub secret_key: String,
    pub api_base_url: String,
    pub timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            skip_migrations: env::var("SKIP_MIGRATIONS")
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(false),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .context("PORT must be a valid port number")?,
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            gql_introspection: env::var("GQL_INTROSPECTION")
                .map(|v| v == "true")
                .unwrap_or(false),
            payments: PaymentConfig::from_env()?,
        })
    }
}

impl PaymentConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            secret_key: env::var("TOSS_SECRET_KEY").context("TOSS_SECRET_KEY must be set")?,
            api_base_url: env::var("TOSS_API_BASE_URL")
                .unwrap_or_else(|_| "https://api.tosspayments.com".to_string()),
            timeout: Duration::from_secs(
                env::var("PAYMENT_GATEWAY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        })
    }
}
