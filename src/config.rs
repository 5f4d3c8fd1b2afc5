use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub db_max_connections: u32,
    /// Base URL of the identity service.
    pub identity_url: Option<String>,
    /// Accept self-asserted `role:user_id` tokens when no identity service is
    /// configured. Off unless ALLOW_DEV_TOKENS is set.
    pub allow_dev_tokens: bool,
    /// Base URL documents are uploaded to; `None` keeps them in memory.
    pub blob_storage_url: Option<String>,
    /// Base URL documents are served from. Falls back to `blob_storage_url`.
    pub blob_public_url: Option<String>,
    pub seed_categories: bool,
}

/// Where bearer tokens get checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentitySource {
    Remote(String),
    DevTokens,
    /// No identity service and dev tokens not allowed: every token is refused.
    Disabled,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://elearning.db?mode=rwc".to_string());
        let bind_addr = parse_var("BIND_ADDR", "127.0.0.1:3000")?;
        let db_max_connections = parse_var("DB_MAX_CONNECTIONS", "5")?;
        let seed_categories = parse_var("SEED_CATEGORIES", "true")?;
        let allow_dev_tokens = parse_var("ALLOW_DEV_TOKENS", "false")?;

        let blob_storage_url = optional_var("BLOB_STORAGE_URL");
        let blob_public_url = optional_var("BLOB_PUBLIC_URL").or_else(|| blob_storage_url.clone());

        Ok(Self {
            database_url,
            bind_addr,
            db_max_connections,
            identity_url: optional_var("IDENTITY_URL"),
            allow_dev_tokens,
            blob_storage_url,
            blob_public_url,
            seed_categories,
        })
    }

    pub fn identity_source(&self) -> IdentitySource {
        match &self.identity_url {
            Some(url) => IdentitySource::Remote(url.clone()),
            None if self.allow_dev_tokens => IdentitySource::DevTokens,
            None => IdentitySource::Disabled,
        }
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(name: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = env::var(name).unwrap_or_else(|_| default.to_string());
    value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        name,
        value: value.clone(),
        reason: e.to_string(),
    })
}
