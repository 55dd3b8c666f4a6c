use std::{env, fmt::Display, str::FromStr};

use derive_more::{Display, Error};
use log::{info, warn};

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display(fmt = "environment variable {} must be set", _0)]
    Missing(#[error(not(source))] &'static str),

    #[display(fmt = "environment variable {} is invalid: {}", key, reason)]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub secret: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub media_store_url: Option<String>,
    pub media_store_key: Option<String>,
    /// Empty means any origin is allowed.
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Read configuration from the process environment (after `.env` is loaded).
    ///
    /// | Env Var              | Required | Default     |
    /// |----------------------|----------|-------------|
    /// | `SECRET`             | yes      |             |
    /// | `BIND_ADDR`          | no       | `127.0.0.1` |
    /// | `PORT`               | no       | `3001`      |
    /// | `DATABASE_URL`       | no       | in-memory   |
    /// | `DB_MAX_CONNECTIONS` | no       | `5`         |
    /// | `MEDIA_STORE_URL`    | no       | none        |
    /// | `MEDIA_STORE_KEY`    | no       | none        |
    /// | `CORS_ORIGINS`       | no       | any origin  |
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = optional("SECRET").ok_or(ConfigError::Missing("SECRET"))?;
        Ok(Self {
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or("PORT", 3001)?,
            secret,
            database_url: optional("DATABASE_URL"),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 5)?,
            media_store_url: optional("MEDIA_STORE_URL"),
            media_store_key: optional("MEDIA_STORE_KEY"),
            cors_origins: optional("CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match optional(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
