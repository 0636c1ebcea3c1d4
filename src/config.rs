//! Application configuration structure
use std::{env, fmt::Display, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use secrecy::SecretString;
use tracing::info;

use crate::store::RetryPolicy;

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: String,
    pub auth_key: SecretString,
    pub read_retry: RetryPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL not set")?;
        let auth_key = env::var("AUTH_KEY").context("AUTH_KEY not set")?.into();
        let bind_address = try_load("BIND_ADDRESS", "0.0.0.0:8000")?;
        let read_retry = RetryPolicy {
            attempts: try_load("READ_RETRY_ATTEMPTS", "3")?,
            base_delay: Duration::from_millis(try_load("READ_RETRY_BASE_MS", "50")?),
        };

        Ok(Self {
            database_url,
            bind_address,
            auth_key,
            read_retry,
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse()
        .map_err(|e| anyhow::anyhow!("Invalid {key} value {raw:?}: {e}"))
}
