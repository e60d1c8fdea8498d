use std::env;
use std::time::Duration;

use dotenvy::dotenv;

use crate::aggregate::DEFAULT_FETCH_TIMEOUT;
use crate::error::{IndicatorError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub fetch_timeout: Duration,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let fetch_timeout = match get("LTP_FETCH_TIMEOUT_SECS") {
            Some(raw) => {
                let seconds: u64 = raw.trim().parse().map_err(|_| {
                    IndicatorError::Config(format!(
                        "LTP_FETCH_TIMEOUT_SECS must be a whole number of seconds, got '{raw}'"
                    ))
                })?;
                if seconds == 0 {
                    return Err(IndicatorError::Config(
                        "LTP_FETCH_TIMEOUT_SECS must be greater than zero".to_string(),
                    ));
                }
                Duration::from_secs(seconds)
            }
            None => DEFAULT_FETCH_TIMEOUT,
        };

        Ok(Self {
            database_url: get("DATABASE_URL"),
            api_url: get("LTP_API_URL"),
            api_token: get("LTP_API_TOKEN"),
            fetch_timeout,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url.as_deref().ok_or_else(|| {
            IndicatorError::Config("DATABASE_URL must be set to a Postgres instance".to_string())
        })
    }

    pub fn require_api_url(&self) -> Result<&str> {
        self.api_url.as_deref().ok_or_else(|| {
            IndicatorError::Config(
                "LTP_API_URL must be set to the monitoring API base URL".to_string(),
            )
        })
    }
}
