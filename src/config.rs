use std::env;
use thiserror::Error;

/// Errors raised while reading configuration from the environment.
///
/// These are fatal at startup: no partial work happens on a bad environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{0} is invalid: {1}")]
    Invalid(&'static str, String),
}

/// Application configuration parsed from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub tally_url: String,
    pub tally_company: String,
    pub database_url: String,
    pub batch_days: i64,
    pub voucher_timeout_secs: u64,
    pub master_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let tally_url = env::var("TALLY_URL")
            .map_err(|_| ConfigError::Missing("TALLY_URL"))?
            .trim_end_matches('/')
            .to_string();

        let tally_company =
            env::var("TALLY_COMPANY").map_err(|_| ConfigError::Missing("TALLY_COMPANY"))?;

        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let batch_days = env::var("BATCH_DAYS")
            .unwrap_or_else(|_| "15".to_string())
            .parse::<i64>()
            .map_err(|e| ConfigError::Invalid("BATCH_DAYS", e.to_string()))?;
        if batch_days < 1 {
            return Err(ConfigError::Invalid(
                "BATCH_DAYS",
                "must be at least 1".to_string(),
            ));
        }

        let voucher_timeout_secs = env::var("TALLY_VOUCHER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()
            .map_err(|e| ConfigError::Invalid("TALLY_VOUCHER_TIMEOUT_SECS", e.to_string()))?;

        let master_timeout_secs = env::var("TALLY_MASTER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse::<u64>()
            .map_err(|e| ConfigError::Invalid("TALLY_MASTER_TIMEOUT_SECS", e.to_string()))?;

        Ok(Config {
            tally_url,
            tally_company,
            database_url,
            batch_days,
            voucher_timeout_secs,
            master_timeout_secs,
        })
    }
}
