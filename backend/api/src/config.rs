//! Application configuration loaded from environment variables.

use crate::errors::{ApiError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// Platform fee in basis points, taken on every release (1000 = 10%)
    pub fee_bps: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let config = Config {
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./escrow.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid API_PORT".to_string()))?,
            fee_bps: env_var("FEE_BPS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid FEE_BPS".to_string()))?,
        };
        if config.fee_bps > 10_000 {
            return Err(ApiError::Config(
                "FEE_BPS must be at most 10000 (100%)".to_string(),
            ));
        }
        Ok(config)
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| ApiError::Config(format!("Missing env var: {key}")))
}
