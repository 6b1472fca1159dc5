//! Configuration management for the server.

use std::env;
use std::path::PathBuf;

/// Signing secret used when `AUTH_SECRET` is not set. Fine for local
/// development, unacceptable anywhere tokens matter.
pub const DEV_AUTH_SECRET: &str = "baler-dev-secret";

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Directory holding the persisted store blobs
    pub data_dir: PathBuf,
    /// Secret key signing issued tokens
    pub auth_secret: String,
    /// Lifetime of issued tokens, in hours
    pub token_ttl_hours: i64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let auth_secret = match env::var("AUTH_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ => {
                tracing::warn!(
                    "AUTH_SECRET is not set; signing tokens with the insecure development default"
                );
                DEV_AUTH_SECRET.to_string()
            }
        };

        let token_ttl_hours = env::var("TOKEN_TTL_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidTokenTtl)?;

        Ok(Self {
            host,
            port,
            data_dir,
            auth_secret,
            token_ttl_hours,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid TOKEN_TTL_HOURS value")]
    InvalidTokenTtl,
}
