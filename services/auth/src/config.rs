//! Service configuration loaded from the environment

use anyhow::{Result, bail};
use chrono::Duration;
use jsonwebtoken::Algorithm;
use std::str::FromStr;

/// Default session token lifetime: 24 hours
const DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 1440;
const DEFAULT_RESET_TOKEN_EXPIRE_HOURS: i64 = 1;
/// One year
const MAX_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 525_600;
/// One week
const MAX_RESET_TOKEN_EXPIRE_HOURS: i64 = 168;
/// Every five minutes, on the minute
const DEFAULT_SWEEP_SCHEDULE: &str = "0 */5 * * * *";

/// Where users and reset tokens are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => bail!("Unknown STORAGE_BACKEND: {}", other),
        }
    }
}

/// Authentication service configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret used to sign session tokens
    pub secret_key: String,
    /// Symmetric signing algorithm
    pub algorithm: Algorithm,
    /// Session token lifetime in minutes (default: 1440)
    pub access_token_expire_minutes: i64,
    /// Reset token lifetime in hours (default: 1)
    pub reset_token_expire_hours: i64,
    /// Cron expression for the revocation/reset-token sweeps
    pub sweep_schedule: String,
    pub bind_address: String,
    /// Base URL of the web client, used to build reset links
    pub frontend_url: String,
    pub storage_backend: StorageBackend,
}

impl AuthConfig {
    /// Create a new AuthConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SECRET_KEY`: HMAC secret (required)
    /// - `ALGORITHM`: HS256, HS384 or HS512 (default: HS256)
    /// - `ACCESS_TOKEN_EXPIRE_MINUTES`: session token lifetime (default: 1440)
    /// - `RESET_TOKEN_EXPIRE_HOURS`: reset token lifetime (default: 1)
    /// - `SWEEP_SCHEDULE`: six-field cron expression (default: every 5 minutes)
    /// - `BIND_ADDRESS`: listen address (default: 0.0.0.0:3000)
    /// - `FRONTEND_URL`: web client base URL (default: http://localhost:5173)
    /// - `STORAGE_BACKEND`: postgres or memory (default: postgres)
    pub fn from_env() -> Result<Self> {
        let secret_key = std::env::var("SECRET_KEY")
            .map_err(|_| anyhow::anyhow!("SECRET_KEY environment variable not set"))?;
        if secret_key.trim().is_empty() {
            bail!("SECRET_KEY must not be empty");
        }

        let algorithm = match std::env::var("ALGORITHM") {
            Ok(value) => parse_hmac_algorithm(&value)?,
            Err(_) => Algorithm::HS256,
        };

        let access_token_expire_minutes = std::env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
            .unwrap_or_else(|_| DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES.to_string())
            .parse()
            .unwrap_or(DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES);
        check_lifetime(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            access_token_expire_minutes,
            MAX_ACCESS_TOKEN_EXPIRE_MINUTES,
        )?;

        let reset_token_expire_hours = std::env::var("RESET_TOKEN_EXPIRE_HOURS")
            .unwrap_or_else(|_| DEFAULT_RESET_TOKEN_EXPIRE_HOURS.to_string())
            .parse()
            .unwrap_or(DEFAULT_RESET_TOKEN_EXPIRE_HOURS);
        check_lifetime(
            "RESET_TOKEN_EXPIRE_HOURS",
            reset_token_expire_hours,
            MAX_RESET_TOKEN_EXPIRE_HOURS,
        )?;

        let sweep_schedule =
            std::env::var("SWEEP_SCHEDULE").unwrap_or_else(|_| DEFAULT_SWEEP_SCHEDULE.to_string());

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let frontend_url = std::env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .trim_end_matches('/')
            .to_string();

        let storage_backend = match std::env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StorageBackend::Postgres,
        };

        Ok(AuthConfig {
            secret_key,
            algorithm,
            access_token_expire_minutes,
            reset_token_expire_hours,
            sweep_schedule,
            bind_address,
            frontend_url,
            storage_backend,
        })
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::minutes(self.access_token_expire_minutes)
    }

    pub fn reset_token_ttl(&self) -> Duration {
        Duration::hours(self.reset_token_expire_hours)
    }
}

/// Token lifetimes must be positive and small enough to add to the current time
fn check_lifetime(name: &str, value: i64, max: i64) -> Result<()> {
    if value <= 0 {
        bail!("{} must be positive, got {}", name, value);
    }
    if value > max {
        bail!("{} must be at most {}, got {}", name, max, value);
    }
    Ok(())
}

/// Only symmetric algorithms make sense with a shared secret
fn parse_hmac_algorithm(value: &str) -> Result<Algorithm> {
    match value.to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => bail!("Unsupported ALGORITHM {}: only HS256, HS384 and HS512 are allowed", other),
    }
}
