use anyhow::{Result, anyhow};
use chrono::{FixedOffset, Offset, Utc};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub client_base_url: String,
    /// Offset of the firm's local time from UTC, in minutes. Used for the
    /// regular-hours window and for "today" when validating leave dates.
    pub business_utc_offset_minutes: i32,
    /// Debit the leave-credit ledger automatically when a leave is approved.
    pub leave_auto_debit: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_env_only()
    }

    /// Load configuration from environment variables only (without loading .env files)
    /// This is useful for testing where you want to control the environment directly
    pub fn from_env_only() -> Result<Self> {
        let business_utc_offset_minutes: i32 = env::var("BUSINESS_UTC_OFFSET_MINUTES")
            .unwrap_or_else(|_| "0".to_string())
            .parse()
            .map_err(|_| anyhow!("BUSINESS_UTC_OFFSET_MINUTES must be an integer"))?;

        if business_utc_offset_minutes.abs() >= 24 * 60 {
            return Err(anyhow!(
                "BUSINESS_UTC_OFFSET_MINUTES out of range: {}",
                business_utc_offset_minutes
            ));
        }

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://@localhost:5432/workledger".to_string()),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                "your-super-secret-jwt-key-change-this-in-production-12345".to_string()
            }),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            client_base_url: env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            business_utc_offset_minutes,
            leave_auto_debit: env::var("LEAVE_AUTO_DEBIT")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(false),
        })
    }

    /// Fixed configuration for tests, never touching the process environment
    pub fn test_config() -> Self {
        Config {
            database_url: "postgres://@localhost:5432/workledger_test".to_string(),
            jwt_secret: "test-jwt-secret-key-that-is-long-enough".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            client_base_url: "http://localhost:3000".to_string(),
            business_utc_offset_minutes: 0,
            leave_auto_debit: false,
        }
    }

    pub fn business_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.business_utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }

    /// `DATABASE_URL=memory` runs against the in-process store
    pub fn uses_memory_store(&self) -> bool {
        self.database_url == "memory"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
