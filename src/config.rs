//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Queue carrying purchase-completed events
    pub purchase_completed_queue: String,

    /// Sleep between polls when the queue is empty
    pub consumer_poll_interval: Duration,

    /// Redelivery delay for unacknowledged messages
    pub queue_visibility_timeout: Duration,

    /// Deliveries before a message is parked as dead
    pub queue_max_deliveries: u32,

    /// Emit JSON log lines instead of the human-readable format
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", 10)?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = parse_or("PORT", 3000)?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let purchase_completed_queue = env::var("PURCHASE_COMPLETED_QUEUE")
            .unwrap_or_else(|_| "payments/purchases-completed".to_string());

        let consumer_poll_interval =
            Duration::from_millis(parse_or("CONSUMER_POLL_INTERVAL_MS", 1000)?);

        let queue_visibility_timeout =
            Duration::from_secs(parse_or("QUEUE_VISIBILITY_TIMEOUT_SECS", 30)?);

        let queue_max_deliveries = parse_or("QUEUE_MAX_DELIVERIES", 5)?;
        if queue_max_deliveries == 0 {
            return Err(ConfigError::InvalidValue("QUEUE_MAX_DELIVERIES"));
        }

        let log_json = env::var("LOG_FORMAT")
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            purchase_completed_queue,
            consumer_poll_interval,
            queue_visibility_timeout,
            queue_max_deliveries,
            log_json,
        })
    }
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Variables are unique to each test; the process environment is shared.
    #[test]
    fn test_parse_or_uses_default_when_unset() {
        let value: u32 = parse_or("GAME_STORE_TEST_UNSET_VALUE", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_parse_or_rejects_garbage() {
        env::set_var("GAME_STORE_TEST_GARBAGE_VALUE", "many");
        let err = parse_or::<u32>("GAME_STORE_TEST_GARBAGE_VALUE", 7).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("GAME_STORE_TEST_GARBAGE_VALUE")));
    }

    #[test]
    fn test_parse_or_reads_value() {
        env::set_var("GAME_STORE_TEST_PORT_VALUE", " 8081 ");
        let port: u16 = parse_or("GAME_STORE_TEST_PORT_VALUE", 3000).unwrap();
        assert_eq!(port, 8081);
    }
}
