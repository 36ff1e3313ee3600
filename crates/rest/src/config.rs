//! Server configuration.
//!
//! Configuration comes from command line flags with environment variable
//! fallbacks, or is built programmatically.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `STRATUM_SERVER_PORT` | 8080 | Server port |
//! | `STRATUM_SERVER_HOST` | 127.0.0.1 | Host to bind |
//! | `STRATUM_LOG_LEVEL` | info | Log level |
//! | `STRATUM_REQUEST_TIMEOUT` | 30s | Per-call deadline |
//! | `STRATUM_DATA_DIR` | (in-memory) | Directory for the SQLite stores |
//! | `STRATUM_MAX_CONNECTIONS` | 10 | Pool size of each store |
//! | `STRATUM_CONNECTION_TIMEOUT` | 30s | Wait for a pooled connection |
//! | `STRATUM_SIGNUP_TOKEN_TTL` | 72h | Lifetime of signup invite tokens |
//! | `STRATUM_RESET_TOKEN_TTL` | 1h | Lifetime of password reset tokens |
//! | `STRATUM_DEFAULT_PAGE_SIZE` | 25 | Page size when a listing asks for 0 |
//! | `STRATUM_MAX_PAGE_SIZE` | 1000 | Largest page a listing may return |
//! | `STRATUM_ENABLE_CORS` | true | Enable CORS |
//! | `STRATUM_CORS_ORIGINS` | * | Allowed origins |
//!
//! Durations use humantime syntax (`30s`, `1h`, `3days`).
//!
//! # Example
//!
//! ```rust
//! use stratum_rest::ServerConfig;
//!
//! let config = ServerConfig {
//!     port: 3000,
//!     host: "0.0.0.0".to_string(),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::accounts::AccountSettings;

/// Server configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "stratum-server")]
#[command(about = "Multi-tenant account administration server")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(short, long, env = "STRATUM_SERVER_PORT", default_value = "8080")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "STRATUM_SERVER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "STRATUM_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Deadline applied to every call.
    #[arg(long, env = "STRATUM_REQUEST_TIMEOUT", default_value = "30s", value_parser = humantime::parse_duration)]
    pub request_timeout: Duration,

    /// Directory holding the control and tenant databases. In-memory when unset.
    #[arg(long, env = "STRATUM_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Maximum pooled connections per store.
    #[arg(long, env = "STRATUM_MAX_CONNECTIONS", default_value = "10")]
    pub max_connections: u32,

    /// How long a call waits for a pooled connection.
    #[arg(long, env = "STRATUM_CONNECTION_TIMEOUT", default_value = "30s", value_parser = humantime::parse_duration)]
    pub connection_timeout: Duration,

    /// Lifetime of signup invite tokens.
    #[arg(long, env = "STRATUM_SIGNUP_TOKEN_TTL", default_value = "72h", value_parser = humantime::parse_duration)]
    pub signup_token_ttl: Duration,

    /// Lifetime of password reset tokens.
    #[arg(long, env = "STRATUM_RESET_TOKEN_TTL", default_value = "1h", value_parser = humantime::parse_duration)]
    pub reset_token_ttl: Duration,

    /// Page size used when a listing asks for a limit of 0.
    #[arg(long, env = "STRATUM_DEFAULT_PAGE_SIZE", default_value = "25")]
    pub default_page_size: u32,

    /// Maximum page size for listings.
    #[arg(long, env = "STRATUM_MAX_PAGE_SIZE", default_value = "1000")]
    pub max_page_size: u32,

    /// Enable CORS.
    #[arg(long, env = "STRATUM_ENABLE_CORS", default_value = "true")]
    pub enable_cors: bool,

    /// Allowed CORS origins (comma-separated, or * for all).
    #[arg(long, env = "STRATUM_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            request_timeout: Duration::from_secs(30),
            data_dir: None,
            max_connections: 10,
            connection_timeout: Duration::from_secs(30),
            signup_token_ttl: Duration::from_secs(72 * 60 * 60),
            reset_token_ttl: Duration::from_secs(60 * 60),
            default_page_size: 25,
            max_page_size: 1000,
            enable_cors: true,
            cors_origins: "*".to_string(),
        }
    }
}

impl ServerConfig {
    /// Parses environment variables without requiring command line arguments.
    pub fn from_env() -> Self {
        Self::try_parse_from(["stratum-server"]).unwrap_or_default()
    }

    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the settings the account operations need.
    pub fn account_settings(&self) -> AccountSettings {
        AccountSettings {
            signup_token_ttl: self.signup_token_ttl,
            reset_token_ttl: self.reset_token_ttl,
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
        }
    }

    /// Validates the configuration, reporting every problem at once.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("Port cannot be 0".to_string());
        }

        if self.request_timeout.is_zero() {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if self.max_connections == 0 {
            errors.push("Max connections cannot be 0".to_string());
        }

        if self.connection_timeout.is_zero() {
            errors.push("Connection timeout cannot be 0".to_string());
        }

        if self.signup_token_ttl.is_zero() {
            errors.push("Signup token lifetime cannot be 0".to_string());
        }

        if self.reset_token_ttl.is_zero() {
            errors.push("Reset token lifetime cannot be 0".to_string());
        }

        if self.default_page_size == 0 {
            errors.push("Default page size cannot be 0".to_string());
        }

        if self.default_page_size > self.max_page_size {
            errors.push("Default page size cannot exceed max page size".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    ///
    /// Uses ephemeral port 0, in-memory stores and a short deadline.
    pub fn for_testing() -> Self {
        Self {
            port: 0,
            log_level: "debug".to_string(),
            request_timeout: Duration::from_secs(5),
            enable_cors: false,
            max_page_size: 100,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.default_page_size, 25);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            port: 3000,
            host: "0.0.0.0".to_string(),
            ..Default::default()
        };
        assert_eq!(config.socket_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_durations_parse_from_flags() {
        let config = ServerConfig::try_parse_from([
            "stratum-server",
            "--request-timeout",
            "250ms",
            "--signup-token-ttl",
            "2days",
        ])
        .unwrap();
        assert_eq!(config.request_timeout, Duration::from_millis(250));
        assert_eq!(config.signup_token_ttl, Duration::from_secs(2 * 24 * 60 * 60));
        assert_eq!(config.reset_token_ttl, Duration::from_secs(60 * 60));
    }

    #[test]
    fn test_pool_flags() {
        let config = ServerConfig::try_parse_from([
            "stratum-server",
            "--max-connections",
            "4",
            "--connection-timeout",
            "2s",
        ])
        .unwrap();
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.connection_timeout, Duration::from_secs(2));

        let config = ServerConfig {
            max_connections: 0,
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err(), vec!["Max connections cannot be 0".to_string()]);
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let config = ServerConfig {
            port: 0,
            request_timeout: Duration::ZERO,
            default_page_size: 100,
            max_page_size: 50,
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("Port")));
    }

    #[test]
    fn test_account_settings() {
        let settings = ServerConfig::default().account_settings();
        assert_eq!(settings.default_page_size, 25);
        assert_eq!(settings.reset_token_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn test_for_testing() {
        let config = ServerConfig::for_testing();
        assert_eq!(config.port, 0);
        assert!(!config.enable_cors);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }
}
