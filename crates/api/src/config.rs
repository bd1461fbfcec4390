//! Application configuration loaded from environment variables.

use std::time::Duration;

use thiserror::Error;

/// Secret used when `JWT_SECRET_KEY` is unset. Only suitable for local runs.
pub const DEFAULT_JWT_SECRET: &str = "secret_key";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default `0.0.0.0`)
/// - `PORT`: HTTP API port (default `8080`)
/// - `METRICS_PORT`: Prometheus listener port (default `9000`)
/// - `GRPC_PORT`: gRPC listener port (default `3000`)
/// - `DATABASE_URL` or `PG_CONN`: PostgreSQL connection string; when both are
///   absent the in-memory store is used
/// - `JWT_SECRET_KEY`: HMAC secret for access tokens (default `secret_key`)
/// - `SHUTDOWN_TIMEOUT_SECS`: drain timeout per listener (default `10`)
/// - `RUST_LOG`: tracing filter directive (default `info`)
/// - `LOG_FORMAT`: `json` switches to JSON log lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub metrics_port: u16,
    pub grpc_port: u16,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub shutdown_timeout: Duration,
    pub log_level: String,
    pub json_logs: bool,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = |name: &'static str, default: u16| -> Result<u16, ConfigError> {
            match var(name) {
                Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                    name,
                    expected: "port number",
                    value,
                }),
                None => Ok(default),
            }
        };

        let shutdown_timeout = match var("SHUTDOWN_TIMEOUT_SECS") {
            Some(value) => value
                .trim()
                .parse()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::Invalid {
                    name: "SHUTDOWN_TIMEOUT_SECS",
                    expected: "number of seconds",
                    value,
                })?,
            None => defaults.shutdown_timeout,
        };

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: port("PORT", defaults.port)?,
            metrics_port: port("METRICS_PORT", defaults.metrics_port)?,
            grpc_port: port("GRPC_PORT", defaults.grpc_port)?,
            database_url: var("DATABASE_URL").or_else(|| var("PG_CONN")),
            jwt_secret: var("JWT_SECRET_KEY").unwrap_or(defaults.jwt_secret),
            shutdown_timeout,
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            json_logs: var("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
        })
    }

    /// Returns the `"host:port"` bind address of the HTTP API.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn metrics_addr(&self) -> String {
        format!("{}:{}", self.host, self.metrics_port)
    }

    pub fn grpc_addr(&self) -> String {
        format!("{}:{}", self.host, self.grpc_port)
    }

    /// True when running with the built-in development secret.
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            metrics_port: 9000,
            grpc_port: 3000,
            database_url: None,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            shutdown_timeout: Duration::from_secs(10),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = load(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.addr(), "0.0.0.0:8080");
        assert_eq!(config.metrics_addr(), "0.0.0.0:9000");
        assert_eq!(config.grpc_addr(), "0.0.0.0:3000");
        assert!(config.database_url.is_none());
        assert!(config.uses_default_secret());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8081"),
            ("METRICS_PORT", "9100"),
            ("GRPC_PORT", "50051"),
            ("JWT_SECRET_KEY", "hunter2"),
            ("SHUTDOWN_TIMEOUT_SECS", "3"),
            ("LOG_FORMAT", "JSON"),
        ])
        .unwrap();
        assert_eq!(config.addr(), "127.0.0.1:8081");
        assert_eq!(config.metrics_port, 9100);
        assert_eq!(config.grpc_port, 50051);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(3));
        assert!(config.json_logs);
        assert!(!config.uses_default_secret());
    }

    #[test]
    fn test_database_url_falls_back_to_pg_conn() {
        let config = load(&[("PG_CONN", "postgres://pg/pvz")]).unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://pg/pvz"));

        let config = load(&[
            ("PG_CONN", "postgres://pg/pvz"),
            ("DATABASE_URL", "postgres://db/pvz"),
        ])
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://db/pvz"));
    }

    #[test]
    fn test_invalid_numbers_are_errors() {
        let err = load(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));

        let err = load(&[("GRPC_PORT", "70000")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "GRPC_PORT", .. }));

        let err = load(&[("SHUTDOWN_TIMEOUT_SECS", "-1")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "SHUTDOWN_TIMEOUT_SECS",
                ..
            }
        ));
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = load(&[("PORT", "  "), ("HOST", "")]).unwrap();
        assert_eq!(config.addr(), "0.0.0.0:8080");
    }
}
