//! Gate and server configuration.
//!
//! # Gate Configuration
//!
//! [`GateConfig`] mirrors the JSON document accepted via `GATE_CONFIG_FILE`:
//!
//! ```json
//! {
//!   "basicAuth": { "users": ["alice:$apr1$..."], "usersFile": "/etc/gate/users", "realm": "internal" },
//!   "exceptions": { "ipList": ["10.0.0.1", "192.168.1.0/24"], "hostList": ["office.example.com"], "hostUpdateInterval": "5m" },
//!   "authExtraTime": "200ms"
//! }
//! ```
//!
//! When no file is given, the same settings come from environment variables:
//!
//! - `BASIC_AUTH_USERS`: Comma-separated `name:secret` list
//! - `BASIC_AUTH_USERS_FILE`: Path to a newline-delimited users file
//! - `BASIC_AUTH_REALM`: Challenge realm (default: `restricted`)
//! - `EXCEPTIONS_IP_LIST`: Comma-separated addresses and CIDR blocks
//! - `EXCEPTIONS_HOST_LIST`: Comma-separated hostnames
//! - `EXCEPTIONS_HOST_UPDATE_INTERVAL`: Host re-resolution interval (e.g. `5m`)
//! - `AUTH_EXTRA_TIME`: Delay added to every credential check (e.g. `200ms`)
//!
//! # Server Configuration
//!
//! - `HOST` / `PORT`: Bind address (default: `0.0.0.0:3000`)
//! - `METRICS_PORT`: Prometheus listener port (default: 0 = disabled)
//! - `RUST_LOG`: Log filter (default: `info`)

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GateError, GateResult};

/// Realm used when none is configured.
pub const DEFAULT_REALM: &str = "restricted";

/// Basic authentication settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BasicAuthConfig {
    /// Inline `name:secret` lines
    pub users: Vec<String>,
    /// Newline-delimited file of `name:secret` lines
    pub users_file: Option<PathBuf>,
    /// Realm presented in the challenge (empty = [`DEFAULT_REALM`])
    pub realm: String,
}

impl BasicAuthConfig {
    /// Configured realm, or [`DEFAULT_REALM`] when empty.
    pub fn realm_or_default(&self) -> &str {
        if self.realm.is_empty() {
            DEFAULT_REALM
        } else {
            &self.realm
        }
    }
}

/// Addresses and hostnames that bypass basic authentication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExceptionsConfig {
    /// Literal IPv4 addresses and CIDR blocks
    pub ip_list: Vec<String>,
    /// Hostnames resolved to addresses on a schedule
    pub host_list: Vec<String>,
    /// Duration string; empty or invalid disables host resolution
    pub host_update_interval: String,
}

/// Complete gate configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GateConfig {
    pub basic_auth: BasicAuthConfig,
    pub exceptions: ExceptionsConfig,
    /// Duration string; empty or invalid means no extra delay
    pub auth_extra_time: String,
}

impl GateConfig {
    /// Load a gate configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `GateError::Config` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> GateResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GateError::Config(format!("Cannot read gate config {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
            .map_err(|e| GateError::Config(format!("Invalid gate config {}: {e}", path.display())))
    }

    /// Parse a gate configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Build a gate configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            basic_auth: BasicAuthConfig {
                users: parse_list("BASIC_AUTH_USERS"),
                users_file: env::var("BASIC_AUTH_USERS_FILE")
                    .ok()
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from),
                realm: env::var("BASIC_AUTH_REALM").unwrap_or_default(),
            },
            exceptions: ExceptionsConfig {
                ip_list: parse_list("EXCEPTIONS_IP_LIST"),
                host_list: parse_list("EXCEPTIONS_HOST_LIST"),
                host_update_interval: env::var("EXCEPTIONS_HOST_UPDATE_INTERVAL")
                    .unwrap_or_default(),
            },
            auth_extra_time: env::var("AUTH_EXTRA_TIME").unwrap_or_default(),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Gate will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    /// Port for Prometheus metrics endpoint (default: 0 = disabled)
    pub metrics_port: u16,

    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,

    /// Gate settings (from `GATE_CONFIG_FILE` or the environment)
    pub gate: GateConfig,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `GateError::Config` for a non-numeric port or an unreadable
    /// `GATE_CONFIG_FILE`.
    pub fn from_env() -> GateResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let gate = match env::var("GATE_CONFIG_FILE").ok().filter(|p| !p.is_empty()) {
            Some(path) => GateConfig::from_file(Path::new(&path))?,
            None => GateConfig::from_env(),
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 3000)?,
            metrics_port: Self::parse_env("METRICS_PORT", 0)?,
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            gate,
        })
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        if self.metrics_enabled() {
            Some(std::net::SocketAddr::from((
                [0, 0, 0, 0],
                self.metrics_port,
            )))
        } else {
            None
        }
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> GateResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .parse()
                .map_err(|e| GateError::Config(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }
}

/// Default configuration for testing and development.
impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            metrics_port: 0,
            log_level: "info".to_string(),
            gate: GateConfig::default(),
        }
    }
}

/// Split a comma-separated environment variable into trimmed, non-empty items.
fn parse_list(name: &str) -> Vec<String> {
    env::var(name)
        .map(|s| split_list(&s))
        .unwrap_or_default()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert!(!config.metrics_enabled());
        assert!(config.metrics_addr().is_none());
        assert_eq!(config.gate, GateConfig::default());
    }

    #[test]
    fn test_server_addr_format() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };

        assert_eq!(config.server_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_metrics_addr_when_enabled() {
        let config = Config {
            metrics_port: 9090,
            ..Config::default()
        };
        assert_eq!(config.metrics_addr().unwrap().port(), 9090);
    }

    #[test]
    fn test_gate_config_from_json() {
        let config = GateConfig::from_json(
            r#"{
                "basicAuth": {
                    "users": ["alice:{SHA}abc="],
                    "usersFile": "/etc/gate/users",
                    "realm": "internal"
                },
                "exceptions": {
                    "ipList": ["10.0.0.1", "192.168.1.0/24"],
                    "hostList": ["office.example.com"],
                    "hostUpdateInterval": "5m"
                },
                "authExtraTime": "200ms"
            }"#,
        )
        .unwrap();

        assert_eq!(config.basic_auth.users, vec!["alice:{SHA}abc="]);
        assert_eq!(
            config.basic_auth.users_file,
            Some(PathBuf::from("/etc/gate/users"))
        );
        assert_eq!(config.basic_auth.realm_or_default(), "internal");
        assert_eq!(config.exceptions.ip_list.len(), 2);
        assert_eq!(config.exceptions.host_list, vec!["office.example.com"]);
        assert_eq!(config.exceptions.host_update_interval, "5m");
        assert_eq!(config.auth_extra_time, "200ms");
    }

    #[test]
    fn test_gate_config_all_fields_optional() {
        let config = GateConfig::from_json("{}").unwrap();
        assert_eq!(config, GateConfig::default());
        assert_eq!(config.basic_auth.realm_or_default(), DEFAULT_REALM);

        let partial = GateConfig::from_json(r#"{"exceptions": {"ipList": ["10.0.0.1"]}}"#).unwrap();
        assert_eq!(partial.exceptions.ip_list, vec!["10.0.0.1"]);
        assert!(partial.exceptions.host_update_interval.is_empty());
    }

    #[test]
    fn test_gate_config_rejects_malformed_json() {
        assert!(GateConfig::from_json(r#"{"basicAuth": {"users": "alice"}}"#).is_err());
    }

    #[test]
    fn test_gate_config_from_missing_file() {
        let err = GateConfig::from_file(Path::new("/nonexistent/gate.json")).unwrap_err();
        assert!(matches!(err, GateError::Config(_)));
    }

    #[test]
    fn test_split_list_trims_and_drops_empty() {
        assert_eq!(
            split_list(" 10.0.0.1 , ,192.168.1.0/24,"),
            vec!["10.0.0.1", "192.168.1.0/24"]
        );
        assert!(split_list("").is_empty());
    }
}
