//! Relay configuration.
//!
//! Loaded from environment variables with defaults matching the reference
//! deployment (plain listener on port 8080).

use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Default listener address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Default idle period after which a silent connection counts as disconnected.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

pub const ENV_BIND_ADDR: &str = "PARLEY_BIND_ADDR";
pub const ENV_IDLE_TIMEOUT_SECS: &str = "PARLEY_IDLE_TIMEOUT_SECS";
pub const ENV_NOTIFY_UNREACHABLE: &str = "PARLEY_NOTIFY_UNREACHABLE";

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the HTTP/WebSocket listener binds to.
    pub bind_addr: SocketAddr,

    /// A connection that sends nothing for this long is dropped like a closed socket.
    pub idle_timeout: Duration,

    /// Answer a directed message to an absent user with a `leave` notice for that user
    /// instead of dropping it silently.
    pub notify_unreachable: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            notify_unreachable: false,
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_addr = vars
            .get(ENV_BIND_ADDR)
            .map(String::as_str)
            .unwrap_or(DEFAULT_BIND_ADDR);
        let bind_addr = bind_addr
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidValue {
                name: ENV_BIND_ADDR,
                value: bind_addr.to_string(),
            })?;

        let idle_timeout = match vars.get(ENV_IDLE_TIMEOUT_SECS) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: ENV_IDLE_TIMEOUT_SECS,
                        value: raw.clone(),
                    });
                }
            },
            None => Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        };

        let notify_unreachable = match vars.get(ENV_NOTIFY_UNREACHABLE) {
            Some(raw) => parse_bool(raw).ok_or_else(|| ConfigError::InvalidValue {
                name: ENV_NOTIFY_UNREACHABLE,
                value: raw.clone(),
            })?,
            None => false,
        };

        Ok(Self {
            bind_addr,
            idle_timeout,
            notify_unreachable,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
