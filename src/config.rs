// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, their defaults, and the [`RouterConfig`] read
//! from them at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `CONFIG_ROOT` | Directory backing the resource store | `./config` |
//! | `PROVIDER_ID` | Absolute identifier of the provider to serve | `/providers/default.yaml` |
//! | `CLIENT_VERSION` | Value reported by `web3_clientVersion` | `wallet-router/v<version>` |
//! | `FORWARD_TIMEOUT_MS` | Bound on handing a request to the backend | `5000` |
//! | `RESPONSE_TIMEOUT_MS` | Bound on waiting for a backend response | `30000` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::provider::settings::{
    default_client_version, DEFAULT_FORWARD_TIMEOUT, DEFAULT_RESPONSE_TIMEOUT,
};

/// Environment variable name for the resource store root directory.
pub const CONFIG_ROOT_ENV: &str = "CONFIG_ROOT";

/// Default resource store root, relative to the working directory.
pub const DEFAULT_CONFIG_ROOT: &str = "./config";

/// Environment variable name for the provider identifier to serve.
///
/// Must be absolute within the store (leading `/`).
pub const PROVIDER_ID_ENV: &str = "PROVIDER_ID";

pub const DEFAULT_PROVIDER_ID: &str = "/providers/default.yaml";

/// Environment variable name overriding the `web3_clientVersion` answer.
pub const CLIENT_VERSION_ENV: &str = "CLIENT_VERSION";

/// Environment variable name for the backend handoff timeout, in milliseconds.
pub const FORWARD_TIMEOUT_MS_ENV: &str = "FORWARD_TIMEOUT_MS";

/// Environment variable name for the backend response timeout, in milliseconds.
pub const RESPONSE_TIMEOUT_MS_ENV: &str = "RESPONSE_TIMEOUT_MS";

/// Environment variable name for the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default `RUST_LOG` filter when the variable is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a whole number of milliseconds, got {value:?}")]
    InvalidDuration { var: &'static str, value: String },

    #[error("{var} must not be zero")]
    ZeroDuration { var: &'static str },

    #[error("LOG_FORMAT must be `json` or `pretty`, got {0:?}")]
    InvalidLogFormat(String),

    #[error("PROVIDER_ID must be an absolute identifier, got {0:?}")]
    RelativeProviderId(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(ConfigError::InvalidLogFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    pub config_root: PathBuf,
    pub provider_id: String,
    pub client_version: String,
    pub forward_timeout: Duration,
    pub response_timeout: Duration,
    pub log_format: LogFormat,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            config_root: PathBuf::from(DEFAULT_CONFIG_ROOT),
            provider_id: DEFAULT_PROVIDER_ID.to_string(),
            client_version: default_client_version(),
            forward_timeout: DEFAULT_FORWARD_TIMEOUT,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            log_format: LogFormat::default(),
        }
    }
}

impl RouterConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read the configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(root) = get(CONFIG_ROOT_ENV) {
            config.config_root = PathBuf::from(root);
        }
        if let Some(id) = get(PROVIDER_ID_ENV) {
            if !id.starts_with('/') {
                return Err(ConfigError::RelativeProviderId(id));
            }
            config.provider_id = id;
        }
        if let Some(version) = get(CLIENT_VERSION_ENV) {
            config.client_version = version;
        }
        if let Some(ms) = get(FORWARD_TIMEOUT_MS_ENV) {
            config.forward_timeout = parse_millis(FORWARD_TIMEOUT_MS_ENV, &ms)?;
        }
        if let Some(ms) = get(RESPONSE_TIMEOUT_MS_ENV) {
            config.response_timeout = parse_millis(RESPONSE_TIMEOUT_MS_ENV, &ms)?;
        }
        if let Some(format) = get(LOG_FORMAT_ENV) {
            config.log_format = format.parse()?;
        }
        Ok(config)
    }
}

fn parse_millis(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let ms: u64 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidDuration {
            var,
            value: value.to_string(),
        })?;
    if ms == 0 {
        return Err(ConfigError::ZeroDuration { var });
    }
    Ok(Duration::from_millis(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = RouterConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, RouterConfig::default());
        assert_eq!(config.provider_id, "/providers/default.yaml");
        assert_eq!(config.forward_timeout, Duration::from_secs(5));
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn reads_overrides() {
        let config = RouterConfig::from_lookup(lookup(&[
            ("CONFIG_ROOT", "/etc/router"),
            ("PROVIDER_ID", "/providers/op.yaml"),
            ("CLIENT_VERSION", "custom/1.0"),
            ("FORWARD_TIMEOUT_MS", "250"),
            ("RESPONSE_TIMEOUT_MS", " 1000 "),
            ("LOG_FORMAT", "JSON"),
        ]))
        .unwrap();
        assert_eq!(config.config_root, PathBuf::from("/etc/router"));
        assert_eq!(config.provider_id, "/providers/op.yaml");
        assert_eq!(config.client_version, "custom/1.0");
        assert_eq!(config.forward_timeout, Duration::from_millis(250));
        assert_eq!(config.response_timeout, Duration::from_secs(1));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn empty_values_fall_back_to_defaults() {
        let config = RouterConfig::from_lookup(lookup(&[("LOG_FORMAT", ""), ("CONFIG_ROOT", " ")]))
            .unwrap();
        assert_eq!(config.config_root, PathBuf::from(DEFAULT_CONFIG_ROOT));
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn rejects_invalid_values() {
        assert_eq!(
            RouterConfig::from_lookup(lookup(&[("FORWARD_TIMEOUT_MS", "5s")])),
            Err(ConfigError::InvalidDuration {
                var: FORWARD_TIMEOUT_MS_ENV,
                value: "5s".to_string(),
            })
        );
        assert_eq!(
            RouterConfig::from_lookup(lookup(&[("RESPONSE_TIMEOUT_MS", "0")])),
            Err(ConfigError::ZeroDuration {
                var: RESPONSE_TIMEOUT_MS_ENV
            })
        );
        assert!(matches!(
            RouterConfig::from_lookup(lookup(&[("LOG_FORMAT", "xml")])),
            Err(ConfigError::InvalidLogFormat(_))
        ));
        assert!(matches!(
            RouterConfig::from_lookup(lookup(&[("PROVIDER_ID", "providers/x.yaml")])),
            Err(ConfigError::RelativeProviderId(_))
        ));
    }
}
