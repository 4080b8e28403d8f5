//! Configuration loading.
//!
//! Layers, later wins:
//! ```text
//! ProxyConfig::default()
//!     → TOML file (optional)
//!     → .env file (optional, never overrides variables already set)
//!     → environment overrides
//!     → validation
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

pub const ENV_PORT: &str = "LOAD_PORT";
pub const ENV_BACKENDS: &str = "LOAD_BACKENDS";
pub const ENV_BALANCER_TYPE: &str = "LOAD_BALANCER_TYPE";
pub const ENV_BREAKER_FAILURES: &str = "CIRCUIT_BREAKER_FAILURES";
pub const ENV_BREAKER_COOLDOWN: &str = "CIRCUIT_BREAKER_COOLDOWN";
pub const ENV_HEALTH_CHECK_PATH: &str = "HEALTH_CHECK_PATH";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to load .env file: {0}")]
    Dotenv(dotenvy::Error),

    #[error("invalid value for {var}: {reason}")]
    Env { var: &'static str, reason: String },

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Full startup load: optional file, then process environment, then validation.
pub fn load(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    dotenv_loaded(dotenvy::dotenv())?;
    load_with_env(path, |key| std::env::var(key).ok())
}

/// A missing `.env` file is fine; an unreadable or malformed one is not.
fn dotenv_loaded<T>(result: Result<T, dotenvy::Error>) -> Result<(), ConfigError> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(ConfigError::Dotenv(e)),
    }
}

/// [`load`] with an injectable environment lookup.
pub fn load_with_env<F>(path: Option<&Path>, env: F) -> Result<ProxyConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => read_file(path)?,
        None => ProxyConfig::default(),
    };
    apply_env_overrides(&mut config, env)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn read_file(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Overlay the recognized environment variables onto `config`.
///
/// Unset or empty variables leave the current value alone.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    if let Some(port) = lookup(ENV_PORT) {
        config.listener.port = port.trim().parse().map_err(|_| ConfigError::Env {
            var: ENV_PORT,
            reason: format!("'{}' is not a valid port", port),
        })?;
    }

    if let Some(list) = lookup(ENV_BACKENDS) {
        config.balancer.backends = parse_backend_list(&list)?;
    }

    if let Some(kind) = lookup(ENV_BALANCER_TYPE) {
        config.balancer.strategy = kind.into();
    }

    if let Some(failures) = lookup(ENV_BREAKER_FAILURES) {
        config.circuit_breaker.failure_threshold = match failures.trim().parse::<u32>() {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(ConfigError::Env {
                    var: ENV_BREAKER_FAILURES,
                    reason: format!("'{}' is not a positive integer", failures),
                })
            }
        };
    }

    if let Some(cooldown) = lookup(ENV_BREAKER_COOLDOWN) {
        let parsed = humantime::parse_duration(cooldown.trim()).map_err(|e| ConfigError::Env {
            var: ENV_BREAKER_COOLDOWN,
            reason: e.to_string(),
        })?;
        if parsed < Duration::from_secs(1) {
            return Err(ConfigError::Env {
                var: ENV_BREAKER_COOLDOWN,
                reason: format!("'{}' is shorter than 1s", cooldown),
            });
        }
        config.circuit_breaker.cooldown = parsed;
    }

    if let Some(path) = lookup(ENV_HEALTH_CHECK_PATH) {
        config.health_check.path = path.trim().to_string();
    }

    Ok(())
}

fn parse_backend_list(list: &str) -> Result<Vec<String>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .enumerate()
        .map(|(index, entry)| {
            if entry.is_empty() {
                Err(ConfigError::Env {
                    var: ENV_BACKENDS,
                    reason: format!("entry {} is empty", index),
                })
            } else {
                Ok(entry.to_string())
            }
        })
        .collect()
}
