//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the balancer.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::load_balancer::StrategyKind;
use crate::resilience::BreakerConfig;

/// Root configuration for the load balancer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (host, port).
    pub listener: ListenerConfig,

    /// Backend list and selection strategy.
    pub balancer: BalancerConfig,

    /// Per-backend circuit breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// TCP port to accept client connections on.
    pub port: u16,
}

impl ListenerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Backend list and selection strategy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BalancerConfig {
    /// Selection strategy. Unknown names fall back to random.
    pub strategy: StrategyKind,

    /// Backend base URLs (e.g., "http://10.0.0.1:8081").
    pub backends: Vec<String>,
}

/// Circuit breaker configuration, shared by every backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Failures before a backend's breaker opens.
    pub failure_threshold: u32,

    /// How long an open breaker waits before admitting a trial request
    /// (e.g., "30s", "1500ms").
    #[serde(with = "humantime_serde")]
    pub cooldown: Duration,
}

impl CircuitBreakerConfig {
    pub fn breaker_config(&self) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: self.failure_threshold,
            cooldown: self.cooldown,
        }
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(30),
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable the background prober.
    pub enabled: bool,

    /// Probe interval in seconds.
    pub interval_secs: u64,

    /// Per-probe timeout in seconds.
    pub timeout_secs: u64,

    /// Path to probe, joined onto each backend's base path.
    pub path: String,
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 2,
            timeout_secs: 5,
            path: "/health".to_string(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts per request, first try included.
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// Timeout configuration for outbound calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Deadline of a single attempt in seconds.
    pub request_secs: u64,
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest inbound body buffered for replay across attempts.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: ProxyConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.balancer.strategy, StrategyKind::Random);
        assert!(config.balancer.backends.is_empty());
        assert_eq!(config.circuit_breaker.failure_threshold, 3);
        assert_eq!(config.circuit_breaker.cooldown, Duration::from_secs(30));
        assert_eq!(config.health_check.path, "/health");
        assert_eq!(config.health_check.interval(), Duration::from_secs(2));
        assert_eq!(config.retries.max_attempts, 3);
        assert_eq!(config.limits.max_body_bytes, 2 * 1024 * 1024);
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn partial_document_keeps_remaining_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [listener]
            port = 9000

            [balancer]
            strategy = "Round-Robin"
            backends = ["http://localhost:8081", "http://localhost:8082"]

            [circuit_breaker]
            failure_threshold = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.host, "0.0.0.0");
        assert_eq!(config.listener.port, 9000);
        assert_eq!(config.balancer.strategy, StrategyKind::RoundRobin);
        assert_eq!(config.balancer.backends.len(), 2);

        let breaker = config.circuit_breaker.breaker_config();
        assert_eq!(breaker.failure_threshold, 5);
        assert_eq!(breaker.cooldown, Duration::from_secs(30));
    }

    #[test]
    fn cooldown_keeps_sub_second_precision() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [circuit_breaker]
            cooldown = "1s 500ms"
            "#,
        )
        .unwrap();
        assert_eq!(config.circuit_breaker.cooldown, Duration::from_millis(1500));
    }

    #[test]
    fn unknown_strategy_is_not_a_parse_error() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [balancer]
            strategy = "least-connections"
            "#,
        )
        .unwrap();
        assert_eq!(config.balancer.strategy, StrategyKind::Random);
    }
}
