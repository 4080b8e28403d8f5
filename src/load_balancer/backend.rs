//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server
//! - Own the backend's circuit breaker (one per backend, never shared)
//! - Report breaker transitions with the backend's address attached

use url::Url;

use crate::load_balancer::BalancerError;
use crate::observability::metrics;
use crate::resilience::circuit_breaker::{BreakerConfig, CircuitBreaker, CircuitState, Transition};

/// A single backend server.
#[derive(Debug)]
pub struct Backend {
    /// Address as configured, used in logs and metric labels.
    address: String,
    /// Parsed target. Immutable after construction.
    url: Url,
    breaker: CircuitBreaker,
}

impl Backend {
    /// Parse a configured address such as `http://10.0.0.1:8080`.
    pub fn parse(address: &str, config: BreakerConfig) -> Result<Self, BalancerError> {
        let invalid = |reason: String| BalancerError::InvalidAddress {
            address: address.to_string(),
            reason,
        };

        let url = Url::parse(address).map_err(|e| invalid(e.to_string()))?;
        if url.scheme() != "http" {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }
        if url.cannot_be_a_base() {
            return Err(invalid("not a base URL".to_string()));
        }

        Ok(Self {
            address: address.to_string(),
            url,
            breaker: CircuitBreaker::new(config),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    // --- Breaker Logic ---

    /// Return true if the breaker admits traffic. May move Open → Half-Open.
    pub fn is_available(&self) -> bool {
        let (available, transition) = self.breaker.poll();
        if let Some(transition) = transition {
            self.report(transition);
        }
        available
    }

    /// Report a successful request/probe.
    pub fn record_success(&self) {
        if let Some(transition) = self.breaker.record_success() {
            self.report(transition);
        }
    }

    /// Report a failed request.
    pub fn record_failure(&self) {
        match self.breaker.record_failure() {
            Some(transition) => self.report(transition),
            None => tracing::debug!(
                backend = %self.address,
                failures = self.breaker.failure_count(),
                threshold = self.breaker.failure_threshold(),
                "Backend failure recorded"
            ),
        }
    }

    fn report(&self, transition: Transition) {
        match transition.to {
            CircuitState::Open => tracing::warn!(
                backend = %self.address,
                from = %transition.from,
                failures = self.breaker.failure_count(),
                cooldown = ?self.breaker.cooldown(),
                "Circuit opened"
            ),
            CircuitState::HalfOpen => tracing::info!(
                backend = %self.address,
                "Circuit half-open, admitting trial traffic"
            ),
            CircuitState::Closed => tracing::info!(
                backend = %self.address,
                "Circuit closed"
            ),
        }
        metrics::record_breaker_transition(&self.address, transition.to);
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.address)
    }
}
