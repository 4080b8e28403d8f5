//! Backend pool management.
//!
//! # Responsibilities
//! - Build the fixed backend list from configured addresses
//! - Apply the configured load balancing algorithm to select backends
//! - Expose the backend list to the health prober

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::load_balancer::{backend::Backend, BalancerError, LoadBalancer, StrategyKind};
use crate::resilience::BreakerConfig;

/// A fixed set of backends plus the strategy that picks among them.
#[derive(Debug)]
pub struct BackendPool {
    backends: Vec<Arc<Backend>>,
    strategy: Box<dyn LoadBalancer>,
    kind: StrategyKind,
}

impl BackendPool {
    /// Build a pool from raw addresses.
    ///
    /// Addresses are parsed concurrently. Every parse is awaited and the first
    /// error observed fails the whole construction; no partial pool is kept.
    pub async fn build(
        kind: StrategyKind,
        addresses: &[String],
        breaker: BreakerConfig,
    ) -> Result<Self, BalancerError> {
        if addresses.is_empty() {
            return Err(BalancerError::EmptyPool);
        }

        let mut parses = JoinSet::new();
        for (index, address) in addresses.iter().cloned().enumerate() {
            parses.spawn(async move { (index, Backend::parse(&address, breaker)) });
        }

        let mut slots: Vec<Option<Arc<Backend>>> = vec![None; addresses.len()];
        let mut first_error = None;
        while let Some(joined) = parses.join_next().await {
            match joined {
                Ok((index, Ok(backend))) => slots[index] = Some(Arc::new(backend)),
                Ok((_, Err(e))) => {
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    first_error.get_or_insert(BalancerError::ParseTask(e));
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        // Every slot is filled when no error was recorded.
        let backends = slots.into_iter().flatten().collect();
        Self::from_backends(kind, backends)
    }

    /// Build a pool from already constructed backends, keeping their order.
    pub fn from_backends(
        kind: StrategyKind,
        backends: Vec<Arc<Backend>>,
    ) -> Result<Self, BalancerError> {
        if backends.is_empty() {
            return Err(BalancerError::EmptyPool);
        }

        tracing::debug!(
            strategy = %kind,
            backend_count = backends.len(),
            "Backend pool built"
        );

        Ok(Self {
            backends,
            strategy: kind.build(),
            kind,
        })
    }

    /// Select an available backend.
    pub fn next_backend(&self) -> Result<Arc<Backend>, BalancerError> {
        if let Some(backend) = self.strategy.next_server(&self.backends) {
            return Ok(backend);
        }

        tracing::debug!(
            strategy = %self.kind,
            backend_count = self.backends.len(),
            "No available backends found in pool"
        );
        for b in &self.backends {
            tracing::debug!(
                backend = %b.address(),
                state = %b.breaker().state(),
                failures = b.breaker().failure_count(),
                "Backend status"
            );
        }
        Err(BalancerError::NoAvailableBackends)
    }

    /// All backends in configured order (for health checking).
    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn kind(&self) -> StrategyKind {
        self.kind
    }
}
