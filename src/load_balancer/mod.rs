//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Configured address list + strategy kind
//!     → pool.rs (parse addresses concurrently, build the fixed backend list)
//!     → Apply load balancing algorithm:
//!         - round_robin.rs (rotate through backends)
//!         - random.rs (uniform sampling, bounded attempts)
//!     → backend.rs (consult the backend's circuit breaker)
//!     → Return an available backend or NoAvailableBackends
//! ```
//!
//! # Design Decisions
//! - Backend list is immutable after construction; only breakers and cursors mutate
//! - Strategies are stateless apart from their own cursor
//! - Unavailable backends (open circuit) are skipped, never returned

pub mod backend;
pub mod pool;
pub mod random;
pub mod round_robin;

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use backend::Backend;
pub use pool::BackendPool;
pub use random::Random;
pub use round_robin::RoundRobin;

/// A backend selection algorithm.
///
/// Implementations must only return a backend whose breaker currently
/// reports available, and `None` when no such backend was found.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>>;
}

/// Errors raised while building a pool or selecting from it.
#[derive(Debug, Error)]
pub enum BalancerError {
    #[error("no backends provided")]
    EmptyPool,

    #[error("invalid backend address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("no available backends")]
    NoAvailableBackends,

    #[error("backend address parsing task failed: {0}")]
    ParseTask(#[from] tokio::task::JoinError),
}

/// Which selection strategy a pool uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", from = "String")]
pub enum StrategyKind {
    #[default]
    Random,
    RoundRobin,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Random => "random",
            StrategyKind::RoundRobin => "round-robin",
        }
    }

    /// Build the selection algorithm for this kind.
    pub fn build(&self) -> Box<dyn LoadBalancer> {
        match self {
            StrategyKind::Random => Box::new(Random::new()),
            StrategyKind::RoundRobin => Box::new(RoundRobin::new()),
        }
    }
}

/// Unrecognized values fall back to random rather than failing.
impl FromStr for StrategyKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], "");
        Ok(match normalized.as_str() {
            "roundrobin" => StrategyKind::RoundRobin,
            _ => StrategyKind::Random,
        })
    }
}

impl From<String> for StrategyKind {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
