//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt against a backend:
//!     → timeouts.rs (deadline around the forward call)
//!     → retries.rs (classify the attempt, decide whether another attempt is allowed)
//!     → circuit_breaker.rs (record success/failure, open circuit if threshold reached)
//! ```
//!
//! # Design Decisions
//! - Every outbound attempt has a deadline; a timeout is an ordinary failure
//! - Retries are bounded per request and never follow a committed response
//! - Client cancellation is never charged to the backend
//! - Circuit breaker prevents cascading failures

pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{BreakerConfig, CircuitBreaker, CircuitState, Transition};
pub use retries::{AttemptOutcome, RetryPolicy};
