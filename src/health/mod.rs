//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (active.rs)
//!     → select backends whose breaker reports unavailable
//!     → GET <backend base><health path>, concurrently
//!     → 2xx → backend.record_success()
//! ```
//!
//! # Design Decisions
//! - Probes never touch the request path; they only write into breakers
//! - Backends that never recover are probed forever
//! - Probe failures are not recorded as breaker failures

pub mod active;

pub use active::{HealthProber, ProbeReport};
