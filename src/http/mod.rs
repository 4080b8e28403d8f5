//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, catch-all route)
//!     → proxy task
//!         → proxy orchestrator
//!             → request.rs (upstream request per attempt)
//!             → response.rs (hop-by-hop stripping)
//!         → access_log.rs (timing, outcome, metrics)
//!     → Send to client
//! ```

pub mod access_log;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_FORWARDED_FOR;
pub use server::HttpServer;
