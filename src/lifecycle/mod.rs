//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Metrics → Backend pool → Health prober → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Server stopped → Broadcast → Drain background tasks → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Stop accepting, finish in-flight requests
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has timeout: background tasks are aborted after the deadline

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
