//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: backend assumed down, requests fail fast
//! - Half-Open: testing if backend recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= threshold
//! Open → Half-Open: cooldown elapsed since last failure (observed by is_available)
//! Half-Open → Closed: record_success, failure_count reset to 0
//! Half-Open → Open: record_failure, last failure re-stamped
//! ```
//!
//! # Design Decisions
//! - Per-backend circuit breaker (not global)
//! - Fail fast in Open state (no waiting for timeout)
//! - Closed and Half-Open reads never take the lock
//! - Half-Open admits every caller; trial traffic is not serialized
//! - Transitions are serialized by a short critical section with no I/O inside

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Circuit state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl CircuitState {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl From<u8> for CircuitState {
    fn from(val: u8) -> Self {
        match val {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state change performed by one breaker call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CircuitState,
    pub to: CircuitState,
}

/// Breaker tuning shared by every backend in a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Failures needed to open the circuit. Always at least 1.
    pub failure_threshold: u32,
    /// Minimum time an open circuit waits before admitting trial traffic.
    pub cooldown: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(30),
        }
    }
}

/// Per-backend health state machine.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: AtomicU8,
    failure_count: AtomicU64,
    failure_threshold: u64,
    cooldown: Duration,
    /// Time of the failure that last opened the circuit.
    /// The mutex doubles as the transition lock.
    last_failure: Mutex<Option<Instant>>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            state: AtomicU8::new(CircuitState::Closed as u8),
            failure_count: AtomicU64::new(0),
            failure_threshold: u64::from(config.failure_threshold.max(1)),
            cooldown: config.cooldown,
            last_failure: Mutex::new(None),
        }
    }

    /// Current state.
    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    /// Failures recorded since the last transition to Closed.
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Acquire)
    }

    pub fn failure_threshold(&self) -> u64 {
        self.failure_threshold
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Time of the most recent failure that (re)opened the circuit.
    pub fn last_failure(&self) -> Option<Instant> {
        *self.lock()
    }

    /// Return true if traffic may be sent through this breaker.
    ///
    /// An open breaker whose cooldown has elapsed moves to Half-Open as a
    /// side effect of this call.
    pub fn is_available(&self) -> bool {
        self.poll().0
    }

    /// Like [`is_available`](Self::is_available), also reporting the
    /// Open → Half-Open transition when this call performed it.
    pub fn poll(&self) -> (bool, Option<Transition>) {
        match self.state() {
            CircuitState::Closed | CircuitState::HalfOpen => (true, None),
            CircuitState::Open => {
                let last_failure = self.lock();
                // Another caller may have moved us on while we waited.
                if self.state() != CircuitState::Open {
                    return (true, None);
                }
                let cooled = last_failure.map_or(true, |at| at.elapsed() > self.cooldown);
                if !cooled {
                    return (false, None);
                }
                self.state
                    .store(CircuitState::HalfOpen as u8, Ordering::Release);
                (
                    true,
                    Some(Transition {
                        from: CircuitState::Open,
                        to: CircuitState::HalfOpen,
                    }),
                )
            }
        }
    }

    /// Record a successful request. Only closes a half-open circuit.
    pub fn record_success(&self) -> Option<Transition> {
        if self.state() != CircuitState::HalfOpen {
            return None;
        }

        let _guard = self.lock();
        if self.state() != CircuitState::HalfOpen {
            return None;
        }
        self.failure_count.store(0, Ordering::Release);
        self.state.store(CircuitState::Closed as u8, Ordering::Release);
        Some(Transition {
            from: CircuitState::HalfOpen,
            to: CircuitState::Closed,
        })
    }

    /// Record a failed request.
    ///
    /// Opens the circuit (or keeps it open with a fresh timestamp) once the
    /// failure count reaches the threshold, whatever the prior state.
    pub fn record_failure(&self) -> Option<Transition> {
        let failures = self.failure_count.fetch_add(1, Ordering::AcqRel) + 1;
        if failures < self.failure_threshold {
            return None;
        }

        let mut last_failure = self.lock();
        let from = self.state();
        *last_failure = Some(Instant::now());
        self.state.store(CircuitState::Open as u8, Ordering::Release);

        (from != CircuitState::Open).then_some(Transition {
            from,
            to: CircuitState::Open,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<Instant>> {
        self.last_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
