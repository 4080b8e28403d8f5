//! Per-attempt response sink.
//!
//! The transport hands the backend's response to an [`AttemptSink`] instead
//! of returning it. The first write is the attempt's terminal decision:
//! a 2xx response is committed for the client, anything else is rejected
//! and its body dropped. Later writes are refused, so a client can never
//! see a partial response followed by a retried one.

use axum::body::Body;
use axum::http::{Response, StatusCode};
use thiserror::Error;

/// Returned when a write arrives after the attempt was decided.
#[derive(Debug, Error)]
#[error("response already decided for this attempt (status {decided})")]
pub struct LateWrite {
    pub decided: StatusCode,
}

#[derive(Debug, Default)]
enum SinkState {
    #[default]
    Empty,
    Committed(Response<Body>),
    Rejected(StatusCode),
}

/// Write-intercepting decorator around one attempt's response.
#[derive(Debug, Default)]
pub struct AttemptSink {
    state: SinkState,
}

impl AttemptSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand over the backend response. Only the first call has any effect.
    pub fn write(&mut self, response: Response<Body>) -> Result<(), LateWrite> {
        if let Some(decided) = self.status() {
            tracing::debug!(
                decided = %decided,
                ignored = %response.status(),
                "Ignoring late write to decided attempt"
            );
            return Err(LateWrite { decided });
        }

        let status = response.status();
        self.state = if status.is_success() {
            SinkState::Committed(response)
        } else {
            SinkState::Rejected(status)
        };
        Ok(())
    }

    /// Status of the first write, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match &self.state {
            SinkState::Empty => None,
            SinkState::Committed(response) => Some(response.status()),
            SinkState::Rejected(status) => Some(*status),
        }
    }

    /// The committed response, if the attempt succeeded.
    pub fn into_committed(self) -> Option<Response<Body>> {
        match self.state {
            SinkState::Committed(response) => Some(response),
            _ => None,
        }
    }
}
