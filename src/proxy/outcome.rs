//! Request-level outcome.
//!
//! Every proxied request ends in exactly one [`ProxyOutcome`]. The outcome is
//! attached to the response extensions so the access log and metrics can
//! tell apart failures that share a wire status.

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};

/// Nginx-style status for a client that closed the connection.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// How a proxied request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyOutcome {
    /// A backend answered 2xx and its response was passed through.
    Success { backend: String, attempts: u32 },
    /// Selection found no available backend.
    NoAvailableBackends { attempts: u32 },
    /// The client went away during an attempt.
    ClientClosed { backend: Option<String>, attempts: u32 },
    /// Every allowed attempt failed.
    Exhausted { attempts: u32 },
    /// The inbound body was too large or could not be read.
    BodyRejected,
}

impl ProxyOutcome {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyOutcome::Success { .. } => "success",
            ProxyOutcome::NoAvailableBackends { .. } => "no_available_backends",
            ProxyOutcome::ClientClosed { .. } => "client_closed",
            ProxyOutcome::Exhausted { .. } => "exhausted",
            ProxyOutcome::BodyRejected => "body_rejected",
        }
    }

    /// Backend that served (or was serving) the request, if any.
    pub fn backend(&self) -> Option<&str> {
        match self {
            ProxyOutcome::Success { backend, .. } => Some(backend),
            ProxyOutcome::ClientClosed { backend, .. } => backend.as_deref(),
            _ => None,
        }
    }

    /// Attempts that reached a backend.
    pub fn attempts(&self) -> u32 {
        match self {
            ProxyOutcome::Success { attempts, .. }
            | ProxyOutcome::NoAvailableBackends { attempts }
            | ProxyOutcome::ClientClosed { attempts, .. }
            | ProxyOutcome::Exhausted { attempts } => *attempts,
            ProxyOutcome::BodyRejected => 0,
        }
    }

    /// Wire status for failure outcomes. `None` for success, whose status
    /// comes from the backend.
    pub fn failure_status(&self) -> Option<StatusCode> {
        match self {
            ProxyOutcome::Success { .. } => None,
            ProxyOutcome::NoAvailableBackends { .. } | ProxyOutcome::Exhausted { .. } => {
                Some(StatusCode::SERVICE_UNAVAILABLE)
            }
            ProxyOutcome::ClientClosed { .. } => {
                Some(StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::BAD_REQUEST))
            }
            ProxyOutcome::BodyRejected => Some(StatusCode::PAYLOAD_TOO_LARGE),
        }
    }

    fn message(&self) -> &'static str {
        match self {
            ProxyOutcome::Success { .. } => "",
            ProxyOutcome::NoAvailableBackends { .. } => "No available backends",
            ProxyOutcome::ClientClosed { .. } => "Client closed request",
            ProxyOutcome::Exhausted { .. } => "All backends unavailable",
            ProxyOutcome::BodyRejected => "Request body too large or unreadable",
        }
    }

    /// Attach this outcome to `response`.
    pub fn attach(self, mut response: Response<Body>) -> Response<Body> {
        response.extensions_mut().insert(self);
        response
    }

    /// Build the uniform client response for a failure outcome.
    pub fn into_failure_response(self) -> Response<Body> {
        let status = self.failure_status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = Response::new(Body::from(format!("{}\n", self.message())));
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        self.attach(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_classes_stay_distinguishable() {
        let none = ProxyOutcome::NoAvailableBackends { attempts: 0 };
        let exhausted = ProxyOutcome::Exhausted { attempts: 3 };
        let closed = ProxyOutcome::ClientClosed { backend: Some("http://a:1".into()), attempts: 1 };

        assert_eq!(none.failure_status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(exhausted.failure_status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(closed.failure_status().map(|s| s.as_u16()), Some(499));
        assert_ne!(none.as_str(), exhausted.as_str());
        assert_eq!(closed.backend(), Some("http://a:1"));
    }

    #[test]
    fn failure_response_carries_outcome() {
        let response = ProxyOutcome::Exhausted { attempts: 3 }.into_failure_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            response.extensions().get::<ProxyOutcome>(),
            Some(&ProxyOutcome::Exhausted { attempts: 3 })
        );
    }
}
