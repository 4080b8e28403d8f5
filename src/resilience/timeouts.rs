//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap backend calls with a per-attempt deadline
//! - Convert an elapsed deadline into a transport error
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timed-out attempts are failures like any other transport error

use std::future::Future;
use std::time::Duration;

use crate::proxy::transport::TransportError;

/// Run `fut` with a deadline, flattening an elapsed deadline into
/// [`TransportError::Timeout`].
pub async fn with_deadline<F, T>(deadline: Duration, fut: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(deadline)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_in_time() {
        let result = with_deadline(Duration::from_millis(100), async { Ok::<_, TransportError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn elapsed_deadline_is_timeout() {
        let result: Result<(), _> =
            with_deadline(Duration::from_millis(20), std::future::pending()).await;
        assert!(matches!(result, Err(TransportError::Timeout(d)) if d == Duration::from_millis(20)));
    }
}
