//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap backend calls (forward, probe) with a hard deadline
//! - Classify call failures for the retry and probe paths
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; a timed-out call is dropped, never left pending
//! - Timeout errors are distinct from other errors

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time;

/// Failure of one outbound HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection error: {0}")]
    Transport(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Run `fut` under `limit`.
pub async fn deadline<T, F>(limit: Duration, fut: F) -> Result<T, CallError>
where
    F: Future<Output = Result<T, CallError>>,
{
    match time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(CallError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_elapses() {
        let res: Result<(), _> = deadline(Duration::from_millis(20), async {
            time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_eq!(res, Err(CallError::Timeout(Duration::from_millis(20))));
    }

    #[tokio::test]
    async fn test_deadline_passes_inner_result() {
        let ok = deadline(Duration::from_secs(1), async { Ok::<_, CallError>(7) }).await;
        assert_eq!(ok, Ok(7));
        let err: Result<(), _> = deadline(Duration::from_secs(1), async { Err(CallError::Status(503)) }).await;
        assert_eq!(err, Err(CallError::Status(503)));
    }
}
