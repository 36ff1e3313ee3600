//! Per-request cancellation signal.

use axum::{extract::FromRequestParts, http::request::Parts};
use stratum_persistence::CallSignal;
use tokio_util::sync::DropGuard;

use crate::error::ApiError;
use crate::state::AppState;

/// The call signal of one request.
///
/// Carries the configured request timeout as its deadline and is cancelled
/// when the extractor is dropped, which happens when the handler future
/// completes or is dropped because the client went away.
#[derive(Debug)]
pub struct RequestSignal {
    signal: CallSignal,
    _cancel: DropGuard,
}

impl RequestSignal {
    /// Creates a request signal expiring after `timeout`.
    pub fn with_timeout(timeout: std::time::Duration) -> Self {
        let signal = CallSignal::with_timeout(timeout);
        let cancel = signal.cancel_on_drop();
        Self {
            signal,
            _cancel: cancel,
        }
    }

    /// Returns a handle to the signal.
    pub fn signal(&self) -> CallSignal {
        self.signal.clone()
    }
}

impl FromRequestParts<AppState> for RequestSignal {
    type Rejection = ApiError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::with_timeout(state.config().request_timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_dropping_request_cancels_signal() {
        let request = RequestSignal::with_timeout(Duration::from_secs(30));
        let handle = request.signal();
        assert!(handle.check().is_ok());
        drop(request);
        assert!(handle.check().is_err());
    }

    #[tokio::test]
    async fn test_deadline_is_set() {
        let request = RequestSignal::with_timeout(Duration::from_secs(30));
        assert!(request.signal().deadline().is_some());
    }
}
