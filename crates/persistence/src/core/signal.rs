//! Per-call cancellation and deadline signal.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::{TransactionError, TransactionResult};

/// The cancellation/timeout signal of one inbound call.
///
/// Every transaction opened on behalf of the call is bound to the same
/// signal, so a caller that gives up aborts the in-flight store work instead
/// of letting it complete unobserved.
///
/// Cloning is cheap and yields a handle to the same signal.
#[derive(Debug, Clone, Default)]
pub struct CallSignal {
    token: CancellationToken,
    deadline: Option<(Instant, Duration)>,
}

impl CallSignal {
    /// Creates a signal with no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a signal that also expires after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some((Instant::now() + timeout, timeout)),
        }
    }

    /// Returns a signal that fires when this one fires, and can additionally
    /// be cancelled on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancels the call.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns a guard that cancels the call when dropped.
    pub fn cancel_on_drop(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    /// Returns the underlying cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Returns the deadline, if one was set.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline.map(|(at, _)| at)
    }

    /// Fails if the call was cancelled or its deadline has passed.
    pub fn check(&self) -> TransactionResult<()> {
        if self.token.is_cancelled() {
            return Err(TransactionError::Cancelled);
        }
        match self.deadline {
            Some((at, timeout)) if Instant::now() >= at => Err(TransactionError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
            _ => Ok(()),
        }
    }

    /// Resolves once the call is cancelled or its deadline passes, yielding
    /// the matching error.
    pub async fn done(&self) -> TransactionError {
        match self.deadline {
            Some((at, timeout)) => {
                tokio::select! {
                    _ = self.token.cancelled() => TransactionError::Cancelled,
                    _ = tokio::time::sleep_until(at) => TransactionError::Timeout {
                        timeout_ms: timeout.as_millis() as u64,
                    },
                }
            }
            None => {
                self.token.cancelled().await;
                TransactionError::Cancelled
            }
        }
    }
}
