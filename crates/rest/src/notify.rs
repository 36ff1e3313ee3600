//! Notification sink for signup and password reset invitations.
//!
//! Notifications run after the writing transaction has committed. A failed
//! notification never undoes the committed rows.

use async_trait::async_trait;
use stratum_persistence::types::{TokenKind, UrlToken, User};
use thiserror::Error;
use tracing::info;

/// Failure to deliver a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The recipient address was refused.
    #[error("recipient rejected: {0}")]
    Rejected(String),

    /// The delivery channel is unavailable.
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Delivers a token to a user out of band.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends `token` of `kind` to `user`.
    async fn send(&self, kind: TokenKind, user: &User, token: &UrlToken) -> Result<(), NotifyError>;
}

/// Notifier that records each notification as a log event.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, kind: TokenKind, user: &User, token: &UrlToken) -> Result<(), NotifyError> {
        info!(
            kind = %kind,
            user_id = %user.id,
            email = %user.email,
            token = %token.id,
            expires_at = %token.expires_at,
            "notification sent"
        );
        Ok(())
    }
}
