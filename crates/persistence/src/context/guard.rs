use std::fmt::Display;
use std::ops::{Deref, DerefMut};

use tracing::warn;

use crate::error::StorageError;

use super::TxContext;

/// Scoped transaction guard.
///
/// Gives access to the wrapped [`TxContext`] and is consumed by
/// [`TxGuard::finish`], which commits on `Ok` and rolls back on `Err`.
///
/// ```ignore
/// let mut guard = resolver.context_for(&identity, signal).await?.guard();
/// let result = async {
///     let tx = guard.tenant_tx().await?;
///     tx.set_enabled(user_id, true).await
/// }
/// .await;
/// guard.finish(result).await?;
/// ```
#[derive(Debug)]
pub struct TxGuard {
    ctx: TxContext,
}

impl TxGuard {
    pub(super) fn new(ctx: TxContext) -> Self {
        Self { ctx }
    }

    /// Returns the wrapped context.
    pub fn context(&mut self) -> &mut TxContext {
        &mut self.ctx
    }

    /// Resolves the context according to `result`.
    ///
    /// On `Ok` the context is committed and a commit failure is returned in
    /// place of the value. On `Err` the context is rolled back and the
    /// original error is returned; a rollback failure is only logged.
    pub async fn finish<T, E>(mut self, result: Result<T, E>) -> Result<T, E>
    where
        E: From<StorageError> + Display,
    {
        match result {
            Ok(value) => {
                self.ctx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.ctx.rollback().await {
                    warn!(error = %rollback_err, cause = %err, "rollback failed while discarding operation");
                }
                Err(err)
            }
        }
    }
}

impl Deref for TxGuard {
    type Target = TxContext;

    fn deref(&self) -> &TxContext {
        &self.ctx
    }
}

impl DerefMut for TxGuard {
    fn deref_mut(&mut self) -> &mut TxContext {
        &mut self.ctx
    }
}
