//! Application state shared by all request handlers.

use std::sync::Arc;

use crate::accounts::AccountService;
use crate::config::ServerConfig;

/// Shared application state.
///
/// # Example
///
/// ```rust,ignore
/// use stratum_rest::{AppState, ServerConfig};
///
/// let state = AppState::new(service, ServerConfig::default());
/// ```
#[derive(Debug, Clone)]
pub struct AppState {
    /// The account operations.
    accounts: Arc<AccountService>,

    /// Server configuration.
    config: Arc<ServerConfig>,
}

impl AppState {
    /// Creates a new AppState.
    pub fn new(accounts: AccountService, config: ServerConfig) -> Self {
        Self {
            accounts: Arc::new(accounts),
            config: Arc::new(config),
        }
    }

    /// Returns the account operations.
    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
