//! # stratum-rest - Account Operations and JSON API
//!
//! The account operations of the Stratum multi-tenant admin service, and a
//! thin axum surface in front of them.
//!
//! Every operation resolves the caller's tenant from a typed
//! [`CallIdentity`](stratum_persistence::CallIdentity), works through one
//! transactional context, and commits or rolls back exactly once through a
//! scoped guard.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use stratum_persistence::backends::sqlite::SqliteProvider;
//! use stratum_rest::{ServerConfig, create_app_with_provider};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let provider = Arc::new(SqliteProvider::open("./data")?);
//!     let config = ServerConfig::default();
//!     let app = create_app_with_provider(provider, config.clone());
//!
//!     let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## API Endpoints
//!
//! | Operation | HTTP Method | URL |
//! |-----------|-------------|-----|
//! | WhoAmI | POST | `/v1/users/whoami` |
//! | AddUser | POST | `/v1/users` |
//! | AddInvite | POST | `/v1/users/invite` |
//! | ResetPasswordInvite | POST | `/v1/users/reset-password-invite` |
//! | ListUsers | POST | `/v1/users/list` |
//! | ChangePassword | POST | `/v1/users/change-password` |
//! | EnableUser | POST | `/v1/users/enable` |
//! | DisableUser | POST | `/v1/users/disable` |
//! | health | GET | `/health` |
//! | readiness | GET | `/_readiness` |
//!
//! The caller is identified by the `X-Tenant-ID`, `X-User-ID`,
//! `X-Session-ID` and optional `X-Acting-As` headers.
//!
//! ## Error Handling
//!
//! Errors are returned as `{"code": ..., "message": ...}`:
//!
//! | HTTP Status | Code |
//! |-------------|------|
//! | 400 | `invalid_argument` |
//! | 401 | `unauthenticated` |
//! | 404 | `not_found` |
//! | 500 | `internal` |
//!
//! ## Architecture
//!
//! - [`accounts`] - The account operations
//! - [`tenants`] - Tenant administration used by the command line
//! - [`notify`] - Notification sink for invitations
//! - [`password`] - Password digests
//! - [`error`] - Caller-facing error taxonomy
//! - [`config`] - Server configuration
//! - [`state`] - Application state
//! - [`extractors`] - Caller identity and request signal extractors
//! - [`handlers`] - HTTP request handlers
//! - [`routing`] - Route configuration

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod accounts;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod notify;
pub mod password;
pub mod routing;
pub mod state;
pub mod tenants;

// Re-export commonly used types
pub use accounts::{AccountService, AccountSettings};
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use notify::{LogNotifier, Notifier, NotifyError};
pub use password::{Argon2Digest, DigestError, PasswordDigest};
pub use state::AppState;
pub use tenants::TenantAdmin;

use std::sync::Arc;

use axum::Router;
use stratum_persistence::{IdentityResolver, StoreProvider};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Builds the account service with the log notifier and argon2 digests.
pub fn account_service(provider: Arc<dyn StoreProvider>, config: &ServerConfig) -> AccountService {
    AccountService::new(
        IdentityResolver::new(provider),
        Arc::new(LogNotifier),
        Arc::new(Argon2Digest::default()),
        config.account_settings(),
    )
}

/// Creates the Axum application over a store provider with the default
/// notifier and password digest.
pub fn create_app_with_provider(provider: Arc<dyn StoreProvider>, config: ServerConfig) -> Router {
    let accounts = account_service(provider, &config);
    create_app(accounts, config)
}

/// Creates the Axum application.
///
/// Sets up every route plus tracing, the request timeout and optional CORS.
pub fn create_app(accounts: AccountService, config: ServerConfig) -> Router {
    info!(
        request_timeout = ?config.request_timeout,
        cors = config.enable_cors,
        "Creating account API server"
    );

    let state = AppState::new(accounts, config.clone());
    let router = routing::create_routes(state);

    let service_builder = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ));

    let router = if config.enable_cors {
        router.layer(build_cors_layer(&config))
    } else {
        router
    };

    router.layer(service_builder)
}

/// Builds the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([http::Method::GET, http::Method::POST])
        .allow_headers(Any);

    if config.cors_origins == "*" {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

/// Initializes the tracing subscriber for logging.
///
/// Call once at startup. `RUST_LOG` overrides `level`.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "stratum={level},stratum_rest={level},stratum_persistence={level},tower_http=debug"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
