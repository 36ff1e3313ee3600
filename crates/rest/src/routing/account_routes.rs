//! Account API routes.

use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers;
use crate::state::AppState;

/// Creates the router with every account route and the health probes.
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/_readiness", get(handlers::readiness_handler))
        .route("/v1/users", post(handlers::add_user_handler))
        .route("/v1/users/whoami", post(handlers::who_am_i_handler))
        .route("/v1/users/invite", post(handlers::add_invite_handler))
        .route(
            "/v1/users/reset-password-invite",
            post(handlers::reset_password_invite_handler),
        )
        .route("/v1/users/list", post(handlers::list_users_handler))
        .route(
            "/v1/users/change-password",
            post(handlers::change_password_handler),
        )
        .route("/v1/users/enable", post(handlers::enable_user_handler))
        .route("/v1/users/disable", post(handlers::disable_user_handler))
        .with_state(state)
}
