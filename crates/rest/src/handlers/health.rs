//! Health check endpoint handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use stratum_persistence::CallSignal;
use tracing::{debug, warn};

use crate::state::AppState;

/// Handler for the health check endpoint.
///
/// # HTTP Request
///
/// `GET [base]/health`
pub async fn health_handler() -> Response {
    debug!("Processing health check request");

    let health_response = serde_json::json!({
        "status": "healthy",
        "version": crate::VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339()
    });

    (StatusCode::OK, Json(health_response)).into_response()
}

/// Handler for a readiness probe that checks the control store.
///
/// # HTTP Request
///
/// `GET [base]/_readiness`
///
/// # Response
///
/// - `200 OK` - The control store answers
/// - `503 Service Unavailable` - The control store does not answer
pub async fn readiness_handler(State(state): State<AppState>) -> Response {
    let signal = CallSignal::with_timeout(state.config().request_timeout);
    let control = state.accounts().resolver().provider().control();

    match control.list_tenants(&signal).await {
        Ok(tenants) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "tenants": tenants.len(),
            })),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "control store not ready");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "unavailable" })),
            )
                .into_response()
        }
    }
}
