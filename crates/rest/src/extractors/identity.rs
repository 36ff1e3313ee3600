//! Caller identity extractor.
//!
//! The transport layer in front of this service authenticates the caller
//! and forwards the result as headers. This extractor turns them into a
//! typed [`CallIdentity`] once, at the edge.

use axum::{extract::FromRequestParts, http::HeaderMap, http::request::Parts};
use stratum_persistence::CallIdentity;

use crate::error::ApiError;

/// Header carrying the caller's tenant id.
pub const X_TENANT_ID: &str = "x-tenant-id";
/// Header carrying the caller's user id.
pub const X_USER_ID: &str = "x-user-id";
/// Header carrying the caller's session id.
pub const X_SESSION_ID: &str = "x-session-id";
/// Header carrying the optional "acting as" identity.
pub const X_ACTING_AS: &str = "x-acting-as";

/// Axum extractor for the authenticated caller.
#[derive(Debug, Clone)]
pub struct Caller(pub CallIdentity);

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, ApiError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::unauthenticated(format!("missing {} header", name)))
}

/// Builds the caller identity from request headers.
pub fn identity_from_headers(headers: &HeaderMap) -> Result<CallIdentity, ApiError> {
    let identity = CallIdentity::parse(
        header(headers, X_TENANT_ID)?,
        header(headers, X_USER_ID)?,
        header(headers, X_SESSION_ID)?,
    )
    .map_err(|e| ApiError::unauthenticated(e.to_string()))?;

    Ok(match headers.get(X_ACTING_AS).and_then(|v| v.to_str().ok()) {
        Some(acting_as) => identity.with_acting_as(acting_as.trim()),
        None => identity,
    })
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_from_headers(&parts.headers).map(Caller)
    }
}
