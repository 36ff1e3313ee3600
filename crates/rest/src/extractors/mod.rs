//! Axum extractors for per-call inputs.
//!
//! - [`Caller`] - The authenticated caller's identity
//! - [`RequestSignal`] - The request's cancellation and deadline signal

mod identity;
mod signal;

pub use identity::{Caller, X_ACTING_AS, X_SESSION_ID, X_TENANT_ID, X_USER_ID, identity_from_headers};
pub use signal::RequestSignal;
