//! Route configuration.

pub mod account_routes;

pub use account_routes::create_routes;
