//! Core types for the persistence layer.
//!
//! - [`Tenant`] - A tenant record owned by the control store
//! - [`User`], [`NewUser`] - User rows in a tenant store
//! - [`Session`], [`SessionStatus`] - Caller sessions in a tenant store
//! - [`UrlToken`], [`TokenKind`] - Single-use signup and password-reset tokens
//! - [`Page`] - Offset pagination for user listings
//!
//! # Examples
//!
//! ```
//! use stratum_persistence::types::{NewUser, Page, DEFAULT_PAGE_LIMIT};
//!
//! let user = NewUser::new("Ann", "ann@acme.io");
//! assert!(user.password_digest.is_none());
//!
//! let page = Page::new(0, 0).unwrap();
//! assert_eq!(page.limit(), DEFAULT_PAGE_LIMIT);
//! ```

mod pagination;
mod session;
mod tenant;
mod token;
mod user;

pub use pagination::{DEFAULT_PAGE_LIMIT, Page};
pub use session::{Session, SessionStatus};
pub use tenant::Tenant;
pub use token::{TokenKind, UrlToken};
pub use user::{NewUser, User};
