//! HTTP request handlers.

pub mod accounts;
pub mod health;

pub use accounts::{
    add_invite_handler, add_user_handler, change_password_handler, disable_user_handler,
    enable_user_handler, list_users_handler, reset_password_invite_handler, who_am_i_handler,
};
pub use health::{health_handler, readiness_handler};
