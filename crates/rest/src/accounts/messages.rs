//! Request and response messages for the account operations.

use serde::{Deserialize, Serialize};
use stratum_persistence::types::User;

/// A user as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    /// User id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Whether the user is enabled.
    pub enabled: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            enabled: user.enabled,
        }
    }
}

/// Body of `WhoAmI`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhoAmIResponse {
    /// User id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
}

/// Body of `AddUser`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddUserRequest {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
}

/// Result of `AddUser`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddUserResponse {
    /// Display name as stored.
    pub name: String,
    /// Email address as stored.
    pub email: String,
}

/// Body of `AddInvite` and `ResetPasswordInvite`. The name is ignored by the
/// reset flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InviteRequest {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
}

/// Body of `ListUsers`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ListUsersRequest {
    /// Rows to skip.
    #[serde(default)]
    pub offset: i64,
    /// Rows to return; 0 selects the default page size.
    #[serde(default)]
    pub limit: i64,
}

/// Result of `ListUsers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersResponse {
    /// The page of users.
    pub users: Vec<UserResponse>,
    /// Number of users in this page.
    pub total_users: u32,
}

/// Body of `ChangePassword`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    /// Current password.
    #[serde(default)]
    pub old_password: String,
    /// Replacement password.
    #[serde(default)]
    pub new_password: String,
}

/// Body of `EnableUser` and `DisableUser`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserActionRequest {
    /// Target user id.
    #[serde(default)]
    pub id: String,
}

/// Result of `EnableUser` and `DisableUser`: `"true"` or `"false"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActionResponse {
    /// The new enabled flag, as a string.
    pub status: String,
}

/// Empty result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}
