//! Account operation handlers.
//!
//! Each handler decodes the request, hands the typed caller identity and
//! request signal to [`AccountService`](crate::accounts::AccountService),
//! and encodes the result.

use axum::{Json, extract::State};

use crate::accounts::{
    AddUserRequest, AddUserResponse, ChangePasswordRequest, Empty, InviteRequest,
    ListUsersRequest, ListUsersResponse, UserActionRequest, UserActionResponse, WhoAmIResponse,
};
use crate::error::ApiResult;
use crate::extractors::{Caller, RequestSignal};
use crate::state::AppState;

/// `POST /v1/users/whoami`
pub async fn who_am_i_handler(
    State(state): State<AppState>,
    Caller(identity): Caller,
    signal: RequestSignal,
) -> ApiResult<Json<WhoAmIResponse>> {
    let user = state.accounts().who_am_i(&identity, signal.signal()).await?;
    Ok(Json(user))
}

/// `POST /v1/users`
pub async fn add_user_handler(
    State(state): State<AppState>,
    Caller(identity): Caller,
    signal: RequestSignal,
    Json(req): Json<AddUserRequest>,
) -> ApiResult<Json<AddUserResponse>> {
    let user = state
        .accounts()
        .add_user(&identity, signal.signal(), req)
        .await?;
    Ok(Json(user))
}

/// `POST /v1/users/invite`
pub async fn add_invite_handler(
    State(state): State<AppState>,
    Caller(identity): Caller,
    signal: RequestSignal,
    Json(req): Json<InviteRequest>,
) -> ApiResult<Json<Empty>> {
    let empty = state
        .accounts()
        .add_invite(&identity, signal.signal(), req)
        .await?;
    Ok(Json(empty))
}

/// `POST /v1/users/reset-password-invite`
pub async fn reset_password_invite_handler(
    State(state): State<AppState>,
    Caller(identity): Caller,
    signal: RequestSignal,
    Json(req): Json<InviteRequest>,
) -> ApiResult<Json<Empty>> {
    let empty = state
        .accounts()
        .reset_password_invite(&identity, signal.signal(), req)
        .await?;
    Ok(Json(empty))
}

/// `POST /v1/users/list`
pub async fn list_users_handler(
    State(state): State<AppState>,
    Caller(identity): Caller,
    signal: RequestSignal,
    Json(req): Json<ListUsersRequest>,
) -> ApiResult<Json<ListUsersResponse>> {
    let page = state
        .accounts()
        .list_users(&identity, signal.signal(), req)
        .await?;
    Ok(Json(page))
}

/// `POST /v1/users/change-password`
pub async fn change_password_handler(
    State(state): State<AppState>,
    Caller(identity): Caller,
    signal: RequestSignal,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<Empty>> {
    let empty = state
        .accounts()
        .change_password(&identity, signal.signal(), req)
        .await?;
    Ok(Json(empty))
}

/// `POST /v1/users/enable`
pub async fn enable_user_handler(
    State(state): State<AppState>,
    Caller(identity): Caller,
    signal: RequestSignal,
    Json(req): Json<UserActionRequest>,
) -> ApiResult<Json<UserActionResponse>> {
    let status = state
        .accounts()
        .enable_user(&identity, signal.signal(), req)
        .await?;
    Ok(Json(status))
}

/// `POST /v1/users/disable`
pub async fn disable_user_handler(
    State(state): State<AppState>,
    Caller(identity): Caller,
    signal: RequestSignal,
    Json(req): Json<UserActionRequest>,
) -> ApiResult<Json<UserActionResponse>> {
    let status = state
        .accounts()
        .disable_user(&identity, signal.signal(), req)
        .await?;
    Ok(Json(status))
}
