//! Account operations.
//!
//! Each operation resolves the caller's tenant into a [`TxContext`], does its
//! reads and writes through it, and resolves it through a [`TxGuard`]:
//! commit on success, rollback on any error. A commit failure is reported
//! as `Internal` even when the operation body succeeded.
//!
//! Invitations notify only after the commit. If notification then fails,
//! the caller sees `Internal` while the user row stays committed.
//!
//! [`TxContext`]: stratum_persistence::TxContext
//! [`TxGuard`]: stratum_persistence::TxGuard

pub mod messages;

use std::sync::Arc;
use std::time::Duration;

use stratum_persistence::types::{NewUser, Page, SessionStatus, TokenKind, UrlToken, User};
use stratum_persistence::{CallIdentity, CallSignal, IdentityResolver, StorageError, TxGuard};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::notify::Notifier;
use crate::password::PasswordDigest;

pub use messages::{
    AddUserRequest, AddUserResponse, ChangePasswordRequest, Empty, InviteRequest,
    ListUsersRequest, ListUsersResponse, UserActionRequest, UserActionResponse, UserResponse,
    WhoAmIResponse,
};

const DUPLICATE_USER: &str = "Email and/or Name already exist";
const USER_NOT_FOUND: &str = "User Not Found";
const WRONG_CREDENTIALS: &str = "Wrong credentials";

/// Tunables for the account operations.
#[derive(Debug, Clone)]
pub struct AccountSettings {
    /// Lifetime of signup invite tokens.
    pub signup_token_ttl: Duration,
    /// Lifetime of password reset tokens.
    pub reset_token_ttl: Duration,
    /// Page size used for a listing limit of 0.
    pub default_page_size: u32,
    /// Largest page a listing returns.
    pub max_page_size: u32,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            signup_token_ttl: Duration::from_secs(72 * 60 * 60),
            reset_token_ttl: Duration::from_secs(60 * 60),
            default_page_size: 25,
            max_page_size: 1000,
        }
    }
}

/// The account operations over one store provider.
#[derive(Clone)]
pub struct AccountService {
    resolver: IdentityResolver,
    notifier: Arc<dyn Notifier>,
    digest: Arc<dyn PasswordDigest>,
    settings: AccountSettings,
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl AccountService {
    /// Creates the service.
    pub fn new(
        resolver: IdentityResolver,
        notifier: Arc<dyn Notifier>,
        digest: Arc<dyn PasswordDigest>,
        settings: AccountSettings,
    ) -> Self {
        Self {
            resolver,
            notifier,
            digest,
            settings,
        }
    }

    /// Returns the identity resolver.
    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    /// Returns the settings.
    pub fn settings(&self) -> &AccountSettings {
        &self.settings
    }

    async fn begin(&self, identity: &CallIdentity, signal: CallSignal) -> ApiResult<TxGuard> {
        let ctx = self
            .resolver
            .context_for(identity, signal)
            .await
            .map_err(|e| ApiError::internal_from(&e, "Error resolving tenant"))?;
        debug!(
            tenant = ctx.tenant().map_or("-", |t| t.short_name.as_str()),
            user_id = %identity.user_id(),
            acting_as = ctx.acting_as().unwrap_or("-"),
            "call context ready"
        );
        Ok(ctx.guard())
    }

    /// Returns the calling user.
    pub async fn who_am_i(
        &self,
        identity: &CallIdentity,
        signal: CallSignal,
    ) -> ApiResult<WhoAmIResponse> {
        let mut guard = self.begin(identity, signal.clone()).await?;
        let result = async {
            let store = guard.tenant_store().await?;
            match store.user_by_id(identity.user_id(), &signal).await? {
                Some(user) => Ok(user),
                None => Err(ApiError::not_found(USER_NOT_FOUND)),
            }
        }
        .await;
        let user = guard.finish(result).await?;

        Ok(WhoAmIResponse {
            id: user.id.to_string(),
            name: user.name,
            email: user.email,
        })
    }

    /// Creates a user with no password.
    pub async fn add_user(
        &self,
        identity: &CallIdentity,
        signal: CallSignal,
        req: AddUserRequest,
    ) -> ApiResult<AddUserResponse> {
        let new_user = new_user(&req.name, &req.email)?;

        let mut guard = self.begin(identity, signal).await?;
        let result = async {
            let tx = guard.tenant_tx().await?;
            tx.insert_user(new_user).await.map_err(insert_error)
        }
        .await;
        let user = guard.finish(result).await?;

        info!(user_id = %user.id, acting_as = identity.acting_as().unwrap_or("-"), "user added");
        Ok(AddUserResponse {
            name: user.name,
            email: user.email,
        })
    }

    /// Creates a user and sends them a signup invitation.
    pub async fn add_invite(
        &self,
        identity: &CallIdentity,
        signal: CallSignal,
        req: InviteRequest,
    ) -> ApiResult<Empty> {
        let new_user = new_user(&req.name, &req.email)?;
        let ttl = token_ttl(self.settings.signup_token_ttl)?;

        let mut guard = self.begin(identity, signal).await?;
        let result = async {
            let tx = guard.tenant_tx().await?;
            let user = tx.insert_user(new_user).await.map_err(insert_error)?;
            let token = UrlToken::issue(user.id, TokenKind::SignupInvite, ttl);
            tx.insert_url_token(&token).await?;
            Ok::<_, ApiError>((user, token))
        }
        .await;
        let (user, token) = guard.finish(result).await?;

        info!(user_id = %user.id, acting_as = identity.acting_as().unwrap_or("-"), "user invited");
        self.notify(TokenKind::SignupInvite, &user, &token).await?;
        Ok(Empty {})
    }

    /// Sends an existing user a password reset invitation.
    pub async fn reset_password_invite(
        &self,
        identity: &CallIdentity,
        signal: CallSignal,
        req: InviteRequest,
    ) -> ApiResult<Empty> {
        let email = req.email.trim();
        if email.is_empty() {
            return Err(ApiError::invalid_argument("Empty Email"));
        }
        let ttl = token_ttl(self.settings.reset_token_ttl)?;

        let mut guard = self.begin(identity, signal).await?;
        let result = async {
            let tx = guard.tenant_tx().await?;
            let user = match tx.user_by_email(email).await? {
                Some(user) => user,
                None => return Err(ApiError::internal(USER_NOT_FOUND)),
            };
            let token = UrlToken::issue(user.id, TokenKind::PasswordReset, ttl);
            tx.insert_url_token(&token).await?;
            Ok::<_, ApiError>((user, token))
        }
        .await;
        let (user, token) = guard.finish(result).await?;

        self.notify(TokenKind::PasswordReset, &user, &token).await?;
        Ok(Empty {})
    }

    /// Lists one page of the tenant's users.
    ///
    /// `total_users` is the number of users in the returned page.
    pub async fn list_users(
        &self,
        identity: &CallIdentity,
        signal: CallSignal,
        req: ListUsersRequest,
    ) -> ApiResult<ListUsersResponse> {
        let page = Page::with_default_limit(req.offset, req.limit, self.settings.default_page_size)?
            .clamp_limit(self.settings.max_page_size);

        let mut guard = self.begin(identity, signal.clone()).await?;
        let result = async {
            let store = guard.tenant_store().await?;
            store
                .list_users(page, &signal)
                .await
                .map_err(|e| ApiError::internal_from(&e, "Error getting Users"))
        }
        .await;
        let users = guard.finish(result).await?;

        let users: Vec<UserResponse> = users.iter().map(UserResponse::from).collect();
        Ok(ListUsersResponse {
            total_users: u32::try_from(users.len()).unwrap_or(u32::MAX),
            users,
        })
    }

    /// Replaces the caller's password and invalidates the caller's session.
    ///
    /// Both writes happen in one tenant transaction.
    pub async fn change_password(
        &self,
        identity: &CallIdentity,
        signal: CallSignal,
        req: ChangePasswordRequest,
    ) -> ApiResult<Empty> {
        if req.new_password.is_empty() {
            return Err(ApiError::invalid_argument("Empty New Password"));
        }
        if req.old_password.is_empty() {
            return Err(ApiError::invalid_argument("Empty Old Password"));
        }

        let mut guard = self.begin(identity, signal).await?;
        let result = async {
            let tx = guard.tenant_tx().await?;
            let user = match tx.user_by_id(identity.user_id()).await? {
                Some(user) => user,
                None => return Err(ApiError::not_found(USER_NOT_FOUND)),
            };
            let matches = match user.password_digest {
                Some(stored) => self.verify_password(&req.old_password, stored).await?,
                None => false,
            };
            if !matches {
                return Err(ApiError::unauthenticated(WRONG_CREDENTIALS));
            }

            let digest = self.digest_password(&req.new_password).await?;
            tx.set_password_digest(user.id, &digest).await?;
            tx.set_session_status(identity.session_id(), SessionStatus::Invalid)
                .await?;
            Ok::<_, ApiError>(())
        }
        .await;
        guard.finish(result).await?;

        info!(user_id = %identity.user_id(), "password changed; session invalidated");
        Ok(Empty {})
    }

    /// Checks `plain` against a stored digest on the blocking pool.
    async fn verify_password(&self, plain: &str, stored: String) -> ApiResult<bool> {
        let digest = Arc::clone(&self.digest);
        let plain = plain.to_owned();
        tokio::task::spawn_blocking(move || digest.verify(&plain, &stored))
            .await
            .map_err(|e| {
                error!(error = %e, "password check task failed");
                ApiError::internal(crate::error::INTERNAL_MESSAGE)
            })
    }

    /// Digests `plain` on the blocking pool.
    async fn digest_password(&self, plain: &str) -> ApiResult<String> {
        let digest = Arc::clone(&self.digest);
        let plain = plain.to_owned();
        let outcome = tokio::task::spawn_blocking(move || digest.digest(&plain)).await;
        match outcome {
            Ok(Ok(digest)) => Ok(digest),
            Ok(Err(e)) => {
                error!(error = %e, "password digest failed");
                Err(ApiError::internal(crate::error::INTERNAL_MESSAGE))
            }
            Err(e) => {
                error!(error = %e, "password digest task failed");
                Err(ApiError::internal(crate::error::INTERNAL_MESSAGE))
            }
        }
    }

    /// Enables a user.
    pub async fn enable_user(
        &self,
        identity: &CallIdentity,
        signal: CallSignal,
        req: UserActionRequest,
    ) -> ApiResult<UserActionResponse> {
        self.set_enabled(identity, signal, req, true).await
    }

    /// Disables a user.
    pub async fn disable_user(
        &self,
        identity: &CallIdentity,
        signal: CallSignal,
        req: UserActionRequest,
    ) -> ApiResult<UserActionResponse> {
        self.set_enabled(identity, signal, req, false).await
    }

    async fn set_enabled(
        &self,
        identity: &CallIdentity,
        signal: CallSignal,
        req: UserActionRequest,
        enabled: bool,
    ) -> ApiResult<UserActionResponse> {
        let user_id = Uuid::parse_str(req.id.trim())
            .map_err(|_| ApiError::invalid_argument("Invalid user id"))?;
        let failure = if enabled {
            "Error enabling user"
        } else {
            "Error disabling user"
        };

        let mut guard = self.begin(identity, signal).await?;
        let result = async {
            let tx = guard.tenant_tx().await?;
            tx.set_enabled(user_id, enabled).await.map_err(|e| {
                if e.is_not_found() {
                    ApiError::not_found(USER_NOT_FOUND)
                } else {
                    ApiError::internal_from(&e, failure)
                }
            })
        }
        .await;
        guard.finish(result).await?;

        info!(
            user_id = %user_id,
            enabled,
            acting_as = identity.acting_as().unwrap_or("-"),
            "user enabled flag updated"
        );
        Ok(UserActionResponse {
            status: enabled.to_string(),
        })
    }

    async fn notify(&self, kind: TokenKind, user: &User, token: &UrlToken) -> ApiResult<()> {
        self.notifier.send(kind, user, token).await.map_err(|e| {
            warn!(kind = %kind, user_id = %user.id, error = %e, "notification failed after commit");
            ApiError::internal("Error sending notification")
        })
    }
}

fn new_user(name: &str, email: &str) -> ApiResult<NewUser> {
    let (name, email) = (name.trim(), email.trim());
    if name.is_empty() {
        return Err(ApiError::invalid_argument("Empty Name"));
    }
    if email.is_empty() {
        return Err(ApiError::invalid_argument("Empty Email"));
    }
    Ok(NewUser::new(name, email))
}

fn insert_error(err: StorageError) -> ApiError {
    if err.is_already_exists() {
        ApiError::invalid_argument(DUPLICATE_USER)
    } else {
        ApiError::from(err)
    }
}

fn token_ttl(ttl: Duration) -> ApiResult<chrono::Duration> {
    chrono::Duration::from_std(ttl).map_err(|e| {
        error!(error = %e, "token lifetime out of range");
        ApiError::internal(crate::error::INTERNAL_MESSAGE)
    })
}
