//! Shared fixtures for the account operation tests.
//!
//! - [`TestEnv`] - An in-memory provider with tenant "acme" and user Ann
//! - [`RecordingNotifier`] - A notifier that records or refuses sends

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use stratum_persistence::backends::sqlite::SqliteProvider;
use stratum_persistence::testing::FaultyProvider;
use stratum_persistence::types::{NewUser, Session, SessionStatus, Tenant, TokenKind, UrlToken, User};
use stratum_persistence::{
    CallIdentity, CallSignal, IdentityResolver, StoreProvider, TenantStore, TxContext,
};
use stratum_rest::{
    AccountService, AccountSettings, Argon2Digest, Notifier, NotifyError, PasswordDigest,
    TenantAdmin,
};
use uuid::Uuid;

/// Ann's password when the environment is created.
pub const OLD_PASSWORD: &str = "oldpw";

/// Ann's session id.
pub const SESSION_ID: &str = "sess-ann-1";

/// One recorded notification.
#[derive(Debug, Clone)]
pub struct Sent {
    pub kind: TokenKind,
    pub email: String,
    pub user_id: Uuid,
    pub token: UrlToken,
}

/// Records notifications; refuses them while `fail` is set.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
    fail: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock() = fail;
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, kind: TokenKind, user: &User, token: &UrlToken) -> Result<(), NotifyError> {
        if *self.fail.lock() {
            return Err(NotifyError::Delivery("mail relay unreachable".to_string()));
        }
        self.sent.lock().push(Sent {
            kind,
            email: user.email.clone(),
            user_id: user.id,
            token: token.clone(),
        });
        Ok(())
    }
}

/// Cheap argon2 parameters so tests stay fast.
pub fn test_digest() -> Argon2Digest {
    Argon2Digest::with_cost(1024, 1, 1).unwrap()
}

/// A tenant "acme" holding one user, Ann, with password [`OLD_PASSWORD`]
/// and a valid session [`SESSION_ID`].
pub struct TestEnv {
    pub provider: Arc<FaultyProvider>,
    pub tenant: Tenant,
    pub ann: User,
    pub notifier: Arc<RecordingNotifier>,
    pub service: AccountService,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_settings(AccountSettings::default()).await
    }

    pub async fn with_settings(settings: AccountSettings) -> Self {
        Self::with_provider(SqliteProvider::in_memory().unwrap(), settings).await
    }

    /// File-backed stores under `dir`, for tests with concurrent writers.
    pub async fn on_disk(dir: &std::path::Path) -> Self {
        Self::with_provider(SqliteProvider::open(dir).unwrap(), AccountSettings::default()).await
    }

    pub async fn with_provider(sqlite: SqliteProvider, settings: AccountSettings) -> Self {
        let provider = Arc::new(FaultyProvider::new(Arc::new(sqlite)));
        let resolver = IdentityResolver::new(provider.clone());

        let tenant = TenantAdmin::new(resolver.clone())
            .add_tenant("Acme", Some("acme"), CallSignal::new())
            .await
            .unwrap();

        let digest = test_digest().digest(OLD_PASSWORD).unwrap();
        let mut ctx = TxContext::new(provider.clone(), Some(tenant.clone()), CallSignal::new());
        let tx = ctx.tenant_tx().await.unwrap();
        let ann = tx
            .insert_user(NewUser::new("Ann", "ann@acme.io").with_password_digest(digest))
            .await
            .unwrap();
        tx.insert_session(&Session::new(SESSION_ID, ann.id)).await.unwrap();
        ctx.commit().await.unwrap();

        let notifier = Arc::new(RecordingNotifier::default());
        let service = AccountService::new(
            resolver,
            notifier.clone(),
            Arc::new(test_digest()),
            settings,
        );

        provider.reset();
        Self {
            provider,
            tenant,
            ann,
            notifier,
            service,
        }
    }

    /// Ann's identity.
    pub fn ann_identity(&self) -> CallIdentity {
        CallIdentity::new(self.tenant.id, self.ann.id, SESSION_ID)
    }

    pub async fn store(&self) -> Arc<dyn TenantStore> {
        self.provider.tenant_store(&self.tenant.short_name).await.unwrap()
    }

    pub async fn user(&self, id: Uuid) -> Option<User> {
        self.store().await.user_by_id(id, &CallSignal::new()).await.unwrap()
    }

    pub async fn user_count(&self) -> u64 {
        self.store().await.count_users(&CallSignal::new()).await.unwrap()
    }

    pub async fn session_status(&self) -> SessionStatus {
        self.store()
            .await
            .session_by_id(SESSION_ID, &CallSignal::new())
            .await
            .unwrap()
            .unwrap()
            .status
    }

    /// Returns `true` if Ann's stored digest matches `password`.
    pub async fn ann_password_is(&self, password: &str) -> bool {
        let ann = self.user(self.ann.id).await.unwrap();
        test_digest().verify(password, ann.password_digest.as_deref().unwrap())
    }

    /// Adds `count` users named `user01`, `user02`, ... after Ann.
    pub async fn seed_users(&self, count: usize) {
        let mut ctx =
            TxContext::new(self.provider.clone(), Some(self.tenant.clone()), CallSignal::new());
        let tx = ctx.tenant_tx().await.unwrap();
        for i in 1..=count {
            tx.insert_user(NewUser::new(format!("user{:02}", i), format!("user{:02}@acme.io", i)))
                .await
                .unwrap();
        }
        ctx.commit().await.unwrap();
        self.provider.reset();
    }
}
