//! Integration tests for the SQLite store provider.

#![cfg(feature = "sqlite")]

use std::sync::Arc;

use stratum_persistence::backends::sqlite::{
    SqliteProvider, SqliteStoreConfig, StoreLocation,
};
use stratum_persistence::core::{CallSignal, StoreProvider, TenantStore};
use stratum_persistence::error::{ResourceError, StorageError, TenantError};
use stratum_persistence::strategy::SchemaPerTenantConfig;
use stratum_persistence::tenant::TenantShortName;
use stratum_persistence::types::{NewUser, Page, Session, SessionStatus, Tenant, TokenKind, UrlToken};

fn short(name: &str) -> TenantShortName {
    TenantShortName::new(name).expect("valid short name")
}

async fn provisioned(provider: &SqliteProvider, name: &str) -> Arc<dyn TenantStore> {
    provider
        .provision_tenant_store(&short(name))
        .await
        .expect("Failed to provision tenant store")
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_insert_and_read_user() {
    let provider = SqliteProvider::in_memory().unwrap();
    let store = provisioned(&provider, "acme").await;
    let signal = CallSignal::new();

    let mut tx = store.begin(&signal).await.unwrap();
    let user = tx
        .insert_user(NewUser::new("Ann", "ann@acme.io").with_password_digest("digest"))
        .await
        .unwrap();
    let by_email = tx.user_by_email("ann@acme.io").await.unwrap().unwrap();
    assert_eq!(by_email.id, user.id);
    tx.commit().await.unwrap();

    let stored = store.user_by_id(user.id, &signal).await.unwrap().unwrap();
    assert_eq!(stored.name, "Ann");
    assert_eq!(stored.password_digest.as_deref(), Some("digest"));
    assert!(stored.enabled);
}

#[tokio::test]
async fn test_duplicate_email_or_name_is_already_exists() {
    let provider = SqliteProvider::in_memory().unwrap();
    let store = provisioned(&provider, "acme").await;
    let signal = CallSignal::new();

    let mut tx = store.begin(&signal).await.unwrap();
    tx.insert_user(NewUser::new("Ann", "ann@acme.io")).await.unwrap();

    let err = tx
        .insert_user(NewUser::new("Annie", "ann@acme.io"))
        .await
        .unwrap_err();
    assert!(err.is_already_exists());

    let err = tx
        .insert_user(NewUser::new("Ann", "other@acme.io"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Resource(ResourceError::AlreadyExists { kind: "user", .. })
    ));
    tx.commit().await.unwrap();

    assert_eq!(store.count_users(&signal).await.unwrap(), 1);
}

#[tokio::test]
async fn test_list_users_pages_in_insertion_order() {
    let provider = SqliteProvider::in_memory().unwrap();
    let store = provisioned(&provider, "acme").await;
    let signal = CallSignal::new();

    let mut tx = store.begin(&signal).await.unwrap();
    for i in 1..=12 {
        tx.insert_user(NewUser::new(format!("user{}", i), format!("user{}@acme.io", i)))
            .await
            .unwrap();
    }
    tx.commit().await.unwrap();

    let page = store
        .list_users(Page::new(10, 5).unwrap(), &signal)
        .await
        .unwrap();
    let names: Vec<_> = page.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["user11", "user12"]);

    let first = store
        .list_users(Page::new(0, 0).unwrap(), &signal)
        .await
        .unwrap();
    assert_eq!(first.len(), 12);
    assert_eq!(store.count_users(&signal).await.unwrap(), 12);
}

#[tokio::test]
async fn test_updates_on_missing_user_are_not_found() {
    let provider = SqliteProvider::in_memory().unwrap();
    let store = provisioned(&provider, "acme").await;

    let mut tx = store.begin(&CallSignal::new()).await.unwrap();
    let missing = uuid::Uuid::new_v4();
    assert!(tx.set_enabled(missing, false).await.unwrap_err().is_not_found());
    assert!(
        tx.set_password_digest(missing, "d")
            .await
            .unwrap_err()
            .is_not_found()
    );
    tx.rollback().await.unwrap();
}

#[tokio::test]
async fn test_set_enabled_and_digest() {
    let provider = SqliteProvider::in_memory().unwrap();
    let store = provisioned(&provider, "acme").await;
    let signal = CallSignal::new();

    let mut tx = store.begin(&signal).await.unwrap();
    let user = tx.insert_user(NewUser::new("Ann", "ann@acme.io")).await.unwrap();
    tx.set_enabled(user.id, false).await.unwrap();
    tx.set_password_digest(user.id, "new").await.unwrap();
    tx.commit().await.unwrap();

    let stored = store.user_by_id(user.id, &signal).await.unwrap().unwrap();
    assert!(!stored.enabled);
    assert_eq!(stored.password_digest.as_deref(), Some("new"));
}

// ============================================================================
// Sessions and tokens
// ============================================================================

#[tokio::test]
async fn test_session_status_update() {
    let provider = SqliteProvider::in_memory().unwrap();
    let store = provisioned(&provider, "acme").await;
    let signal = CallSignal::new();

    let mut tx = store.begin(&signal).await.unwrap();
    let user = tx.insert_user(NewUser::new("Ann", "ann@acme.io")).await.unwrap();
    tx.insert_session(&Session::new("sess-1", user.id)).await.unwrap();
    tx.set_session_status("sess-1", SessionStatus::Invalid)
        .await
        .unwrap();
    assert!(
        tx.set_session_status("missing", SessionStatus::Invalid)
            .await
            .unwrap_err()
            .is_not_found()
    );
    tx.commit().await.unwrap();

    let session = store.session_by_id("sess-1", &signal).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Invalid);
    assert_eq!(session.user_id, user.id);
}

#[tokio::test]
async fn test_url_token_requires_existing_user() {
    let provider = SqliteProvider::in_memory().unwrap();
    let store = provisioned(&provider, "acme").await;

    let mut tx = store.begin(&CallSignal::new()).await.unwrap();
    let user = tx.insert_user(NewUser::new("Ann", "ann@acme.io")).await.unwrap();
    let token = UrlToken::issue(user.id, TokenKind::SignupInvite, chrono::Duration::hours(72));
    tx.insert_url_token(&token).await.unwrap();
    assert!(tx.insert_url_token(&token).await.unwrap_err().is_already_exists());

    let orphan = UrlToken::issue(uuid::Uuid::new_v4(), TokenKind::PasswordReset, chrono::Duration::hours(1));
    assert!(tx.insert_url_token(&orphan).await.is_err());
    tx.rollback().await.unwrap();
}

// ============================================================================
// Control store and provider
// ============================================================================

#[tokio::test]
async fn test_tenant_short_name_is_unique() {
    let provider = SqliteProvider::in_memory().unwrap();
    let signal = CallSignal::new();
    let control = provider.control();

    let mut tx = control.begin(&signal).await.unwrap();
    tx.insert_tenant(&Tenant::new(short("acme"), "Acme")).await.unwrap();
    let err = tx
        .insert_tenant(&Tenant::new(short("acme"), "Acme Again"))
        .await
        .unwrap_err();
    assert!(err.is_already_exists());
    tx.insert_tenant(&Tenant::new(short("beta"), "Beta")).await.unwrap();
    tx.commit().await.unwrap();

    let tenants = control.list_tenants(&signal).await.unwrap();
    let names: Vec<_> = tenants.iter().map(|t| t.short_name.as_str()).collect();
    assert_eq!(names, vec!["acme", "beta"]);
}

#[tokio::test]
async fn test_delete_tenant_row() {
    let provider = SqliteProvider::in_memory().unwrap();
    let signal = CallSignal::new();
    let control = provider.control();
    let tenant = Tenant::new(short("acme"), "Acme");

    let mut tx = control.begin(&signal).await.unwrap();
    tx.insert_tenant(&tenant).await.unwrap();
    assert_eq!(
        tx.tenant_by_short_name(&short("acme")).await.unwrap().map(|t| t.id),
        Some(tenant.id)
    );
    assert!(tx.delete_tenant(tenant.id).await.unwrap());
    assert!(!tx.delete_tenant(tenant.id).await.unwrap());
    tx.commit().await.unwrap();

    assert!(control.tenant_by_id(tenant.id, &signal).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unprovisioned_tenant_store_is_not_found() {
    let provider = SqliteProvider::in_memory().unwrap();
    let err = provider.tenant_store(&short("ghost")).await.err().expect("expected NotFound error");
    assert!(matches!(err, StorageError::Tenant(TenantError::NotFound { .. })));
}

#[tokio::test]
async fn test_in_memory_providers_are_isolated() {
    let a = SqliteProvider::in_memory().unwrap();
    let b = SqliteProvider::in_memory().unwrap();
    provisioned(&a, "acme").await;
    assert!(b.tenant_store(&short("acme")).await.is_err());
}

#[tokio::test]
async fn test_file_stores_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let user_id = {
        let provider = SqliteProvider::open(dir.path()).unwrap();
        let store = provisioned(&provider, "acme").await;
        let mut tx = store.begin(&CallSignal::new()).await.unwrap();
        let user = tx.insert_user(NewUser::new("Ann", "ann@acme.io")).await.unwrap();
        tx.commit().await.unwrap();
        user.id
    };
    assert!(dir.path().join("control.db").exists());
    assert!(dir.path().join("tenant_acme.db").exists());

    let provider = SqliteProvider::open(dir.path()).unwrap();
    let store = provider.tenant_store(&short("acme")).await.unwrap();
    let user = store.user_by_id(user_id, &CallSignal::new()).await.unwrap();
    assert_eq!(user.map(|u| u.email), Some("ann@acme.io".to_string()));
}

#[tokio::test]
async fn test_remove_tenant_store_drops_file() {
    let dir = tempfile::tempdir().unwrap();
    let provider = SqliteProvider::open(dir.path()).unwrap();
    provisioned(&provider, "acme").await;
    assert!(dir.path().join("tenant_acme.db").exists());

    provider.remove_tenant_store(&short("acme")).await.unwrap();
    assert!(!dir.path().join("tenant_acme.db").exists());
    assert!(provider.tenant_store(&short("acme")).await.is_err());
}

#[tokio::test]
async fn test_reprovisioned_store_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let provider = SqliteProvider::open(dir.path()).unwrap();
    let store = provisioned(&provider, "acme").await;
    let mut tx = store.begin(&CallSignal::new()).await.unwrap();
    tx.insert_user(NewUser::new("Ann", "ann@acme.io")).await.unwrap();
    tx.commit().await.unwrap();
    drop(store);

    provider.remove_tenant_store(&short("acme")).await.unwrap();
    let store = provisioned(&provider, "acme").await;
    assert_eq!(store.count_users(&CallSignal::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_retained_store_is_moved_aside() {
    let dir = tempfile::tempdir().unwrap();
    let provider = SqliteProvider::with_config(
        StoreLocation::directory(dir.path()),
        SqliteStoreConfig::default(),
        SchemaPerTenantConfig::new().with_retain_on_delete(),
    )
    .unwrap();
    let store = provisioned(&provider, "acme").await;
    let mut tx = store.begin(&CallSignal::new()).await.unwrap();
    tx.insert_user(NewUser::new("Ann", "ann@acme.io")).await.unwrap();
    tx.commit().await.unwrap();
    drop(store);

    provider.remove_tenant_store(&short("acme")).await.unwrap();
    assert!(!dir.path().join("tenant_acme.db").exists());
    let retained: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("tenant_acme.db.deleted-"))
        .filter(|name| !name.ends_with("-wal") && !name.ends_with("-shm"))
        .collect();
    assert_eq!(retained.len(), 1);

    let store = provisioned(&provider, "acme").await;
    assert_eq!(store.count_users(&CallSignal::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_file_writers_serialize() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(SqliteProvider::open(dir.path()).unwrap());
    provisioned(&provider, "acme").await;

    let mut handles = Vec::new();
    for i in 0..4 {
        let provider = Arc::clone(&provider);
        handles.push(tokio::spawn(async move {
            let store = provider.tenant_store(&short("acme")).await.unwrap();
            let mut tx = store.begin(&CallSignal::new()).await.unwrap();
            tx.insert_user(NewUser::new(format!("u{}", i), format!("u{}@acme.io", i)))
                .await
                .unwrap();
            tx.commit().await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let store = provider.tenant_store(&short("acme")).await.unwrap();
    assert_eq!(store.count_users(&CallSignal::new()).await.unwrap(), 4);
}

#[tokio::test]
async fn test_tenant_stores_are_isolated() {
    let provider = SqliteProvider::in_memory().unwrap();
    let acme = provisioned(&provider, "acme").await;
    let beta = provisioned(&provider, "beta").await;
    let signal = CallSignal::new();

    let mut tx = acme.begin(&signal).await.unwrap();
    let user = tx.insert_user(NewUser::new("Ann", "ann@acme.io")).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = beta.begin(&signal).await.unwrap();
    tx.insert_user(NewUser::new("Ann", "ann@acme.io")).await.unwrap();
    tx.commit().await.unwrap();

    assert!(beta.user_by_id(user.id, &signal).await.unwrap().is_none());
    assert_eq!(acme.count_users(&signal).await.unwrap(), 1);
    assert_eq!(beta.count_users(&signal).await.unwrap(), 1);
}

#[tokio::test]
async fn test_pool_settings_are_applied() {
    let config = SqliteStoreConfig::default()
        .with_max_connections(2)
        .with_connection_timeout(std::time::Duration::from_millis(1500));
    let provider = SqliteProvider::with_config(
        StoreLocation::in_memory(),
        config,
        SchemaPerTenantConfig::default(),
    )
    .unwrap();

    assert_eq!(provider.config().max_connections, 2);
    assert_eq!(provider.config().connection_timeout_ms, 1500);
    provisioned(&provider, "acme").await;
}
