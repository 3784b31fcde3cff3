/// Integration tests for user registration

mod common;

use common::{test_config, Harness};
use formdesk_core::auth::password::{is_password_hash, verify_password};
use formdesk_core::config::ServiceConfig;
use formdesk_core::schema::users;
use formdesk_core::store::Cell;
use formdesk_core::{ErrorCode, ServiceError};
use std::sync::Arc;

#[tokio::test]
async fn test_register_returns_generated_credentials() {
    let harness = Harness::new().await;

    let registration = harness.register("a@example.com").await;

    assert_eq!(registration.access_id.len(), 5);
    assert!(registration
        .access_id
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    assert_eq!(registration.password.len(), 5);
    assert!(registration
        .password
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
}

#[tokio::test]
async fn test_register_writes_one_row() {
    let harness = Harness::new().await;
    let registration = harness.register("a@example.com").await;

    let rows = harness.rows(users::TABLE).await;
    assert_eq!(rows.len(), 2);

    let row = &rows[1];
    assert_eq!(row[users::ACCESS_ID - 1].as_str(), registration.access_id);
    assert_eq!(row[users::ACCOUNT - 1].as_str(), "a@example.com");
    assert_eq!(row[users::AUTO_LOGIN - 1], Cell::Bool(false));
    assert!(row[users::SESSION_TOKEN - 1].is_blank());
    assert!(row[users::SESSION_TOKEN].is_blank());

    let registered_at = row[users::REGISTERED_AT - 1].as_timestamp();
    assert!(registered_at.is_some());
    assert_eq!(registered_at, row[users::LAST_LOGIN_AT - 1].as_timestamp());
}

#[tokio::test]
async fn test_password_is_stored_hashed() {
    let harness = Harness::new().await;
    let registration = harness.register("a@example.com").await;

    let rows = harness.rows(users::TABLE).await;
    let stored = rows[1][users::PASSWORD - 1].as_str();

    assert_ne!(stored, registration.password);
    assert!(is_password_hash(stored));
    assert!(verify_password(&registration.password, stored).unwrap());
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let harness = Harness::new().await;
    harness.register("a@example.com").await;

    let result = harness.services.directory.register("a@example.com").await;
    assert_eq!(result, Err(ServiceError::Duplicate("a@example.com".to_string())));
    assert_eq!(harness.rows(users::TABLE).await.len(), 2);
}

#[tokio::test]
async fn test_email_match_is_case_sensitive() {
    let harness = Harness::new().await;
    harness.register("a@example.com").await;
    harness.register("A@example.com").await;

    assert_eq!(harness.rows(users::TABLE).await.len(), 3);
}

#[tokio::test]
async fn test_invalid_emails() {
    let harness = Harness::new().await;

    for email in ["", "not-an-email", "a@b", "a @example.com"] {
        let err = harness.services.directory.register(email).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError, "email {:?}", email);
    }
    assert_eq!(harness.rows(users::TABLE).await.len(), 1);
}

#[tokio::test]
async fn test_register_before_setup() {
    let harness = Harness::unprovisioned();

    let result = harness.services.directory.register("a@example.com").await;
    assert_eq!(result, Err(ServiceError::NotInitialized));
}

#[tokio::test]
async fn test_register_against_missing_store() {
    let harness = Harness::with_config(ServiceConfig {
        store_id: Some("does-not-exist".to_string()),
        ..test_config()
    });

    let result = harness.services.directory.register("a@example.com").await;
    assert_eq!(result, Err(ServiceError::NotInitialized));
}

#[tokio::test]
async fn test_register_without_users_table() {
    use formdesk_core::store::RowStore;

    let harness = Harness::new().await;
    let store_id = harness.store_id().await;
    harness
        .store
        .delete_table(&store_id, users::TABLE)
        .await
        .unwrap();

    let err = harness
        .services
        .directory
        .register("a@example.com")
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::SchemaError);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_registrations() {
    let harness = Arc::new(Harness::new().await);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let services = harness.services.clone();
            tokio::spawn(async move { services.directory.register("race@example.com").await })
        })
        .collect();

    let results: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("task should not panic"))
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let duplicates = results
        .iter()
        .filter(|r| matches!(r, Err(ServiceError::Duplicate(_))))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(duplicates, 7);
    assert_eq!(harness.rows(users::TABLE).await.len(), 2);
}
