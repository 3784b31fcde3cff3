/// Integration tests for store setup and legacy migrations

mod common;

use common::{test_config, Harness};
use formdesk_core::auth::password::is_password_hash;
use formdesk_core::auth::token::digest_remember_token;
use formdesk_core::config::ServiceConfig;
use formdesk_core::schema::{settings, users, SCHEMA_VERSION, SCHEMA_VERSION_KEY, STORE_TITLE};
use formdesk_core::services::Services;
use formdesk_core::store::{header_row, Cell, RowStore, Table};

#[tokio::test]
async fn test_setup_creates_three_tables() {
    let harness = Harness::unprovisioned();
    let report = harness.services.setup().await.unwrap();

    assert!(report.created);
    assert_eq!(report.schema_version, SCHEMA_VERSION);
    assert_eq!(
        harness.store.list_tables(&report.store_id).await.unwrap(),
        vec!["Users", "Instances", "Settings"]
    );
    assert_eq!(
        harness.store.store_title(&report.store_id).await.as_deref(),
        Some(STORE_TITLE)
    );
    assert_eq!(
        harness.services.context().current_store_id().await,
        Some(report.store_id)
    );
}

#[tokio::test]
async fn test_setup_is_idempotent() {
    let harness = Harness::new().await;
    harness.register("a@example.com").await;
    let store_id = harness.store_id().await;
    let users_before = harness.rows(users::TABLE).await;
    let settings_before = harness.rows(settings::TABLE).await;

    let report = harness.services.setup().await.unwrap();

    assert!(!report.created);
    assert_eq!(report.store_id, store_id);
    assert!(report.created_tables.is_empty());
    assert!(report.deleted_tables.is_empty());
    assert!(!report.added_remember_column);
    assert_eq!(report.hashed_passwords, 0);
    assert_eq!(report.digested_remember_tokens, 0);
    assert_eq!(harness.rows(users::TABLE).await, users_before);
    assert_eq!(harness.rows(settings::TABLE).await, settings_before);
}

#[tokio::test]
async fn test_setup_deletes_unexpected_tables() {
    let harness = Harness::new().await;
    let store_id = harness.store_id().await;
    harness.store.create_table(&store_id, "Sheet1").await.unwrap();

    let report = harness.services.setup().await.unwrap();

    assert_eq!(report.deleted_tables, vec!["Sheet1".to_string()]);
    assert!(!harness
        .store
        .list_tables(&store_id)
        .await
        .unwrap()
        .contains(&"Sheet1".to_string()));
}

#[tokio::test]
async fn test_setup_restores_missing_table() {
    let harness = Harness::new().await;
    let store_id = harness.store_id().await;
    harness.store.delete_table(&store_id, "Instances").await.unwrap();

    let report = harness.services.setup().await.unwrap();

    assert_eq!(report.created_tables, vec!["Instances".to_string()]);
    assert_eq!(harness.rows("Instances").await.len(), 1);
}

#[tokio::test]
async fn test_setup_migrates_legacy_store() {
    let harness = Harness::unprovisioned();
    let store = harness.store.as_ref();

    // Version 1 layout: seven columns, plaintext passwords, no version key
    let store_id = store.create_store("legacy").await.unwrap();
    store.create_table(&store_id, users::TABLE).await.unwrap();
    let users_table = Table::new(store, &store_id, users::TABLE);
    users_table
        .append_row(header_row(&users::HEADER[..7]))
        .await
        .unwrap();
    users_table
        .append_row(vec![
            Cell::text("AB12C"),
            Cell::text("k3x9q"),
            Cell::text("legacy@example.com"),
            Cell::Empty,
            Cell::Empty,
            Cell::Bool(false),
            Cell::text(""),
        ])
        .await
        .unwrap();

    let services = Services::new(
        harness.store.clone(),
        harness.provider.clone(),
        ServiceConfig {
            store_id: Some(store_id.clone()),
            ..test_config()
        },
    );

    let report = services.setup().await.unwrap();
    assert!(!report.created);
    assert!(report.added_remember_column);
    assert_eq!(report.hashed_passwords, 1);

    let snapshot = users_table.snapshot().await.unwrap();
    assert_eq!(snapshot.column_index(users::REMEMBER_TOKEN_LABEL), Some(8));
    assert!(is_password_hash(snapshot.cell(2, users::PASSWORD).as_str()));

    let settings_rows = Table::new(store, &store_id, settings::TABLE)
        .rows()
        .await
        .unwrap();
    assert!(settings_rows.iter().any(|row| {
        row[0].as_str() == SCHEMA_VERSION_KEY && row[1].as_str() == SCHEMA_VERSION.to_string()
    }));

    // The legacy credentials keep working, and remember tokens now have a column
    let login = services
        .auth
        .authenticate_by_password("AB12C", "k3x9q")
        .await
        .unwrap();
    assert_eq!(login.email, "legacy@example.com");
    services
        .auth
        .save_remember_token("AB12C", "remember")
        .await
        .unwrap();

    let second = services.setup().await.unwrap();
    assert!(!second.added_remember_column);
    assert_eq!(second.hashed_passwords, 0);
}

#[tokio::test]
async fn test_setup_digests_legacy_remember_tokens() {
    let harness = Harness::unprovisioned();
    let store = harness.store.as_ref();

    // Remember column already present, token stored in plaintext
    let store_id = store.create_store("legacy").await.unwrap();
    store.create_table(&store_id, users::TABLE).await.unwrap();
    let users_table = Table::new(store, &store_id, users::TABLE);
    users_table
        .append_row(header_row(&users::HEADER))
        .await
        .unwrap();
    users_table
        .append_row(vec![
            Cell::text("AB12C"),
            Cell::text("k3x9q"),
            Cell::text("legacy@example.com"),
            Cell::Empty,
            Cell::Empty,
            Cell::Bool(true),
            Cell::text(""),
            Cell::text("0b8d1c9e-legacy-token"),
        ])
        .await
        .unwrap();
    users_table
        .append_row(vec![
            Cell::text("ZZ99Z"),
            Cell::text("p4ss1"),
            Cell::text("other@example.com"),
            Cell::Empty,
            Cell::Empty,
            Cell::Bool(false),
            Cell::text(""),
            Cell::Empty,
        ])
        .await
        .unwrap();

    let services = Services::new(
        harness.store.clone(),
        harness.provider.clone(),
        ServiceConfig {
            store_id: Some(store_id.clone()),
            ..test_config()
        },
    );

    let report = services.setup().await.unwrap();
    assert!(!report.added_remember_column);
    assert_eq!(report.hashed_passwords, 2);
    assert_eq!(report.digested_remember_tokens, 1);

    let snapshot = users_table.snapshot().await.unwrap();
    assert_eq!(
        snapshot.cell(2, 8).as_str(),
        digest_remember_token("0b8d1c9e-legacy-token")
    );
    assert!(snapshot.cell(3, 8).is_blank());

    let login = services
        .auth
        .authenticate_by_remember_token("0b8d1c9e-legacy-token")
        .await
        .unwrap();
    assert_eq!(login.user_id, "AB12C");
    assert_eq!(login.email, "legacy@example.com");

    let second = services.setup().await.unwrap();
    assert_eq!(second.digested_remember_tokens, 0);
    assert_eq!(
        users_table.snapshot().await.unwrap().cell(2, 8).as_str(),
        digest_remember_token("0b8d1c9e-legacy-token")
    );
}
