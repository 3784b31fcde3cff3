/// Table layout and store setup
///
/// The store holds exactly three tables. Their header rows are fixed per
/// schema version; columns are addressed by the constants below, except the
/// remember-token column which is resolved by its header label because legacy
/// stores may have it at a different position.
///
/// [`setup_store`] is idempotent. Run it at startup (or from the admin route)
/// before any service call: it creates whatever is missing, removes foreign
/// tables, and migrates legacy stores to the current version:
///
/// - a Users header without `rememberToken` gets the column appended
/// - plaintext password cells are replaced by their Argon2id hash
/// - plaintext remember tokens are replaced by their SHA-256 digest

use crate::auth::password::{hash_password, is_password_hash};
use crate::auth::token::{digest_remember_token, is_remember_digest};
use crate::config::PasswordParams;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{header_row, Cell, Mutation, Plan, RowStore, Table};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Title given to newly created stores
pub const STORE_TITLE: &str = "FormDesk DB";

/// Current schema version
pub const SCHEMA_VERSION: u32 = 2;

/// Settings key recording the schema version
pub const SCHEMA_VERSION_KEY: &str = "schema:version";

/// Settings key prefix for template registrations
pub const TEMPLATE_KEY_PREFIX: &str = "template:";

/// Users table
pub mod users {
    pub const TABLE: &str = "Users";

    pub const HEADER: [&str; 8] = [
        "accessId",
        "password",
        "account",
        "registeredAt",
        "lastLoginAt",
        "autoLoginFlag",
        "sessionToken",
        REMEMBER_TOKEN_LABEL,
    ];

    pub const ACCESS_ID: usize = 1;
    pub const PASSWORD: usize = 2;
    pub const ACCOUNT: usize = 3;
    pub const REGISTERED_AT: usize = 4;
    pub const LAST_LOGIN_AT: usize = 5;
    pub const AUTO_LOGIN: usize = 6;
    pub const SESSION_TOKEN: usize = 7;

    /// Header label of the remember-token column
    pub const REMEMBER_TOKEN_LABEL: &str = "rememberToken";
}

/// Instances table
pub mod instances {
    pub const TABLE: &str = "Instances";

    pub const HEADER: [&str; 6] = [
        "ownerAccessId",
        "ownerAccount",
        "templateType",
        "instanceId",
        "instanceUrl",
        "createdAt",
    ];

    pub const OWNER_ACCESS_ID: usize = 1;
    pub const OWNER_ACCOUNT: usize = 2;
    pub const TEMPLATE_TYPE: usize = 3;
    pub const INSTANCE_ID: usize = 4;
    pub const INSTANCE_URL: usize = 5;
    pub const CREATED_AT: usize = 6;
}

/// Settings table
pub mod settings {
    pub const TABLE: &str = "Settings";

    pub const HEADER: [&str; 2] = ["key", "value"];

    pub const KEY: usize = 1;
    pub const VALUE: usize = 2;
}

/// Every table the store should contain, with its header
pub const TABLES: [(&str, &[&str]); 3] = [
    (users::TABLE, &users::HEADER),
    (instances::TABLE, &instances::HEADER),
    (settings::TABLE, &settings::HEADER),
];

/// What [`setup_store`] did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupReport {
    /// Id of the store, to be passed to the services
    pub store_id: String,

    /// Whether a new store was created
    pub created: bool,

    /// Tables that were created during this run
    pub created_tables: Vec<String>,

    /// Unexpected tables that were removed
    pub deleted_tables: Vec<String>,

    /// Whether the remember-token column had to be added to Users
    pub added_remember_column: bool,

    /// Number of plaintext passwords replaced by hashes
    pub hashed_passwords: usize,

    /// Number of plaintext remember tokens replaced by digests
    pub digested_remember_tokens: usize,

    /// Schema version now recorded in Settings
    pub schema_version: u32,
}

/// Opens or creates the store and brings it to the current schema
///
/// If `existing_store_id` names an existing store it is reused; otherwise a new
/// store titled [`STORE_TITLE`] is created.
///
/// # Errors
///
/// Returns `ServiceError::System` on storage or hashing failures
pub async fn setup_store(
    store: &dyn RowStore,
    existing_store_id: Option<&str>,
    password_params: &PasswordParams,
) -> ServiceResult<SetupReport> {
    let (store_id, created) = open_or_create(store, existing_store_id).await?;

    let mut created_tables = Vec::new();
    let present = store.list_tables(&store_id).await?;
    for (name, header) in TABLES {
        if !present.iter().any(|t| t == name) {
            store.create_table(&store_id, name).await?;
            created_tables.push(name.to_string());
        }
        write_header_if_empty(Table::new(store, &store_id, name), header).await?;
    }

    let mut deleted_tables = Vec::new();
    for name in present {
        if !TABLES.iter().any(|(expected, _)| *expected == name) {
            warn!(store_id = %store_id, table = %name, "Deleting unexpected table");
            store.delete_table(&store_id, &name).await?;
            deleted_tables.push(name);
        }
    }

    let users_table = Table::new(store, &store_id, users::TABLE);
    let added_remember_column = add_remember_column(users_table).await?;
    let hashed_passwords = hash_legacy_passwords(users_table, password_params).await?;
    let digested_remember_tokens = digest_legacy_remember_tokens(users_table).await?;

    record_schema_version(Table::new(store, &store_id, settings::TABLE)).await?;

    info!(
        store_id = %store_id,
        created,
        created_tables = created_tables.len(),
        deleted_tables = deleted_tables.len(),
        added_remember_column,
        hashed_passwords,
        digested_remember_tokens,
        schema_version = SCHEMA_VERSION,
        "Store setup complete"
    );

    Ok(SetupReport {
        store_id,
        created,
        created_tables,
        deleted_tables,
        added_remember_column,
        hashed_passwords,
        digested_remember_tokens,
        schema_version: SCHEMA_VERSION,
    })
}

async fn open_or_create(
    store: &dyn RowStore,
    existing_store_id: Option<&str>,
) -> ServiceResult<(String, bool)> {
    if let Some(id) = existing_store_id.filter(|id| !id.is_empty()) {
        if store.store_exists(id).await? {
            debug!(store_id = %id, "Reusing existing store");
            return Ok((id.to_string(), false));
        }
        warn!(store_id = %id, "Configured store does not exist, creating a new one");
    }

    let id = store.create_store(STORE_TITLE).await?;
    info!(store_id = %id, title = STORE_TITLE, "Created store");
    Ok((id, true))
}

async fn write_header_if_empty(table: Table<'_>, header: &[&str]) -> ServiceResult<()> {
    table
        .transact(|snapshot| {
            if snapshot.rows.is_empty() {
                Ok::<_, ServiceError>(Plan::Commit(vec![Mutation::Append(header_row(header))], ()))
            } else {
                Ok(Plan::Done(()))
            }
        })
        .await
}

async fn add_remember_column(users_table: Table<'_>) -> ServiceResult<bool> {
    let added = users_table
        .transact(|snapshot| {
            if snapshot.column_index(users::REMEMBER_TOKEN_LABEL).is_some() {
                return Ok::<_, ServiceError>(Plan::Done(false));
            }
            // Legacy headers stop at sessionToken; never place the new column
            // on top of one of the fixed ones.
            let col = (snapshot.header().len() + 1).max(users::SESSION_TOKEN + 1);
            Ok(Plan::Commit(
                vec![Mutation::set(1, col, users::REMEMBER_TOKEN_LABEL)],
                true,
            ))
        })
        .await?;

    if added {
        info!("Migrated Users header: added rememberToken column");
    }
    Ok(added)
}

async fn hash_legacy_passwords(
    users_table: Table<'_>,
    params: &PasswordParams,
) -> ServiceResult<usize> {
    users_table
        .transact(|snapshot| -> ServiceResult<Plan<usize>> {
            let mut mutations = Vec::new();
            for (row_number, _) in snapshot.data_rows() {
                let stored = snapshot.cell(row_number, users::PASSWORD).as_str();
                if stored.is_empty() || is_password_hash(stored) {
                    continue;
                }
                let hash = hash_password(stored, params).map_err(|e| {
                    ServiceError::system(format!("hashing legacy password: {}", e))
                })?;
                mutations.push(Mutation::set(row_number, users::PASSWORD, hash));
            }

            if mutations.is_empty() {
                Ok(Plan::Done(0))
            } else {
                let count = mutations.len();
                info!(count, "Hashing legacy plaintext passwords");
                Ok(Plan::Commit(mutations, count))
            }
        })
        .await
}

async fn digest_legacy_remember_tokens(users_table: Table<'_>) -> ServiceResult<usize> {
    users_table
        .transact(|snapshot| -> ServiceResult<Plan<usize>> {
            let Some(col) = snapshot.column_index(users::REMEMBER_TOKEN_LABEL) else {
                return Ok(Plan::Done(0));
            };

            let mutations: Vec<Mutation> = snapshot
                .data_rows()
                .filter_map(|(row_number, _)| {
                    let stored = snapshot.cell(row_number, col).as_str();
                    if stored.is_empty() || is_remember_digest(stored) {
                        None
                    } else {
                        Some(Mutation::set(row_number, col, digest_remember_token(stored)))
                    }
                })
                .collect();

            if mutations.is_empty() {
                Ok(Plan::Done(0))
            } else {
                let count = mutations.len();
                info!(count, "Digesting legacy plaintext remember tokens");
                Ok(Plan::Commit(mutations, count))
            }
        })
        .await
}

async fn record_schema_version(settings_table: Table<'_>) -> ServiceResult<()> {
    let version = Cell::text(SCHEMA_VERSION.to_string());
    settings_table
        .transact(|snapshot| {
            let existing = snapshot
                .data_rows()
                .find(|(_, row)| row.first().map(Cell::as_str) == Some(SCHEMA_VERSION_KEY))
                .map(|(row_number, _)| row_number);

            let plan = match existing {
                Some(row) if snapshot.cell(row, settings::VALUE) == &version => Plan::Done(()),
                Some(row) => Plan::Commit(vec![Mutation::set(row, settings::VALUE, version.clone())], ()),
                None => Plan::Commit(
                    vec![Mutation::Append(vec![Cell::text(SCHEMA_VERSION_KEY), version.clone()])],
                    (),
                ),
            };
            Ok::<_, ServiceError>(plan)
        })
        .await
}
