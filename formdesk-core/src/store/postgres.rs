/// PostgreSQL row store
///
/// Stores rows as JSONB cell arrays. Schema (see `migrations/`):
///
/// ```sql
/// CREATE TABLE row_stores (id TEXT PRIMARY KEY, title TEXT NOT NULL, created_at TIMESTAMPTZ);
/// CREATE TABLE row_tables (
///     id BIGSERIAL PRIMARY KEY,
///     store_id TEXT NOT NULL REFERENCES row_stores(id) ON DELETE CASCADE,
///     name TEXT NOT NULL,
///     position INTEGER NOT NULL,
///     revision BIGINT NOT NULL DEFAULT 0,
///     UNIQUE (store_id, name)
/// );
/// CREATE TABLE row_table_rows (
///     table_id BIGINT NOT NULL REFERENCES row_tables(id) ON DELETE CASCADE,
///     row_index INTEGER NOT NULL,
///     cells JSONB NOT NULL,
///     PRIMARY KEY (table_id, row_index)
/// );
/// ```
///
/// A commit locks the `row_tables` row with `SELECT ... FOR UPDATE`, compares
/// the revision, rewrites the affected rows and bumps the revision in one
/// transaction.
///
/// # Example
///
/// ```no_run
/// use formdesk_core::db::pool::{create_pool, DatabaseConfig};
/// use formdesk_core::store::{PgRowStore, RowStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
///
/// let store = PgRowStore::new(pool);
/// let store_id = store.create_store("FormDesk DB").await?;
/// # Ok(())
/// # }
/// ```

use crate::store::{
    apply_mutations, CommitOutcome, Mutation, Row, RowStore, StoreError, StoreResult,
    TableSnapshot,
};
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use tracing::debug;
use uuid::Uuid;

/// PostgreSQL-backed [`RowStore`]
#[derive(Clone)]
pub struct PgRowStore {
    pool: PgPool,
}

impl PgRowStore {
    /// Wraps an existing pool; run migrations before first use
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn require_store(&self, store_id: &str) -> StoreResult<()> {
        if self.store_exists(store_id).await? {
            Ok(())
        } else {
            Err(StoreError::StoreNotFound(store_id.to_string()))
        }
    }
}

#[async_trait]
impl RowStore for PgRowStore {
    async fn create_store(&self, title: &str) -> StoreResult<String> {
        let id = Uuid::new_v4().simple().to_string();
        sqlx::query("INSERT INTO row_stores (id, title) VALUES ($1, $2)")
            .bind(&id)
            .bind(title)
            .execute(&self.pool)
            .await?;

        debug!(store_id = %id, title, "Created row store");
        Ok(id)
    }

    async fn store_exists(&self, store_id: &str) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM row_stores WHERE id = $1)")
                .bind(store_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn list_tables(&self, store_id: &str) -> StoreResult<Vec<String>> {
        self.require_store(store_id).await?;
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM row_tables WHERE store_id = $1 ORDER BY position",
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    async fn create_table(&self, store_id: &str, name: &str) -> StoreResult<()> {
        self.require_store(store_id).await?;
        sqlx::query(
            r#"
            INSERT INTO row_tables (store_id, name, position)
            SELECT $1, $2, COALESCE(MAX(position), 0) + 1
            FROM row_tables
            WHERE store_id = $1
            ON CONFLICT (store_id, name) DO NOTHING
            "#,
        )
        .bind(store_id)
        .bind(name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_table(&self, store_id: &str, name: &str) -> StoreResult<()> {
        self.require_store(store_id).await?;
        sqlx::query("DELETE FROM row_tables WHERE store_id = $1 AND name = $2")
            .bind(store_id)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn snapshot(&self, store_id: &str, table: &str) -> StoreResult<Option<TableSnapshot>> {
        self.require_store(store_id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;

        let found: Option<(i64, i64)> = sqlx::query_as(
            "SELECT id, revision FROM row_tables WHERE store_id = $1 AND name = $2",
        )
        .bind(store_id)
        .bind(table)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((table_id, revision)) = found else {
            return Ok(None);
        };

        let rows: Vec<Json<Row>> = sqlx::query_scalar(
            "SELECT cells FROM row_table_rows WHERE table_id = $1 ORDER BY row_index",
        )
        .bind(table_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(TableSnapshot {
            revision: revision as u64,
            rows: rows.into_iter().map(|Json(row)| row).collect(),
        }))
    }

    async fn commit(
        &self,
        store_id: &str,
        table: &str,
        expected_revision: u64,
        mutations: Vec<Mutation>,
    ) -> StoreResult<CommitOutcome> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<(i64, i64)> = sqlx::query_as(
            "SELECT id, revision FROM row_tables WHERE store_id = $1 AND name = $2 FOR UPDATE",
        )
        .bind(store_id)
        .bind(table)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((table_id, revision)) = locked else {
            return Err(StoreError::TableNotFound(table.to_string()));
        };

        if revision as u64 != expected_revision {
            return Ok(CommitOutcome::Conflict {
                current: revision as u64,
            });
        }
        if mutations.is_empty() {
            return Ok(CommitOutcome::Applied {
                revision: revision as u64,
            });
        }

        let current: Vec<Json<Row>> = sqlx::query_scalar(
            "SELECT cells FROM row_table_rows WHERE table_id = $1 ORDER BY row_index",
        )
        .bind(table_id)
        .fetch_all(&mut *tx)
        .await?;
        let current: Vec<Row> = current.into_iter().map(|Json(row)| row).collect();

        let next = apply_mutations(&current, mutations)?;

        // Only rewrite rows that were added or changed
        for (idx, row) in next.iter().enumerate() {
            if current.get(idx) == Some(row) {
                continue;
            }
            sqlx::query(
                r#"
                INSERT INTO row_table_rows (table_id, row_index, cells)
                VALUES ($1, $2, $3)
                ON CONFLICT (table_id, row_index) DO UPDATE SET cells = EXCLUDED.cells
                "#,
            )
            .bind(table_id)
            .bind((idx + 1) as i32)
            .bind(Json(row))
            .execute(&mut *tx)
            .await?;
        }

        let new_revision: i64 = sqlx::query_scalar(
            "UPDATE row_tables SET revision = revision + 1 WHERE id = $1 RETURNING revision",
        )
        .bind(table_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(CommitOutcome::Applied {
            revision: new_revision as u64,
        })
    }
}
