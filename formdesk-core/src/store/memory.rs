/// In-memory row store
///
/// Keeps every store in a map guarded by a tokio mutex. Commits are atomic
/// because the whole map is locked for their duration. Contents are lost when
/// the process exits.

use crate::store::{
    apply_mutations, CommitOutcome, Mutation, Row, RowStore, StoreError, StoreResult,
    TableSnapshot,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

struct MemoryTable {
    name: String,
    revision: u64,
    rows: Vec<Row>,
}

struct MemoryStore {
    title: String,
    tables: Vec<MemoryTable>,
}

impl MemoryStore {
    fn table(&self, name: &str) -> Option<&MemoryTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    fn table_mut(&mut self, name: &str) -> Option<&mut MemoryTable> {
        self.tables.iter_mut().find(|t| t.name == name)
    }
}

/// In-memory [`RowStore`] implementation
pub struct MemoryRowStore {
    stores: Mutex<HashMap<String, MemoryStore>>,
}

impl MemoryRowStore {
    /// Creates an empty instance with no stores
    pub fn new() -> Self {
        Self {
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Title a store was created with
    pub async fn store_title(&self, store_id: &str) -> Option<String> {
        let stores = self.stores.lock().await;
        stores.get(store_id).map(|s| s.title.clone())
    }
}

impl Default for MemoryRowStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RowStore for MemoryRowStore {
    async fn create_store(&self, title: &str) -> StoreResult<String> {
        let id = Uuid::new_v4().simple().to_string();
        let mut stores = self.stores.lock().await;
        stores.insert(
            id.clone(),
            MemoryStore {
                title: title.to_string(),
                tables: Vec::new(),
            },
        );
        debug!(store_id = %id, title, "Created in-memory store");
        Ok(id)
    }

    async fn store_exists(&self, store_id: &str) -> StoreResult<bool> {
        let stores = self.stores.lock().await;
        Ok(stores.contains_key(store_id))
    }

    async fn list_tables(&self, store_id: &str) -> StoreResult<Vec<String>> {
        let stores = self.stores.lock().await;
        let store = stores
            .get(store_id)
            .ok_or_else(|| StoreError::StoreNotFound(store_id.to_string()))?;
        Ok(store.tables.iter().map(|t| t.name.clone()).collect())
    }

    async fn create_table(&self, store_id: &str, name: &str) -> StoreResult<()> {
        let mut stores = self.stores.lock().await;
        let store = stores
            .get_mut(store_id)
            .ok_or_else(|| StoreError::StoreNotFound(store_id.to_string()))?;
        if store.table(name).is_none() {
            store.tables.push(MemoryTable {
                name: name.to_string(),
                revision: 0,
                rows: Vec::new(),
            });
        }
        Ok(())
    }

    async fn delete_table(&self, store_id: &str, name: &str) -> StoreResult<()> {
        let mut stores = self.stores.lock().await;
        let store = stores
            .get_mut(store_id)
            .ok_or_else(|| StoreError::StoreNotFound(store_id.to_string()))?;
        store.tables.retain(|t| t.name != name);
        Ok(())
    }

    async fn snapshot(&self, store_id: &str, table: &str) -> StoreResult<Option<TableSnapshot>> {
        let stores = self.stores.lock().await;
        let store = stores
            .get(store_id)
            .ok_or_else(|| StoreError::StoreNotFound(store_id.to_string()))?;
        Ok(store.table(table).map(|t| TableSnapshot {
            revision: t.revision,
            rows: t.rows.clone(),
        }))
    }

    async fn commit(
        &self,
        store_id: &str,
        table: &str,
        expected_revision: u64,
        mutations: Vec<Mutation>,
    ) -> StoreResult<CommitOutcome> {
        let mut stores = self.stores.lock().await;
        let store = stores
            .get_mut(store_id)
            .ok_or_else(|| StoreError::StoreNotFound(store_id.to_string()))?;
        let target = store
            .table_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

        if target.revision != expected_revision {
            return Ok(CommitOutcome::Conflict {
                current: target.revision,
            });
        }
        if mutations.is_empty() {
            return Ok(CommitOutcome::Applied {
                revision: target.revision,
            });
        }

        target.rows = apply_mutations(&target.rows, mutations)?;
        target.revision += 1;

        Ok(CommitOutcome::Applied {
            revision: target.revision,
        })
    }
}
