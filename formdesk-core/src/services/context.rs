/// Shared service context
///
/// Holds the row store, the configuration, and the id of the active store.
/// The id starts out as [`ServiceConfig::store_id`] and is replaced when setup
/// runs, so every service cloned from the same context sees the new store.

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{RowStore, Table, TableSnapshot};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

#[derive(Clone)]
pub struct StoreContext {
    store: Arc<dyn RowStore>,
    config: Arc<ServiceConfig>,
    store_id: Arc<RwLock<Option<String>>>,
}

impl StoreContext {
    pub fn new(store: Arc<dyn RowStore>, config: ServiceConfig) -> Self {
        let store_id = config.store_id.clone().filter(|id| !id.is_empty());
        Self {
            store,
            config: Arc::new(config),
            store_id: Arc::new(RwLock::new(store_id)),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn RowStore {
        self.store.as_ref()
    }

    /// Active store id, if one has been configured or set up
    pub async fn current_store_id(&self) -> Option<String> {
        self.store_id.read().await.clone()
    }

    pub(crate) async fn set_store_id(&self, store_id: String) {
        *self.store_id.write().await = Some(store_id);
    }

    /// Active store id, checked against the backend
    ///
    /// # Errors
    ///
    /// `ServiceError::NotInitialized` when no store is configured or the
    /// configured one no longer exists
    pub(crate) async fn store_id(&self) -> ServiceResult<String> {
        let store_id = self
            .current_store_id()
            .await
            .ok_or(ServiceError::NotInitialized)?;

        if !self.store.store_exists(&store_id).await? {
            warn!(store_id = %store_id, "Configured store does not exist");
            return Err(ServiceError::NotInitialized);
        }
        Ok(store_id)
    }

    /// Table handle using the configured commit bound
    pub(crate) fn table<'a>(&'a self, store_id: &'a str, name: &'a str) -> Table<'a> {
        Table::new(self.store.as_ref(), store_id, name)
            .with_max_attempts(self.config.max_commit_attempts)
    }
}

/// Fails with `ServiceError::Schema` if the table has lost its header row
pub(crate) fn require_header(snapshot: &TableSnapshot, table: &str) -> ServiceResult<()> {
    if snapshot.rows.is_empty() {
        return Err(ServiceError::Schema(format!("table {} has no header row", table)));
    }
    Ok(())
}
