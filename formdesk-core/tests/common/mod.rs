//! Shared fixtures for the core integration tests
//!
//! Everything runs against the in-memory row store and document provider with
//! cheap Argon2 parameters.

#![allow(dead_code)]

use formdesk_core::config::{PasswordParams, ServiceConfig};
use formdesk_core::provider::MemoryDocumentProvider;
use formdesk_core::services::{PasswordLogin, Registration, Services};
use formdesk_core::store::{MemoryRowStore, Row, Table};
use std::sync::Arc;

pub const TEMPLATE_SOURCE_ID: &str = "tmpl-survey";

pub fn test_config() -> ServiceConfig {
    ServiceConfig::default().with_password_params(PasswordParams::fast())
}

pub struct Harness {
    pub services: Services,
    pub store: Arc<MemoryRowStore>,
    pub provider: Arc<MemoryDocumentProvider>,
}

impl Harness {
    /// Services over an empty backend, setup not run
    pub fn unprovisioned() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        let store = Arc::new(MemoryRowStore::new());
        let provider = Arc::new(MemoryDocumentProvider::new());
        let services = Services::new(store.clone(), provider.clone(), config);
        Self {
            services,
            store,
            provider,
        }
    }

    /// Services over a freshly set up store
    pub async fn new() -> Self {
        let harness = Self::unprovisioned();
        harness.services.setup().await.expect("setup should succeed");
        harness
    }

    /// Set up store with one registered template ("survey")
    pub async fn with_template() -> Self {
        let harness = Self::new().await;
        harness
            .provider
            .insert_resource(TEMPLATE_SOURCE_ID, "Survey template")
            .await;
        harness
            .services
            .provisioning
            .register_template("survey", TEMPLATE_SOURCE_ID)
            .await
            .expect("template registration should succeed");
        harness
    }

    pub async fn store_id(&self) -> String {
        self.services
            .context()
            .current_store_id()
            .await
            .expect("store should be set up")
    }

    /// Raw rows of a table, header first
    pub async fn rows(&self, table: &str) -> Vec<Row> {
        let store_id = self.store_id().await;
        Table::new(self.store.as_ref(), &store_id, table)
            .rows()
            .await
            .expect("table should exist")
    }

    pub async fn register(&self, email: &str) -> Registration {
        self.services
            .directory
            .register(email)
            .await
            .expect("registration should succeed")
    }

    pub async fn register_and_login(&self, email: &str) -> (Registration, PasswordLogin) {
        let registration = self.register(email).await;
        let login = self
            .services
            .auth
            .authenticate_by_password(&registration.access_id, &registration.password)
            .await
            .expect("login should succeed");
        (registration, login)
    }
}
