/// In-memory document provider
///
/// Keeps resources, titles and grants in a map. Clones get fresh UUID ids.
/// Grants can be made to fail on demand so callers can exercise their
/// best-effort handling.

use super::{DocumentProvider, ProviderError, ProviderResult, ResourceRef};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Public URL prefix of in-memory resources
const PUBLIC_URL_BASE: &str = "memory://resources";

#[derive(Debug, Clone)]
struct MemoryResource {
    name: String,
    source_id: Option<String>,
    editors: Vec<String>,
}

/// In-memory [`DocumentProvider`]
#[derive(Debug, Default)]
pub struct MemoryDocumentProvider {
    resources: Mutex<HashMap<String, MemoryResource>>,
    fail_grants: AtomicBool,
}

impl MemoryDocumentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source resource
    pub async fn insert_resource(&self, id: &str, name: &str) {
        self.resources.lock().await.insert(
            id.to_string(),
            MemoryResource {
                name: name.to_string(),
                source_id: None,
                editors: Vec::new(),
            },
        );
    }

    /// Makes every subsequent grant fail (or succeed again)
    pub fn set_fail_grants(&self, fail: bool) {
        self.fail_grants.store(fail, Ordering::SeqCst);
    }

    /// Title of a resource
    pub async fn resource_name(&self, id: &str) -> Option<String> {
        self.resources.lock().await.get(id).map(|r| r.name.clone())
    }

    /// Source a clone was copied from
    pub async fn source_of(&self, id: &str) -> Option<String> {
        self.resources
            .lock()
            .await
            .get(id)
            .and_then(|r| r.source_id.clone())
    }

    /// Principals holding edit rights on a resource
    pub async fn editors(&self, id: &str) -> Vec<String> {
        self.resources
            .lock()
            .await
            .get(id)
            .map(|r| r.editors.clone())
            .unwrap_or_default()
    }

    /// Number of resources, sources and clones together
    pub async fn resource_count(&self) -> usize {
        self.resources.lock().await.len()
    }
}

#[async_trait]
impl DocumentProvider for MemoryDocumentProvider {
    fn name(&self) -> &str {
        "memory"
    }

    async fn open_by_id(&self, id: &str) -> ProviderResult<ResourceRef> {
        let resources = self.resources.lock().await;
        let resource = resources
            .get(id)
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))?;

        Ok(ResourceRef {
            id: id.to_string(),
            name: Some(resource.name.clone()),
        })
    }

    async fn clone_as_new_resource(&self, source_id: &str, title: &str) -> ProviderResult<ResourceRef> {
        let mut resources = self.resources.lock().await;
        if !resources.contains_key(source_id) {
            return Err(ProviderError::NotFound(source_id.to_string()));
        }

        let id = Uuid::new_v4().simple().to_string();
        resources.insert(
            id.clone(),
            MemoryResource {
                name: title.to_string(),
                source_id: Some(source_id.to_string()),
                editors: Vec::new(),
            },
        );
        debug!(source_id, resource_id = %id, "Cloned in-memory resource");

        Ok(ResourceRef {
            id,
            name: Some(title.to_string()),
        })
    }

    async fn grant_edit_access(&self, resource_id: &str, principal: &str) -> ProviderResult<()> {
        if self.fail_grants.load(Ordering::SeqCst) {
            return Err(ProviderError::Rejected {
                status: 403,
                message: "sharing disabled".to_string(),
            });
        }

        let mut resources = self.resources.lock().await;
        let resource = resources
            .get_mut(resource_id)
            .ok_or_else(|| ProviderError::NotFound(resource_id.to_string()))?;
        if !resource.editors.iter().any(|p| p == principal) {
            resource.editors.push(principal.to_string());
        }
        Ok(())
    }

    async fn get_public_url(&self, resource_id: &str) -> ProviderResult<String> {
        if !self.resources.lock().await.contains_key(resource_id) {
            return Err(ProviderError::NotFound(resource_id.to_string()));
        }
        Ok(format!("{}/{}", PUBLIC_URL_BASE, resource_id))
    }
}
