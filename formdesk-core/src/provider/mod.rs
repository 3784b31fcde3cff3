/// Document providers
///
/// A provider owns the template resources and their per-user clones. The
/// provisioning service needs four things from it: open a source resource,
/// copy it under a new title, share the copy with its owner, and build the
/// copy's public URL.
///
/// # Implementations
///
/// - [`MemoryDocumentProvider`]: in-process catalog for tests and local runs
/// - [`HttpDocumentProvider`]: Drive-style REST API over reqwest
///
/// # Example
///
/// ```
/// use formdesk_core::provider::{DocumentProvider, MemoryDocumentProvider};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = MemoryDocumentProvider::new();
/// provider.insert_resource("tmpl-1", "Survey template").await;
///
/// let copy = provider.clone_as_new_resource("tmpl-1", "survey - a@example.com").await?;
/// let url = provider.get_public_url(&copy.id).await?;
/// assert!(url.contains(&copy.id));
/// # Ok(())
/// # }
/// ```

pub mod http;
pub mod memory;

pub use http::{HttpDocumentProvider, HttpProviderConfig};
pub use memory::MemoryDocumentProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Provider error types
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// No resource with this id, or not visible to us
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The provider refused the call
    #[error("Provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Unexpected response body
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Provider result type alias
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Handle on a provider resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,

    /// Display title, when the provider reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Template/document provider
#[async_trait]
pub trait DocumentProvider: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Opens a resource, failing if it does not exist
    async fn open_by_id(&self, id: &str) -> ProviderResult<ResourceRef>;

    /// Copies `source_id` into a new resource titled `title`
    async fn clone_as_new_resource(&self, source_id: &str, title: &str) -> ProviderResult<ResourceRef>;

    /// Gives `principal` (an email address) edit rights on the resource
    async fn grant_edit_access(&self, resource_id: &str, principal: &str) -> ProviderResult<()>;

    /// URL under which the resource is publicly reachable
    async fn get_public_url(&self, resource_id: &str) -> ProviderResult<String>;
}
