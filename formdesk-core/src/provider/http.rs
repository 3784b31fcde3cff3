/// Drive-style REST document provider
///
/// Talks to a files API with bearer authentication:
///
/// ```text
/// GET  {base}/files/{id}               open
/// POST {base}/files/{id}/copy          {"name": title}            -> {"id", "name"}
/// POST {base}/files/{id}/permissions   {"role": "writer", "type": "user", "emailAddress": principal}
/// ```
///
/// Public URLs are not fetched; they are built from a template containing `{id}`.

use super::{DocumentProvider, ProviderError, ProviderResult, ResourceRef};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Default public URL template
pub const DEFAULT_PUBLIC_URL_TEMPLATE: &str = "https://docs.google.com/forms/d/{id}/viewform";

/// Configuration for [`HttpDocumentProvider`]
#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    /// API base, e.g. `https://www.googleapis.com/drive/v3`
    pub base_url: String,

    /// Bearer token, sent when present
    pub token: Option<String>,

    /// Public URL template with an `{id}` placeholder
    pub public_url_template: String,

    /// Request timeout (seconds)
    pub timeout_seconds: u64,
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: None,
            public_url_template: DEFAULT_PUBLIC_URL_TEMPLATE.to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Serialize)]
struct CopyRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PermissionRequest<'a> {
    role: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    email_address: &'a str,
}

/// REST [`DocumentProvider`]
#[derive(Debug, Clone)]
pub struct HttpDocumentProvider {
    client: Client,
    config: HttpProviderConfig,
}

impl HttpDocumentProvider {
    /// Builds the provider and its HTTP client
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Http` if the client cannot be built
    pub fn new(mut config: HttpProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(Self { client, config })
    }

    fn file_url(&self, id: &str, suffix: &str) -> String {
        format!("{}/files/{}{}", self.config.base_url, id, suffix)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: Response, id: &str) -> ProviderResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(id.to_string()));
        }

        let message = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), resource_id = id, "Provider request rejected");
        Err(ProviderError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    /// Builds the public URL of a resource from the configured template
    pub fn public_url(&self, resource_id: &str) -> String {
        self.config.public_url_template.replace("{id}", resource_id)
    }
}

#[async_trait]
impl DocumentProvider for HttpDocumentProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn open_by_id(&self, id: &str) -> ProviderResult<ResourceRef> {
        let request = self.authorized(self.client.get(self.file_url(id, "")));
        let response = Self::check(request.send().await?, id).await?;

        let resource: ResourceRef = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        debug!(resource_id = %resource.id, "Opened provider resource");
        Ok(resource)
    }

    async fn clone_as_new_resource(&self, source_id: &str, title: &str) -> ProviderResult<ResourceRef> {
        let request = self
            .authorized(self.client.post(self.file_url(source_id, "/copy")))
            .json(&CopyRequest { name: title });
        let response = Self::check(request.send().await?, source_id).await?;

        let copy: ResourceRef = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        if copy.id.is_empty() {
            return Err(ProviderError::InvalidResponse("copy returned no id".to_string()));
        }
        debug!(source_id, resource_id = %copy.id, "Copied provider resource");
        Ok(copy)
    }

    async fn grant_edit_access(&self, resource_id: &str, principal: &str) -> ProviderResult<()> {
        let request = self
            .authorized(self.client.post(self.file_url(resource_id, "/permissions")))
            .json(&PermissionRequest {
                role: "writer",
                kind: "user",
                email_address: principal,
            });
        Self::check(request.send().await?, resource_id).await?;
        Ok(())
    }

    async fn get_public_url(&self, resource_id: &str) -> ProviderResult<String> {
        Ok(self.public_url(resource_id))
    }
}
