/// Template provisioning service
///
/// Turns an administrator-registered template into a per-user copy:
///
/// ```text
/// session ─> user ─> "template:<type>" setting ─> open source ─> clone
///         ─> public URL ─> grant edit access (best effort) ─> upsert Instance row
/// ```
///
/// Each stage fails fast with its own error. The Instances upsert is keyed on
/// (owner access ID, template type): provisioning the same template again
/// overwrites the existing row with the new clone.

use super::context::{require_header, StoreContext};
use super::directory::UserDirectory;
use crate::error::{report, ServiceError, ServiceResult};
use crate::models::setting::{template_key, template_type_from_key};
use crate::models::{InstanceRecord, InstanceSummary, SettingRecord, UserRecord};
use crate::provider::DocumentProvider;
use crate::schema::{instances, settings};
use crate::store::{Cell, Mutation, Plan};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of provisioning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedInstance {
    pub instance_id: String,
    pub instance_url: String,
    pub title: String,
    pub template_type: String,
}

/// Instances owned by one user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceList {
    pub instances: Vec<InstanceSummary>,
}

/// Registered template types
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateList {
    pub template_types: Vec<String>,
}

/// Result of a template registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredTemplate {
    pub template_type: String,
    pub template_id: String,

    /// False when an existing registration was overwritten
    pub created: bool,
}

#[derive(Clone)]
pub struct ProvisioningService {
    context: StoreContext,
    directory: UserDirectory,
    provider: Arc<dyn DocumentProvider>,
}

impl ProvisioningService {
    pub fn new(context: StoreContext, provider: Arc<dyn DocumentProvider>) -> Self {
        Self {
            directory: UserDirectory::new(context.clone()),
            context,
            provider,
        }
    }

    /// Clones the template registered under `template_type` for the session's user
    ///
    /// # Errors
    ///
    /// - `Validation` if either argument is empty
    /// - `NotInitialized` if no store has been set up
    /// - `Auth` if the session does not resolve to a user
    /// - `TemplateNotFound` if no template is registered under the type
    /// - `Provider` if the source cannot be opened or cloned
    /// - `System` on storage failures
    pub async fn provision_instance(
        &self,
        template_type: &str,
        session_id: &str,
    ) -> ServiceResult<ProvisionedInstance> {
        report(
            "provision_instance",
            self.provision(template_type, session_id).await,
        )
    }

    async fn provision(&self, template_type: &str, session_id: &str) -> ServiceResult<ProvisionedInstance> {
        if template_type.is_empty() || session_id.is_empty() {
            return Err(ServiceError::validation("template type and session ID are required"));
        }

        let store_id = self.context.store_id().await?;
        let owner = self.resolve_owner(&store_id, session_id).await?;
        let source_id = self.resolve_template(&store_id, template_type).await?;

        let provider = self.provider.name();
        self.provider.open_by_id(&source_id).await.map_err(|e| {
            ServiceError::Provider(format!("cannot open template {}: {}", template_type, e))
        })?;

        let title = format!("{} - {}", template_type, owner.account);
        let copy = self
            .provider
            .clone_as_new_resource(&source_id, &title)
            .await
            .map_err(|e| ServiceError::Provider(format!("cannot clone template {}: {}", template_type, e)))?;
        let instance_url = self
            .provider
            .get_public_url(&copy.id)
            .await
            .map_err(|e| ServiceError::Provider(format!("cannot resolve URL of {}: {}", copy.id, e)))?;
        debug!(provider, source_id = %source_id, instance_id = %copy.id, "Cloned template");

        if let Err(e) = self.provider.grant_edit_access(&copy.id, &owner.account).await {
            warn!(
                provider,
                instance_id = %copy.id,
                access_id = %owner.access_id,
                error = %e,
                "Could not grant edit access; continuing without it"
            );
        }

        let created_at = Utc::now();
        let inserted = self
            .context
            .table(&store_id, instances::TABLE)
            .transact(|snapshot| -> ServiceResult<Plan<bool>> {
                require_header(snapshot, instances::TABLE)?;

                let existing = InstanceRecord::scan(snapshot).find(|instance| {
                    instance.owner_access_id == owner.access_id
                        && instance.template_type == template_type
                });

                Ok(match existing {
                    Some(instance) => Plan::Commit(
                        InstanceRecord::replace_clone(instance.row_number, &copy.id, &instance_url, created_at),
                        false,
                    ),
                    None => Plan::Commit(
                        vec![Mutation::Append(InstanceRecord::new_row(
                            &owner.access_id,
                            &owner.account,
                            template_type,
                            &copy.id,
                            &instance_url,
                            created_at,
                        ))],
                        true,
                    ),
                })
            })
            .await?;

        info!(
            access_id = %owner.access_id,
            template_type,
            instance_id = %copy.id,
            replaced = !inserted,
            "Provisioned instance"
        );

        Ok(ProvisionedInstance {
            instance_id: copy.id,
            instance_url,
            title,
            template_type: template_type.to_string(),
        })
    }

    /// Instances owned by the session's user, in table order
    pub async fn list_instances(&self, session_id: &str) -> ServiceResult<InstanceList> {
        report("list_instances", self.instances_for(session_id).await)
    }

    async fn instances_for(&self, session_id: &str) -> ServiceResult<InstanceList> {
        if session_id.is_empty() {
            return Err(ServiceError::validation("session ID is required"));
        }

        let store_id = self.context.store_id().await?;
        let owner = self.resolve_owner(&store_id, session_id).await?;

        let snapshot = self
            .context
            .table(&store_id, instances::TABLE)
            .snapshot()
            .await?;
        require_header(&snapshot, instances::TABLE)?;

        let instances: Vec<InstanceSummary> = InstanceRecord::scan(&snapshot)
            .filter(|instance| instance.owner_access_id == owner.access_id)
            .map(|instance| instance.summary())
            .collect();

        debug!(access_id = %owner.access_id, count = instances.len(), "Listed instances");
        Ok(InstanceList { instances })
    }

    /// Registered template types, prefix stripped, in table order
    pub async fn list_template_types(&self) -> ServiceResult<TemplateList> {
        report("list_template_types", self.template_types().await)
    }

    async fn template_types(&self) -> ServiceResult<TemplateList> {
        let store_id = self.context.store_id().await?;
        let snapshot = self
            .context
            .table(&store_id, settings::TABLE)
            .snapshot()
            .await?;
        require_header(&snapshot, settings::TABLE)?;

        let template_types = SettingRecord::scan(&snapshot)
            .filter_map(|setting| template_type_from_key(&setting.key).map(str::to_string))
            .collect();

        Ok(TemplateList { template_types })
    }

    /// Registers (or re-points) a template type at a source resource
    pub async fn register_template(
        &self,
        template_type: &str,
        resource_id: &str,
    ) -> ServiceResult<RegisteredTemplate> {
        report(
            "register_template",
            self.upsert_template(template_type, resource_id).await,
        )
    }

    async fn upsert_template(&self, template_type: &str, resource_id: &str) -> ServiceResult<RegisteredTemplate> {
        if template_type.is_empty() || resource_id.is_empty() {
            return Err(ServiceError::validation("template type and resource ID are required"));
        }

        let store_id = self.context.store_id().await?;
        let key = template_key(template_type);

        let created = self
            .context
            .table(&store_id, settings::TABLE)
            .transact(|snapshot| -> ServiceResult<Plan<bool>> {
                require_header(snapshot, settings::TABLE)?;

                Ok(match SettingRecord::find(snapshot, &key) {
                    Some(setting) if setting.value == resource_id => Plan::Done(false),
                    Some(setting) => Plan::Commit(
                        vec![Mutation::set(setting.row_number, settings::VALUE, resource_id)],
                        false,
                    ),
                    None => Plan::Commit(
                        vec![Mutation::Append(vec![Cell::text(key.as_str()), Cell::text(resource_id)])],
                        true,
                    ),
                })
            })
            .await?;

        info!(template_type, resource_id, created, "Registered template");
        Ok(RegisteredTemplate {
            template_type: template_type.to_string(),
            template_id: resource_id.to_string(),
            created,
        })
    }

    async fn resolve_owner(&self, store_id: &str, session_id: &str) -> ServiceResult<UserRecord> {
        self.directory
            .find_by_session(store_id, session_id)
            .await?
            .ok_or_else(|| {
                warn!("Session did not resolve to a user");
                ServiceError::Auth
            })
    }

    async fn resolve_template(&self, store_id: &str, template_type: &str) -> ServiceResult<String> {
        let snapshot = self
            .context
            .table(store_id, settings::TABLE)
            .snapshot()
            .await?;
        require_header(&snapshot, settings::TABLE)?;

        SettingRecord::find(&snapshot, &template_key(template_type))
            .map(|setting| setting.value)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                warn!(template_type, "Template not registered");
                ServiceError::TemplateNotFound(template_type.to_string())
            })
    }
}
