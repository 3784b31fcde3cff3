/// Account, authentication and provisioning services
///
/// All three services share one [`StoreContext`]; [`Services`] bundles them
/// together with store setup.
///
/// # Example
///
/// ```
/// use formdesk_core::config::{PasswordParams, ServiceConfig};
/// use formdesk_core::provider::MemoryDocumentProvider;
/// use formdesk_core::services::Services;
/// use formdesk_core::store::MemoryRowStore;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let services = Services::new(
///     Arc::new(MemoryRowStore::new()),
///     Arc::new(MemoryDocumentProvider::new()),
///     ServiceConfig::default().with_password_params(PasswordParams::fast()),
/// );
/// services.setup().await?;
///
/// let registration = services.directory.register("a@example.com").await?;
/// let login = services
///     .auth
///     .authenticate_by_password(&registration.access_id, &registration.password)
///     .await?;
/// assert_eq!(login.email, "a@example.com");
/// # Ok(())
/// # }
/// ```

pub mod authentication;
pub mod context;
pub mod directory;
pub mod provisioning;

pub use authentication::{AuthService, IssuedToken, PasswordLogin, RememberLogin, SessionLogin};
pub use context::StoreContext;
pub use directory::{Registration, UserDirectory};
pub use provisioning::{InstanceList, ProvisionedInstance, ProvisioningService, RegisteredTemplate, TemplateList};

use crate::config::ServiceConfig;
use crate::error::{report, ServiceResult};
use crate::provider::DocumentProvider;
use crate::schema::{setup_store, SetupReport};
use crate::store::RowStore;
use std::sync::Arc;

/// All services over one store
#[derive(Clone)]
pub struct Services {
    pub directory: UserDirectory,
    pub auth: AuthService,
    pub provisioning: ProvisioningService,
    context: StoreContext,
}

impl Services {
    pub fn new(
        store: Arc<dyn RowStore>,
        provider: Arc<dyn DocumentProvider>,
        config: ServiceConfig,
    ) -> Self {
        let context = StoreContext::new(store, config);
        Self {
            directory: UserDirectory::new(context.clone()),
            auth: AuthService::new(context.clone()),
            provisioning: ProvisioningService::new(context.clone(), provider),
            context,
        }
    }

    pub fn context(&self) -> &StoreContext {
        &self.context
    }

    /// Runs [`setup_store`] against the active store and adopts the resulting id
    pub async fn setup(&self) -> ServiceResult<SetupReport> {
        let existing = self.context.current_store_id().await;
        let result = setup_store(
            self.context.store(),
            existing.as_deref(),
            &self.context.config().password,
        )
        .await;

        if let Ok(setup) = &result {
            self.context.set_store_id(setup.store_id.clone()).await;
        }
        report("setup_store", result)
    }
}
