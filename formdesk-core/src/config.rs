/// Core service configuration
///
/// Passed explicitly to the services at construction. The store id lives here
/// rather than in any process-wide property lookup.

use crate::store::DEFAULT_MAX_COMMIT_ATTEMPTS;
use serde::{Deserialize, Serialize};

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordParams {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Parallel lanes
    pub parallelism: u32,
}

impl Default for PasswordParams {
    /// 64 MB, 3 passes, 4 lanes
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl PasswordParams {
    /// Cheap parameters for tests and local development
    pub fn fast() -> Self {
        Self {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Configuration shared by all services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Id of the provisioned store, None until setup has run
    pub store_id: Option<String>,

    /// Argon2id parameters for new password hashes
    pub password: PasswordParams,

    /// Read-plan-commit rounds before a contended write gives up
    pub max_commit_attempts: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store_id: None,
            password: PasswordParams::default(),
            max_commit_attempts: DEFAULT_MAX_COMMIT_ATTEMPTS,
        }
    }
}

impl ServiceConfig {
    /// Configuration pointing at an existing store
    pub fn for_store(store_id: impl Into<String>) -> Self {
        Self {
            store_id: Some(store_id.into()),
            ..Default::default()
        }
    }

    /// Replaces the password hashing parameters
    pub fn with_password_params(mut self, params: PasswordParams) -> Self {
        self.password = params;
        self
    }
}
