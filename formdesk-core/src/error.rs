/// Service-level errors and the unified result envelope
///
/// Every public service operation returns `Result<T, ServiceError>`. The
/// variants form a closed taxonomy: callers match on them (or on
/// [`ServiceError::code`]) instead of parsing messages. Collaborator failures
/// (row store, document provider, password hashing) are converted at the
/// service boundary and never escape raw.
///
/// [`Outcome`] is the serializable form handed to request-routing glue:
///
/// ```json
/// { "success": false, "errorCode": "invalid_credentials", "error": "Invalid access ID or password" }
/// { "success": true, "sessionId": "…", "email": "a@example.com", "lastLogin": "…" }
/// ```

use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error};

/// Service result type alias
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error taxonomy shared by all services
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Missing or malformed input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No store configured, or the configured store does not exist
    #[error("The store has not been initialized; run setup first")]
    NotInitialized,

    /// An expected table or column is missing
    #[error("Schema error: {0}")]
    Schema(String),

    /// Uniqueness violation
    #[error("Already exists: {0}")]
    Duplicate(String),

    /// The Users table has no data rows
    #[error("No users are registered")]
    NoUsers,

    /// Session token did not resolve to a user (provisioning and listings)
    #[error("Authentication required; log in again")]
    Auth,

    /// No template registered under this type
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// Access ID / password pair did not match
    #[error("Invalid access ID or password")]
    InvalidCredentials,

    /// Session token did not match any user
    #[error("Session is invalid; log in again")]
    InvalidSession,

    /// Remember token did not match any user
    #[error("Remember token is invalid; log in again")]
    InvalidToken,

    /// No user with this access ID
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// The document provider could not open or clone a resource
    #[error("Provider error: {0}")]
    Provider(String),

    /// Unexpected collaborator failure
    #[error("System error: {0}")]
    System(String),
}

/// Stable machine-readable error code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ValidationError,
    NotInitialized,
    SchemaError,
    Duplicate,
    NoUsers,
    AuthError,
    TemplateNotFound,
    InvalidCredentials,
    InvalidSession,
    InvalidToken,
    UserNotFound,
    ProviderError,
    SystemError,
}

impl ErrorCode {
    /// Snake case name, as serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::NotInitialized => "not_initialized",
            ErrorCode::SchemaError => "schema_error",
            ErrorCode::Duplicate => "duplicate",
            ErrorCode::NoUsers => "no_users",
            ErrorCode::AuthError => "auth_error",
            ErrorCode::TemplateNotFound => "template_not_found",
            ErrorCode::InvalidCredentials => "invalid_credentials",
            ErrorCode::InvalidSession => "invalid_session",
            ErrorCode::InvalidToken => "invalid_token",
            ErrorCode::UserNotFound => "user_not_found",
            ErrorCode::ProviderError => "provider_error",
            ErrorCode::SystemError => "system_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ServiceError {
    /// Creates a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a system error
    pub fn system(msg: impl Into<String>) -> Self {
        Self::System(msg.into())
    }

    /// Machine-readable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Validation(_) => ErrorCode::ValidationError,
            ServiceError::NotInitialized => ErrorCode::NotInitialized,
            ServiceError::Schema(_) => ErrorCode::SchemaError,
            ServiceError::Duplicate(_) => ErrorCode::Duplicate,
            ServiceError::NoUsers => ErrorCode::NoUsers,
            ServiceError::Auth => ErrorCode::AuthError,
            ServiceError::TemplateNotFound(_) => ErrorCode::TemplateNotFound,
            ServiceError::InvalidCredentials => ErrorCode::InvalidCredentials,
            ServiceError::InvalidSession => ErrorCode::InvalidSession,
            ServiceError::InvalidToken => ErrorCode::InvalidToken,
            ServiceError::UserNotFound(_) => ErrorCode::UserNotFound,
            ServiceError::Provider(_) => ErrorCode::ProviderError,
            ServiceError::System(_) => ErrorCode::SystemError,
        }
    }

    /// True for the "lookup found nothing" family
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ServiceError::Auth
                | ServiceError::TemplateNotFound(_)
                | ServiceError::InvalidCredentials
                | ServiceError::InvalidSession
                | ServiceError::InvalidToken
                | ServiceError::UserNotFound(_)
        )
    }

    /// Message safe to show to end users
    ///
    /// System and schema details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::System(_) | ServiceError::Schema(_) => {
                "A system error occurred. Please contact the administrator.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::StoreNotFound(_) => ServiceError::NotInitialized,
            StoreError::TableNotFound(table) => {
                ServiceError::Schema(format!("table {} does not exist", table))
            }
            other => ServiceError::System(format!("store failure: {}", other)),
        }
    }
}

/// Logs the outcome of a public operation at the appropriate level
///
/// Unexpected failures go out at `error`; expected failures were already
/// reported where they were detected.
pub(crate) fn report<T>(operation: &'static str, result: ServiceResult<T>) -> ServiceResult<T> {
    if let Err(err) = &result {
        match err {
            ServiceError::System(_) | ServiceError::Schema(_) | ServiceError::NotInitialized => {
                error!(operation, code = %err.code(), error = %err, "Operation failed");
            }
            _ => {
                debug!(operation, code = %err.code(), error = %err, "Operation rejected");
            }
        }
    }
    result
}

/// Unified result envelope
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome<T> {
    /// Whether the operation succeeded
    pub success: bool,

    /// Error code on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,

    /// User-facing error message on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Payload on success, flattened into the envelope
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Outcome<T> {
    /// Successful envelope
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            error_code: None,
            error: None,
            data: Some(data),
        }
    }

    /// Failed envelope
    pub fn failed(err: &ServiceError) -> Self {
        Self {
            success: false,
            error_code: Some(err.code()),
            error: Some(err.public_message()),
            data: None,
        }
    }
}

impl<T> From<ServiceResult<T>> for Outcome<T> {
    fn from(result: ServiceResult<T>) -> Self {
        match result {
            Ok(data) => Outcome::ok(data),
            Err(err) => Outcome::failed(&err),
        }
    }
}
