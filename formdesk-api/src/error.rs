/// Error handling for the API server
///
/// Handlers return `ApiResult<T>`; `ApiError` converts to an HTTP status and
/// a failed envelope, so clients see the same shape for every failure:
///
/// ```json
/// { "success": false, "errorCode": "invalid_session", "error": "Session is invalid; log in again" }
/// ```
///
/// Service errors keep their own code. System and schema details never reach
/// the body; the core has already logged them.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use formdesk_core::{ErrorCode, ServiceError};
use serde::{Deserialize, Serialize};
use validator::ValidationErrors;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Error returned by a core service
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Missing or wrong bearer credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Unreadable request body (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request body failed validation (422)
    #[error("Validation failed: {} errors", .0.len())]
    ValidationError(Vec<ValidationErrorDetail>),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Failed envelope
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,

    /// Machine-readable code, e.g. "duplicate"
    pub error_code: String,

    /// Human-readable message
    pub error: String,

    /// Field errors for request validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

/// HTTP status for a service error
pub fn service_status(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::NotInitialized => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Duplicate(_) => StatusCode::CONFLICT,
        ServiceError::Auth
        | ServiceError::InvalidCredentials
        | ServiceError::InvalidSession
        | ServiceError::InvalidToken
        | ServiceError::NoUsers => StatusCode::UNAUTHORIZED,
        ServiceError::TemplateNotFound(_) | ServiceError::UserNotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Provider(_) => StatusCode::BAD_GATEWAY,
        ServiceError::Schema(_) | ServiceError::System(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::Service(err) => (
                service_status(&err),
                err.code().to_string(),
                err.public_message(),
                None,
            ),
            ApiError::Unauthorized(msg) => {
                tracing::debug!(reason = %msg, "Rejected unauthenticated request");
                (
                    StatusCode::UNAUTHORIZED,
                    ErrorCode::AuthError.to_string(),
                    msg,
                    None,
                )
            }
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "bad_request".to_string(),
                msg,
                None,
            ),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::ValidationError.to_string(),
                "Request validation failed".to_string(),
                Some(errors),
            ),
        };

        let body = Json(ErrorResponse {
            success: false,
            error_code,
            error: message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert validator field errors to API errors
impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        let errors: Vec<ValidationErrorDetail> = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        ApiError::ValidationError(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::from(ServiceError::NoUsers);
        assert_eq!(err.to_string(), "No users are registered");
    }

    #[test]
    fn test_service_status_mapping() {
        assert_eq!(
            service_status(&ServiceError::validation("x")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            service_status(&ServiceError::NotInitialized),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            service_status(&ServiceError::Duplicate("a".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(service_status(&ServiceError::NoUsers), StatusCode::UNAUTHORIZED);
        assert_eq!(
            service_status(&ServiceError::TemplateNotFound("a".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            service_status(&ServiceError::Provider("a".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            service_status(&ServiceError::Schema("a".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_error() {
        let errors = vec![
            ValidationErrorDetail {
                field: "email".to_string(),
                message: "Email is required".to_string(),
            },
            ValidationErrorDetail {
                field: "templateType".to_string(),
                message: "Template type is required".to_string(),
            },
        ];

        let err = ApiError::ValidationError(errors);
        assert_eq!(err.to_string(), "Validation failed: 2 errors");
    }

    #[test]
    fn test_system_error_status() {
        let response = ApiError::from(ServiceError::system("disk full")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
