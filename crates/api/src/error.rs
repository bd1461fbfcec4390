//! API error types with HTTP and gRPC status mapping.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use thiserror::Error;

use crate::auth::TokenError;

/// API-level error type that maps to HTTP responses and gRPC statuses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request that never reached the domain.
    #[error("{0}")]
    BadRequest(String),

    /// Missing or malformed credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// The caller's role may not perform the operation.
    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) | ApiError::Token(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Domain(err) => match err {
                DomainError::Validation(_) => StatusCode::BAD_REQUEST,
                DomainError::Conflict(_) => StatusCode::CONFLICT,
                DomainError::NotFound(_) => StatusCode::NOT_FOUND,
                DomainError::Auth => StatusCode::UNAUTHORIZED,
                DomainError::Storage(_) | DomainError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Message safe to return to the client. Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            ApiError::Domain(DomainError::Storage(_) | DomainError::Internal(_)) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }

    fn log(&self) {
        match self {
            ApiError::Domain(DomainError::Storage(err)) => {
                tracing::error!(error = %err, "storage failure");
            }
            ApiError::Domain(DomainError::Internal(detail)) => {
                tracing::error!(error = %detail, "internal failure");
            }
            _ => {}
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status();
        let body = serde_json::json!({ "error": self.public_message() });
        (status, axum::Json(body)).into_response()
    }
}

impl From<ApiError> for tonic::Status {
    fn from(err: ApiError) -> Self {
        err.log();
        let message = err.public_message();
        match err {
            ApiError::BadRequest(_) | ApiError::Domain(DomainError::Validation(_)) => {
                tonic::Status::invalid_argument(message)
            }
            ApiError::Unauthorized(_) | ApiError::Token(_) | ApiError::Domain(DomainError::Auth) => {
                tonic::Status::unauthenticated(message)
            }
            ApiError::Forbidden(_) => tonic::Status::permission_denied(message),
            ApiError::Domain(DomainError::Conflict(_)) => tonic::Status::failed_precondition(message),
            ApiError::Domain(DomainError::NotFound(_)) => tonic::Status::not_found(message),
            ApiError::Domain(DomainError::Storage(_) | DomainError::Internal(_)) => {
                tonic::Status::internal(message)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
