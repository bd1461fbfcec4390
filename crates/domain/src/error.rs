//! Domain error types.

use storage::StoreError;
use thiserror::Error;

/// Errors that can occur during domain operations.
///
/// The first four variants are client-facing rejections; `Storage` and
/// `Internal` carry failures that callers should surface as internal errors.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed input: bad identifier, unknown enum value, bad pagination.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation would violate a lifecycle invariant.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad credentials. Deliberately carries no detail.
    #[error("Invalid email or password")]
    Auth,

    /// An error occurred in the store.
    #[error("Storage error: {0}")]
    Storage(StoreError),

    /// A local failure unrelated to the request, such as the hasher failing.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PvzNotFound(_) | StoreError::NoReception(_) | StoreError::EmptyReception(_) => {
                DomainError::NotFound(err.to_string())
            }
            StoreError::PvzAlreadyExists(_)
            | StoreError::ReceptionAlreadyOpen(_)
            | StoreError::ReceptionAlreadyClosed(_)
            | StoreError::NoOpenReception(_)
            | StoreError::EmailTaken(_) => DomainError::Conflict(err.to_string()),
            StoreError::InvalidRecord(_) | StoreError::Database(_) | StoreError::Migration(_) => {
                DomainError::Storage(err)
            }
        }
    }
}

impl From<common::IdParseError> for DomainError {
    fn from(err: common::IdParseError) -> Self {
        DomainError::Validation(err.to_string())
    }
}

impl From<common::UnknownValue> for DomainError {
    fn from(err: common::UnknownValue) -> Self {
        DomainError::Validation(err.to_string())
    }
}
