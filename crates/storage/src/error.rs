use thiserror::Error;

use crate::{PvzId, ReceptionId};

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The pickup point does not exist.
    #[error("Pickup point not found: {0}")]
    PvzNotFound(PvzId),

    /// A pickup point with this id already exists.
    #[error("Pickup point already exists: {0}")]
    PvzAlreadyExists(PvzId),

    /// The pickup point already has a reception in progress.
    #[error("Pickup point {0} already has an open reception")]
    ReceptionAlreadyOpen(PvzId),

    /// The pickup point never had a reception.
    #[error("Pickup point {0} has no receptions")]
    NoReception(PvzId),

    /// The most recent reception is already closed.
    #[error("Reception {0} is already closed")]
    ReceptionAlreadyClosed(ReceptionId),

    /// The pickup point has no reception in progress.
    #[error("Pickup point {0} has no open reception")]
    NoOpenReception(PvzId),

    /// The open reception has no products to remove.
    #[error("Reception {0} has no products")]
    EmptyReception(ReceptionId),

    /// The email address is already registered.
    #[error("Email already registered: {0}")]
    EmailTaken(String),

    /// A stored row could not be mapped back to a record.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
