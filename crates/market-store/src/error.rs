//! Store error types.

use thiserror::Error;

/// Errors that can occur in the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A persisted row could not be mapped back into a domain value.
    #[error("row decode error: {0}")]
    Decode(String),

    /// The backend rejected the operation (used by test doubles to
    /// simulate infrastructure failures).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;
