use thiserror::Error;

/// Errors that can occur when interacting with a key/value store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The key is not acceptable to the store (e.g. empty).
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),

    /// A filesystem error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend could not serve the read.
    #[error("Read rejected for key {key}: {reason}")]
    ReadRejected { key: String, reason: String },

    /// The backend refused the write.
    #[error("Write rejected for key {key}: {reason}")]
    WriteRejected { key: String, reason: String },
}

/// Result type for key/value store operations.
pub type Result<T> = std::result::Result<T, StorageError>;
