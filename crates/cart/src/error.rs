//! Cart error types.

use common::ProductId;
use kv_store::StorageError;
use thiserror::Error;

use crate::snapshot::SnapshotDecodeError;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The cart was used outside an active store scope. This is a
    /// programming mistake in the caller.
    #[error("Usage error: {0}")]
    Usage(&'static str),

    /// The stored cart value could not be decoded during hydration.
    #[error("Corrupt cart data under key {key}: {source}")]
    CorruptPersistedData {
        key: String,
        #[source]
        source: SnapshotDecodeError,
    },

    /// Reading the stored cart failed.
    #[error("Storage read failed: {0}")]
    StorageRead(#[source] StorageError),

    /// The durable write failed after all retries. The in-memory cart already
    /// reflects the operation; the next successful write brings storage back
    /// in line because every write carries the full cart.
    #[error("Storage write failed after {attempts} attempt(s): {source}")]
    StorageWriteFailure {
        attempts: u32,
        #[source]
        source: StorageError,
    },

    /// The task carrying the durable write panicked or was aborted.
    #[error("Storage write task failed: {0}")]
    WriteTask(#[source] tokio::task::JoinError),

    /// The candidate cannot be stored losslessly.
    #[error("Invalid item {id}: {reason}")]
    InvalidItem {
        id: ProductId,
        reason: &'static str,
    },

    /// Encoding the cart failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for cart operations.
pub type Result<T> = std::result::Result<T, CartError>;
