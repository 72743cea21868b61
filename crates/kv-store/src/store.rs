use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{Result, StorageError};

/// Core trait for durable key/value stores.
///
/// Values are opaque strings. Every `set` replaces the previous value for the
/// key in full; there is no partial update and no transaction spanning keys.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// Returns None if nothing has been written for the key.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes `value` under `key`, replacing any previous value.
    ///
    /// Resolves once the backend has durably accepted the write.
    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Deletes the value under `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Extension trait providing JSON helpers for key/value stores.
#[async_trait]
pub trait KeyValueStoreExt: KeyValueStore {
    /// Reads the value under `key` and decodes it as JSON.
    async fn get_json<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Encodes `value` as JSON and writes it under `key`.
    async fn set_json<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let raw = serde_json::to_string(value)?;
        self.set(key, raw).await
    }

    /// Checks whether a value exists under `key`.
    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

// Blanket implementation for all KeyValueStore implementations
impl<T: KeyValueStore + ?Sized> KeyValueStoreExt for T {}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key).await
    }
}

/// Validates a key before it reaches a backend.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
