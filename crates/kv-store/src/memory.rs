use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    Result, StorageError,
    store::{KeyValueStore, validate_key},
};

/// In-memory key/value store implementation for testing.
///
/// Clones share the same underlying map, so a test can keep one handle for
/// inspection while the cart owns another. Writes are counted, and upcoming
/// reads or writes can be made to fail to exercise error paths.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
    writes: Arc<AtomicUsize>,
    failing_writes: Arc<AtomicUsize>,
    failing_reads: Arc<AtomicUsize>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with the given entries.
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Arc::new(RwLock::new(map)),
            ..Self::default()
        }
    }

    /// Returns the number of successful `set` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes the next `count` calls to `set` fail with `WriteRejected`.
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Makes the next `count` calls to `get` fail with `ReadRejected`.
    pub fn fail_next_reads(&self, count: usize) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    /// Returns the number of keys stored.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Clears all entries and resets the write counter.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
        self.writes.store(0, Ordering::SeqCst);
    }
}

fn take_injected_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;

        if take_injected_failure(&self.failing_reads) {
            return Err(StorageError::ReadRejected {
                key: key.to_string(),
                reason: "injected failure".to_string(),
            });
        }

        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        validate_key(key)?;

        if take_injected_failure(&self.failing_writes) {
            return Err(StorageError::WriteRejected {
                key: key.to_string(),
                reason: "injected failure".to_string(),
            });
        }

        self.entries.write().await.insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.entries.write().await.remove(key);
        Ok(())
    }
}
