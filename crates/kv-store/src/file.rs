use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    Result, StorageError,
    store::{KeyValueStore, validate_key},
};

/// Directory-backed key/value store.
///
/// Each key maps to one file named after the hex encoding of the key, so any
/// key (including the `@namespace:name` style) is a valid file name. Writes go
/// to a temporary file first and are renamed into place, so a crash mid-write
/// leaves the previous value intact.
///
/// Hex encoding doubles the key length and the temp name adds a uuid, so keys
/// are limited to [`MAX_KEY_LEN`] bytes to stay inside the common 255-byte
/// file name limit. Longer keys are rejected with `InvalidKey`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        tracing::debug!(dir = %dir.display(), "opened file store");
        Ok(Self { dir })
    }

    /// Returns the directory holding the store files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path of the file holding `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }
}

/// Longest key, in bytes, a [`FileStore`] accepts.
pub const MAX_KEY_LEN: usize = 100;

fn check_key(key: &str) -> Result<()> {
    validate_key(key)?;
    if key.len() > MAX_KEY_LEN {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn encode_key(key: &str) -> String {
    key.bytes().map(|b| format!("{b:02x}")).collect()
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        check_key(key)?;
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        check_key(key)?;
        let target = self.path_for(key);
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", encode_key(key), Uuid::new_v4()));

        if let Err(e) = tokio::fs::write(&tmp, value.as_bytes()).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        check_key(key)?;
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
