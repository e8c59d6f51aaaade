//! File-backed key storage.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};
use crate::storage::{io::atomic_write, KeyStorage};
use crate::sync::ScanKey;

/// Stores key scan ranges as a JSON array under `<storage_path>/keys/keys.json`.
///
/// Every persist rewrites the whole file atomically, so after a crash the
/// file holds the ranges of the last completed batch.
#[derive(Debug, Clone)]
pub struct JsonKeyStorage {
    storage_path: PathBuf,
}

impl JsonKeyStorage {
    const FOLDER_NAME: &'static str = "keys";
    const FILE_NAME: &'static str = "keys.json";

    pub fn open(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
        }
    }

    pub fn file_path(&self) -> PathBuf {
        self.storage_path.join(Self::FOLDER_NAME).join(Self::FILE_NAME)
    }

    fn folder(&self) -> PathBuf {
        self.storage_path.join(Self::FOLDER_NAME)
    }
}

async fn read_keys(path: &Path) -> StorageResult<Vec<ScanKey>> {
    let content = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&content).map_err(|e| {
        StorageError::Corruption(format!("Failed to parse keys from {}: {}", path.display(), e))
    })
}

#[async_trait]
impl KeyStorage for JsonKeyStorage {
    async fn load_keys(&self) -> StorageResult<Vec<ScanKey>> {
        let path = self.file_path();
        if !tokio::fs::try_exists(&path).await? {
            return Ok(Vec::new());
        }
        read_keys(&path).await
    }

    async fn persist_keys(&mut self, keys: &[ScanKey]) -> StorageResult<()> {
        tokio::fs::create_dir_all(self.folder()).await?;

        let json = serde_json::to_vec_pretty(keys)
            .map_err(|e| StorageError::Serialization(format!("Failed to encode keys: {}", e)))?;
        atomic_write(&self.file_path(), &json).await?;

        tracing::trace!("Persisted {} keys to {}", keys.len(), self.file_path().display());
        Ok(())
    }
}
