//! File-backed vault storage
//!
//! One blob file per vault slot in a caller-provided directory. Writes go
//! through a temp file and an atomic rename so a crash mid-write never
//! leaves a torn envelope behind.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use super::VaultStorage;
use crate::error::{Result, VaultError};

/// File-backed storage collaborator
pub struct FileVaultStorage {
    /// Directory holding the vault blob files
    storage_dir: PathBuf,
}

impl FileVaultStorage {
    /// Create storage rooted at the given directory (created if missing)
    pub fn new(storage_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&storage_dir)?;
        debug!("Vault storage initialized at {:?}", storage_dir);
        Ok(Self { storage_dir })
    }

    /// Get the storage directory path
    pub fn storage_dir(&self) -> &PathBuf {
        &self.storage_dir
    }

    fn slot_path(&self, index: Option<u32>) -> PathBuf {
        let name = match index {
            Some(index) => format!("vault-{index}.bin"),
            None => "vault.bin".to_string(),
        };
        self.storage_dir.join(name)
    }
}

#[async_trait]
impl VaultStorage for FileVaultStorage {
    async fn save(&self, index: Option<u32>, bytes: &[u8]) -> Result<()> {
        let path = self.slot_path(index);

        // Write atomically using a temp file
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, bytes).await?;
        tokio::fs::rename(&temp_path, &path).await?;

        debug!("Saved {} bytes to {:?}", bytes.len(), path);
        Ok(())
    }

    async fn load(&self, index: Option<u32>) -> Result<Option<Vec<u8>>> {
        let path = self.slot_path(index);

        if !path.exists() {
            return Ok(None);
        }

        let bytes = tokio::fs::read(&path).await?;
        debug!("Loaded {} bytes from {:?}", bytes.len(), path);
        Ok(Some(bytes))
    }

    async fn delete(&self, index: Option<u32>) -> Result<()> {
        let path = self.slot_path(index);

        if !path.exists() {
            return Ok(());
        }

        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| VaultError::Storage(e.to_string()))?;

        debug!("Deleted {:?}", path);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "File Vault Storage"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_storage() -> (FileVaultStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileVaultStorage::new(temp_dir.path().to_path_buf()).unwrap();
        (storage, temp_dir)
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (storage, _temp) = test_storage();

        storage.save(None, b"envelope bytes").await.unwrap();

        let loaded = storage.load(None).await.unwrap();
        assert_eq!(loaded, Some(b"envelope bytes".to_vec()));
    }

    #[tokio::test]
    async fn test_load_missing_slot() {
        let (storage, _temp) = test_storage();
        assert_eq!(storage.load(Some(3)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_slots_are_independent() {
        let (storage, _temp) = test_storage();

        storage.save(None, b"default").await.unwrap();
        storage.save(Some(1), b"first").await.unwrap();

        assert_eq!(storage.load(None).await.unwrap(), Some(b"default".to_vec()));
        assert_eq!(storage.load(Some(1)).await.unwrap(), Some(b"first".to_vec()));
    }

    #[tokio::test]
    async fn test_delete() {
        let (storage, _temp) = test_storage();

        storage.save(None, b"bytes").await.unwrap();
        storage.delete(None).await.unwrap();
        assert_eq!(storage.load(None).await.unwrap(), None);

        // Deleting an absent slot is accepted
        storage.delete(None).await.unwrap();
    }

    #[tokio::test]
    async fn test_overwrite_replaces_contents() {
        let (storage, _temp) = test_storage();

        storage.save(None, b"old").await.unwrap();
        storage.save(None, b"new").await.unwrap();

        assert_eq!(storage.load(None).await.unwrap(), Some(b"new".to_vec()));
    }
}
