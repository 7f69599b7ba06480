use super::content_type::key_with_extension;
use super::{path_for_snapshot, Storage};
use crate::config::CameraSettings;
use crate::error::{LocalError, StorageError};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

pub struct LocalStorage {
    storage_path: PathBuf,
}

impl LocalStorage {
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
        }
    }

    /// Writes `data` under `key` (relative to the storage path), appending
    /// the sniffed extension. An existing file at the final path is truncated.
    pub async fn write_snapshot(&self, key: &str, data: &[u8]) -> Result<PathBuf, LocalError> {
        let (key, content_type) = key_with_extension(key.to_string(), data);
        let file_path = self.storage_path.join(key);

        if let Some(dir) = file_path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(LocalError::DirectoryCreation)?;
        }

        let mut file = fs::File::create(&file_path)
            .await
            .map_err(LocalError::FileCreate)?;
        file.write_all(data).await.map_err(LocalError::FileWrite)?;
        file.flush().await.map_err(LocalError::FileWrite)?;

        info!(path = ?file_path, content_type, "Saved snapshot locally");
        Ok(file_path)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn save_snapshot(&self, camera: &CameraSettings, data: &[u8]) -> Result<(), StorageError> {
        let key = path_for_snapshot(camera);
        self.write_snapshot(&key, data).await?;
        Ok(())
    }
}
