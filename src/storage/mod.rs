pub mod content_type;
mod local_storage;
mod path;
mod s3_storage;
mod storage_manager;

pub use local_storage::LocalStorage;
pub use path::{path_for_snapshot, path_for_snapshot_at};
pub use s3_storage::S3Storage;
pub use storage_manager::StorageManager;

use crate::config::{CameraSettings, StorageSettings};
use crate::error::{ConfigError, StorageError};
use crate::prelude::*;
use async_trait::async_trait;
use std::sync::Arc;

/// A destination snapshots can be persisted to.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn save_snapshot(
        &self,
        camera: &CameraSettings,
        data: &[u8],
    ) -> std::result::Result<(), StorageError>;
}

/// Builds the fan-out storage from configuration, registering every
/// configured backend.
pub async fn build_storage(settings: &StorageSettings) -> Result<Arc<StorageManager>> {
    let mut manager = StorageManager::new();

    if let Some(s3) = &settings.s3 {
        manager.register("s3", Arc::new(S3Storage::new(s3).await?));
    }
    if let Some(local) = &settings.local {
        manager.register("local", Arc::new(LocalStorage::new(&local.path)));
    }

    if manager.is_empty() {
        return Err(ConfigError::NoStorage.into());
    }
    Ok(Arc::new(manager))
}
