use super::Storage;
use crate::config::CameraSettings;
use crate::error::StorageError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Fans each save out to every registered backend.
///
/// Backends are tried in name order and the first failure aborts the save.
/// Writes already made by earlier backends are left in place.
#[derive(Default)]
pub struct StorageManager {
    backends: BTreeMap<String, Arc<dyn Storage>>,
}

impl StorageManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a backend, replacing any existing one with the same name.
    pub fn register(&mut self, name: impl Into<String>, storage: Arc<dyn Storage>) {
        let name = name.into();
        info!(storage = %name, "Registering storage backend");
        self.backends.insert(name, storage);
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn backend_names(&self) -> impl Iterator<Item = &str> {
        self.backends.keys().map(String::as_str)
    }
}

#[async_trait]
impl Storage for StorageManager {
    async fn save_snapshot(&self, camera: &CameraSettings, data: &[u8]) -> Result<(), StorageError> {
        for (name, storage) in &self.backends {
            debug!(storage = %name, camera = %camera.name, "Saving snapshot");
            storage
                .save_snapshot(camera, data)
                .await
                .map_err(|e| StorageError::Backend {
                    name: name.clone(),
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }
}
