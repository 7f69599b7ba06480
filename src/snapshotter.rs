use crate::config::{CameraSettings, HttpSettings, Settings};
use crate::error::{Error, FetchError};
use crate::prelude::*;
use crate::storage::Storage;
use bytes::Bytes;
use reqwest::StatusCode;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Builds the HTTP client used to fetch snapshots.
pub fn build_http_client(settings: &HttpSettings) -> std::result::Result<reqwest::Client, FetchError> {
    if settings.accept_invalid_certs {
        warn!("TLS certificate verification is disabled for camera snapshot requests");
    }
    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(settings.accept_invalid_certs)
        .build()?;
    Ok(client)
}

/// Fetches a still image from each configured camera and hands it to
/// storage.
pub struct Snapshotter {
    client: reqwest::Client,
    cameras: Vec<CameraSettings>,
    storage: Arc<dyn Storage>,
    run_lock: Option<Mutex<()>>,
}

impl Snapshotter {
    pub fn new(client: reqwest::Client, cameras: Vec<CameraSettings>, storage: Arc<dyn Storage>) -> Self {
        Self {
            client,
            cameras,
            storage,
            run_lock: None,
        }
    }

    /// Wires a snapshotter from loaded settings, serializing runs when
    /// `snapshot.serialize_runs` is set.
    pub fn from_settings(settings: &Settings, client: reqwest::Client, storage: Arc<dyn Storage>) -> Self {
        let snapshotter = Self::new(client, settings.cameras.clone(), storage);
        match &settings.snapshot {
            Some(snapshot) if snapshot.serialize_runs => snapshotter.serialized(),
            _ => snapshotter,
        }
    }

    /// Makes overlapping `save_snapshots` calls wait for each other instead
    /// of running concurrently.
    pub fn serialized(mut self) -> Self {
        self.run_lock = Some(Mutex::new(()));
        self
    }

    pub fn cameras(&self) -> &[CameraSettings] {
        &self.cameras
    }

    /// Runs one snapshot cycle over the cameras in configured order,
    /// stopping at the first camera that fails to fetch or save.
    pub async fn save_snapshots(&self) -> Result<()> {
        let _guard = match &self.run_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        for camera in &self.cameras {
            let data = self.get_snapshot(camera).await.map_err(|source| Error::Fetch {
                camera: camera.name.clone(),
                source,
            })?;

            self.storage
                .save_snapshot(camera, &data)
                .await
                .map_err(|source| Error::Save {
                    camera: camera.name.clone(),
                    source,
                })?;

            info!(camera = %camera.name, bytes = data.len(), "Saved snapshot");
        }
        Ok(())
    }

    pub async fn get_snapshot(&self, camera: &CameraSettings) -> std::result::Result<Bytes, FetchError> {
        if camera.snapshot_url.is_empty() {
            return Err(FetchError::EmptyUrl);
        }

        debug!(camera = %camera.name, url = %camera.snapshot_url, "Fetching snapshot");
        let response = self.client.get(&camera.snapshot_url).send().await?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::Status(response.status()));
        }

        Ok(response.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, StorageError};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingStorage {
        saved: StdMutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl Storage for RecordingStorage {
        async fn save_snapshot(
            &self,
            camera: &CameraSettings,
            data: &[u8],
        ) -> std::result::Result<(), StorageError> {
            self.saved
                .lock()
                .unwrap()
                .push((camera.name.clone(), data.to_vec()));
            Ok(())
        }
    }

    fn camera(name: &str, url: &str) -> CameraSettings {
        CameraSettings {
            name: name.to_string(),
            snapshot_url: url.to_string(),
        }
    }

    fn snapshotter(cameras: Vec<CameraSettings>, storage: Arc<RecordingStorage>) -> Snapshotter {
        Snapshotter::new(reqwest::Client::new(), cameras, storage)
    }

    #[tokio::test]
    async fn test_get_snapshot_empty_url() {
        let storage = Arc::new(RecordingStorage::default());
        let s = snapshotter(vec![], storage);

        let result = s.get_snapshot(&camera("TestCam", "")).await;
        assert!(matches!(result, Err(FetchError::EmptyUrl)));
    }

    #[tokio::test]
    async fn test_get_snapshot_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("fail"))
            .mount(&server)
            .await;

        let s = snapshotter(vec![], Arc::new(RecordingStorage::default()));
        let err = s
            .get_snapshot(&camera("TestCam", &server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status(StatusCode::INTERNAL_SERVER_ERROR)));
        assert!(err.to_string().contains("500"), "got {err}");
    }

    #[tokio::test]
    async fn test_get_snapshot_non_ok_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let s = snapshotter(vec![], Arc::new(RecordingStorage::default()));
        let result = s.get_snapshot(&camera("TestCam", &server.uri())).await;
        assert!(matches!(result, Err(FetchError::Status(StatusCode::NO_CONTENT))));
    }

    #[tokio::test]
    async fn test_get_snapshot_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/snapshot.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"snapshotdata".to_vec()))
            .mount(&server)
            .await;

        let s = snapshotter(vec![], Arc::new(RecordingStorage::default()));
        let url = format!("{}/snapshot.jpg", server.uri());
        let data = s.get_snapshot(&camera("TestCam", &url)).await.unwrap();
        assert_eq!(&data[..], b"snapshotdata");
    }

    #[tokio::test]
    async fn test_get_snapshot_client_error() {
        let s = snapshotter(vec![], Arc::new(RecordingStorage::default()));
        let result = s
            .get_snapshot(&camera("TestCam", "http://invalid.invalid"))
            .await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }

    #[tokio::test]
    async fn test_save_snapshots_delegates_exact_bytes() {
        let body: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let storage = Arc::new(RecordingStorage::default());
        let s = snapshotter(
            vec![camera("Cam1", &server.uri()), camera("Cam2", &server.uri())],
            storage.clone(),
        );
        s.save_snapshots().await.unwrap();

        let saved = storage.saved.lock().unwrap().clone();
        assert_eq!(
            saved,
            vec![("Cam1".to_string(), body.clone()), ("Cam2".to_string(), body)]
        );
    }

    #[tokio::test]
    async fn test_save_snapshots_stops_at_first_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data".to_vec()))
            .expect(0)
            .mount(&server)
            .await;

        let storage = Arc::new(RecordingStorage::default());
        let s = snapshotter(
            vec![camera("Broken", ""), camera("Cam2", &server.uri())],
            storage.clone(),
        );

        let err = s.save_snapshots().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fetch);
        assert!(err.to_string().contains("Broken"));
        assert!(storage.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_serialized_snapshotter_still_saves() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data".to_vec()))
            .expect(2)
            .mount(&server)
            .await;

        let storage = Arc::new(RecordingStorage::default());
        let s = Arc::new(snapshotter(vec![camera("Cam1", &server.uri())], storage.clone()).serialized());

        let (first, second) = tokio::join!(s.save_snapshots(), s.save_snapshots());
        first.unwrap();
        second.unwrap();
        assert_eq!(storage.saved.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&HttpSettings::default()).is_ok());
        assert!(build_http_client(&HttpSettings {
            accept_invalid_certs: false
        })
        .is_ok());
    }
}
