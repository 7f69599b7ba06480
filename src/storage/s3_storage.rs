use super::content_type::key_with_extension;
use super::{path_for_snapshot, Storage};
use crate::config::{CameraSettings, S3StorageSettings};
use crate::error::{S3Error, StorageError};
use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::info;

const CREDENTIALS_PROVIDER: &str = "camsnap-config";

pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    /// Builds a client authenticated with the static credentials from the
    /// configuration.
    pub async fn new(settings: &S3StorageSettings) -> Result<Self, StorageError> {
        validate_settings(settings)?;

        let credentials = Credentials::new(
            settings.access_key_id.clone(),
            settings.secret_access_key.clone(),
            None,
            None,
            CREDENTIALS_PROVIDER,
        );
        let config = aws_config::defaults(aws_config::BehaviorVersion::v2024_03_28())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;
        let mut s3_config = aws_sdk_s3::config::Builder::from(&config);
        if let Some(endpoint) = settings.endpoint.as_deref().filter(|e| !e.is_empty()) {
            s3_config = s3_config.endpoint_url(endpoint).force_path_style(true);
        }
        let client = Client::from_conf(s3_config.build());

        info!(bucket = %settings.bucket, region = %settings.region, "Created S3 client");
        Ok(Self {
            client,
            bucket: settings.bucket.clone(),
        })
    }
}

fn validate_settings(settings: &S3StorageSettings) -> Result<(), S3Error> {
    if settings.bucket.trim().is_empty() {
        return Err(S3Error::Config("bucket must not be empty".to_string()));
    }
    let region_valid = !settings.region.is_empty()
        && settings
            .region
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !region_valid {
        return Err(S3Error::Config(format!(
            "invalid region {:?}",
            settings.region
        )));
    }
    Ok(())
}

#[async_trait]
impl Storage for S3Storage {
    async fn save_snapshot(&self, camera: &CameraSettings, data: &[u8]) -> Result<(), StorageError> {
        let (key, content_type) = key_with_extension(path_for_snapshot(camera), data);
        let body = ByteStream::from(data.to_vec());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| S3Error::Upload(DisplayErrorContext(&e).to_string()))?;

        info!(bucket = %self.bucket, key = %key, content_type, "Uploaded snapshot to S3");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(bucket: &str, region: &str) -> S3StorageSettings {
        S3StorageSettings {
            bucket: bucket.to_string(),
            region: region.to_string(),
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            endpoint: None,
        }
    }

    const JPEG: &[u8] = b"\xFF\xD8\xFF\xE0\x00\x10JFIF\x00";

    fn camera() -> CameraSettings {
        CameraSettings {
            name: "Cam1".to_string(),
            snapshot_url: "http://camera.local/snapshot.jpg".to_string(),
        }
    }

    async fn storage_for(server: &MockServer) -> S3Storage {
        let settings = S3StorageSettings {
            endpoint: Some(server.uri()),
            ..settings("snapshots-bucket", "us-east-1")
        };
        S3Storage::new(&settings).await.unwrap()
    }

    #[tokio::test]
    async fn test_upload_uses_snapshot_key_and_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(
                r"^/snapshots-bucket/snapshots/cam1/\d{4}/\d{1,2}/\d{1,2}/\d+\.jpg$",
            ))
            .and(header("content-type", "image/jpeg"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let storage = storage_for(&server).await;
        storage.save_snapshot(&camera(), JPEG).await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_failure_maps_to_upload_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1..)
            .mount(&server)
            .await;

        let storage = storage_for(&server).await;
        let result = storage.save_snapshot(&camera(), JPEG).await;
        assert!(matches!(result, Err(StorageError::S3(S3Error::Upload(_)))));
    }

    #[test]
    fn test_validate_accepts_well_formed_settings() {
        assert!(validate_settings(&settings("snapshots", "ap-southeast-2")).is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_bucket() {
        assert!(matches!(
            validate_settings(&settings("  ", "us-east-1")),
            Err(S3Error::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_malformed_region() {
        for region in ["", "us east 1", "us-east-1/../"] {
            assert!(
                matches!(
                    validate_settings(&settings("snapshots", region)),
                    Err(S3Error::Config(_))
                ),
                "region {region:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_new_fails_for_malformed_region() {
        let result = S3Storage::new(&settings("snapshots", "not a region")).await;
        assert!(matches!(result, Err(StorageError::S3(S3Error::Config(_)))));
    }
}
