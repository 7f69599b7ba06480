use crate::error::ConfigError;
use crate::scheduler::CronSchedule;
use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

const ENV_PREFIX: &str = "CAMSNAP";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub cameras: Vec<CameraSettings>,
    pub snapshot: Option<SnapshotSettings>,
    pub storage: Option<StorageSettings>,
    /// IANA timezone the cron schedule is evaluated in. Local time when unset.
    pub tz: Option<String>,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub http: HttpSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CameraSettings {
    pub name: String,
    #[serde(default)]
    pub snapshot_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotSettings {
    pub cron_schedule: String,
    #[serde(default)]
    pub serialize_runs: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageSettings {
    pub local: Option<LocalStorageSettings>,
    pub s3: Option<S3StorageSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalStorageSettings {
    pub path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct S3StorageSettings {
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
    /// Custom S3-compatible endpoint (e.g. MinIO). Uses path-style addressing.
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    /// Skip TLS certificate verification when fetching snapshots.
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            accept_invalid_certs: default_accept_invalid_certs(),
        }
    }
}

fn default_accept_invalid_certs() -> bool {
    true
}

impl Settings {
    /// Reads the configuration file (format picked from its extension) and
    /// layers `CAMSNAP_*` environment overrides on top, e.g.
    /// `CAMSNAP_STORAGE__S3__SECRET_ACCESS_KEY`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(s.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.has_storage() {
            return Err(ConfigError::NoStorage);
        }
        if let Some(snapshot) = &self.snapshot {
            CronSchedule::parse(&snapshot.cron_schedule)?;
        }
        self.timezone()?;
        self.listen_addr()?;
        Ok(())
    }

    pub fn has_storage(&self) -> bool {
        self.storage
            .as_ref()
            .is_some_and(|storage| storage.local.is_some() || storage.s3.is_some())
    }

    pub fn timezone(&self) -> Result<Option<Tz>, ConfigError> {
        match self.tz.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(name) => name
                .parse::<Tz>()
                .map(Some)
                .map_err(|e| ConfigError::InvalidValue(format!("timezone {name:?}: {e}"))),
        }
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|e| ConfigError::InvalidValue(format!("Invalid host: {}", e)))?;
        Ok(SocketAddr::new(host, self.server.port))
    }
}

/// Loads and validates the configuration, failing when no storage backend
/// is configured.
pub fn load_config(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
    let settings = Settings::load(path)?;
    settings.validate()?;
    Ok(settings)
}
