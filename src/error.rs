use std::io;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to get snapshot for camera {camera}: {source}")]
    Fetch {
        camera: String,
        #[source]
        source: FetchError,
    },

    #[error("Failed to save snapshot for camera {camera}: {source}")]
    Save {
        camera: String,
        #[source]
        source: StorageError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

/// Coarse classification of an [`Error`], for callers that need to branch
/// on the failure category rather than its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Fetch,
    Storage,
    Server,
    Scheduler,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::IO(_) => ErrorKind::Io,
            Error::Config(_) => ErrorKind::Config,
            Error::Fetch { .. } => ErrorKind::Fetch,
            Error::Save { .. } | Error::Storage(_) => ErrorKind::Storage,
            Error::Server(_) => ErrorKind::Server,
            Error::Scheduler(_) => ErrorKind::Scheduler,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("No storage configured")]
    NoStorage,

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("empty snapshot URL")]
    EmptyUrl,

    #[error("unexpected HTTP status: {0}")]
    Status(reqwest::StatusCode),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("Local storage error: {0}")]
    Local(#[from] LocalError),

    #[error("S3 error: {0}")]
    S3(#[from] S3Error),

    #[error("Failed to save snapshot using storage {name}: {source}")]
    Backend {
        name: String,
        #[source]
        source: Box<StorageError>,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum LocalError {
    #[error("Failed to create snapshot directory: {0}")]
    DirectoryCreation(io::Error),

    #[error("Failed to create snapshot file: {0}")]
    FileCreate(io::Error),

    #[error("Failed to write snapshot data: {0}")]
    FileWrite(io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum S3Error {
    #[error("S3 config error: {0}")]
    Config(String),

    #[error("failed to upload to S3: {0}")]
    Upload(String),
}

#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("HTTP listener error: {0}")]
    Serve(io::Error),

    #[error("Server task failed: {0}")]
    Task(String),
}

#[derive(thiserror::Error, Debug)]
pub enum SchedulerError {
    #[error("Scheduler task failed during shutdown: {0}")]
    Shutdown(String),
}

pub type Result<T> = std::result::Result<T, Error>;
