use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Invalid manifest: {0}")]
    ManifestShape(String),

    #[error("Invalid {0} in the manifest file")]
    ManifestField(&'static str),

    #[error("Invalid response of the {0} method")]
    Response(&'static str),

    #[error("Invalid {0} of the dapp")]
    DappField(&'static str),

    #[error("Failed to open the dapp archive: {0}")]
    ArchiveOpen(String),

    #[error("No manifest.json entry in the dapp archive")]
    InvalidArchive,

    #[error("Failed to prepare folder {0}: {1}")]
    InstallPrepare(String, String),

    #[error("Extraction produced no files in {0}")]
    ExtractFailed(String),

    #[error("Publish Error: {0}")]
    Publish(String),

    #[error("Contract Error: {0}")]
    Contract(String),

    #[error("Content Store Error: {0}")]
    ContentStore(String),

    #[error("Resource Not Found: {0}")]
    NotFound(String),

    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),

    #[error("Generic Error: {0}")]
    Generic(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Json(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
