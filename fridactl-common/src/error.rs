use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum FridaError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("HTTP Request Error: {0}")]
    Http(#[from] Arc<reqwest::Error>),

    #[error("JSON Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Network Error: Failed to download '{0}' from '{1}': {2}")]
    Network(String, String, String),

    #[error("IoError: {0}")]
    IoError(String),

    #[error("Validation Error: {0}")]
    Validation(String),

    #[error("Privileged command failed: {0}")]
    Privilege(String),

    #[error("Generic Error: {0}")]
    Generic(String),

    #[error("A download is already in progress, ignoring this request")]
    DownloadInProgress,

    #[error("'{name}' not found in the process table after {attempts} attempts")]
    ConfirmationTimeout { name: String, attempts: u32 },
}

impl FridaError {
    /// Failures that are reported as warnings rather than errors.
    pub fn is_benign(&self) -> bool {
        matches!(self, FridaError::ConfirmationTimeout { .. })
    }
}

impl From<std::io::Error> for FridaError {
    fn from(err: std::io::Error) -> Self {
        FridaError::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for FridaError {
    fn from(err: reqwest::Error) -> Self {
        FridaError::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for FridaError {
    fn from(err: serde_json::Error) -> Self {
        FridaError::Json(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, FridaError>;
