//! Storage abstraction trait
//!
//! Every backend evidence can be written to implements [`StorageTarget`].

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use casetrack_core::AppError;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StorageError::BackendError(format!("request timed out: {}", err))
        } else {
            StorageError::BackendError(err.to_string())
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("File not found: {}", key)),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// What a target needs to know about a file besides its bytes.
#[derive(Debug, Clone)]
pub struct FileMeta {
    /// Storage-assigned filename
    pub filename: String,
    /// Normalized MIME type
    pub content_type: String,
}

/// Where a file ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub backend: StorageBackend,
    /// Identifier used to delete the object later
    pub key: String,
    /// Publicly reachable URL
    pub url: String,
}

#[async_trait]
pub trait StorageTarget: Send + Sync {
    /// Write the file and return where it lives.
    async fn store(&self, meta: &FileMeta, data: Bytes) -> StorageResult<StoredObject>;

    /// Remove a previously stored object. Missing objects are not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    fn backend_type(&self) -> StorageBackend;
}
