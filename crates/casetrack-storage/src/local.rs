use crate::traits::{FileMeta, StorageError, StorageResult, StorageTarget, StoredObject};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage. Files are served statically under `url_prefix`.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
    url_prefix: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for evidence files (e.g., "public/uploads")
    /// * `url_prefix` - Public prefix the directory is served under (e.g., "/uploads")
    pub async fn new(base_path: impl Into<PathBuf>, url_prefix: impl Into<String>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert storage key to filesystem path. Keys are flat filenames.
    pub fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty()
            || storage_key.contains("..")
            || storage_key.contains('/')
            || storage_key.contains('\\')
        {
            return Err(StorageError::InvalidKey(format!(
                "Storage key contains invalid characters: {}",
                storage_key
            )));
        }

        Ok(self.base_path.join(storage_key))
    }

    /// Generate public URL for file
    pub fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.url_prefix, urlencoding::encode(key))
    }

    pub async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(storage_key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        let mut file = fs::File::create(path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        Ok(())
    }
}

#[async_trait]
impl StorageTarget for LocalStorage {
    async fn store(&self, meta: &FileMeta, data: Bytes) -> StorageResult<StoredObject> {
        let key = meta.filename.clone();
        let path = self.key_to_path(&key)?;
        let size = data.len();
        let start = std::time::Instant::now();

        // A staged copy of the same file is kept as-is.
        let already_staged = match fs::metadata(&path).await {
            Ok(existing) => existing.len() == size as u64,
            Err(_) => false,
        };
        if !already_staged {
            self.write_file(&path, &data).await?;
        }

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            reused = already_staged,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(StoredObject {
            backend: StorageBackend::Local,
            url: self.generate_url(&key),
            key,
        })
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
