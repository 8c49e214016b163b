//! Ordered fallback over storage targets.

use crate::local::LocalStorage;
use crate::traits::{FileMeta, StorageResult, StorageTarget, StoredObject};
use crate::StorageBackend;
use bytes::Bytes;
use std::sync::Arc;

/// A target that refused a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFailure {
    pub backend: StorageBackend,
    pub error: String,
}

/// Result of offering one file to the chain.
#[derive(Debug, Clone, Default)]
pub struct ChainOutcome {
    /// The winning target's placement, if any target accepted the file
    pub stored: Option<StoredObject>,
    /// Targets that failed, in the order they were tried
    pub failures: Vec<TargetFailure>,
}

/// Stages files locally, then walks `targets` until one accepts the file.
#[derive(Clone)]
pub struct StorageChain {
    staging: Arc<LocalStorage>,
    targets: Vec<Arc<dyn StorageTarget>>,
}

impl StorageChain {
    pub fn new(staging: Arc<LocalStorage>, targets: Vec<Arc<dyn StorageTarget>>) -> Self {
        Self { staging, targets }
    }

    /// Chain with only the local target.
    pub fn local_only(local: Arc<LocalStorage>) -> Self {
        let target: Arc<dyn StorageTarget> = local.clone();
        Self::new(local, vec![target])
    }

    /// Backends in the order they are tried.
    pub fn backends(&self) -> Vec<StorageBackend> {
        self.targets.iter().map(|t| t.backend_type()).collect()
    }

    pub fn staging(&self) -> &LocalStorage {
        &self.staging
    }

    #[tracing::instrument(skip(self, data), fields(filename = %meta.filename, size_bytes = data.len()))]
    pub async fn store(&self, meta: &FileMeta, data: Bytes) -> ChainOutcome {
        let mut outcome = ChainOutcome::default();

        let staged = match self.staging.store(meta, data.clone()).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to stage file locally");
                false
            }
        };

        for target in &self.targets {
            let backend = target.backend_type();
            match target.store(meta, data.clone()).await {
                Ok(stored) => {
                    if staged && backend != StorageBackend::Local {
                        self.discard_staged(&meta.filename).await;
                    }
                    tracing::info!(
                        backend = %backend,
                        key = %stored.key,
                        fallbacks = outcome.failures.len(),
                        "File stored"
                    );
                    outcome.stored = Some(stored);
                    return outcome;
                }
                Err(e) => {
                    tracing::warn!(
                        backend = %backend,
                        error = %e,
                        "Storage target failed, trying next"
                    );
                    outcome.failures.push(TargetFailure {
                        backend,
                        error: e.to_string(),
                    });
                }
            }
        }

        if staged {
            self.discard_staged(&meta.filename).await;
        }
        tracing::error!(attempts = outcome.failures.len(), "Every storage target failed");
        outcome
    }

    /// Delete an object from the target recorded as holding it. Backends
    /// without a configured target are skipped with a warning.
    pub async fn delete(&self, backend: StorageBackend, key: &str) -> StorageResult<()> {
        if let Some(target) = self.targets.iter().find(|t| t.backend_type() == backend) {
            return target.delete(key).await;
        }
        if backend == StorageBackend::Local {
            return self.staging.delete(key).await;
        }
        tracing::warn!(
            backend = %backend,
            key = %key,
            "No storage target configured for backend; object left in place"
        );
        Ok(())
    }

    async fn discard_staged(&self, filename: &str) {
        if let Err(e) = self.staging.delete(filename).await {
            tracing::warn!(error = %e, filename = %filename, "Failed to remove staged copy");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::StorageError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Target that records deletions and either accepts or refuses uploads.
    struct FakeTarget {
        backend: StorageBackend,
        fail: bool,
        deleted: Mutex<Vec<String>>,
    }

    impl FakeTarget {
        fn new(backend: StorageBackend, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                backend,
                fail,
                deleted: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl StorageTarget for FakeTarget {
        async fn store(&self, meta: &FileMeta, _data: Bytes) -> StorageResult<StoredObject> {
            if self.fail {
                return Err(StorageError::UploadFailed(format!("{} offline", self.backend)));
            }
            Ok(StoredObject {
                backend: self.backend,
                key: format!("remote-{}", meta.filename),
                url: format!("https://files.test/{}", meta.filename),
            })
        }

        async fn delete(&self, key: &str) -> StorageResult<()> {
            self.deleted.lock().unwrap().push(key.to_string());
            Ok(())
        }

        fn backend_type(&self) -> StorageBackend {
            self.backend
        }
    }

    fn meta() -> FileMeta {
        FileMeta {
            filename: "escena-1-2.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
        }
    }

    #[tokio::test]
    async fn test_remote_success_discards_staged_copy() {
        let dir = tempdir().unwrap();
        let local = Arc::new(LocalStorage::new(dir.path(), "/uploads").await.unwrap());
        let drive = FakeTarget::new(StorageBackend::Drive, false);
        let chain = StorageChain::new(local.clone(), vec![drive, local.clone()]);

        let outcome = chain.store(&meta(), Bytes::from_static(b"data")).await;

        let stored = outcome.stored.unwrap();
        assert_eq!(stored.backend, StorageBackend::Drive);
        assert!(outcome.failures.is_empty());
        assert!(!local.exists("escena-1-2.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn test_falls_back_to_local_and_keeps_file() {
        let dir = tempdir().unwrap();
        let local = Arc::new(LocalStorage::new(dir.path(), "/uploads").await.unwrap());
        let drive = FakeTarget::new(StorageBackend::Drive, true);
        let object = FakeTarget::new(StorageBackend::Object, true);
        let chain = StorageChain::new(local.clone(), vec![drive, object, local.clone()]);

        let outcome = chain.store(&meta(), Bytes::from_static(b"data")).await;

        assert_eq!(outcome.stored.unwrap().url, "/uploads/escena-1-2.jpg");
        assert_eq!(
            outcome.failures.iter().map(|f| f.backend).collect::<Vec<_>>(),
            vec![StorageBackend::Drive, StorageBackend::Object]
        );
        assert!(local.exists("escena-1-2.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn test_all_targets_failing_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        let local = Arc::new(LocalStorage::new(dir.path(), "/uploads").await.unwrap());
        let object = FakeTarget::new(StorageBackend::Object, true);
        let chain = StorageChain::new(local.clone(), vec![object]);

        let outcome = chain.store(&meta(), Bytes::from_static(b"data")).await;

        assert!(outcome.stored.is_none());
        assert_eq!(outcome.failures.len(), 1);
        assert!(!local.exists("escena-1-2.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_routes_by_backend() {
        let dir = tempdir().unwrap();
        let local = Arc::new(LocalStorage::new(dir.path(), "/uploads").await.unwrap());
        let drive = FakeTarget::new(StorageBackend::Drive, false);
        let chain = StorageChain::new(local.clone(), vec![drive.clone(), local.clone()]);

        chain.delete(StorageBackend::Drive, "file-id").await.unwrap();
        assert_eq!(drive.deleted.lock().unwrap().as_slice(), ["file-id".to_string()]);

        // No object target configured: skipped
        chain.delete(StorageBackend::Object, "gone.jpg").await.unwrap();
        assert_eq!(
            chain.backends(),
            vec![StorageBackend::Drive, StorageBackend::Local]
        );
    }
}
