#[cfg(feature = "storage-drive")]
use crate::{DriveStorage, ServiceAccountKey};
#[cfg(feature = "storage-object")]
use crate::{BucketProvisioner, ObjectStorage};
use crate::{LocalStorage, StorageChain, StorageError, StorageResult, StorageTarget};
use casetrack_core::Config;
use std::sync::Arc;
use std::time::Duration;

/// HTTP client used for every outbound storage call.
pub fn outbound_client(timeout_secs: u64) -> StorageResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| StorageError::ConfigError(format!("Failed to build HTTP client: {}", e)))
}

/// Build the fallback chain from configuration.
///
/// Order: file-hosting API (when enabled and complete), object storage (when
/// a bucket is configured), local disk. A remote target that cannot be
/// constructed is logged and left out; the local target is always present.
pub async fn build_storage_chain(config: &Config) -> StorageResult<StorageChain> {
    let uploads = config.uploads();
    let local = Arc::new(LocalStorage::new(&uploads.dir, uploads.url_prefix.clone()).await?);
    let mut targets: Vec<Arc<dyn StorageTarget>> = Vec::new();

    if let Some(drive) = drive_target(config).await? {
        targets.push(drive);
    }
    if config.drive_misconfigured() {
        tracing::warn!(
            "DRIVE_ENABLED=true but DRIVE_SERVICE_ACCOUNT or DRIVE_FOLDER_ID is missing; Drive storage disabled"
        );
    }
    if let Some(object) = object_target(config) {
        targets.push(object);
    }

    targets.push(local.clone());

    let chain = StorageChain::new(local, targets);
    tracing::info!(targets = ?chain.backends(), "Storage chain ready");
    Ok(chain)
}

#[cfg(feature = "storage-drive")]
async fn drive_target(config: &Config) -> StorageResult<Option<Arc<dyn StorageTarget>>> {
    let Some(drive) = config.drive() else {
        return Ok(None);
    };
    match ServiceAccountKey::load(&drive.service_account).await {
        Ok(key) => {
            let client = outbound_client(config.outbound_timeout_secs())?;
            let target: Arc<dyn StorageTarget> =
                Arc::new(DriveStorage::new(client, key, drive.folder_id));
            Ok(Some(target))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Drive storage disabled: service account unusable");
            Ok(None)
        }
    }
}

#[cfg(not(feature = "storage-drive"))]
async fn drive_target(config: &Config) -> StorageResult<Option<Arc<dyn StorageTarget>>> {
    if config.drive().is_some() {
        tracing::warn!("Drive storage not available (storage-drive feature not enabled)");
    }
    Ok(None)
}

#[cfg(feature = "storage-object")]
fn object_target(config: &Config) -> Option<Arc<dyn StorageTarget>> {
    let object = config.object_storage()?;
    match ObjectStorage::new(
        object.bucket.clone(),
        object.region.clone(),
        object.endpoint.clone(),
        object.public_url.clone(),
        Duration::from_secs(config.outbound_timeout_secs()),
    ) {
        Ok(storage) => {
            let target: Arc<dyn StorageTarget> = Arc::new(storage);
            Some(target)
        }
        Err(e) => {
            tracing::warn!(error = %e, bucket = %object.bucket, "Object storage disabled");
            None
        }
    }
}

#[cfg(not(feature = "storage-object"))]
fn object_target(config: &Config) -> Option<Arc<dyn StorageTarget>> {
    if config.object_storage().is_some() {
        tracing::warn!("Object storage not available (storage-object feature not enabled)");
    }
    None
}

/// Best-effort creation of the configured bucket. Failures are logged.
#[cfg(feature = "storage-object")]
pub async fn provision_object_storage(config: &Config) {
    let Some(object) = config.object_storage() else {
        return;
    };
    let (Some(admin_url), Some(service_key)) = (&object.admin_url, &object.service_key) else {
        return;
    };
    let client = match outbound_client(config.outbound_timeout_secs()) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping bucket provisioning");
            return;
        }
    };
    let provisioner = BucketProvisioner::new(client, admin_url, service_key, &object.bucket);
    if let Err(e) = provisioner.ensure_bucket().await {
        tracing::warn!(error = %e, bucket = %object.bucket, "Bucket provisioning failed");
    }
}
