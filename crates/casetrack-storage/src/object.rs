use crate::traits::{FileMeta, StorageError, StorageResult, StorageTarget, StoredObject};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::{
    Attribute, Attributes, ClientOptions, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
    Result as ObjectResult,
};
use std::time::Duration;

/// S3-compatible object storage target
#[derive(Clone)]
pub struct ObjectStorage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>,
    public_url: Option<String>,
}

impl ObjectStorage {
    /// Create a new ObjectStorage instance
    ///
    /// # Arguments
    /// * `bucket` - Bucket name
    /// * `region` - Region identifier
    /// * `endpoint_url` - Custom endpoint for S3-compatible providers
    /// * `public_url` - Base for public URLs (`{public_url}/{bucket}/{key}`)
    /// * `timeout` - Bound on every request to the provider
    pub fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        public_url: Option<String>,
        timeout: Duration,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone())
            .with_client_options(ClientOptions::new().with_timeout(timeout));

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(ObjectStorage {
            store,
            bucket,
            region,
            endpoint_url,
            public_url,
        })
    }

    /// Public URL for an object.
    ///
    /// With a public base the key is percent-encoded; otherwise the endpoint is
    /// used path-style, falling back to the AWS virtual-hosted form.
    pub fn generate_url(&self, key: &str) -> String {
        object_url(
            &self.bucket,
            &self.region,
            self.endpoint_url.as_deref(),
            self.public_url.as_deref(),
            key,
        )
    }
}

fn object_url(
    bucket: &str,
    region: &str,
    endpoint: Option<&str>,
    public_url: Option<&str>,
    key: &str,
) -> String {
    match (public_url, endpoint) {
        (Some(public), _) => format!(
            "{}/{}/{}",
            public.trim_end_matches('/'),
            bucket,
            urlencoding::encode(key)
        ),
        (None, Some(endpoint)) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key),
        (None, None) => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key),
    }
}

#[async_trait]
impl StorageTarget for ObjectStorage {
    async fn store(&self, meta: &FileMeta, data: Bytes) -> StorageResult<StoredObject> {
        let key = meta.filename.clone();
        let size = data.len() as u64;
        let location = Path::from(key.clone());
        let start = std::time::Instant::now();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, meta.content_type.clone().into());

        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(data), PutOptions::from(attributes))
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Object storage upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        let url = self.generate_url(&key);

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object storage upload successful"
        );

        Ok(StoredObject {
            backend: StorageBackend::Object,
            key,
            url,
        })
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let location = Path::from(storage_key.to_string());

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Object storage delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object storage delete successful"
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Object
    }
}
