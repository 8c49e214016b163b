//! Startup provisioning of the evidence bucket through the storage admin API.

use crate::traits::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct BucketSummary {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateBucketRequest<'a> {
    id: &'a str,
    name: &'a str,
    public: bool,
}

/// Lists buckets via `GET {admin_url}/bucket` and creates the configured one
/// as public via `POST {admin_url}/bucket` when it is missing.
#[derive(Clone)]
pub struct BucketProvisioner {
    client: reqwest::Client,
    admin_url: String,
    service_key: String,
    bucket: String,
}

impl BucketProvisioner {
    pub fn new(
        client: reqwest::Client,
        admin_url: impl Into<String>,
        service_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            client,
            admin_url: admin_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
            bucket: bucket.into(),
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
    }

    /// Returns `true` when the bucket had to be created.
    #[tracing::instrument(skip(self), fields(bucket = %self.bucket))]
    pub async fn ensure_bucket(&self) -> StorageResult<bool> {
        let url = format!("{}/bucket", self.admin_url);

        let response = self.authorized(self.client.get(&url)).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::BackendError(format!(
                "Listing buckets failed ({}): {}",
                status, body
            )));
        }

        let buckets: Vec<BucketSummary> = response.json().await?;
        if bucket_exists(&buckets, &self.bucket) {
            tracing::debug!("Bucket already exists");
            return Ok(false);
        }

        let response = self
            .authorized(self.client.post(&url))
            .json(&CreateBucketRequest {
                id: &self.bucket,
                name: &self.bucket,
                public: true,
            })
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::BackendError(format!(
                "Creating bucket failed ({}): {}",
                status, body
            )));
        }

        tracing::info!("Created public bucket");
        Ok(true)
    }
}

fn bucket_exists(buckets: &[BucketSummary], bucket: &str) -> bool {
    buckets
        .iter()
        .any(|b| b.name.as_deref() == Some(bucket) || b.id.as_deref() == Some(bucket))
}
