//! File-hosting API target (Google Drive v3 with a service account).

use crate::traits::{FileMeta, StorageError, StorageResult, StorageTarget, StoredObject};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_API_BASE: &str = "https://www.googleapis.com";
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;
/// Tokens this close to expiry are refreshed before use.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;
const LINK_FIELDS: &str = "id,webViewLink,webContentLink,thumbnailLink";

/// Relevant fields of a service-account key file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    /// Accepts the key JSON inline, or a path to the key file.
    pub async fn load(raw: &str) -> StorageResult<Self> {
        let raw = raw.trim();
        let json = if raw.starts_with('{') {
            raw.to_string()
        } else {
            tokio::fs::read_to_string(raw).await.map_err(|e| {
                StorageError::ConfigError(format!("Failed to read service account file {}: {}", raw, e))
            })?
        };
        serde_json::from_str(&json)
            .map_err(|e| StorageError::ConfigError(format!("Invalid service account JSON: {}", e)))
    }

    fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }
}

#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    web_view_link: Option<String>,
    #[serde(default)]
    web_content_link: Option<String>,
    #[serde(default)]
    thumbnail_link: Option<String>,
}

impl DriveFile {
    /// thumbnailLink, then webContentLink, then webViewLink, then the
    /// public view URL built from the id.
    fn preferred_url(&self) -> String {
        self.thumbnail_link
            .clone()
            .or_else(|| self.web_content_link.clone())
            .or_else(|| self.web_view_link.clone())
            .unwrap_or_else(|| {
                format!(
                    "https://drive.google.com/uc?export=view&id={}",
                    urlencoding::encode(&self.id)
                )
            })
    }

    /// Links from a later metadata fetch win over the upload response.
    fn merged_with(self, refreshed: DriveFile) -> DriveFile {
        DriveFile {
            id: self.id,
            web_view_link: refreshed.web_view_link.or(self.web_view_link),
            web_content_link: refreshed.web_content_link.or(self.web_content_link),
            thumbnail_link: refreshed.thumbnail_link.or(self.thumbnail_link),
        }
    }
}

/// Uploads evidence into a shared folder and makes it readable by link.
pub struct DriveStorage {
    client: reqwest::Client,
    key: ServiceAccountKey,
    folder_id: String,
    api_base: String,
    token: Mutex<Option<CachedToken>>,
}

impl DriveStorage {
    pub fn new(client: reqwest::Client, key: ServiceAccountKey, folder_id: impl Into<String>) -> Self {
        Self {
            client,
            key,
            folder_id: folder_id.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            token: Mutex::new(None),
        }
    }

    /// Point the client at a different API host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn signed_assertion(&self, now: i64) -> StorageResult<String> {
        let claims = JwtClaims {
            iss: &self.key.client_email,
            scope: DRIVE_SCOPE,
            aud: self.key.token_uri(),
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| StorageError::ConfigError(format!("Invalid service account key: {}", e)))?;
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| StorageError::AuthFailed(format!("Failed to sign assertion: {}", e)))
    }

    async fn access_token(&self) -> StorageResult<String> {
        let mut cached = self.token.lock().await;
        let now = Utc::now().timestamp();
        if let Some(token) = cached.as_ref() {
            if token.expires_at - TOKEN_REFRESH_MARGIN_SECS > now {
                return Ok(token.value.clone());
            }
        }

        let assertion = self.signed_assertion(now)?;
        let response = self
            .client
            .post(self.key.token_uri())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::AuthFailed(format!(
                "Failed to obtain access token ({}): {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        let expires_at = now + token.expires_in.unwrap_or(TOKEN_LIFETIME_SECS);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at,
        });
        Ok(token.access_token)
    }

    async fn grant_public_read(&self, token: &str, file_id: &str) {
        let url = format!(
            "{}/drive/v3/files/{}/permissions?supportsAllDrives=true",
            self.api_base,
            urlencoding::encode(file_id)
        );
        let result = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({
                "role": "reader",
                "type": "anyone",
                "allowFileDiscovery": false
            }))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!(file_id = %file_id, status = %response.status(), "Could not make file public");
            }
            Err(e) => {
                tracing::warn!(file_id = %file_id, error = %e, "Could not make file public");
            }
        }
    }

    async fn fetch_links(&self, token: &str, file_id: &str) -> Option<DriveFile> {
        let url = format!(
            "{}/drive/v3/files/{}?fields={}&supportsAllDrives=true",
            self.api_base,
            urlencoding::encode(file_id),
            LINK_FIELDS
        );
        let response = match self.client.get(&url).bearer_auth(token).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::debug!(file_id = %file_id, status = %response.status(), "Metadata refetch failed");
                return None;
            }
            Err(e) => {
                tracing::debug!(file_id = %file_id, error = %e, "Metadata refetch failed");
                return None;
            }
        };
        response.json::<DriveFile>().await.ok()
    }
}

/// Body of a `multipart/related` upload: JSON metadata, then the file bytes.
fn related_body(boundary: &str, metadata: &serde_json::Value, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 512);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--", boundary).as_bytes());
    body
}

#[async_trait]
impl StorageTarget for DriveStorage {
    async fn store(&self, meta: &FileMeta, data: Bytes) -> StorageResult<StoredObject> {
        let start = std::time::Instant::now();
        let size = data.len();
        let token = self.access_token().await?;

        let boundary = format!("casetrack-{:016x}", rand::random::<u64>());
        let metadata = serde_json::json!({
            "name": meta.filename,
            "parents": [self.folder_id],
        });
        let content_type = if meta.content_type.is_empty() {
            "application/octet-stream"
        } else {
            meta.content_type.as_str()
        };
        let body = related_body(&boundary, &metadata, content_type, &data);

        let url = format!(
            "{}/upload/drive/v3/files?uploadType=multipart&fields={}&supportsAllDrives=true",
            self.api_base, LINK_FIELDS
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                filename = %meta.filename,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Drive upload failed"
            );
            return Err(StorageError::UploadFailed(format!(
                "Drive upload failed ({}): {}",
                status, body
            )));
        }

        let uploaded: DriveFile = response.json().await?;
        self.grant_public_read(&token, &uploaded.id).await;
        let file = match self.fetch_links(&token, &uploaded.id).await {
            Some(refreshed) => uploaded.merged_with(refreshed),
            None => uploaded,
        };
        let url = file.preferred_url();

        tracing::info!(
            key = %file.id,
            filename = %meta.filename,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Drive upload successful"
        );

        Ok(StoredObject {
            backend: StorageBackend::Drive,
            key: file.id,
            url,
        })
    }

    async fn delete(&self, file_id: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let token = self.access_token().await?;
        let url = format!(
            "{}/drive/v3/files/{}?supportsAllDrives=true",
            self.api_base,
            urlencoding::encode(file_id)
        );
        let response = self.client.delete(&url).bearer_auth(&token).send().await?;

        let status = response.status();
        if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::DeleteFailed(format!(
                "Drive delete failed ({}): {}",
                status, body
            )));
        }

        tracing::info!(
            key = %file_id,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Drive delete successful"
        );
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Drive
    }
}
