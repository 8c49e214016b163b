//! Domain methods for the case tracking API.

use crate::ApiClient;
use anyhow::{Context, Result};
use casetrack_core::models::{
    AttachMediaResponse, CrimeCase, DeleteMediaResponse, DeleteResponse, MediaKind,
};
use serde_json::Value;
use std::path::Path;
use uuid::Uuid;

/// Content type sent for a local file, from its extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "3gp" => "video/3gpp",
        _ => "application/octet-stream",
    }
}

fn upload_field(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Image => "images",
        MediaKind::Video => "videos",
    }
}

impl ApiClient {
    pub async fn list_cases(&self) -> Result<Vec<CrimeCase>> {
        self.get("/api/cases").await
    }

    pub async fn get_case(&self, id: Uuid) -> Result<CrimeCase> {
        self.get(&format!("/api/cases/{}", id)).await
    }

    /// Body is passed through untouched; the server parses numeric text.
    pub async fn create_case(&self, body: &Value) -> Result<CrimeCase> {
        self.post_json("/api/cases", body).await
    }

    pub async fn update_case(&self, id: Uuid, body: &Value) -> Result<CrimeCase> {
        self.put_json(&format!("/api/cases/{}", id), body).await
    }

    pub async fn delete_case(&self, id: Uuid) -> Result<DeleteResponse> {
        self.delete(&format!("/api/cases/{}", id)).await
    }

    /// Upload local files to a case in one multipart batch.
    pub async fn upload_media(
        &self,
        case_id: Uuid,
        kind: MediaKind,
        files: &[impl AsRef<Path>],
    ) -> Result<AttachMediaResponse> {
        let mut form = reqwest::multipart::Form::new();

        for file in files {
            let path = file.as_ref();
            if path
                .components()
                .any(|c| c == std::path::Component::ParentDir)
            {
                return Err(anyhow::anyhow!("Invalid input: {}", path.display()));
            }

            let data = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read file: {}", path.display()))?;
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload")
                .to_string();

            let part = reqwest::multipart::Part::bytes(data)
                .file_name(filename)
                .mime_str(content_type_for(path))
                .context("Invalid content type")?;
            form = form.part(upload_field(kind), part);
        }

        self.post_multipart(&format!("/api/cases/{}/media", case_id), form)
            .await
    }

    pub async fn delete_media(&self, case_id: Uuid, media_id: Uuid) -> Result<DeleteMediaResponse> {
        self.delete(&format!("/api/cases/{}/media/{}", case_id, media_id))
            .await
    }

    pub async fn crime_types(&self) -> Result<Vec<String>> {
        self.get("/api/catalog/crime-types").await
    }
}
