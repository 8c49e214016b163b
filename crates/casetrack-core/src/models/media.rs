use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::constants::{IMAGE_FIELDS, VIDEO_FIELDS};
use crate::storage_types::StorageBackend;

/// Kind of evidence, decided by the multipart field the file arrived in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "media_kind", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Maps an upload field name (`images`, `images[]`, `videos`, `videos[]`).
    pub fn from_field(field: &str) -> Option<Self> {
        if IMAGE_FIELDS.contains(&field) {
            Some(MediaKind::Image)
        } else if VIDEO_FIELDS.contains(&field) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// A stored piece of evidence attached to exactly one case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaseMedia {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub url: String,
    /// Storage-assigned name, not the client's original filename
    pub filename: String,
    pub backend: StorageBackend,
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_field() {
        assert_eq!(MediaKind::from_field("images"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_field("images[]"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_field("videos[]"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_field("avatar"), None);
        assert_eq!(MediaKind::from_field("Images"), None);
    }

    #[test]
    fn test_media_serializes_kind_as_type() {
        let media = CaseMedia {
            id: Uuid::new_v4(),
            kind: MediaKind::Video,
            url: "/uploads/clip-1-2.mp4".to_string(),
            filename: "clip-1-2.mp4".to_string(),
            backend: StorageBackend::Local,
            storage_key: "clip-1-2.mp4".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&media).unwrap();
        assert_eq!(json["type"], "video");
        assert_eq!(json["backend"], "local");
        assert_eq!(json["storageKey"], "clip-1-2.mp4");
    }
}
