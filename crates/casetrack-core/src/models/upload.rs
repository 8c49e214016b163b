use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{CaseMedia, CrimeCase};
use crate::storage_types::StorageBackend;

/// Why a file in an upload batch was not stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    InvalidMime,
    UnexpectedField,
    DuplicateRecent,
    TooManyFiles,
    FileTooLarge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RejectedUpload {
    pub field: String,
    pub originalname: String,
    pub mimetype: String,
    pub reason: RejectReason,
}

/// Non-fatal problem reported alongside an upload batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UploadWarning {
    /// A target failed and the next one in the chain was tried
    StorageFallback {
        filename: String,
        backend: StorageBackend,
        error: String,
    },
    /// Every storage target failed for this file
    StorageFailed { filename: String, error: String },
    /// The file was stored but its media row could not be written
    MetadataWriteFailed { filename: String, error: String },
    RejectedUploads { items: Vec<RejectedUpload> },
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttachMediaResponse {
    pub added: Vec<CaseMedia>,
    pub case: CrimeCase,
    pub warnings: Vec<UploadWarning>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteMediaResponse {
    pub success: bool,
    pub case: CrimeCase,
}
