//! Data models for the application
//!
//! Cases, their media, and the request/response shapes of the upload flow.

mod case;
mod media;
mod upload;

pub use case::{
    hour_format, CaseInput, CasePatch, CaseStatus, CrimeCase, NewCase, NumericInput,
    REQUIRED_CASE_FIELDS,
};
pub use media::{CaseMedia, MediaKind};
pub use upload::{
    AttachMediaResponse, DeleteMediaResponse, DeleteResponse, RejectReason, RejectedUpload,
    UploadWarning,
};
