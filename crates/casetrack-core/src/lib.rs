//! Casetrack Core Library
//!
//! Domain models, error types, configuration and input validation shared by
//! every Casetrack component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::{
    BaseConfig, CasetrackConfig, Config, DriveConfig, DriveSettings, IdentityConfig,
    ObjectStorageConfig, UploadConfig,
};
pub use error::{AppError, AppResult, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
