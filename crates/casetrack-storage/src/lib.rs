//! Casetrack Storage Library
//!
//! Evidence files are written through a [`StorageChain`]: the bytes are staged
//! on local disk, then offered to each configured target in order (file-hosting
//! API, object storage, local disk) until one accepts them.
//!
//! # Storage key format
//!
//! Keys are flat, storage-assigned filenames for the local and object targets,
//! and the remote file id for the file-hosting target. Keys must not contain
//! `..` or path separators.

pub mod chain;
#[cfg(feature = "storage-drive")]
pub mod drive;
pub mod factory;
pub mod local;
#[cfg(feature = "storage-object")]
pub mod object;
#[cfg(feature = "storage-object")]
pub mod provision;
pub mod traits;

// Re-export commonly used types
pub use casetrack_core::StorageBackend;
pub use chain::{ChainOutcome, StorageChain, TargetFailure};
#[cfg(feature = "storage-drive")]
pub use drive::{DriveStorage, ServiceAccountKey};
pub use factory::{build_storage_chain, outbound_client};
#[cfg(feature = "storage-object")]
pub use factory::provision_object_storage;
pub use local::LocalStorage;
#[cfg(feature = "storage-object")]
pub use object::ObjectStorage;
#[cfg(feature = "storage-object")]
pub use provision::BucketProvisioner;
pub use traits::{FileMeta, StorageError, StorageResult, StorageTarget, StoredObject};
