use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage backend types
///
/// Recorded on every media row so that deletion can be routed to the target
/// that actually holds the bytes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, utoipa::ToSchema,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "storage_backend", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// File-hosting API (service-account upload into a shared folder)
    Drive,
    /// S3-compatible object storage bucket
    Object,
    /// Local disk served under the uploads prefix
    Local,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drive" => Ok(StorageBackend::Drive),
            "object" | "s3" => Ok(StorageBackend::Object),
            "local" => Ok(StorageBackend::Local),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::Drive => write!(f, "drive"),
            StorageBackend::Object => write!(f, "object"),
            StorageBackend::Local => write!(f, "local"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!("Drive".parse::<StorageBackend>().unwrap(), StorageBackend::Drive);
        assert_eq!("s3".parse::<StorageBackend>().unwrap(), StorageBackend::Object);
        assert_eq!(StorageBackend::Local.to_string(), "local");
        assert!("nfs".parse::<StorageBackend>().is_err());
    }
}
