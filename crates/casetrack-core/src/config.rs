//! Configuration module
//!
//! Settings are read from the environment (a `.env` file is honoured when
//! present) and validated once at startup.

use std::env;
use std::path::PathBuf;

const PORT: u16 = 8080;
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const OUTBOUND_TIMEOUT_SECS: u64 = 30;
const MAX_IMAGE_SIZE_MB: usize = 15;
const MAX_VIDEO_SIZE_MB: usize = 200;
const MAX_IMAGES_PER_REQUEST: usize = 10;
const MAX_VIDEOS_PER_REQUEST: usize = 5;
const UPLOAD_DEDUP_WINDOW_SECS: u64 = 120;
const OBJECT_STORAGE_REGION: &str = "us-east-1";

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            server_port: PORT,
            cors_origins: vec!["*".to_string()],
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            environment: "development".to_string(),
        }
    }
}

/// Upload limits and the local evidence directory
#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub url_prefix: String,
    pub max_image_size_bytes: usize,
    pub max_video_size_bytes: usize,
    pub max_images_per_request: usize,
    pub max_videos_per_request: usize,
    pub dedup_window_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("public/uploads"),
            url_prefix: "/uploads".to_string(),
            max_image_size_bytes: MAX_IMAGE_SIZE_MB * 1024 * 1024,
            max_video_size_bytes: MAX_VIDEO_SIZE_MB * 1024 * 1024,
            max_images_per_request: MAX_IMAGES_PER_REQUEST,
            max_videos_per_request: MAX_VIDEOS_PER_REQUEST,
            dedup_window_secs: UPLOAD_DEDUP_WINDOW_SECS,
        }
    }
}

/// S3-compatible object storage
#[derive(Clone, Debug)]
pub struct ObjectStorageConfig {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible providers
    pub endpoint: Option<String>,
    /// Base for public object URLs: `{public_url}/{bucket}/{key}`
    pub public_url: Option<String>,
    /// Admin REST API used to provision the bucket at startup
    pub admin_url: Option<String>,
    pub service_key: Option<String>,
}

/// File-hosting API settings as read from the environment.
#[derive(Clone, Debug, Default)]
pub struct DriveSettings {
    pub enabled: bool,
    /// Service-account JSON, either inline or a path to the file
    pub service_account: Option<String>,
    pub folder_id: Option<String>,
}

/// Complete file-hosting credentials; only built when the target is usable.
#[derive(Clone, Debug)]
pub struct DriveConfig {
    pub service_account: String,
    pub folder_id: String,
}

/// External GoTrue-compatible identity service
#[derive(Clone, Debug)]
pub struct IdentityConfig {
    pub url: String,
    pub api_key: String,
    /// Admin key for user creation and confirmation
    pub service_key: Option<String>,
}

#[derive(Clone, Debug)]
pub struct CasetrackConfig {
    pub base: BaseConfig,
    /// Unset selects the in-memory record store
    pub database_url: Option<String>,
    pub uploads: UploadConfig,
    pub outbound_timeout_secs: u64,
    pub object_storage: Option<ObjectStorageConfig>,
    pub drive: DriveSettings,
    pub identity: Option<IdentityConfig>,
}

impl Default for CasetrackConfig {
    fn default() -> Self {
        Self {
            base: BaseConfig::default(),
            database_url: None,
            uploads: UploadConfig::default(),
            outbound_timeout_secs: OUTBOUND_TIMEOUT_SECS,
            object_storage: None,
            drive: DriveSettings::default(),
            identity: None,
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug, Default)]
pub struct Config(pub Box<CasetrackConfig>);

impl Config {
    pub fn new(inner: CasetrackConfig) -> Self {
        Config(Box::new(inner))
    }

    fn inner(&self) -> &CasetrackConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_env(&self.inner().base.environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = CasetrackConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn database_url(&self) -> Option<&str> {
        self.inner().database_url.as_deref()
    }

    pub fn uploads(&self) -> &UploadConfig {
        &self.inner().uploads
    }

    pub fn outbound_timeout_secs(&self) -> u64 {
        self.inner().outbound_timeout_secs
    }

    pub fn object_storage(&self) -> Option<&ObjectStorageConfig> {
        self.inner().object_storage.as_ref()
    }

    pub fn drive_settings(&self) -> &DriveSettings {
        &self.inner().drive
    }

    /// Usable file-hosting credentials, or `None` when disabled or incomplete.
    pub fn drive(&self) -> Option<DriveConfig> {
        let drive = &self.inner().drive;
        if !drive.enabled {
            return None;
        }
        match (&drive.service_account, &drive.folder_id) {
            (Some(service_account), Some(folder_id)) => Some(DriveConfig {
                service_account: service_account.clone(),
                folder_id: folder_id.clone(),
            }),
            _ => None,
        }
    }

    /// True when `DRIVE_ENABLED=true` but credentials or folder are missing.
    pub fn drive_misconfigured(&self) -> bool {
        self.inner().drive.enabled && self.drive().is_none()
    }

    pub fn identity(&self) -> Option<&IdentityConfig> {
        self.inner().identity.as_ref()
    }
}

pub fn is_production_env(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl CasetrackConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        if is_production_env(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: parsed_var("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: parsed_var("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            environment,
        };

        let uploads = UploadConfig {
            dir: PathBuf::from(
                optional_var("UPLOADS_DIR").unwrap_or_else(|| "public/uploads".to_string()),
            ),
            url_prefix: optional_var("UPLOADS_URL_PREFIX")
                .unwrap_or_else(|| "/uploads".to_string())
                .trim_end_matches('/')
                .to_string(),
            max_image_size_bytes: parsed_var("MAX_IMAGE_SIZE_MB", MAX_IMAGE_SIZE_MB) * 1024 * 1024,
            max_video_size_bytes: parsed_var("MAX_VIDEO_SIZE_MB", MAX_VIDEO_SIZE_MB) * 1024 * 1024,
            max_images_per_request: parsed_var("MAX_IMAGES_PER_REQUEST", MAX_IMAGES_PER_REQUEST),
            max_videos_per_request: parsed_var("MAX_VIDEOS_PER_REQUEST", MAX_VIDEOS_PER_REQUEST),
            dedup_window_secs: parsed_var("UPLOAD_DEDUP_WINDOW_SECS", UPLOAD_DEDUP_WINDOW_SECS),
        };

        let object_storage = optional_var("OBJECT_STORAGE_BUCKET").map(|bucket| ObjectStorageConfig {
            bucket,
            region: optional_var("OBJECT_STORAGE_REGION")
                .unwrap_or_else(|| OBJECT_STORAGE_REGION.to_string()),
            endpoint: optional_var("OBJECT_STORAGE_ENDPOINT"),
            public_url: optional_var("OBJECT_STORAGE_PUBLIC_URL")
                .map(|u| u.trim_end_matches('/').to_string()),
            admin_url: optional_var("OBJECT_STORAGE_ADMIN_URL")
                .map(|u| u.trim_end_matches('/').to_string()),
            service_key: optional_var("OBJECT_STORAGE_SERVICE_KEY"),
        });

        let drive = DriveSettings {
            enabled: env::var("DRIVE_ENABLED")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            service_account: optional_var("DRIVE_SERVICE_ACCOUNT"),
            folder_id: optional_var("DRIVE_FOLDER_ID"),
        };

        let identity = match (optional_var("IDENTITY_URL"), optional_var("IDENTITY_API_KEY")) {
            (Some(url), Some(api_key)) => Some(IdentityConfig {
                url: url.trim_end_matches('/').to_string(),
                api_key,
                service_key: optional_var("IDENTITY_SERVICE_KEY"),
            }),
            _ => None,
        };

        Ok(CasetrackConfig {
            base,
            database_url: optional_var("DATABASE_URL"),
            uploads,
            outbound_timeout_secs: parsed_var("OUTBOUND_TIMEOUT_SECS", OUTBOUND_TIMEOUT_SECS),
            object_storage,
            drive,
            identity,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        if is_production_env(&self.base.environment)
            && self.base.cors_origins.iter().any(|o| o == "*")
        {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.uploads.max_image_size_bytes == 0 || self.uploads.max_video_size_bytes == 0 {
            return Err(anyhow::anyhow!(
                "MAX_IMAGE_SIZE_MB and MAX_VIDEO_SIZE_MB must be greater than zero"
            ));
        }

        if !self.uploads.url_prefix.starts_with('/') {
            return Err(anyhow::anyhow!("UPLOADS_URL_PREFIX must start with '/'"));
        }

        if self.outbound_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "OUTBOUND_TIMEOUT_SECS must be greater than zero"
            ));
        }

        if let Some(object) = &self.object_storage {
            if object.admin_url.is_some() != object.service_key.is_some() {
                return Err(anyhow::anyhow!(
                    "OBJECT_STORAGE_ADMIN_URL and OBJECT_STORAGE_SERVICE_KEY must be set together"
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(inner: CasetrackConfig) -> Config {
        Config::new(inner)
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server_port(), 8080);
        assert_eq!(config.uploads().max_images_per_request, 10);
        assert_eq!(config.uploads().max_videos_per_request, 5);
        assert_eq!(config.uploads().dedup_window_secs, 120);
        assert_eq!(config.uploads().max_image_size_bytes, 15 * 1024 * 1024);
        assert!(config.database_url().is_none());
    }

    #[test]
    fn test_rejects_non_postgres_url() {
        let config = config_with(CasetrackConfig {
            database_url: Some("mysql://localhost/cases".to_string()),
            ..Default::default()
        });
        assert!(config.validate().is_err());

        let config = config_with(CasetrackConfig {
            database_url: Some("postgres://localhost/cases".to_string()),
            ..Default::default()
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_wildcard_cors_in_production() {
        let config = config_with(CasetrackConfig {
            base: BaseConfig {
                environment: "production".to_string(),
                ..Default::default()
            },
            ..Default::default()
        });
        assert!(config.is_production());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_drive_requires_complete_credentials() {
        let config = config_with(CasetrackConfig {
            drive: DriveSettings {
                enabled: true,
                service_account: None,
                folder_id: Some("folder".to_string()),
            },
            ..Default::default()
        });
        assert!(config.drive().is_none());
        assert!(config.drive_misconfigured());

        let config = config_with(CasetrackConfig {
            drive: DriveSettings {
                enabled: true,
                service_account: Some("{}".to_string()),
                folder_id: Some("folder".to_string()),
            },
            ..Default::default()
        });
        assert_eq!(config.drive().map(|d| d.folder_id), Some("folder".to_string()));
        assert!(!config.drive_misconfigured());
    }

    #[test]
    fn test_disabled_drive_is_not_misconfigured() {
        let config = Config::default();
        assert!(config.drive().is_none());
        assert!(!config.drive_misconfigured());
    }
}
