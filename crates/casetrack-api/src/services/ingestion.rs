//! Multipart evidence ingestion: routing, allow-listing, dedup, storage and
//! metadata writes for one upload batch.

use bytes::Bytes;
use casetrack_core::models::{
    AttachMediaResponse, CaseMedia, MediaKind, RejectReason, RejectedUpload, UploadWarning,
};
use casetrack_core::validation::{is_allowed_mime, normalize_mime_type, storage_filename};
use casetrack_core::{AppError, AppResult, UploadConfig};
use casetrack_db::CaseStore;
use casetrack_storage::{ChainOutcome, FileMeta, StorageChain};
use std::sync::Arc;
use uuid::Uuid;

use super::timestamp;
use super::upload::dedup::{dedup_key, DedupCache};

/// One file received in a multipart request.
#[derive(Debug, Clone)]
pub struct ReceivedFile {
    pub field: String,
    pub original_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Files of one request in arrival order.
#[derive(Debug, Clone, Default)]
pub struct UploadBatch {
    pub files: Vec<ReceivedFile>,
}

impl UploadBatch {
    pub fn push(&mut self, file: ReceivedFile) {
        self.files.push(file);
    }
}

/// Per-request limits applied before anything is stored.
#[derive(Debug, Clone)]
pub struct UploadLimits {
    pub max_image_size_bytes: usize,
    pub max_video_size_bytes: usize,
    pub max_images_per_request: usize,
    pub max_videos_per_request: usize,
}

impl UploadLimits {
    fn max_size(&self, kind: MediaKind) -> usize {
        match kind {
            MediaKind::Image => self.max_image_size_bytes,
            MediaKind::Video => self.max_video_size_bytes,
        }
    }

    fn max_count(&self, kind: MediaKind) -> usize {
        match kind {
            MediaKind::Image => self.max_images_per_request,
            MediaKind::Video => self.max_videos_per_request,
        }
    }
}

impl From<&UploadConfig> for UploadLimits {
    fn from(config: &UploadConfig) -> Self {
        Self {
            max_image_size_bytes: config.max_image_size_bytes,
            max_video_size_bytes: config.max_video_size_bytes,
            max_images_per_request: config.max_images_per_request,
            max_videos_per_request: config.max_videos_per_request,
        }
    }
}

#[derive(Clone)]
pub struct MediaIngestionService {
    store: Arc<dyn CaseStore>,
    storage: StorageChain,
    dedup: Arc<dyn DedupCache>,
    limits: UploadLimits,
}

#[derive(Default)]
struct BatchReport {
    added: Vec<CaseMedia>,
    warnings: Vec<UploadWarning>,
    rejected: Vec<RejectedUpload>,
    images_seen: usize,
    videos_seen: usize,
}

impl BatchReport {
    fn reject(&mut self, file: &ReceivedFile, reason: RejectReason) {
        tracing::debug!(
            field = %file.field,
            original_name = %file.original_name,
            reason = ?reason,
            "Upload rejected"
        );
        self.rejected.push(RejectedUpload {
            field: file.field.clone(),
            originalname: file.original_name.clone(),
            mimetype: file.content_type.clone(),
            reason,
        });
    }

    fn count(&mut self, kind: MediaKind) -> usize {
        let seen = match kind {
            MediaKind::Image => &mut self.images_seen,
            MediaKind::Video => &mut self.videos_seen,
        };
        *seen += 1;
        *seen
    }
}

impl MediaIngestionService {
    pub fn new(
        store: Arc<dyn CaseStore>,
        storage: StorageChain,
        dedup: Arc<dyn DedupCache>,
        limits: UploadLimits,
    ) -> Self {
        Self {
            store,
            storage,
            dedup,
            limits,
        }
    }

    /// `NotFound` unless the case exists. Checked before the request body is read.
    pub async fn ensure_case(&self, case_id: Uuid) -> AppResult<()> {
        match self.store.get_case(case_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("Case {} not found", case_id))),
        }
    }

    /// Processes every file sequentially. Per-file problems become warnings;
    /// only a missing case fails the whole batch.
    #[tracing::instrument(skip(self, batch), fields(operation = "attach_media", case_id = %case_id, files = batch.files.len()))]
    pub async fn attach_media(
        &self,
        case_id: Uuid,
        batch: UploadBatch,
    ) -> AppResult<AttachMediaResponse> {
        self.ensure_case(case_id).await?;

        let mut report = BatchReport::default();
        for file in batch.files {
            self.ingest_file(case_id, file, &mut report).await;
        }

        if !report.added.is_empty() {
            self.store.touch_case(case_id, timestamp()).await?;
        }

        let case = self
            .store
            .get_case(case_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Case {} not found", case_id)))?;

        let BatchReport {
            added,
            mut warnings,
            rejected,
            ..
        } = report;
        if !rejected.is_empty() {
            warnings.push(UploadWarning::RejectedUploads { items: rejected });
        }

        tracing::info!(
            added = added.len(),
            warnings = warnings.len(),
            "Upload batch processed"
        );
        Ok(AttachMediaResponse {
            added,
            case,
            warnings,
        })
    }

    async fn ingest_file(&self, case_id: Uuid, file: ReceivedFile, report: &mut BatchReport) {
        let Some(kind) = MediaKind::from_field(&file.field) else {
            report.reject(&file, RejectReason::UnexpectedField);
            return;
        };

        if report.count(kind) > self.limits.max_count(kind) {
            report.reject(&file, RejectReason::TooManyFiles);
            return;
        }

        if file.data.len() > self.limits.max_size(kind) {
            report.reject(&file, RejectReason::FileTooLarge);
            return;
        }

        if !is_allowed_mime(kind, &file.content_type) {
            report.reject(&file, RejectReason::InvalidMime);
            return;
        }

        let key = dedup_key(&case_id, &file.original_name, file.data.len());
        if self.dedup.check_and_record(&key).await {
            report.reject(&file, RejectReason::DuplicateRecent);
            return;
        }

        let filename = storage_filename(
            &file.original_name,
            timestamp().timestamp_millis(),
            rand::random::<u32>(),
        );
        let meta = FileMeta {
            filename: filename.clone(),
            content_type: normalize_mime_type(&file.content_type),
        };

        let outcome = self.storage.store(&meta, file.data).await;
        report
            .warnings
            .extend(storage_warnings(&filename, &outcome));
        let Some(stored) = outcome.stored else {
            return;
        };

        let media = CaseMedia {
            id: Uuid::new_v4(),
            kind,
            url: stored.url,
            filename: filename.clone(),
            backend: stored.backend,
            storage_key: stored.key,
            created_at: timestamp(),
        };

        if let Err(e) = self.store.insert_media(case_id, &media).await {
            tracing::error!(error = %e, filename = %filename, "Failed to record media row");
            report.warnings.push(UploadWarning::MetadataWriteFailed {
                filename: filename.clone(),
                error: e.to_string(),
            });
            if let Err(e) = self.storage.delete(media.backend, &media.storage_key).await {
                tracing::warn!(error = %e, key = %media.storage_key, "Failed to remove orphaned object");
            }
            return;
        }

        report.added.push(media);
    }
}

/// Warnings for one file's trip through the chain. When no target accepted
/// the file the last failure is reported as `storage_failed`.
fn storage_warnings(filename: &str, outcome: &ChainOutcome) -> Vec<UploadWarning> {
    let fallback = |failure: &casetrack_storage::TargetFailure| UploadWarning::StorageFallback {
        filename: filename.to_string(),
        backend: failure.backend,
        error: failure.error.clone(),
    };

    if outcome.stored.is_some() {
        return outcome.failures.iter().map(fallback).collect();
    }

    match outcome.failures.split_last() {
        Some((last, earlier)) => {
            let mut warnings: Vec<UploadWarning> = earlier.iter().map(fallback).collect();
            warnings.push(UploadWarning::StorageFailed {
                filename: filename.to_string(),
                error: last.error.clone(),
            });
            warnings
        }
        None => vec![UploadWarning::StorageFailed {
            filename: filename.to_string(),
            error: "no storage target configured".to_string(),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::FaultyCaseStore;
    use crate::services::upload::dedup::InMemoryDedupCache;
    use casetrack_core::models::{CaseStatus, CrimeCase};
    use casetrack_core::StorageBackend;
    use casetrack_db::InMemoryCaseStore;
    use casetrack_storage::{LocalStorage, StoredObject, TargetFailure};
    use chrono::{NaiveDate, NaiveTime};
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        service: MediaIngestionService,
        store: Arc<InMemoryCaseStore>,
        case_id: Uuid,
        dir: TempDir,
    }

    fn sample_case() -> CrimeCase {
        let now = timestamp();
        CrimeCase {
            id: Uuid::new_v4(),
            code: 5,
            title: "Hurto en mercado".to_string(),
            place: None,
            description: None,
            crime_type: "Hurto".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
            hour: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            status: CaseStatus::Open,
            latitude: -12.0,
            longitude: -77.0,
            suspect: None,
            victim: None,
            cuadrante: None,
            sector: None,
            escape_route: None,
            suspect_description: None,
            media: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn limits() -> UploadLimits {
        UploadLimits {
            max_image_size_bytes: 1024,
            max_video_size_bytes: 4096,
            max_images_per_request: 2,
            max_videos_per_request: 1,
        }
    }

    fn ingestion(store: Arc<dyn CaseStore>, local: Arc<LocalStorage>) -> MediaIngestionService {
        MediaIngestionService::new(
            store,
            StorageChain::local_only(local),
            Arc::new(InMemoryDedupCache::new(Duration::from_secs(120))),
            limits(),
        )
    }

    async fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let local = Arc::new(LocalStorage::new(dir.path(), "/uploads").await.unwrap());
        let store = Arc::new(InMemoryCaseStore::new());
        let case = sample_case();
        store.insert_case(&case).await.unwrap();

        let service = ingestion(store.clone(), local);
        Fixture {
            service,
            store,
            case_id: case.id,
            dir,
        }
    }

    fn file(field: &str, name: &str, content_type: &str, data: &[u8]) -> ReceivedFile {
        ReceivedFile {
            field: field.to_string(),
            original_name: name.to_string(),
            content_type: content_type.to_string(),
            data: Bytes::copy_from_slice(data),
        }
    }

    fn batch(files: Vec<ReceivedFile>) -> UploadBatch {
        UploadBatch { files }
    }

    fn rejected(response: &AttachMediaResponse) -> Vec<(String, RejectReason)> {
        response
            .warnings
            .iter()
            .filter_map(|w| match w {
                UploadWarning::RejectedUploads { items } => Some(items),
                _ => None,
            })
            .flatten()
            .map(|r| (r.originalname.clone(), r.reason))
            .collect()
    }

    #[tokio::test]
    async fn test_valid_image_is_stored_and_recorded() {
        let fx = fixture().await;
        let response = fx
            .service
            .attach_media(
                fx.case_id,
                batch(vec![file("images", "escena del crimen.jpg", "image/jpeg", b"jpeg")]),
            )
            .await
            .unwrap();

        assert_eq!(response.added.len(), 1);
        assert!(response.warnings.is_empty());
        let media = &response.added[0];
        assert_eq!(media.kind, MediaKind::Image);
        assert_eq!(media.backend, StorageBackend::Local);
        assert!(media.filename.starts_with("escena_del_crimen-"));
        assert!(media.filename.ends_with(".jpg"));
        assert_eq!(media.url, format!("/uploads/{}", media.filename));
        assert!(fx.dir.path().join(&media.filename).exists());
        assert_eq!(response.case.media, response.added);
        assert!(response.case.updated_at >= response.case.created_at);
    }

    #[tokio::test]
    async fn test_rejections_do_not_block_siblings() {
        let fx = fixture().await;
        let response = fx
            .service
            .attach_media(
                fx.case_id,
                batch(vec![
                    file("images", "notas.txt", "text/plain", b"text"),
                    file("avatar", "perfil.png", "image/png", b"png"),
                    file("images[]", "foto.PNG", "IMAGE/PNG; charset=binary", b"png"),
                    file("videos", "clip.mp4", "video/mp4", &[0u8; 5000]),
                ]),
            )
            .await
            .unwrap();

        assert_eq!(response.added.len(), 1);
        assert_eq!(response.added[0].kind, MediaKind::Image);
        assert_eq!(
            rejected(&response),
            vec![
                ("notas.txt".to_string(), RejectReason::InvalidMime),
                ("perfil.png".to_string(), RejectReason::UnexpectedField),
                ("clip.mp4".to_string(), RejectReason::FileTooLarge),
            ]
        );
        assert!(matches!(
            response.warnings.last(),
            Some(UploadWarning::RejectedUploads { .. })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_within_window_is_rejected() {
        let fx = fixture().await;
        let first = fx
            .service
            .attach_media(
                fx.case_id,
                batch(vec![file("images", "a.jpg", "image/jpeg", b"same")]),
            )
            .await
            .unwrap();
        assert_eq!(first.added.len(), 1);

        let second = fx
            .service
            .attach_media(
                fx.case_id,
                batch(vec![file("images", "a.jpg", "image/jpeg", b"same")]),
            )
            .await
            .unwrap();
        assert!(second.added.is_empty());
        assert_eq!(
            rejected(&second),
            vec![("a.jpg".to_string(), RejectReason::DuplicateRecent)]
        );
        assert_eq!(second.case.media.len(), 1);
    }

    #[tokio::test]
    async fn test_per_kind_caps() {
        let fx = fixture().await;
        let response = fx
            .service
            .attach_media(
                fx.case_id,
                batch(vec![
                    file("images", "1.jpg", "image/jpeg", b"1"),
                    file("images", "2.jpg", "image/jpeg", b"22"),
                    file("images", "3.jpg", "image/jpeg", b"333"),
                    file("videos", "a.mp4", "video/mp4", b"a"),
                    file("videos", "b.mp4", "video/mp4", b"bb"),
                ]),
            )
            .await
            .unwrap();

        assert_eq!(response.added.len(), 3);
        assert_eq!(
            rejected(&response),
            vec![
                ("3.jpg".to_string(), RejectReason::TooManyFiles),
                ("b.mp4".to_string(), RejectReason::TooManyFiles),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_case_is_not_found() {
        let fx = fixture().await;
        let err = fx
            .service
            .attach_media(
                Uuid::new_v4(),
                batch(vec![file("images", "a.jpg", "image/jpeg", b"x")]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(fx.store.get_case(fx.case_id).await.unwrap().unwrap().media.is_empty());
    }

    #[test]
    fn test_storage_warnings_on_fallback_and_total_failure() {
        let failures = vec![
            TargetFailure {
                backend: StorageBackend::Drive,
                error: "token rejected".to_string(),
            },
            TargetFailure {
                backend: StorageBackend::Object,
                error: "timeout".to_string(),
            },
        ];

        let recovered = ChainOutcome {
            stored: Some(StoredObject {
                backend: StorageBackend::Local,
                key: "a.jpg".to_string(),
                url: "/uploads/a.jpg".to_string(),
            }),
            failures: failures.clone(),
        };
        let warnings = storage_warnings("a.jpg", &recovered);
        assert_eq!(warnings.len(), 2);
        assert!(warnings
            .iter()
            .all(|w| matches!(w, UploadWarning::StorageFallback { .. })));

        let lost = ChainOutcome {
            stored: None,
            failures,
        };
        let warnings = storage_warnings("a.jpg", &lost);
        assert_eq!(
            warnings,
            vec![
                UploadWarning::StorageFallback {
                    filename: "a.jpg".to_string(),
                    backend: StorageBackend::Drive,
                    error: "token rejected".to_string(),
                },
                UploadWarning::StorageFailed {
                    filename: "a.jpg".to_string(),
                    error: "timeout".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_metadata_failure_removes_object_and_keeps_siblings() {
        let dir = tempdir().unwrap();
        let local = Arc::new(LocalStorage::new(dir.path(), "/uploads").await.unwrap());
        let store = Arc::new(FaultyCaseStore {
            reject_media_prefix: Some("roto-"),
            ..Default::default()
        });
        let case = sample_case();
        store.insert_case(&case).await.unwrap();
        let service = ingestion(store.clone(), local);

        let response = service
            .attach_media(
                case.id,
                batch(vec![
                    file("images", "roto.jpg", "image/jpeg", b"jpeg-a"),
                    file("images", "puerta.jpg", "image/jpeg", b"jpeg-b"),
                ]),
            )
            .await
            .unwrap();

        assert_eq!(response.added.len(), 1);
        assert!(response.added[0].filename.starts_with("puerta-"));
        assert_eq!(response.case.media, response.added);

        assert_eq!(response.warnings.len(), 1);
        match &response.warnings[0] {
            UploadWarning::MetadataWriteFailed { filename, .. } => {
                assert!(filename.starts_with("roto-"));
                assert!(!dir.path().join(filename).exists());
            }
            other => panic!("unexpected warning: {:?}", other),
        }

        let remaining: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(remaining, vec![response.added[0].filename.clone()]);
    }
}
