//! Case CRUD. This service is the only writer of case records.

use casetrack_core::models::{CaseInput, CaseMedia, CrimeCase};
use casetrack_core::{AppError, AppResult};
use casetrack_db::CaseStore;
use casetrack_storage::StorageChain;
use std::sync::Arc;
use uuid::Uuid;

use super::timestamp;

/// Result of listing cases. `degraded` is set when the store could not be
/// read and an empty list was returned instead.
#[derive(Debug, Clone, Default)]
pub struct CaseListing {
    pub cases: Vec<CrimeCase>,
    pub degraded: bool,
}

#[derive(Clone)]
pub struct CaseService {
    store: Arc<dyn CaseStore>,
    storage: StorageChain,
}

impl CaseService {
    pub fn new(store: Arc<dyn CaseStore>, storage: StorageChain) -> Self {
        Self { store, storage }
    }

    /// Newest created first. Store failures degrade to an empty listing.
    pub async fn list_cases(&self) -> CaseListing {
        match self.store.list_cases().await {
            Ok(cases) => CaseListing {
                cases,
                degraded: false,
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to list cases; returning empty list");
                CaseListing {
                    cases: Vec::new(),
                    degraded: true,
                }
            }
        }
    }

    pub async fn get_case(&self, id: Uuid) -> AppResult<CrimeCase> {
        self.store
            .get_case(id)
            .await?
            .ok_or_else(|| case_not_found(id))
    }

    #[tracing::instrument(skip(self, input), fields(operation = "create_case"))]
    pub async fn create_case(&self, input: CaseInput) -> AppResult<CrimeCase> {
        let new_case = input.into_new_case()?;
        let case = new_case.into_case(Uuid::new_v4(), timestamp());
        self.store.insert_case(&case).await?;

        tracing::info!(case_id = %case.id, code = case.code, "Case created");
        Ok(case)
    }

    #[tracing::instrument(skip(self, input), fields(operation = "update_case", case_id = %id))]
    pub async fn update_case(&self, id: Uuid, input: CaseInput) -> AppResult<CrimeCase> {
        // Unknown ids answer NotFound regardless of the body.
        if self.store.get_case(id).await?.is_none() {
            return Err(case_not_found(id));
        }

        let patch = input.into_patch()?;
        let updated = self
            .store
            .update_case(id, &patch, timestamp())
            .await?
            .ok_or_else(|| case_not_found(id))?;

        tracing::info!(case_id = %id, "Case updated");
        Ok(updated)
    }

    /// Removes stored objects best-effort, then the record and its media rows.
    #[tracing::instrument(skip(self), fields(operation = "delete_case", case_id = %id))]
    pub async fn delete_case(&self, id: Uuid) -> AppResult<bool> {
        let case = self.get_case(id).await?;

        for media in &case.media {
            self.discard_object(media).await;
        }

        if !self.store.delete_case(id).await? {
            return Err(case_not_found(id));
        }

        tracing::info!(case_id = %id, media_count = case.media.len(), "Case deleted");
        Ok(true)
    }

    #[tracing::instrument(skip(self), fields(operation = "delete_media", case_id = %case_id, media_id = %media_id))]
    pub async fn delete_media(&self, case_id: Uuid, media_id: Uuid) -> AppResult<CrimeCase> {
        if self.store.get_case(case_id).await?.is_none() {
            return Err(case_not_found(case_id));
        }

        let removed = self
            .store
            .delete_media(case_id, media_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Media {} not found", media_id)))?;

        self.discard_object(&removed).await;
        self.store.touch_case(case_id, timestamp()).await?;

        tracing::info!(filename = %removed.filename, "Media removed");
        self.get_case(case_id).await
    }

    async fn discard_object(&self, media: &CaseMedia) {
        if let Err(e) = self.storage.delete(media.backend, &media.storage_key).await {
            tracing::warn!(
                error = %e,
                backend = %media.backend,
                key = %media.storage_key,
                "Failed to delete stored object"
            );
        }
    }
}

fn case_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Case {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::FaultyCaseStore;
    use casetrack_core::models::{CaseStatus, MediaKind, NumericInput};
    use casetrack_core::StorageBackend;
    use casetrack_db::InMemoryCaseStore;
    use casetrack_storage::LocalStorage;
    use tempfile::{tempdir, TempDir};

    async fn service() -> (CaseService, Arc<InMemoryCaseStore>, TempDir) {
        let dir = tempdir().unwrap();
        let local = Arc::new(LocalStorage::new(dir.path(), "/uploads").await.unwrap());
        let store = Arc::new(InMemoryCaseStore::new());
        let service = CaseService::new(store.clone(), StorageChain::local_only(local));
        (service, store, dir)
    }

    fn input() -> CaseInput {
        CaseInput {
            code: Some(NumericInput::Integer(77)),
            title: Some("Robo de vehículo".to_string()),
            crime_type: Some("Robo".to_string()),
            date: Some("2024-05-02".to_string()),
            hour: Some("08:15".to_string()),
            status: Some("Open".to_string()),
            latitude: Some(NumericInput::Text("-12.05".to_string())),
            longitude: Some(NumericInput::Number(-77.04)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let (service, _store, _dir) = service().await;
        let created = service.create_case(input()).await.unwrap();
        assert_eq!(created.created_at, created.updated_at);
        assert!(created.media.is_empty());
        assert_eq!(created.latitude, -12.05);

        let fetched = service.get_case(created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_create_reports_every_missing_field() {
        let (service, _store, _dir) = service().await;
        let err = service
            .create_case(CaseInput {
                title: Some("  ".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(
            err.missing_fields().unwrap(),
            &["code", "title", "crimeType", "date", "hour", "status", "latitude", "longitude"]
        );
    }

    #[tokio::test]
    async fn test_update_restamps_and_keeps_unsupplied_fields() {
        let (service, _store, _dir) = service().await;
        let created = service.create_case(input()).await.unwrap();

        let updated = service
            .update_case(
                created.id,
                CaseInput {
                    status: Some("closed".to_string()),
                    cuadrante: Some(NumericInput::Text("12".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, CaseStatus::Closed);
        assert_eq!(updated.cuadrante, Some(12));
        assert_eq!(updated.title, created.title);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.created_at, created.created_at);

        let missing = service
            .update_case(Uuid::new_v4(), CaseInput::default())
            .await
            .unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_media_removes_file_and_row() {
        let (service, store, dir) = service().await;
        let created = service.create_case(input()).await.unwrap();

        std::fs::write(dir.path().join("foto-1-1.jpg"), b"jpeg").unwrap();
        let media = CaseMedia {
            id: Uuid::new_v4(),
            kind: MediaKind::Image,
            url: "/uploads/foto-1-1.jpg".to_string(),
            filename: "foto-1-1.jpg".to_string(),
            backend: StorageBackend::Local,
            storage_key: "foto-1-1.jpg".to_string(),
            created_at: timestamp(),
        };
        store.insert_media(created.id, &media).await.unwrap();

        let refreshed = service.delete_media(created.id, media.id).await.unwrap();
        assert!(refreshed.media.is_empty());
        assert!(!dir.path().join("foto-1-1.jpg").exists());

        let again = service.delete_media(created.id, media.id).await.unwrap_err();
        assert!(matches!(again, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_case_twice_is_not_found() {
        let (service, _store, _dir) = service().await;
        let created = service.create_case(input()).await.unwrap();

        assert!(service.delete_case(created.id).await.unwrap());
        let err = service.delete_case(created.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(service.list_cases().await.cases.is_empty());
    }

    #[tokio::test]
    async fn test_list_degrades_when_store_fails() {
        let dir = tempdir().unwrap();
        let local = Arc::new(LocalStorage::new(dir.path(), "/uploads").await.unwrap());
        let store = Arc::new(FaultyCaseStore {
            fail_list: true,
            ..Default::default()
        });
        let service = CaseService::new(store.clone(), StorageChain::local_only(local));
        service.create_case(input()).await.unwrap();

        let listing = service.list_cases().await;
        assert!(listing.degraded);
        assert!(listing.cases.is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_case_ignores_malformed_body() {
        let (service, _store, _dir) = service().await;
        let err = service
            .update_case(
                Uuid::new_v4(),
                CaseInput {
                    title: Some("  ".to_string()),
                    latitude: Some(NumericInput::Text("north".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
