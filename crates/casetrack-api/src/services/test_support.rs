//! Record store that fails selected operations, for exercising the
//! degraded and partial-failure paths.

use async_trait::async_trait;
use casetrack_core::models::{CaseMedia, CasePatch, CrimeCase};
use casetrack_core::{AppError, AppResult};
use casetrack_db::{CaseStore, InMemoryCaseStore};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Default)]
pub(crate) struct FaultyCaseStore {
    pub inner: InMemoryCaseStore,
    /// `list_cases` always errors
    pub fail_list: bool,
    /// `insert_media` errors for filenames starting with this prefix
    pub reject_media_prefix: Option<&'static str>,
}

fn unavailable() -> AppError {
    AppError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl CaseStore for FaultyCaseStore {
    async fn list_cases(&self) -> AppResult<Vec<CrimeCase>> {
        if self.fail_list {
            return Err(unavailable());
        }
        self.inner.list_cases().await
    }

    async fn get_case(&self, id: Uuid) -> AppResult<Option<CrimeCase>> {
        self.inner.get_case(id).await
    }

    async fn insert_case(&self, case: &CrimeCase) -> AppResult<()> {
        self.inner.insert_case(case).await
    }

    async fn update_case(
        &self,
        id: Uuid,
        patch: &CasePatch,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Option<CrimeCase>> {
        self.inner.update_case(id, patch, updated_at).await
    }

    async fn delete_case(&self, id: Uuid) -> AppResult<bool> {
        self.inner.delete_case(id).await
    }

    async fn insert_media(&self, case_id: Uuid, media: &CaseMedia) -> AppResult<()> {
        if let Some(prefix) = self.reject_media_prefix {
            if media.filename.starts_with(prefix) {
                return Err(unavailable());
            }
        }
        self.inner.insert_media(case_id, media).await
    }

    async fn delete_media(&self, case_id: Uuid, media_id: Uuid) -> AppResult<Option<CaseMedia>> {
        self.inner.delete_media(case_id, media_id).await
    }

    async fn touch_case(&self, id: Uuid, updated_at: DateTime<Utc>) -> AppResult<bool> {
        self.inner.touch_case(id, updated_at).await
    }

    fn kind(&self) -> &'static str {
        "faulty"
    }
}
