//! Record store whose backing database is unreachable.

use async_trait::async_trait;
use casetrack_core::models::{CaseMedia, CasePatch, CrimeCase};
use casetrack_core::{AppError, AppResult};
use casetrack_db::CaseStore;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub struct OfflineCaseStore;

fn offline() -> AppError {
    AppError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl CaseStore for OfflineCaseStore {
    async fn list_cases(&self) -> AppResult<Vec<CrimeCase>> {
        Err(offline())
    }

    async fn get_case(&self, _id: Uuid) -> AppResult<Option<CrimeCase>> {
        Err(offline())
    }

    async fn insert_case(&self, _case: &CrimeCase) -> AppResult<()> {
        Err(offline())
    }

    async fn update_case(
        &self,
        _id: Uuid,
        _patch: &CasePatch,
        _updated_at: DateTime<Utc>,
    ) -> AppResult<Option<CrimeCase>> {
        Err(offline())
    }

    async fn delete_case(&self, _id: Uuid) -> AppResult<bool> {
        Err(offline())
    }

    async fn insert_media(&self, _case_id: Uuid, _media: &CaseMedia) -> AppResult<()> {
        Err(offline())
    }

    async fn delete_media(&self, _case_id: Uuid, _media_id: Uuid) -> AppResult<Option<CaseMedia>> {
        Err(offline())
    }

    async fn touch_case(&self, _id: Uuid, _updated_at: DateTime<Utc>) -> AppResult<bool> {
        Err(offline())
    }

    fn kind(&self) -> &'static str {
        "offline"
    }
}
