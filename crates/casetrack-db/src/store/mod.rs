//! The `CaseStore` trait and its implementations.

mod memory;
mod postgres;

pub use memory::InMemoryCaseStore;
pub use postgres::{PgCaseStore, MIGRATOR};

use async_trait::async_trait;
use casetrack_core::models::{CaseMedia, CasePatch, CrimeCase};
use casetrack_core::AppResult;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Persistence for cases and their media. Media is always returned in
/// insertion order.
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Every case, newest created first, with media attached.
    async fn list_cases(&self) -> AppResult<Vec<CrimeCase>>;

    async fn get_case(&self, id: Uuid) -> AppResult<Option<CrimeCase>>;

    async fn insert_case(&self, case: &CrimeCase) -> AppResult<()>;

    /// Merges `patch` and stamps `updated_at`. `None` when the case is absent.
    async fn update_case(
        &self,
        id: Uuid,
        patch: &CasePatch,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Option<CrimeCase>>;

    /// Removes the case and its media rows. `false` when the case is absent.
    async fn delete_case(&self, id: Uuid) -> AppResult<bool>;

    /// Appends a media row. `NotFound` when the case is absent.
    async fn insert_media(&self, case_id: Uuid, media: &CaseMedia) -> AppResult<()>;

    /// Removes one media row of one case, returning it.
    async fn delete_media(&self, case_id: Uuid, media_id: Uuid) -> AppResult<Option<CaseMedia>>;

    /// Refreshes `updated_at`. `false` when the case is absent.
    async fn touch_case(&self, id: Uuid, updated_at: DateTime<Utc>) -> AppResult<bool>;

    /// Short name for health reporting.
    fn kind(&self) -> &'static str;
}
