use async_trait::async_trait;
use casetrack_core::models::{CaseMedia, CasePatch, CrimeCase};
use casetrack_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::CaseStore;

/// Non-durable store used when no database is configured.
#[derive(Default)]
pub struct InMemoryCaseStore {
    cases: RwLock<HashMap<Uuid, CrimeCase>>,
}

impl InMemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CaseStore for InMemoryCaseStore {
    async fn list_cases(&self) -> AppResult<Vec<CrimeCase>> {
        let cases = self.cases.read().await;
        let mut listed: Vec<CrimeCase> = cases.values().cloned().collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(listed)
    }

    async fn get_case(&self, id: Uuid) -> AppResult<Option<CrimeCase>> {
        Ok(self.cases.read().await.get(&id).cloned())
    }

    async fn insert_case(&self, case: &CrimeCase) -> AppResult<()> {
        let mut cases = self.cases.write().await;
        if cases.contains_key(&case.id) {
            return Err(AppError::InvalidInput(format!(
                "Case {} already exists",
                case.id
            )));
        }
        cases.insert(case.id, case.clone());
        Ok(())
    }

    async fn update_case(
        &self,
        id: Uuid,
        patch: &CasePatch,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Option<CrimeCase>> {
        let mut cases = self.cases.write().await;
        Ok(cases.get_mut(&id).map(|case| {
            patch.apply(case);
            case.updated_at = updated_at;
            case.clone()
        }))
    }

    async fn delete_case(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.cases.write().await.remove(&id).is_some())
    }

    async fn insert_media(&self, case_id: Uuid, media: &CaseMedia) -> AppResult<()> {
        let mut cases = self.cases.write().await;
        let case = cases
            .get_mut(&case_id)
            .ok_or_else(|| AppError::NotFound(format!("Case {} not found", case_id)))?;
        case.media.push(media.clone());
        Ok(())
    }

    async fn delete_media(&self, case_id: Uuid, media_id: Uuid) -> AppResult<Option<CaseMedia>> {
        let mut cases = self.cases.write().await;
        let Some(case) = cases.get_mut(&case_id) else {
            return Ok(None);
        };
        let removed = case
            .media
            .iter()
            .position(|m| m.id == media_id)
            .map(|idx| case.media.remove(idx));
        Ok(removed)
    }

    async fn touch_case(&self, id: Uuid, updated_at: DateTime<Utc>) -> AppResult<bool> {
        let mut cases = self.cases.write().await;
        match cases.get_mut(&id) {
            Some(case) => {
                case.updated_at = updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
