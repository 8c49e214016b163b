use async_trait::async_trait;
use casetrack_core::models::{CaseMedia, CasePatch, CaseStatus, CrimeCase, MediaKind};
use casetrack_core::{AppError, AppResult, StorageBackend};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::{FromRow, PgPool, Postgres};
use std::collections::HashMap;
use uuid::Uuid;

use super::CaseStore;

/// Migrations embedded from the workspace `migrations/` directory.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

const CASE_COLUMNS: &str = "id, code, title, place, description, crime_type, incident_date, \
     incident_hour, status, latitude, longitude, suspect, victim, cuadrante, sector, \
     escape_route, suspect_description, created_at, updated_at";

const MEDIA_COLUMNS: &str =
    "id, case_id, kind, url, filename, backend, storage_key, created_at";

#[derive(Debug, FromRow)]
struct CaseRow {
    id: Uuid,
    code: i64,
    title: String,
    place: Option<String>,
    description: Option<String>,
    crime_type: String,
    incident_date: NaiveDate,
    incident_hour: NaiveTime,
    status: CaseStatus,
    latitude: f64,
    longitude: f64,
    suspect: Option<String>,
    victim: Option<String>,
    cuadrante: Option<i32>,
    sector: Option<i32>,
    escape_route: Option<String>,
    suspect_description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CaseRow {
    fn into_case(self, media: Vec<CaseMedia>) -> CrimeCase {
        CrimeCase {
            id: self.id,
            code: self.code,
            title: self.title,
            place: self.place,
            description: self.description,
            crime_type: self.crime_type,
            date: self.incident_date,
            hour: self.incident_hour,
            status: self.status,
            latitude: self.latitude,
            longitude: self.longitude,
            suspect: self.suspect,
            victim: self.victim,
            cuadrante: self.cuadrante,
            sector: self.sector,
            escape_route: self.escape_route,
            suspect_description: self.suspect_description,
            media,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MediaRow {
    id: Uuid,
    case_id: Uuid,
    kind: MediaKind,
    url: String,
    filename: String,
    backend: StorageBackend,
    storage_key: String,
    created_at: DateTime<Utc>,
}

impl MediaRow {
    fn into_media(self) -> CaseMedia {
        CaseMedia {
            id: self.id,
            kind: self.kind,
            url: self.url,
            filename: self.filename,
            backend: self.backend,
            storage_key: self.storage_key,
            created_at: self.created_at,
        }
    }
}

/// Postgres-backed store over the `cases` and `media` tables.
#[derive(Clone)]
pub struct PgCaseStore {
    pool: PgPool,
}

impl PgCaseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn media_for(&self, case_id: Uuid) -> AppResult<Vec<CaseMedia>> {
        let rows = sqlx::query_as::<Postgres, MediaRow>(&format!(
            "SELECT {} FROM media WHERE case_id = $1 ORDER BY seq ASC",
            MEDIA_COLUMNS
        ))
        .bind(case_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MediaRow::into_media).collect())
    }

    async fn write_case<'e, E>(executor: E, case: &CrimeCase) -> AppResult<()>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE cases SET
                code = $2, title = $3, place = $4, description = $5, crime_type = $6,
                incident_date = $7, incident_hour = $8, status = $9, latitude = $10,
                longitude = $11, suspect = $12, victim = $13, cuadrante = $14, sector = $15,
                escape_route = $16, suspect_description = $17, updated_at = $18
            WHERE id = $1
            "#,
        )
        .bind(case.id)
        .bind(case.code)
        .bind(&case.title)
        .bind(&case.place)
        .bind(&case.description)
        .bind(&case.crime_type)
        .bind(case.date)
        .bind(case.hour)
        .bind(case.status)
        .bind(case.latitude)
        .bind(case.longitude)
        .bind(&case.suspect)
        .bind(&case.victim)
        .bind(case.cuadrante)
        .bind(case.sector)
        .bind(&case.escape_route)
        .bind(&case.suspect_description)
        .bind(case.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CaseStore for PgCaseStore {
    #[tracing::instrument(skip(self), fields(db.table = "cases", db.operation = "select"))]
    async fn list_cases(&self) -> AppResult<Vec<CrimeCase>> {
        let rows = sqlx::query_as::<Postgres, CaseRow>(&format!(
            "SELECT {} FROM cases ORDER BY created_at DESC, id ASC",
            CASE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let media_rows = sqlx::query_as::<Postgres, MediaRow>(&format!(
            "SELECT {} FROM media ORDER BY seq ASC",
            MEDIA_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut media_by_case: HashMap<Uuid, Vec<CaseMedia>> = HashMap::new();
        for row in media_rows {
            media_by_case
                .entry(row.case_id)
                .or_default()
                .push(row.into_media());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let media = media_by_case.remove(&row.id).unwrap_or_default();
                row.into_case(media)
            })
            .collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "cases", db.operation = "select", db.record_id = %id))]
    async fn get_case(&self, id: Uuid) -> AppResult<Option<CrimeCase>> {
        let row = sqlx::query_as::<Postgres, CaseRow>(&format!(
            "SELECT {} FROM cases WHERE id = $1",
            CASE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let media = self.media_for(id).await?;
                Ok(Some(row.into_case(media)))
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self, case), fields(db.table = "cases", db.operation = "insert", db.record_id = %case.id))]
    async fn insert_case(&self, case: &CrimeCase) -> AppResult<()> {
        sqlx::query(&format!(
            "INSERT INTO cases ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)",
            CASE_COLUMNS
        ))
        .bind(case.id)
        .bind(case.code)
        .bind(&case.title)
        .bind(&case.place)
        .bind(&case.description)
        .bind(&case.crime_type)
        .bind(case.date)
        .bind(case.hour)
        .bind(case.status)
        .bind(case.latitude)
        .bind(case.longitude)
        .bind(&case.suspect)
        .bind(&case.victim)
        .bind(case.cuadrante)
        .bind(case.sector)
        .bind(&case.escape_route)
        .bind(&case.suspect_description)
        .bind(case.created_at)
        .bind(case.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self, patch), fields(db.table = "cases", db.operation = "update", db.record_id = %id))]
    async fn update_case(
        &self,
        id: Uuid,
        patch: &CasePatch,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Option<CrimeCase>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<Postgres, CaseRow>(&format!(
            "SELECT {} FROM cases WHERE id = $1 FOR UPDATE",
            CASE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut case = row.into_case(Vec::new());
        patch.apply(&mut case);
        case.updated_at = updated_at;
        Self::write_case(&mut *tx, &case).await?;
        tx.commit().await?;

        case.media = self.media_for(id).await?;
        Ok(Some(case))
    }

    #[tracing::instrument(skip(self), fields(db.table = "cases", db.operation = "delete", db.record_id = %id))]
    async fn delete_case(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM cases WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self, media), fields(db.table = "media", db.operation = "insert", db.record_id = %media.id))]
    async fn insert_media(&self, case_id: Uuid, media: &CaseMedia) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO media (id, case_id, kind, url, filename, backend, storage_key, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(media.id)
        .bind(case_id)
        .bind(media.kind)
        .bind(&media.url)
        .bind(&media.filename)
        .bind(media.backend)
        .bind(&media.storage_key)
        .bind(media.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                Err(AppError::NotFound(format!("Case {} not found", case_id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "delete", db.record_id = %media_id))]
    async fn delete_media(&self, case_id: Uuid, media_id: Uuid) -> AppResult<Option<CaseMedia>> {
        let row = sqlx::query_as::<Postgres, MediaRow>(&format!(
            "DELETE FROM media WHERE id = $1 AND case_id = $2 RETURNING {}",
            MEDIA_COLUMNS
        ))
        .bind(media_id)
        .bind(case_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MediaRow::into_media))
    }

    #[tracing::instrument(skip(self), fields(db.table = "cases", db.operation = "update", db.record_id = %id))]
    async fn touch_case(&self, id: Uuid, updated_at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query("UPDATE cases SET updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(updated_at)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    fn kind(&self) -> &'static str {
        "postgres"
    }
}
