// src/db/project_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        archive::ArchiveSearchQuery,
        project::{BuildProject, CreateLotPayload, CreateProjectPayload, Lot, ProjectStatus},
    },
};

// Obras e lotes. Toda leitura ignora linhas com deleted_at.
#[derive(Clone, Default)]
pub struct ProjectRepository;

impl ProjectRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        payload: &CreateProjectPayload,
    ) -> Result<BuildProject, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let project = sqlx::query_as::<_, BuildProject>(
            r#"
            INSERT INTO build_projects (
                tenant_id, title, address, city, state, zip_code, status,
                home_area_sqft, budget,
                baseline_start_date, baseline_end_date, actual_start_date, actual_end_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&payload.title)
        .bind(&payload.address)
        .bind(&payload.city)
        .bind(&payload.state)
        .bind(&payload.zip_code)
        .bind(payload.status)
        .bind(payload.home_area_sq_ft)
        .bind(payload.budget)
        .bind(payload.baseline_start_date)
        .bind(payload.baseline_end_date)
        .bind(payload.actual_start_date)
        .bind(payload.actual_end_date)
        .fetch_one(executor)
        .await?;
        Ok(project)
    }

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<BuildProject>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let project = sqlx::query_as::<_, BuildProject>(
            "SELECT * FROM build_projects WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;
        Ok(project)
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        status: Option<ProjectStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BuildProject>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let projects = sqlx::query_as::<_, BuildProject>(
            r#"
            SELECT * FROM build_projects
            WHERE tenant_id = $1 AND deleted_at IS NULL
              AND ($2::project_status IS NULL OR status = $2)
            ORDER BY created_at DESC, id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(tenant_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;
        Ok(projects)
    }

    pub async fn count<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        status: Option<ProjectStatus>,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM build_projects
            WHERE tenant_id = $1 AND deleted_at IS NULL
              AND ($2::project_status IS NULL OR status = $2)
            "#,
        )
        .bind(tenant_id)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(total)
    }

    /// Grava o registro inteiro (o serviço já mesclou o PATCH e validou).
    pub async fn update<'e, E>(&self, executor: E, project: &BuildProject) -> Result<BuildProject, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, BuildProject>(
            r#"
            UPDATE build_projects SET
                title = $3, address = $4, city = $5, state = $6, zip_code = $7, status = $8,
                home_area_sqft = $9, budget = $10,
                baseline_start_date = $11, baseline_end_date = $12,
                actual_start_date = $13, actual_end_date = $14,
                updated_at = now()
            WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(project.id)
        .bind(project.tenant_id)
        .bind(&project.title)
        .bind(&project.address)
        .bind(&project.city)
        .bind(&project.state)
        .bind(&project.zip_code)
        .bind(project.status)
        .bind(project.home_area_sq_ft)
        .bind(project.budget)
        .bind(project.baseline_start_date)
        .bind(project.baseline_end_date)
        .bind(project.actual_start_date)
        .bind(project.actual_end_date)
        .fetch_optional(executor)
        .await?;
        updated.ok_or_else(|| AppError::ResourceNotFound("Project".into()))
    }

    pub async fn soft_delete<'e, E>(&self, executor: E, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE build_projects SET deleted_at = now(), updated_at = now()
            WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---
    // Lotes
    // ---

    pub async fn create_lot<'e, E>(
        &self,
        executor: E,
        project_id: Uuid,
        payload: &CreateLotPayload,
    ) -> Result<Lot, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lot = sqlx::query_as::<_, Lot>(
            r#"
            INSERT INTO lots (project_id, lot_number, address, area_sqft)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(project_id)
        .bind(&payload.lot_number)
        .bind(&payload.address)
        .bind(payload.area_sq_ft)
        .fetch_one(executor)
        .await?;
        Ok(lot)
    }

    pub async fn list_lots<'e, E>(&self, executor: E, project_id: Uuid) -> Result<Vec<Lot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lots = sqlx::query_as::<_, Lot>(
            "SELECT * FROM lots WHERE project_id = $1 ORDER BY lot_number, id",
        )
        .bind(project_id)
        .fetch_all(executor)
        .await?;
        Ok(lots)
    }

    // ---
    // Arquivo (busca)
    // ---

    pub async fn search<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        query: &ArchiveSearchQuery,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BuildProject>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let projects = sqlx::query_as::<_, BuildProject>(&format!(
            "SELECT * FROM build_projects {} ORDER BY updated_at DESC, id LIMIT $8 OFFSET $9",
            SEARCH_WHERE
        ))
        .bind(tenant_id)
        .bind(query.q.as_deref().map(ArchiveSearchQuery::like_pattern))
        .bind(query.city.as_deref().map(ArchiveSearchQuery::like_pattern))
        .bind(query.state.as_deref())
        .bind(query.status)
        .bind(query.min_area)
        .bind(query.max_area)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;
        Ok(projects)
    }

    pub async fn count_search<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        query: &ArchiveSearchQuery,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM build_projects {}", SEARCH_WHERE))
            .bind(tenant_id)
            .bind(query.q.as_deref().map(ArchiveSearchQuery::like_pattern))
            .bind(query.city.as_deref().map(ArchiveSearchQuery::like_pattern))
            .bind(query.state.as_deref())
            .bind(query.status)
            .bind(query.min_area)
            .bind(query.max_area)
            .fetch_one(executor)
            .await?;
        Ok(total)
    }
}

// $1 tenant, $2 texto, $3 cidade, $4 estado, $5 status, $6/$7 faixa de área
const SEARCH_WHERE: &str = r#"
    WHERE tenant_id = $1 AND deleted_at IS NULL
      AND ($2::text IS NULL OR title ILIKE $2 OR address ILIKE $2 OR city ILIKE $2)
      AND ($3::text IS NULL OR city ILIKE $3)
      AND ($4::text IS NULL OR state = $4)
      AND ($5::project_status IS NULL OR status = $5)
      AND ($6::numeric IS NULL OR home_area_sqft >= $6)
      AND ($7::numeric IS NULL OR home_area_sqft <= $7)
"#;
