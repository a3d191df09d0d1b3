// src/db/report_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::report::{QueuedReport, Report, ReportArtifact, ReportFormat, ReportStatus, ReportType},
};

#[derive(Clone, Default)]
pub struct ReportRepository;

impl ReportRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        project_id: Uuid,
        report_type: ReportType,
        format: ReportFormat,
        include_materials: bool,
        include_schedule: bool,
    ) -> Result<Report, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let report = sqlx::query_as::<_, Report>(
            r#"
            INSERT INTO reports (tenant_id, project_id, type, format, status, include_materials, include_schedule)
            VALUES ($1, $2, $3, $4, 'PENDING', $5, $6)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(project_id)
        .bind(report_type)
        .bind(format)
        .bind(include_materials)
        .bind(include_schedule)
        .fetch_one(executor)
        .await?;
        Ok(report)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, tenant_id: Uuid, id: Uuid) -> Result<Option<Report>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let report = sqlx::query_as::<_, Report>("SELECT * FROM reports WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(executor)
            .await?;
        Ok(report)
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        project_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Report>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reports = sqlx::query_as::<_, Report>(
            r#"
            SELECT * FROM reports
            WHERE tenant_id = $1 AND ($2::uuid IS NULL OR project_id = $2)
            ORDER BY created_at DESC, id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(tenant_id)
        .bind(project_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;
        Ok(reports)
    }

    pub async fn count<'e, E>(&self, executor: E, tenant_id: Uuid, project_id: Option<Uuid>) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reports WHERE tenant_id = $1 AND ($2::uuid IS NULL OR project_id = $2)",
        )
        .bind(tenant_id)
        .bind(project_id)
        .fetch_one(executor)
        .await?;
        Ok(total)
    }

    /// Compare-and-set: só muda se o status atual ainda for `from`.
    /// `None` = outro worker chegou antes (ou o relatório sumiu).
    pub async fn transition<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        from: ReportStatus,
        to: ReportStatus,
        download_url: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<Option<Report>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let report = sqlx::query_as::<_, Report>(
            r#"
            UPDATE reports
            SET status = $3, download_url = $4, error_message = $5, updated_at = now()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(download_url)
        .bind(error_message)
        .fetch_optional(executor)
        .await?;
        Ok(report)
    }

    // --- Boot: atravessam tenants via funções SECURITY DEFINER ---

    /// PROCESSING órfãos viram FAILED. Devolve quantos foram marcados.
    pub async fn fail_interrupted<'e, E>(&self, executor: E, message: &str) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let failed = sqlx::query_scalar::<_, i64>("SELECT fail_interrupted_reports($1)")
            .bind(message)
            .fetch_one(executor)
            .await?;
        Ok(failed)
    }

    pub async fn list_pending<'e, E>(&self, executor: E) -> Result<Vec<QueuedReport>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let queued = sqlx::query_as::<_, QueuedReport>("SELECT * FROM pending_reports()")
            .fetch_all(executor)
            .await?;
        Ok(queued)
    }

    pub async fn save_artifact<'e, E>(&self, executor: E, artifact: &ReportArtifact) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO report_artifacts (report_id, content_type, file_name, content)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (report_id) DO UPDATE
            SET content_type = EXCLUDED.content_type, file_name = EXCLUDED.file_name, content = EXCLUDED.content
            "#,
        )
        .bind(artifact.report_id)
        .bind(&artifact.content_type)
        .bind(&artifact.file_name)
        .bind(&artifact.content)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn find_artifact<'e, E>(&self, executor: E, report_id: Uuid) -> Result<Option<ReportArtifact>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let artifact = sqlx::query_as::<_, ReportArtifact>(
            "SELECT report_id, content_type, file_name, content FROM report_artifacts WHERE report_id = $1",
        )
        .bind(report_id)
        .fetch_optional(executor)
        .await?;
        Ok(artifact)
    }
}
