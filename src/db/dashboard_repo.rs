// src/db/dashboard_repo.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, FromRow, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::project::ProjectStatus};

// Dados crus; o serviço faz as contas
#[derive(Debug, Clone, FromRow)]
pub struct ProjectFigures {
    pub id: Uuid,
    pub title: String,
    pub status: ProjectStatus,
    pub budget: Option<Decimal>,
    pub home_area_sqft: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct MilestoneFigures {
    pub project_id: Uuid,
    pub baseline_end_date: NaiveDate,
    pub actual_end_date: Option<NaiveDate>,
    pub percent_complete: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardSnapshot {
    pub projects: Vec<ProjectFigures>,
    pub milestones: Vec<MilestoneFigures>,
    pub materials_tracked: i64,
}

#[derive(Clone, Default)]
pub struct DashboardRepository;

impl DashboardRepository {
    pub fn new() -> Self {
        Self
    }

    /// Lê tudo numa transação só (snapshot consistente).
    pub async fn load_snapshot<'a, A>(&self, executor: A, tenant_id: Uuid) -> Result<DashboardSnapshot, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        // A. Obras vivas
        let projects = sqlx::query_as::<_, ProjectFigures>(
            r#"
            SELECT id, title, status, budget, home_area_sqft, updated_at
            FROM build_projects
            WHERE tenant_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&mut *tx)
        .await?;

        // B. Marcos vivos dessas obras
        let milestones = sqlx::query_as::<_, MilestoneFigures>(
            r#"
            SELECT s.project_id, s.baseline_end_date, s.actual_end_date, s.percent_complete
            FROM schedule_milestones s
            JOIN build_projects p ON p.id = s.project_id
            WHERE p.tenant_id = $1 AND p.deleted_at IS NULL AND s.deleted_at IS NULL
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&mut *tx)
        .await?;

        // C. Linhas de material rastreadas
        let materials_tracked = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM material_line_items m
            JOIN build_projects p ON p.id = m.project_id
            WHERE p.tenant_id = $1 AND p.deleted_at IS NULL AND m.deleted_at IS NULL
            "#,
        )
        .bind(tenant_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(DashboardSnapshot { projects, milestones, materials_tracked })
    }
}
