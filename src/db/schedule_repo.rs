// src/db/schedule_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::schedule::{CreateMilestonePayload, ScheduleMilestone},
};

#[derive(Clone, Default)]
pub struct ScheduleRepository;

impl ScheduleRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create<'e, E>(&self, executor: E, p: &CreateMilestonePayload) -> Result<ScheduleMilestone, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let milestone = sqlx::query_as::<_, ScheduleMilestone>(
            r#"
            INSERT INTO schedule_milestones (
                project_id, phase, description,
                baseline_start_date, baseline_end_date,
                actual_start_date, actual_end_date, percent_complete
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(p.project_id)
        .bind(p.phase)
        .bind(&p.description)
        .bind(p.baseline_start_date)
        .bind(p.baseline_end_date)
        .bind(p.actual_start_date)
        .bind(p.actual_end_date)
        .bind(p.percent_complete)
        .fetch_one(executor)
        .await?;
        Ok(milestone)
    }

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ScheduleMilestone>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let milestone = sqlx::query_as::<_, ScheduleMilestone>(
            r#"
            SELECT s.* FROM schedule_milestones s
            JOIN build_projects p ON p.id = s.project_id
            WHERE s.id = $1 AND p.tenant_id = $2
              AND s.deleted_at IS NULL AND p.deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;
        Ok(milestone)
    }

    pub async fn list_for_project<'e, E>(&self, executor: E, project_id: Uuid) -> Result<Vec<ScheduleMilestone>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let milestones = sqlx::query_as::<_, ScheduleMilestone>(
            r#"
            SELECT * FROM schedule_milestones
            WHERE project_id = $1 AND deleted_at IS NULL
            ORDER BY baseline_start_date, id
            "#,
        )
        .bind(project_id)
        .fetch_all(executor)
        .await?;
        Ok(milestones)
    }

    pub async fn update<'e, E>(&self, executor: E, m: &ScheduleMilestone) -> Result<ScheduleMilestone, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let milestone = sqlx::query_as::<_, ScheduleMilestone>(
            r#"
            UPDATE schedule_milestones SET
                phase = $2, description = $3,
                baseline_start_date = $4, baseline_end_date = $5,
                actual_start_date = $6, actual_end_date = $7,
                percent_complete = $8, updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(m.id)
        .bind(m.phase)
        .bind(&m.description)
        .bind(m.baseline_start_date)
        .bind(m.baseline_end_date)
        .bind(m.actual_start_date)
        .bind(m.actual_end_date)
        .bind(m.percent_complete)
        .fetch_optional(executor)
        .await?;
        milestone.ok_or_else(|| AppError::ResourceNotFound("Milestone".into()))
    }

    pub async fn soft_delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE schedule_milestones SET deleted_at = now(), updated_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
