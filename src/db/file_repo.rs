// src/db/file_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::file::{CreateFilePayload, ProjectFile},
};

#[derive(Clone, Default)]
pub struct FileRepository;

impl FileRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        payload: &CreateFilePayload,
        storage_url: &str,
    ) -> Result<ProjectFile, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let file = sqlx::query_as::<_, ProjectFile>(
            r#"
            INSERT INTO files (
                tenant_id, project_id, filename, file_type, mime_type,
                size_bytes, storage_key, storage_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(payload.project_id)
        .bind(&payload.filename)
        .bind(payload.file_type)
        .bind(&payload.mime_type)
        .bind(payload.size_bytes)
        .bind(&payload.storage_key)
        .bind(storage_url)
        .fetch_one(executor)
        .await?;
        Ok(file)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, tenant_id: Uuid, id: Uuid) -> Result<Option<ProjectFile>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let file = sqlx::query_as::<_, ProjectFile>("SELECT * FROM files WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(executor)
            .await?;
        Ok(file)
    }

    pub async fn list_for_project<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        project_id: Uuid,
    ) -> Result<Vec<ProjectFile>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let files = sqlx::query_as::<_, ProjectFile>(
            "SELECT * FROM files WHERE tenant_id = $1 AND project_id = $2 ORDER BY created_at DESC, id",
        )
        .bind(tenant_id)
        .bind(project_id)
        .fetch_all(executor)
        .await?;
        Ok(files)
    }
}
