// src/db/material_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::material::{CategoryTotal, MaterialCategory, MaterialLineItem, UnitOfMeasure},
};

// Linha pronta para gravar: totais já calculados pelo serviço
pub struct NewMaterial<'a> {
    pub project_id: Uuid,
    pub category: MaterialCategory,
    pub description: &'a str,
    pub quantity: Decimal,
    pub unit: UnitOfMeasure,
    pub wastage_factor: Decimal,
    pub total_qty: Decimal,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
    pub notes: Option<&'a str>,
}

#[derive(Clone, Default)]
pub struct MaterialRepository;

impl MaterialRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn insert<'e, E>(&self, executor: E, m: &NewMaterial<'_>) -> Result<MaterialLineItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, MaterialLineItem>(
            r#"
            INSERT INTO material_line_items (
                project_id, category, description, quantity, unit,
                wastage_factor, total_qty, unit_cost, total_cost, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(m.project_id)
        .bind(m.category)
        .bind(m.description)
        .bind(m.quantity)
        .bind(m.unit)
        .bind(m.wastage_factor)
        .bind(m.total_qty)
        .bind(m.unit_cost)
        .bind(m.total_cost)
        .bind(m.notes)
        .fetch_one(executor)
        .await?;
        Ok(item)
    }

    /// Busca a linha garantindo que o projeto é do tenant.
    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<MaterialLineItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, MaterialLineItem>(
            r#"
            SELECT m.* FROM material_line_items m
            JOIN build_projects p ON p.id = m.project_id
            WHERE m.id = $1 AND p.tenant_id = $2
              AND m.deleted_at IS NULL AND p.deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;
        Ok(item)
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        project_id: Option<Uuid>,
        category: Option<MaterialCategory>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MaterialLineItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, MaterialLineItem>(
            r#"
            SELECT m.* FROM material_line_items m
            JOIN build_projects p ON p.id = m.project_id
            WHERE p.tenant_id = $1 AND m.deleted_at IS NULL AND p.deleted_at IS NULL
              AND ($2::uuid IS NULL OR m.project_id = $2)
              AND ($3::material_category IS NULL OR m.category = $3)
            ORDER BY m.category, m.description, m.id
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(tenant_id)
        .bind(project_id)
        .bind(category)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn count<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        project_id: Option<Uuid>,
        category: Option<MaterialCategory>,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM material_line_items m
            JOIN build_projects p ON p.id = m.project_id
            WHERE p.tenant_id = $1 AND m.deleted_at IS NULL AND p.deleted_at IS NULL
              AND ($2::uuid IS NULL OR m.project_id = $2)
              AND ($3::material_category IS NULL OR m.category = $3)
            "#,
        )
        .bind(tenant_id)
        .bind(project_id)
        .bind(category)
        .fetch_one(executor)
        .await?;
        Ok(total)
    }

    /// Todas as linhas vivas de um projeto (export, relatórios, clone).
    pub async fn list_for_project<'e, E>(&self, executor: E, project_id: Uuid) -> Result<Vec<MaterialLineItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, MaterialLineItem>(
            r#"
            SELECT * FROM material_line_items
            WHERE project_id = $1 AND deleted_at IS NULL
            ORDER BY category, description, id
            "#,
        )
        .bind(project_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn update<'e, E>(&self, executor: E, m: &MaterialLineItem) -> Result<MaterialLineItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, MaterialLineItem>(
            r#"
            UPDATE material_line_items SET
                category = $2, description = $3, quantity = $4, unit = $5,
                wastage_factor = $6, total_qty = $7, unit_cost = $8, total_cost = $9,
                notes = $10, updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(m.id)
        .bind(m.category)
        .bind(&m.description)
        .bind(m.quantity)
        .bind(m.unit)
        .bind(m.wastage_factor)
        .bind(m.total_qty)
        .bind(m.unit_cost)
        .bind(m.total_cost)
        .bind(&m.notes)
        .fetch_optional(executor)
        .await?;
        item.ok_or_else(|| AppError::ResourceNotFound("Material".into()))
    }

    pub async fn soft_delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE material_line_items SET deleted_at = now(), updated_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---
    // Agregados
    // ---

    pub async fn total_cost<'e, E>(&self, executor: E, project_id: Uuid) -> Result<Decimal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(total_cost), 0) FROM material_line_items WHERE project_id = $1 AND deleted_at IS NULL",
        )
        .bind(project_id)
        .fetch_one(executor)
        .await?;
        Ok(total)
    }

    pub async fn totals_by_category<'e, E>(&self, executor: E, project_id: Uuid) -> Result<Vec<CategoryTotal>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let totals = sqlx::query_as::<_, CategoryTotal>(
            r#"
            SELECT category, COUNT(*) AS item_count, COALESCE(SUM(total_cost), 0) AS total_cost
            FROM material_line_items
            WHERE project_id = $1 AND deleted_at IS NULL
            GROUP BY category
            ORDER BY category
            "#,
        )
        .bind(project_id)
        .fetch_all(executor)
        .await?;
        Ok(totals)
    }
}
