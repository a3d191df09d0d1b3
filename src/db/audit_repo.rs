// src/db/audit_repo.rs

use serde_json::Value;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::audit::{Actor, AuditAction},
};

#[derive(Clone, Default)]
pub struct AuditRepository;

impl AuditRepository {
    pub fn new() -> Self {
        Self
    }

    /// Grava na mesma transação da alteração.
    pub async fn record<'e, E>(
        &self,
        executor: E,
        actor: Actor,
        action: AuditAction,
        entity_type: &str,
        entity_id: Uuid,
        changes: Value,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (tenant_id, user_id, action, entity_type, entity_id, changes)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(actor.tenant_id)
        .bind(actor.user_id)
        .bind(action)
        .bind(entity_type)
        .bind(entity_id)
        .bind(changes)
        .execute(executor)
        .await?;
        Ok(())
    }
}
