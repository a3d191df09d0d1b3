// src/db/tenancy_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::tenancy::{Membership, Tenant, TenantWithRole, UserRole},
};

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Cria o tenant (dentro da transação do serviço).
    pub async fn create_tenant<'e, E>(&self, executor: E, name: &str, slug: &str) -> Result<Tenant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Tenant>("INSERT INTO tenants (name, slug) VALUES ($1, $2) RETURNING *")
            .bind(name)
            .bind(slug)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() && db_err.constraint() == Some("tenants_slug_key") {
                        return AppError::TenantSlugAlreadyExists(slug.to_string());
                    }
                }
                e.into()
            })
    }

    pub async fn add_member<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<Membership, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Membership>(
            "INSERT INTO memberships (tenant_id, user_id, role) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation()
                    && db_err.constraint() == Some("uq_membership_tenant_user")
                {
                    return AppError::MemberAlreadyExists;
                }
            }
            e.into()
        })
    }

    // Usado pelo tenant_guard a cada request: vai direto na pool
    pub async fn find_membership(&self, tenant_id: Uuid, user_id: Uuid) -> Result<Option<Membership>, AppError> {
        let membership = sqlx::query_as::<_, Membership>(
            "SELECT * FROM memberships WHERE tenant_id = $1 AND user_id = $2",
        )
        .bind(tenant_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(membership)
    }

    pub async fn list_user_tenants(&self, user_id: Uuid) -> Result<Vec<TenantWithRole>, AppError> {
        let tenants = sqlx::query_as::<_, TenantWithRole>(
            r#"
            SELECT t.id, t.name, t.slug, m.role, t.created_at
            FROM tenants t
            JOIN memberships m ON m.tenant_id = t.id
            WHERE m.user_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tenants)
    }

    pub async fn update_member_role<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<Option<Membership>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            UPDATE memberships SET role = $3, updated_at = now()
            WHERE tenant_id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(executor)
        .await?;
        Ok(membership)
    }

    /// Conta donos travando as linhas (evita dois rebaixamentos simultâneos).
    pub async fn lock_owners<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let owners = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM memberships WHERE tenant_id = $1 AND role = 'OWNER' FOR UPDATE",
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(owners)
    }
}
