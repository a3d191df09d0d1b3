// src/common/db_utils.rs

use sqlx::{pool::PoolConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::config::AppState;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::tenancy::TenantContext;

// ---
// Helper RLS: a "chave" para o banco de dados
// ---

/// Adquire uma conexão da pool e define as variáveis RLS do request atual.
pub(crate) async fn get_rls_connection(
    app_state: &AppState,
    tenant_ctx: &TenantContext,
    user: &AuthenticatedUser,
) -> Result<PoolConnection<Postgres>, AppError> {
    scoped_connection(&app_state.db_pool, tenant_ctx.0, Some(user.0.id)).await
}

/// Mesma coisa, fora de um request (ex.: jobs de relatório).
/// As variáveis são de sessão: toda aquisição sobrescreve as anteriores.
pub(crate) async fn scoped_connection(
    pool: &PgPool,
    tenant_id: Uuid,
    user_id: Option<Uuid>,
) -> Result<PoolConnection<Postgres>, AppError> {
    // 1. Adquire conexão
    let mut conn = pool.acquire().await?;

    // 2. Define Tenant ID
    sqlx::query("SELECT set_config('app.tenant_id', $1, false)")
        .bind(tenant_id.to_string())
        .execute(&mut *conn)
        .await?;

    // 3. Define User ID (vazio para jobs do sistema)
    sqlx::query("SELECT set_config('app.user_id', $1, false)")
        .bind(user_id.map(|id| id.to_string()).unwrap_or_default())
        .execute(&mut *conn)
        .await?;

    Ok(conn)
}
