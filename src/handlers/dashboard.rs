// src/handlers/dashboard.rs

use axum::{extract::State, Json};
use uuid::Uuid; // Importante para o Swagger params

use crate::{
    common::{db_utils::get_rls_connection, error::ApiError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, tenancy::TenantContext},
    models::dashboard::DashboardSummary,
};

// GET /api/dashboard/summary
#[utoipa::path(
    get,
    path = "/api/dashboard/summary",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Indicadores do tenant e obras recentes", body = DashboardSummary),
        (status = 401, description = "Não autorizado"),
        (status = 403, description = "Sem acesso ao tenant")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<Json<DashboardSummary>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;

    let summary = app_state
        .dashboard_service
        .get_summary(&mut *rls_conn, tenant.0)
        .await?;

    Ok(Json(summary))
}
