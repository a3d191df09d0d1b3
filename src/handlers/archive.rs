// src/handlers/archive.rs

use axum::{extract::State, Json};
use uuid::Uuid; // Usado nos params do Swagger

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::ApiError,
        extract::ValidQuery,
        pagination::{PaginatedResponse, PaginationParams},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, tenancy::TenantContext},
    models::{
        archive::{ArchiveSearchQuery, CompareQuery, ProjectComparison},
        project::BuildProject,
    },
};

// ---
// Handler: search_archive
// ---
#[utoipa::path(
    get,
    path = "/api/archive/search",
    tag = "Archive",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ArchiveSearchQuery,
        PaginationParams
    ),
    responses(
        (status = 200, description = "Obras encontradas (paginado)", body = PaginatedResponse<BuildProject>),
        (status = 400, description = "Faixa de área inválida")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn search_archive(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    ValidQuery(query): ValidQuery<ArchiveSearchQuery>,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<PaginatedResponse<BuildProject>>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let page = app_state
        .archive_service
        .search(&mut *rls_conn, tenant.0, &query, &params)
        .await?;
    Ok(Json(page))
}

// ---
// Handler: compare_projects
// ---
#[utoipa::path(
    get,
    path = "/api/archive/compare",
    tag = "Archive",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        CompareQuery
    ),
    responses(
        (status = 200, description = "As duas obras e as diferenças B - A", body = ProjectComparison),
        (status = 404, description = "Obra não encontrada")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn compare_projects(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    ValidQuery(query): ValidQuery<CompareQuery>,
) -> Result<Json<ProjectComparison>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let comparison = app_state
        .archive_service
        .compare(&mut *rls_conn, tenant.0, query.project_a_id, query.project_b_id)
        .await?;
    Ok(Json(comparison))
}
