// src/handlers/projects.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::ApiError,
        extract::{ValidJson, ValidQuery},
        pagination::{ApiSuccess, PaginatedResponse, PaginationParams},
    },
    config::AppState,
    handlers::actor,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{MinAdmin, MinPm, RequireRole},
        tenancy::TenantContext,
    },
    models::project::{
        BuildProject, BuildProjectDetail, CloneProjectPayload, CreateLotPayload, CreateProjectPayload, Lot,
        ProjectFilter, UpdateProjectPayload,
    },
};

// ---
// Handler: create_project
// ---
#[utoipa::path(
    post,
    path = "/api/projects",
    tag = "Projects",
    request_body = CreateProjectPayload,
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant")
    ),
    responses(
        (status = 201, description = "Obra criada", body = BuildProject),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Papel insuficiente (PM+)")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn create_project(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireRole<MinPm>,
    ValidJson(payload): ValidJson<CreateProjectPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let project = app_state
        .project_service
        .create(&mut *rls_conn, actor(&tenant, &user), &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(project)))
}

// ---
// Handler: list_projects
// ---
#[utoipa::path(
    get,
    path = "/api/projects",
    tag = "Projects",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ProjectFilter,
        PaginationParams
    ),
    responses(
        (status = 200, description = "Obras do tenant (paginado)", body = PaginatedResponse<BuildProject>)
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn list_projects(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    ValidQuery(filter): ValidQuery<ProjectFilter>,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<PaginatedResponse<BuildProject>>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let page = app_state
        .project_service
        .list(&mut *rls_conn, tenant.0, filter.status, &params)
        .await?;
    Ok(Json(page))
}

// ---
// Handler: get_project (detalhe com lotes e financeiro)
// ---
#[utoipa::path(
    get,
    path = "/api/projects/{id}",
    tag = "Projects",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID da obra")
    ),
    responses(
        (status = 200, description = "Obra, lotes e números derivados", body = BuildProjectDetail),
        (status = 404, description = "Obra não encontrada")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_project(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<BuildProjectDetail>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let detail = app_state
        .project_service
        .get_detail(&mut *rls_conn, tenant.0, id)
        .await?;
    Ok(Json(detail))
}

#[utoipa::path(
    patch,
    path = "/api/projects/{id}",
    tag = "Projects",
    request_body = UpdateProjectPayload,
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID da obra")
    ),
    responses(
        (status = 200, description = "Obra atualizada", body = BuildProject),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Obra não encontrada")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn update_project(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireRole<MinPm>,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<UpdateProjectPayload>,
) -> Result<Json<BuildProject>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let project = app_state
        .project_service
        .update(&mut *rls_conn, actor(&tenant, &user), id, payload)
        .await?;
    Ok(Json(project))
}

#[utoipa::path(
    delete,
    path = "/api/projects/{id}",
    tag = "Projects",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID da obra")
    ),
    responses(
        (status = 204, description = "Obra removida (soft delete)"),
        (status = 403, description = "Papel insuficiente (ADMIN+)"),
        (status = 404, description = "Obra não encontrada")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn delete_project(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireRole<MinAdmin>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    app_state
        .project_service
        .delete(&mut *rls_conn, actor(&tenant, &user), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/projects/{id}/clone",
    tag = "Projects",
    request_body = CloneProjectPayload,
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID da obra de origem")
    ),
    responses(
        (status = 201, description = "Nova obra em PLANNING", body = BuildProject),
        (status = 404, description = "Obra de origem não encontrada")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn clone_project(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireRole<MinPm>,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<CloneProjectPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let project = app_state
        .project_service
        .clone_project(&mut *rls_conn, actor(&tenant, &user), id, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(project)))
}

// ---
// Lotes
// ---

#[utoipa::path(
    post,
    path = "/api/projects/{id}/lots",
    tag = "Projects",
    request_body = CreateLotPayload,
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID da obra")
    ),
    responses(
        (status = 201, description = "Lote criado", body = Lot),
        (status = 404, description = "Obra não encontrada")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn create_lot(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireRole<MinPm>,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<CreateLotPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let lot = app_state
        .project_service
        .create_lot(&mut *rls_conn, actor(&tenant, &user), id, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(lot)))
}

#[utoipa::path(
    get,
    path = "/api/projects/{id}/lots",
    tag = "Projects",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID da obra")
    ),
    responses(
        (status = 200, description = "Lotes da obra", body = ApiSuccess<Vec<Lot>>)
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn list_lots(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiSuccess<Vec<Lot>>>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let lots = app_state.project_service.list_lots(&mut *rls_conn, tenant.0, id).await?;
    Ok(Json(ApiSuccess { data: lots }))
}
