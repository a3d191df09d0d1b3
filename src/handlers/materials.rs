// src/handlers/materials.rs

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::{ApiError, AppError},
        extract::{ValidJson, ValidQuery},
        pagination::{PaginatedResponse, PaginationParams},
    },
    config::AppState,
    handlers::actor,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{MinEstimator, RequireRole},
        tenancy::TenantContext,
    },
    models::material::{
        CreateMaterialPayload, MaterialFilter, MaterialImportPayload, MaterialImportResult, MaterialLineItem,
        MaterialSummary, UpdateMaterialPayload,
    },
};

// ---
// CRUD
// ---

#[utoipa::path(
    post,
    path = "/api/materials",
    tag = "Materials",
    request_body = CreateMaterialPayload,
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant")
    ),
    responses(
        (status = 201, description = "Item criado; totais calculados no servidor", body = MaterialLineItem),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Papel insuficiente (ESTIMATOR+)")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn create_material(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireRole<MinEstimator>,
    ValidJson(payload): ValidJson<CreateMaterialPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let item = app_state
        .material_service
        .create(&mut *rls_conn, actor(&tenant, &user), &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    get,
    path = "/api/materials",
    tag = "Materials",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        MaterialFilter,
        PaginationParams
    ),
    responses(
        (status = 200, description = "Itens de levantamento (paginado)", body = PaginatedResponse<MaterialLineItem>)
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn list_materials(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    ValidQuery(filter): ValidQuery<MaterialFilter>,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<PaginatedResponse<MaterialLineItem>>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let page = app_state
        .material_service
        .list(&mut *rls_conn, tenant.0, &filter, &params)
        .await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/materials/{id}",
    tag = "Materials",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do item")
    ),
    responses(
        (status = 200, description = "Item", body = MaterialLineItem),
        (status = 404, description = "Item não encontrado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_material(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<MaterialLineItem>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let item = app_state.material_service.get(&mut *rls_conn, tenant.0, id).await?;
    Ok(Json(item))
}

#[utoipa::path(
    patch,
    path = "/api/materials/{id}",
    tag = "Materials",
    request_body = UpdateMaterialPayload,
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do item")
    ),
    responses(
        (status = 200, description = "Item atualizado e totais recalculados", body = MaterialLineItem),
        (status = 404, description = "Item não encontrado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn update_material(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireRole<MinEstimator>,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<UpdateMaterialPayload>,
) -> Result<Json<MaterialLineItem>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let item = app_state
        .material_service
        .update(&mut *rls_conn, actor(&tenant, &user), id, payload)
        .await?;
    Ok(Json(item))
}

#[utoipa::path(
    delete,
    path = "/api/materials/{id}",
    tag = "Materials",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do item")
    ),
    responses(
        (status = 204, description = "Item removido (soft delete)"),
        (status = 404, description = "Item não encontrado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn delete_material(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireRole<MinEstimator>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    app_state
        .material_service
        .delete(&mut *rls_conn, actor(&tenant, &user), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Resumo por categoria
// ---

#[utoipa::path(
    get,
    path = "/api/materials/summary/{projectId}",
    tag = "Materials",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ("projectId" = Uuid, Path, description = "ID da obra")
    ),
    responses(
        (status = 200, description = "Total geral e totais por categoria", body = MaterialSummary),
        (status = 404, description = "Obra não encontrada")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn material_summary(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(project_id): Path<Uuid>,
) -> Result<Json<MaterialSummary>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let summary = app_state
        .material_service
        .summary(&mut *rls_conn, tenant.0, project_id)
        .await?;
    Ok(Json(summary))
}

// ---
// Importação / exportação
// ---

#[utoipa::path(
    post,
    path = "/api/materials/import",
    tag = "Materials",
    request_body = MaterialImportPayload,
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant")
    ),
    responses(
        (status = 200, description = "Linhas válidas importadas; inválidas listadas por número", body = MaterialImportResult),
        (status = 404, description = "Obra não encontrada")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn import_materials(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireRole<MinEstimator>,
    ValidJson(payload): ValidJson<MaterialImportPayload>,
) -> Result<Json<MaterialImportResult>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let result = app_state
        .material_service
        .import_rows(&mut *rls_conn, actor(&tenant, &user), payload.project_id, payload.materials)
        .await?;
    Ok(Json(result))
}

#[utoipa::path(
    post,
    path = "/api/materials/import-csv/{projectId}",
    tag = "Materials",
    request_body(content = String, content_type = "text/csv", description = "category,description,quantity,unit,wastage_factor,unit_cost,notes"),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ("projectId" = Uuid, Path, description = "ID da obra")
    ),
    responses(
        (status = 200, description = "Resultado da importação", body = MaterialImportResult),
        (status = 400, description = "Arquivo sem as colunas obrigatórias")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn import_materials_csv(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireRole<MinEstimator>,
    Path(project_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<MaterialImportResult>, ApiError> {
    let text = std::str::from_utf8(&body)
        .map_err(|_| AppError::BadRequest("CSV body must be valid UTF-8.".into()))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let result = app_state
        .material_service
        .import_csv(&mut *rls_conn, actor(&tenant, &user), project_id, text)
        .await?;
    Ok(Json(result))
}

#[utoipa::path(
    get,
    path = "/api/materials/export-csv/{projectId}",
    tag = "Materials",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ("projectId" = Uuid, Path, description = "ID da obra")
    ),
    responses(
        (status = 200, description = "CSV dos itens da obra", content_type = "text/csv", body = String),
        (status = 404, description = "Obra não encontrada")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn export_materials_csv(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let csv = app_state
        .material_service
        .export_csv(&mut *rls_conn, tenant.0, project_id)
        .await?;

    let disposition = format!("attachment; filename=\"materials-{}.csv\"", project_id);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}
