// src/handlers/files.rs

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
        pagination::ApiSuccess,
    },
    config::AppState,
    handlers::actor,
    middleware::{auth::AuthenticatedUser, tenancy::TenantContext},
    models::file::{CreateFilePayload, DownloadUrlResponse, FileFilter, ProjectFile, UploadUrlQuery, UploadUrlResponse},
};

#[utoipa::path(
    post,
    path = "/api/files/upload-url",
    tag = "Files",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        UploadUrlQuery
    ),
    responses(
        (status = 200, description = "URL de upload e a chave de storage reservada", body = UploadUrlResponse),
        (status = 404, description = "Obra não encontrada")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn upload_url(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    ValidQuery(query): ValidQuery<UploadUrlQuery>,
) -> Result<Json<UploadUrlResponse>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let response = app_state
        .file_service
        .upload_url(&mut *rls_conn, tenant.0, query.project_id, &query.filename)
        .await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/files",
    tag = "Files",
    request_body = CreateFilePayload,
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant")
    ),
    responses(
        (status = 201, description = "Metadados registrados", body = ProjectFile),
        (status = 400, description = "Chave de storage de outra obra")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn register_file(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    ValidJson(payload): ValidJson<CreateFilePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let file = app_state
        .file_service
        .register(&mut *rls_conn, actor(&tenant, &user), &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(file)))
}

#[utoipa::path(
    get,
    path = "/api/files",
    tag = "Files",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        FileFilter
    ),
    responses(
        (status = 200, description = "Arquivos da obra", body = ApiSuccess<Vec<ProjectFile>>)
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn list_files(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    ValidQuery(filter): ValidQuery<FileFilter>,
) -> Result<Json<ApiSuccess<Vec<ProjectFile>>>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let files = app_state
        .file_service
        .list(&mut *rls_conn, tenant.0, filter.project_id)
        .await?;
    Ok(Json(ApiSuccess { data: files }))
}

#[utoipa::path(
    get,
    path = "/api/files/{id}/download-url",
    tag = "Files",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do arquivo")
    ),
    responses(
        (status = 200, description = "URL temporária de download", body = DownloadUrlResponse),
        (status = 404, description = "Arquivo não encontrado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn download_url(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<DownloadUrlResponse>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let response = app_state
        .file_service
        .download_url(&mut *rls_conn, tenant.0, id)
        .await?;
    Ok(Json(response))
}
