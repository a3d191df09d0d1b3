// src/handlers/reports.rs

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::ApiError,
        extract::{ValidJson, ValidQuery},
        pagination::{PaginatedResponse, PaginationParams},
    },
    config::AppState,
    handlers::actor,
    middleware::{auth::AuthenticatedUser, tenancy::TenantContext},
    models::report::{GenerateReportRequest, Report, ReportFilter},
};

// ---
// Handler: generate_report
// ---
// Responde 202 com o relatório PENDING; o arquivo sai de um job em segundo plano.
#[utoipa::path(
    post,
    path = "/api/reports/generate",
    tag = "Reports",
    request_body = GenerateReportRequest,
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant")
    ),
    responses(
        (status = 202, description = "Relatório enfileirado (PENDING)", body = Report),
        (status = 404, description = "Obra não encontrada")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn generate_report(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    ValidJson(payload): ValidJson<GenerateReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let report = app_state
        .report_service
        .generate(&mut *rls_conn, actor(&tenant, &user), &payload)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(report)))
}

#[utoipa::path(
    get,
    path = "/api/reports",
    tag = "Reports",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ReportFilter,
        PaginationParams
    ),
    responses(
        (status = 200, description = "Relatórios, mais recentes primeiro", body = PaginatedResponse<Report>)
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn list_reports(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    ValidQuery(filter): ValidQuery<ReportFilter>,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<PaginatedResponse<Report>>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let page = app_state
        .report_service
        .list(&mut *rls_conn, tenant.0, filter.project_id, &params)
        .await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/reports/{id}",
    tag = "Reports",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do relatório")
    ),
    responses(
        (status = 200, description = "Relatório e status atual", body = Report),
        (status = 404, description = "Relatório não encontrado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_report(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Report>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let report = app_state.report_service.get(&mut *rls_conn, tenant.0, id).await?;
    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/api/reports/{id}/download",
    tag = "Reports",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do relatório")
    ),
    responses(
        (status = 200, description = "Arquivo renderizado (PDF ou CSV)", content_type = "application/octet-stream", body = Vec<u8>),
        (status = 404, description = "Relatório não encontrado"),
        (status = 409, description = "Relatório ainda não está COMPLETED")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn download_report(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let artifact = app_state
        .report_service
        .download(&mut *rls_conn, tenant.0, id)
        .await?;

    let disposition = format!("attachment; filename=\"{}\"", artifact.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, artifact.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.content,
    ))
}
