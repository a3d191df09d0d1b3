// src/handlers/milestones.rs

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
    middleware::{
        auth::AuthenticatedUser,
        rbac::{MinSupervisor, RequireRole},
        tenancy::TenantContext,
    },
    models::schedule::{
        CreateMilestonePayload, MilestoneFilter, ScheduleMilestone, ScheduleVarianceReport, UpdateMilestonePayload,
    },
};

#[utoipa::path(
    post,
    path = "/api/milestones",
    tag = "Schedule",
    request_body = CreateMilestonePayload,
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant")
    ),
    responses(
        (status = 201, description = "Marco criado", body = ScheduleMilestone),
        (status = 400, description = "Datas ou percentual inválidos"),
        (status = 403, description = "Papel insuficiente (SUPERVISOR+)")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn create_milestone(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireRole<MinSupervisor>,
    ValidJson(payload): ValidJson<CreateMilestonePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let milestone = app_state
        .schedule_service
        .create(&mut *rls_conn, actor(&tenant, &user), &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(milestone)))
}

#[utoipa::path(
    get,
    path = "/api/milestones",
    tag = "Schedule",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        MilestoneFilter
    ),
    responses(
        (status = 200, description = "Marcos da obra em ordem de início", body = ApiSuccess<Vec<ScheduleMilestone>>)
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn list_milestones(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    ValidQuery(filter): ValidQuery<MilestoneFilter>,
) -> Result<Json<ApiSuccess<Vec<ScheduleMilestone>>>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let milestones = app_state
        .schedule_service
        .list(&mut *rls_conn, tenant.0, filter.project_id)
        .await?;
    Ok(Json(ApiSuccess { data: milestones }))
}

#[utoipa::path(
    get,
    path = "/api/milestones/{id}",
    tag = "Schedule",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do marco")
    ),
    responses(
        (status = 200, description = "Marco", body = ScheduleMilestone),
        (status = 404, description = "Marco não encontrado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_milestone(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ScheduleMilestone>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let milestone = app_state.schedule_service.get(&mut *rls_conn, tenant.0, id).await?;
    Ok(Json(milestone))
}

#[utoipa::path(
    patch,
    path = "/api/milestones/{id}",
    tag = "Schedule",
    request_body = UpdateMilestonePayload,
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do marco")
    ),
    responses(
        (status = 200, description = "Marco atualizado", body = ScheduleMilestone),
        (status = 400, description = "Resultado inválido após a mescla"),
        (status = 404, description = "Marco não encontrado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn update_milestone(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireRole<MinSupervisor>,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<UpdateMilestonePayload>,
) -> Result<Json<ScheduleMilestone>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let milestone = app_state
        .schedule_service
        .update(&mut *rls_conn, actor(&tenant, &user), id, payload)
        .await?;
    Ok(Json(milestone))
}

#[utoipa::path(
    delete,
    path = "/api/milestones/{id}",
    tag = "Schedule",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do marco")
    ),
    responses(
        (status = 204, description = "Marco removido (soft delete)"),
        (status = 404, description = "Marco não encontrado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn delete_milestone(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireRole<MinSupervisor>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    app_state
        .schedule_service
        .delete(&mut *rls_conn, actor(&tenant, &user), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Handler: schedule_variance
// ---
#[utoipa::path(
    get,
    path = "/api/milestones/variance/{projectId}",
    tag = "Schedule",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ("projectId" = Uuid, Path, description = "ID da obra")
    ),
    responses(
        (status = 200, description = "Atraso por marco e resumo de conclusão", body = ScheduleVarianceReport),
        (status = 404, description = "Obra não encontrada")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn schedule_variance(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ScheduleVarianceReport>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let report = app_state
        .schedule_service
        .variance(&mut *rls_conn, tenant.0, project_id)
        .await?;
    Ok(Json(report))
}
