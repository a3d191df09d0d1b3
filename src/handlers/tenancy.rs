// src/handlers/tenancy.rs

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
        pagination::{PaginatedResponse, PaginationParams},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{MinAdmin, RequireRole},
        tenancy::{MemberRole, TenantContext},
    },
    models::tenancy::{
        AddMemberPayload, CreateTenantPayload, Membership, Tenant, TenantMember, TenantWithRole,
        UpdateMemberRolePayload,
    },
};

// ---
// Handler: create_tenant
// ---
#[utoipa::path(
    post,
    path = "/api/tenants",
    tag = "Tenancy",
    request_body = CreateTenantPayload,
    responses(
        (status = 201, description = "Tenant criado; o criador vira OWNER", body = Tenant),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Slug já em uso")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn create_tenant(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ValidJson(payload): ValidJson<CreateTenantPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = app_state
        .tenant_service
        .create_tenant_with_owner(payload.name.trim(), &payload.slug, user.0.id)
        .await?;

    Ok((StatusCode::CREATED, Json(tenant)))
}

// ---
// Handler: list_my_tenants
// ---
#[utoipa::path(
    get,
    path = "/api/tenants",
    tag = "Tenancy",
    responses(
        (status = 200, description = "Tenants do usuário com o papel em cada um", body = Vec<TenantWithRole>),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn list_my_tenants(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<TenantWithRole>>, ApiError> {
    let tenants = app_state.tenant_service.list_user_tenants(user.0.id).await?;
    Ok(Json(tenants))
}

// ---
// Membros
// ---

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        PaginationParams
    ),
    responses(
        (status = 200, description = "Membros do tenant (paginado)", body = PaginatedResponse<TenantMember>),
        (status = 403, description = "Sem acesso ao tenant")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn list_members(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<PaginatedResponse<TenantMember>>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let page = app_state
        .tenant_service
        .list_members(&mut *rls_conn, tenant.0, &params)
        .await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ("id" = Uuid, Path, description = "ID do usuário")
    ),
    responses(
        (status = 200, description = "Membro do tenant", body = TenantMember),
        (status = 404, description = "Usuário não é membro")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_member(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(user_id): Path<Uuid>,
) -> Result<Json<TenantMember>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let member = app_state
        .tenant_service
        .get_member(&mut *rls_conn, tenant.0, user_id)
        .await?;
    Ok(Json(member))
}

#[utoipa::path(
    post,
    path = "/api/tenants/members",
    tag = "Tenancy",
    request_body = AddMemberPayload,
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant")
    ),
    responses(
        (status = 201, description = "Membro adicionado", body = Membership),
        (status = 403, description = "Papel insuficiente"),
        (status = 404, description = "Usuário não encontrado"),
        (status = 409, description = "Já é membro")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn add_member(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    MemberRole(actor_role): MemberRole,
    _guard: RequireRole<MinAdmin>,
    ValidJson(payload): ValidJson<AddMemberPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let membership = app_state
        .tenant_service
        .add_member(&mut *rls_conn, tenant.0, actor_role, &payload.email, payload.role)
        .await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

#[utoipa::path(
    patch,
    path = "/api/tenants/members/{userId}",
    tag = "Tenancy",
    request_body = UpdateMemberRolePayload,
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do tenant"),
        ("userId" = Uuid, Path, description = "ID do membro")
    ),
    responses(
        (status = 200, description = "Papel atualizado", body = Membership),
        (status = 409, description = "Último OWNER não pode ser rebaixado"),
        (status = 403, description = "Papel insuficiente")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn update_member_role(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    MemberRole(actor_role): MemberRole,
    _guard: RequireRole<MinAdmin>,
    Path(user_id): Path<Uuid>,
    ValidJson(payload): ValidJson<UpdateMemberRolePayload>,
) -> Result<Json<Membership>, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user).await?;
    let membership = app_state
        .tenant_service
        .update_member_role(&mut *rls_conn, tenant.0, actor_role, user_id, payload.role)
        .await?;
    Ok(Json(membership))
}
