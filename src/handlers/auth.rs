// src/handlers/auth.rs

use axum::{extract::State, http::{HeaderMap, StatusCode}, response::IntoResponse, Json};
use uuid::Uuid; // Usado nos params do Swagger

use crate::{
    common::{error::ApiError, extract::ValidJson},
    config::AppState,
    middleware::{auth::AuthenticatedUser, tenancy::optional_tenant_id},
    models::auth::{AuthResponse, CurrentUserResponse, LoginUserPayload, RegisterUserPayload},
};

// ---
// Handler: register
// ---
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Usuário criado", body = AuthResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Email já cadastrado")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    ValidJson(payload): ValidJson<RegisterUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let token = app_state.auth_service.register_user(&payload).await?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token })))
}

// ---
// Handler: login
// ---
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Login realizado", body = AuthResponse),
        (status = 401, description = "Credenciais inválidas")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    ValidJson(payload): ValidJson<LoginUserPayload>,
) -> Result<Json<AuthResponse>, ApiError> {
    let token = app_state
        .auth_service
        .login_user(&payload.email, &payload.password)
        .await?;
    Ok(Json(AuthResponse { token }))
}

// ---
// Handler: get_me
// ---
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Usuário logado e seus tenants", body = CurrentUserResponse),
        (status = 401, description = "Não autorizado")
    ),
    params(
        ("x-tenant-id" = Option<Uuid>, Header, description = "Tenant atual (opcional)")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_me(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    headers: HeaderMap,
) -> Result<Json<CurrentUserResponse>, ApiError> {
    let current_tenant_id = optional_tenant_id(&headers)?;
    let me = app_state.auth_service.current_user(user, current_tenant_id).await?;
    Ok(Json(me))
}
