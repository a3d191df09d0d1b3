// src/middleware/tenancy.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::auth::{authenticate, AuthenticatedUser},
    models::tenancy::UserRole,
};

// O nome do nosso cabeçalho HTTP customizado
pub const TENANT_ID_HEADER: &str = "x-tenant-id";

/// Tenant escolhido pelo cliente (já conferido pelo `tenant_guard`).
#[derive(Debug, Clone, Copy)]
pub struct TenantContext(pub Uuid);

/// Papel do usuário no tenant do request.
#[derive(Debug, Clone, Copy)]
pub struct MemberRole(pub UserRole);

/// `None` se o cabeçalho não veio; 400 se veio inválido.
pub fn optional_tenant_id(headers: &HeaderMap) -> Result<Option<Uuid>, ApiError> {
    let Some(value) = headers.get(TENANT_ID_HEADER) else {
        return Ok(None);
    };
    let value_str = value
        .to_str()
        .map_err(|_| ApiError::bad_request("X-Tenant-ID header contains invalid characters."))?;
    let tenant_id = Uuid::parse_str(value_str.trim())
        .map_err(|_| ApiError::bad_request("X-Tenant-ID header is not a valid UUID."))?;
    Ok(Some(tenant_id))
}

// Guard das rotas do tenant: login + cabeçalho + membership
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Autentica (401 antes de qualquer outra coisa)
    let user = authenticate(&app_state, request.headers()).await?;

    // 2. Cabeçalho obrigatório
    let tenant_id = optional_tenant_id(request.headers())?
        .ok_or_else(|| ApiError::bad_request("The X-Tenant-ID header is required."))?;

    // 3. Precisa ser membro
    let role = app_state
        .tenant_service
        .find_role(tenant_id, user.id)
        .await?
        .ok_or(AppError::NotTenantMember)?;

    let extensions = request.extensions_mut();
    extensions.insert(AuthenticatedUser(user));
    extensions.insert(TenantContext(tenant_id));
    extensions.insert(MemberRole(role));
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .copied()
            .ok_or_else(|| ApiError::bad_request("Tenant context not found."))
    }
}

impl<S> FromRequestParts<S> for MemberRole
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<MemberRole>()
            .copied()
            .ok_or_else(|| AppError::NotTenantMember.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn tenant_header_is_optional_but_must_be_a_uuid() {
        let mut headers = HeaderMap::new();
        assert!(optional_tenant_id(&headers).unwrap().is_none());

        let id = Uuid::new_v4();
        headers.insert(TENANT_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(optional_tenant_id(&headers).unwrap(), Some(id));

        headers.insert(TENANT_ID_HEADER, HeaderValue::from_static("acme"));
        let err = optional_tenant_id(&headers).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }
}
