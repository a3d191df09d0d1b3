// src/middleware/rbac.rs

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    common::error::{ApiError, AppError},
    middleware::tenancy::MemberRole,
    models::tenancy::UserRole,
};

/// 1. O papel mínimo exigido por uma rota
pub trait RoleRequirement: Send + Sync + 'static {
    fn min_role() -> UserRole;
}

/// 2. O Extractor (Guardião)
pub struct RequireRole<R>(pub PhantomData<R>);

impl<R, S> FromRequestParts<S> for RequireRole<R>
where
    R: RoleRequirement,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // O tenant_guard já resolveu o papel
        let MemberRole(current) = parts
            .extensions
            .get::<MemberRole>()
            .copied()
            .ok_or(AppError::NotTenantMember)?;

        check_role(current, R::min_role())?;
        Ok(RequireRole(PhantomData))
    }
}

pub fn check_role(current: UserRole, required: UserRole) -> Result<(), AppError> {
    if !current.at_least(required) {
        return Err(AppError::InsufficientRole {
            required: required.as_str().into(),
            current: current.as_str().into(),
        });
    }
    Ok(())
}

// ---
// PAPÉIS MÍNIMOS (TIPOS)
// ---

pub struct MinAdmin;
impl RoleRequirement for MinAdmin {
    fn min_role() -> UserRole { UserRole::Admin }
}

pub struct MinPm;
impl RoleRequirement for MinPm {
    fn min_role() -> UserRole { UserRole::Pm }
}

pub struct MinSupervisor;
impl RoleRequirement for MinSupervisor {
    fn min_role() -> UserRole { UserRole::Supervisor }
}

pub struct MinEstimator;
impl RoleRequirement for MinEstimator {
    fn min_role() -> UserRole { UserRole::Estimator }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_hierarchy_is_enforced() {
        assert!(check_role(UserRole::Owner, MinAdmin::min_role()).is_ok());
        assert!(check_role(UserRole::Pm, MinPm::min_role()).is_ok());
        assert!(check_role(UserRole::Estimator, MinSupervisor::min_role()).is_err());

        let err = check_role(UserRole::Sub, MinEstimator::min_role()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Insufficient permissions. Required: ESTIMATOR, Current: SUB"
        );
    }
}
