// src/models/tenancy.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::schema::validate_slug;

// ---
// 1. Papéis (hierarquia de acesso dentro do tenant)
// ---
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Owner,
    Admin,
    Pm,
    Supervisor,
    Estimator,
    Sub,
}

impl UserRole {
    /// OWNER 6 > ADMIN 5 > PM 4 > SUPERVISOR 3 > ESTIMATOR 2 > SUB 1
    pub fn level(self) -> u8 {
        match self {
            UserRole::Owner => 6,
            UserRole::Admin => 5,
            UserRole::Pm => 4,
            UserRole::Supervisor => 3,
            UserRole::Estimator => 2,
            UserRole::Sub => 1,
        }
    }

    pub fn at_least(self, required: UserRole) -> bool {
        self.level() >= required.level()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Owner => "OWNER",
            UserRole::Admin => "ADMIN",
            UserRole::Pm => "PM",
            UserRole::Supervisor => "SUPERVISOR",
            UserRole::Estimator => "ESTIMATOR",
            UserRole::Sub => "SUB",
        }
    }
}

// ---
// 2. Tenant (a construtora)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(custom(function = "validate_slug"))]
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// 3. Membership (ponte usuário-tenant com papel)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Tenant visto pelo usuário logado (lista "meus tenants")
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantWithRole {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

// Membro visto pelo tenant (lista de usuários)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantMember {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub joined_at: DateTime<Utc>,
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTenantPayload {
    #[validate(length(min = 1, max = 255, message = "Name must have 1 to 255 characters."))]
    #[schema(example = "Acme Builders")]
    pub name: String,

    #[validate(custom(function = "validate_slug"))]
    #[schema(example = "acme-builders")]
    pub slug: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberPayload {
    #[validate(email(message = "Invalid email address."))]
    #[schema(example = "estimator@acme.com")]
    pub email: String,
    pub role: UserRole,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRolePayload {
    pub role: UserRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_hierarchy() {
        assert!(UserRole::Owner.at_least(UserRole::Admin));
        assert!(UserRole::Pm.at_least(UserRole::Pm));
        assert!(!UserRole::Estimator.at_least(UserRole::Supervisor));
        assert!(!UserRole::Sub.at_least(UserRole::Estimator));
    }

    #[test]
    fn roles_serialize_in_screaming_case() {
        assert_eq!(serde_json::to_value(UserRole::Pm).unwrap(), "PM");
        let role: UserRole = serde_json::from_value("SUPERVISOR".into()).unwrap();
        assert_eq!(role, UserRole::Supervisor);
        assert!(serde_json::from_value::<UserRole>("GUEST".into()).is_err());
    }

    #[test]
    fn tenant_payload_requires_a_clean_slug() {
        let bad = CreateTenantPayload { name: "Acme".into(), slug: "Acme Builders".into() };
        assert!(bad.validate().is_err());
        let ok = CreateTenantPayload { name: "Acme".into(), slug: "acme-builders".into() };
        assert!(ok.validate().is_ok());
    }
}
