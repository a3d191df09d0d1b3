pub mod archive;
pub mod auth;
pub mod calculations;
pub mod dashboard;
pub mod files;
pub mod materials;
pub mod milestones;
pub mod projects;
pub mod reports;
pub mod tenancy;

use crate::{
    middleware::{auth::AuthenticatedUser, tenancy::TenantContext},
    models::audit::Actor,
};

// Quem está agindo, para a auditoria
pub(crate) fn actor(tenant: &TenantContext, user: &AuthenticatedUser) -> Actor {
    Actor { tenant_id: tenant.0, user_id: user.0.id }
}
