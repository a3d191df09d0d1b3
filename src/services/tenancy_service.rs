// src/services/tenancy_service.rs

use sqlx::{Connection, PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{PaginatedResponse, PaginationParams},
    },
    db::{TenantRepository, UserRepository},
    models::tenancy::{Membership, Tenant, TenantMember, TenantWithRole, UserRole},
};

#[derive(Clone)]
pub struct TenantService {
    tenant_repo: TenantRepository,
    user_repo: UserRepository,
    pool: PgPool,
}

impl TenantService {
    pub fn new(tenant_repo: TenantRepository, user_repo: UserRepository, pool: PgPool) -> Self {
        Self { tenant_repo, user_repo, pool }
    }

    /// Cria o tenant e, na mesma transação, torna o criador OWNER.
    pub async fn create_tenant_with_owner(&self, name: &str, slug: &str, owner_id: Uuid) -> Result<Tenant, AppError> {
        // 1. Inicia a transação
        let mut tx = self.pool.begin().await?;

        // 2. Cria o tenant (slug duplicado vira 409)
        let tenant = self.tenant_repo.create_tenant(&mut *tx, name.trim(), slug).await?;

        // 3. Criador vira dono
        self.tenant_repo
            .add_member(&mut *tx, tenant.id, owner_id, UserRole::Owner)
            .await?;

        // 4. Commit
        tx.commit().await?;

        tracing::info!(tenant_id = %tenant.id, slug = %tenant.slug, "Tenant criado");
        Ok(tenant)
    }

    pub async fn list_user_tenants(&self, user_id: Uuid) -> Result<Vec<TenantWithRole>, AppError> {
        self.tenant_repo.list_user_tenants(user_id).await
    }

    /// Papel do usuário no tenant, ou `None` se não for membro.
    pub async fn find_role(&self, tenant_id: Uuid, user_id: Uuid) -> Result<Option<UserRole>, AppError> {
        Ok(self
            .tenant_repo
            .find_membership(tenant_id, user_id)
            .await?
            .map(|m| m.role))
    }

    // ---
    // Membros
    // ---

    pub async fn list_members(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        params: &PaginationParams,
    ) -> Result<PaginatedResponse<TenantMember>, AppError> {
        let members = self
            .user_repo
            .list_members(&mut *conn, tenant_id, params.limit(), params.offset())
            .await?;
        let total = self.user_repo.count_members(&mut *conn, tenant_id).await?;
        Ok(PaginatedResponse::new(members, params, total))
    }

    pub async fn get_member(&self, conn: &mut PgConnection, tenant_id: Uuid, user_id: Uuid) -> Result<TenantMember, AppError> {
        self.user_repo
            .find_member(conn, tenant_id, user_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("User".into()))
    }

    /// Adiciona um usuário já cadastrado. Só OWNER concede OWNER.
    pub async fn add_member(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        actor_role: UserRole,
        email: &str,
        role: UserRole,
    ) -> Result<Membership, AppError> {
        ensure_can_manage(actor_role, None, role)?;

        let user = self
            .user_repo
            .find_by_email(email.trim())
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("User".into()))?;

        let membership = self.tenant_repo.add_member(conn, tenant_id, user.id, role).await?;
        tracing::info!(tenant_id = %tenant_id, user_id = %user.id, role = role.as_str(), "Membro adicionado");
        Ok(membership)
    }

    /// Troca o papel de um membro. O último OWNER não pode ser rebaixado.
    pub async fn update_member_role(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        actor_role: UserRole,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<Membership, AppError> {
        // 1. Inicia a transação
        let mut tx = conn.begin().await?;

        // 2. Trava os donos e confere o papel atual
        let owners = self.tenant_repo.lock_owners(&mut *tx, tenant_id).await?;
        let current = self
            .user_repo
            .find_member(&mut *tx, tenant_id, user_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Member".into()))?;

        ensure_can_manage(actor_role, Some(current.role), role)?;
        ensure_owner_remains(&owners, user_id, role)?;

        // 3. Atualiza
        let membership = self
            .tenant_repo
            .update_member_role(&mut *tx, tenant_id, user_id, role)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Member".into()))?;

        tx.commit().await?;
        Ok(membership)
    }
}

// OWNER só é concedido ou retirado por outro OWNER
fn ensure_can_manage(actor: UserRole, current: Option<UserRole>, next: UserRole) -> Result<(), AppError> {
    let touches_owner = next == UserRole::Owner || current == Some(UserRole::Owner);
    if touches_owner && actor != UserRole::Owner {
        return Err(AppError::InsufficientRole {
            required: UserRole::Owner.as_str().into(),
            current: actor.as_str().into(),
        });
    }
    Ok(())
}

fn ensure_owner_remains(owners: &[Uuid], user_id: Uuid, next: UserRole) -> Result<(), AppError> {
    let demoting_owner = owners.contains(&user_id) && next != UserRole::Owner;
    if demoting_owner && owners.len() == 1 {
        return Err(AppError::LastOwner);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_owner_cannot_be_demoted() {
        let owner = Uuid::new_v4();
        assert!(matches!(
            ensure_owner_remains(&[owner], owner, UserRole::Admin),
            Err(AppError::LastOwner)
        ));
        assert!(ensure_owner_remains(&[owner], owner, UserRole::Owner).is_ok());
        assert!(ensure_owner_remains(&[owner, Uuid::new_v4()], owner, UserRole::Pm).is_ok());
    }

    #[test]
    fn promoting_a_member_keeps_owners_intact() {
        let owner = Uuid::new_v4();
        assert!(ensure_owner_remains(&[owner], Uuid::new_v4(), UserRole::Admin).is_ok());
    }

    #[test]
    fn only_owners_touch_the_owner_role() {
        assert!(ensure_can_manage(UserRole::Admin, Some(UserRole::Pm), UserRole::Supervisor).is_ok());
        assert!(ensure_can_manage(UserRole::Admin, Some(UserRole::Pm), UserRole::Owner).is_err());
        assert!(ensure_can_manage(UserRole::Admin, Some(UserRole::Owner), UserRole::Pm).is_err());
        assert!(ensure_can_manage(UserRole::Owner, Some(UserRole::Owner), UserRole::Admin).is_ok());
        assert!(ensure_can_manage(UserRole::Admin, None, UserRole::Owner).is_err());
    }
}
