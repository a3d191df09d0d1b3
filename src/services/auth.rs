// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{TenantRepository, UserRepository},
    models::auth::{Claims, CurrentUserResponse, RegisterUserPayload, User},
};

const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    tenant_repo: TenantRepository,
    jwt_secret: String,
    pool: PgPool,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, tenant_repo: TenantRepository, jwt_secret: String, pool: PgPool) -> Self {
        Self { user_repo, tenant_repo, jwt_secret, pool }
    }

    pub async fn register_user(&self, payload: &RegisterUserPayload) -> Result<String, AppError> {
        // 1. Hash fora do runtime async
        let password = payload.password.clone();
        let hashed_password = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        // 2. Cria o usuário
        let email = payload.email.trim().to_lowercase();
        let user = self
            .user_repo
            .create_user(
                &self.pool,
                &email,
                &hashed_password,
                payload.first_name.trim(),
                payload.last_name.trim(),
            )
            .await?;

        tracing::info!(user_id = %user.id, "Usuário registrado");

        // 3. Token
        self.create_token(user.id)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_email(email.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password = password.to_owned();
        let password_hash = user.password_hash.clone();

        // Verificação em thread separada
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.create_token(user.id)
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = self.decode_token(token)?;
        self.user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    pub async fn current_user(&self, user: User, current_tenant_id: Option<Uuid>) -> Result<CurrentUserResponse, AppError> {
        let memberships = self.tenant_repo.list_user_tenants(user.id).await?;
        Ok(CurrentUserResponse { user, memberships, current_tenant_id })
    }

    fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;
        Ok(data.claims)
    }

    fn create_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(TOKEN_TTL_DAYS);

        let claims = Claims {
            sub: user_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn service(secret: &str) -> AuthService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/buildpro_test")
            .unwrap();
        AuthService::new(
            UserRepository::new(pool.clone()),
            TenantRepository::new(pool.clone()),
            secret.to_string(),
            pool,
        )
    }

    #[tokio::test]
    async fn issued_tokens_decode_to_the_same_user() {
        let svc = service("test-secret");
        let user_id = Uuid::new_v4();
        let token = svc.create_token(user_id).unwrap();
        let claims = svc.decode_token(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
    }

    #[tokio::test]
    async fn tokens_signed_with_another_secret_are_rejected() {
        let token = service("one").create_token(Uuid::new_v4()).unwrap();
        assert!(matches!(service("two").decode_token(&token), Err(AppError::InvalidToken)));
    }
}
