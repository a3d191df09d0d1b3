// src/config.rs

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        AuditRepository, DashboardRepository, FileRepository, MaterialRepository, ProjectRepository,
        ReportRepository, ScheduleRepository, TenantRepository, UserRepository,
    },
    services::{
        archive_service::ArchiveService, auth::AuthService, dashboard_service::DashboardService,
        file_service::FileService, material_service::MaterialService, project_service::ProjectService,
        report_service::ReportService, schedule_service::ScheduleService, tenancy_service::TenantService,
    },
};

// ---
// Settings (variáveis de ambiente / .env)
// ---

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub api_host: String,
    pub api_port: u16,
    pub environment: String,
    pub database_pool_size: u32,
    pub database_acquire_timeout_secs: u64,
    pub allowed_origins: Vec<String>,
    pub log_level: String,
    pub storage_base_url: String,
    pub report_fonts_dir: PathBuf,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Monta a partir de qualquer fonte chave -> valor (testes usam um mapa).
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{} deve ser definida", key))
        };
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let allowed_origins = or_default("ALLOWED_ORIGINS", "http://localhost:3000")
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            api_host: or_default("API_HOST", "0.0.0.0"),
            api_port: parse_number(&or_default("API_PORT", "8000"), "API_PORT")?,
            environment: or_default("ENVIRONMENT", "development"),
            database_pool_size: parse_number(&or_default("DATABASE_POOL_SIZE", "5"), "DATABASE_POOL_SIZE")?,
            database_acquire_timeout_secs: parse_number(
                &or_default("DATABASE_ACQUIRE_TIMEOUT_SECS", "3"),
                "DATABASE_ACQUIRE_TIMEOUT_SECS",
            )?,
            allowed_origins,
            log_level: or_default("LOG_LEVEL", "info"),
            storage_base_url: or_default("STORAGE_BASE_URL", "https://s3.example.com"),
            report_fonts_dir: PathBuf::from(or_default("REPORT_FONTS_DIR", "./fonts")),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str, key: &str) -> anyhow::Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("{} inválida: '{}'", key, raw))
}

// ---
// AppState
// ---

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: Arc<Settings>,
    pub auth_service: AuthService,
    pub tenant_service: TenantService,
    pub project_service: ProjectService,
    pub material_service: MaterialService,
    pub schedule_service: ScheduleService,
    pub report_service: ReportService,
    pub file_service: FileService,
    pub archive_service: ArchiveService,
    pub dashboard_service: DashboardService,
}

impl AppState {
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.database_pool_size)
            .acquire_timeout(Duration::from_secs(settings.database_acquire_timeout_secs))
            .connect(&settings.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
        Ok(Self::with_pool(db_pool, settings))
    }

    /// Monta o gráfico de dependências sobre uma pool já criada.
    pub fn with_pool(db_pool: PgPool, settings: Settings) -> Self {
        let user_repo = UserRepository::new(db_pool.clone());
        let tenant_repo = TenantRepository::new(db_pool.clone());
        let project_repo = ProjectRepository::new();
        let material_repo = MaterialRepository::new();
        let schedule_repo = ScheduleRepository::new();
        let report_repo = ReportRepository::new();
        let file_repo = FileRepository::new();
        let audit_repo = AuditRepository::new();

        let auth_service = AuthService::new(
            user_repo.clone(),
            tenant_repo.clone(),
            settings.jwt_secret.clone(),
            db_pool.clone(),
        );
        let tenant_service = TenantService::new(tenant_repo, user_repo, db_pool.clone());
        let project_service = ProjectService::new(
            project_repo.clone(),
            material_repo.clone(),
            schedule_repo.clone(),
            audit_repo.clone(),
        );
        let material_service = MaterialService::new(material_repo.clone(), project_repo.clone(), audit_repo.clone());
        let schedule_service = ScheduleService::new(schedule_repo.clone(), project_repo.clone(), audit_repo.clone());
        let report_service = ReportService::new(
            report_repo,
            project_repo.clone(),
            material_repo,
            schedule_repo,
            file_repo.clone(),
            audit_repo.clone(),
            db_pool.clone(),
            settings.report_fonts_dir.clone(),
        );
        let file_service = FileService::new(file_repo, project_repo.clone(), audit_repo, settings.storage_base_url.clone());
        let archive_service = ArchiveService::new(project_repo);
        let dashboard_service = DashboardService::new(DashboardRepository::new());

        Self {
            db_pool,
            settings: Arc::new(settings),
            auth_service,
            tenant_service,
            project_service,
            material_service,
            schedule_service,
            report_service,
            file_service,
            archive_service,
            dashboard_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> anyhow::Result<Settings> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|k| map.get(k).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [("DATABASE_URL", "postgres://localhost/buildpro"), ("JWT_SECRET", "s3cret")];

    #[test]
    fn defaults_apply_when_only_required_values_are_set() {
        let s = settings(&REQUIRED).unwrap();
        assert_eq!(s.bind_address(), "0.0.0.0:8000");
        assert_eq!(s.environment, "development");
        assert_eq!(s.database_pool_size, 5);
        assert_eq!(s.database_acquire_timeout_secs, 3);
        assert_eq!(s.allowed_origins, vec!["http://localhost:3000".to_string()]);
        assert_eq!(s.storage_base_url, "https://s3.example.com");
        assert_eq!(s.report_fonts_dir, PathBuf::from("./fonts"));
    }

    #[test]
    fn missing_secret_is_a_startup_error() {
        let err = settings(&[("DATABASE_URL", "postgres://x")]).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn origins_are_split_and_numbers_validated() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("ALLOWED_ORIGINS", "https://a.com, https://b.com,"));
        pairs.push(("API_PORT", "9090"));
        let s = settings(&pairs).unwrap();
        assert_eq!(s.allowed_origins, vec!["https://a.com".to_string(), "https://b.com".to_string()]);
        assert_eq!(s.api_port, 9090);

        let mut bad = REQUIRED.to_vec();
        bad.push(("API_PORT", "porta"));
        assert!(settings(&bad).unwrap_err().to_string().contains("API_PORT"));
    }
}
