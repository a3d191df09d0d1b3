// src/services/file_service.rs

use sqlx::{Connection, PgConnection};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AuditRepository, FileRepository, ProjectRepository},
    models::{
        audit::{changes, Actor, AuditAction},
        file::{CreateFilePayload, DownloadUrlResponse, ProjectFile, UploadUrlResponse},
    },
};

/// Validade das URLs de upload/download (segundos)
pub const URL_TTL_SECS: u32 = 3600;

#[derive(Clone)]
pub struct FileService {
    file_repo: FileRepository,
    project_repo: ProjectRepository,
    audit_repo: AuditRepository,
    storage_base_url: String,
}

impl FileService {
    pub fn new(
        file_repo: FileRepository,
        project_repo: ProjectRepository,
        audit_repo: AuditRepository,
        storage_base_url: String,
    ) -> Self {
        let storage_base_url = storage_base_url.trim_end_matches('/').to_string();
        Self { file_repo, project_repo, audit_repo, storage_base_url }
    }

    async fn ensure_project(&self, conn: &mut PgConnection, tenant_id: Uuid, project_id: Uuid) -> Result<(), AppError> {
        self.project_repo
            .find_by_id(conn, tenant_id, project_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::ResourceNotFound("Project".into()))
    }

    pub async fn upload_url(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        project_id: Uuid,
        filename: &str,
    ) -> Result<UploadUrlResponse, AppError> {
        self.ensure_project(conn, tenant_id, project_id).await?;

        let storage_key = storage_key(tenant_id, project_id, Uuid::new_v4(), filename);
        Ok(UploadUrlResponse {
            upload_url: self.signed_url("upload", &storage_key),
            storage_key,
            expires_in: URL_TTL_SECS,
        })
    }

    /// Registra os metadados depois do upload.
    pub async fn register(&self, conn: &mut PgConnection, actor: Actor, payload: &CreateFilePayload) -> Result<ProjectFile, AppError> {
        // A chave tem que ter saído de upload_url para este tenant/obra
        let prefix = format!("{}/{}/", actor.tenant_id, payload.project_id);
        if !payload.storage_key.starts_with(&prefix) {
            return Err(AppError::BadRequest("storageKey does not belong to this project.".into()));
        }

        let mut tx = conn.begin().await?;

        self.ensure_project(&mut *tx, actor.tenant_id, payload.project_id).await?;
        let storage_url = format!("{}/{}", self.storage_base_url, payload.storage_key);
        let file = self
            .file_repo
            .create(&mut *tx, actor.tenant_id, payload, &storage_url)
            .await?;
        self.audit_repo
            .record(&mut *tx, actor, AuditAction::Create, "File", file.id, changes::<(), _>(None, Some(&file)))
            .await?;

        tx.commit().await?;
        Ok(file)
    }

    pub async fn list(&self, conn: &mut PgConnection, tenant_id: Uuid, project_id: Uuid) -> Result<Vec<ProjectFile>, AppError> {
        self.ensure_project(&mut *conn, tenant_id, project_id).await?;
        self.file_repo.list_for_project(conn, tenant_id, project_id).await
    }

    pub async fn download_url(&self, conn: &mut PgConnection, tenant_id: Uuid, id: Uuid) -> Result<DownloadUrlResponse, AppError> {
        let file = self
            .file_repo
            .find_by_id(conn, tenant_id, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("File".into()))?;
        Ok(DownloadUrlResponse {
            download_url: self.signed_url("download", &file.storage_key),
            expires_in: URL_TTL_SECS,
        })
    }

    // Sem assinatura real: o storage de verdade fica atrás desta URL
    fn signed_url(&self, action: &str, key: &str) -> String {
        format!(
            "{}/{}?key={}&expires={}",
            self.storage_base_url,
            action,
            urlencoding::encode(key),
            URL_TTL_SECS
        )
    }
}

pub fn storage_key(tenant_id: Uuid, project_id: Uuid, object_id: Uuid, filename: &str) -> String {
    format!("{}/{}/{}/{}", tenant_id, project_id, object_id, filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> FileService {
        FileService::new(
            FileRepository::new(),
            ProjectRepository::new(),
            AuditRepository::new(),
            "https://s3.example.com/".into(),
        )
    }

    #[test]
    fn storage_keys_are_namespaced_by_tenant_and_project() {
        let (t, p, o) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(storage_key(t, p, o, "plan.pdf"), format!("{}/{}/{}/plan.pdf", t, p, o));
    }

    #[test]
    fn urls_encode_the_key() {
        let url = service().signed_url("upload", "t/p/o/site plan.pdf");
        assert_eq!(url, "https://s3.example.com/upload?key=t%2Fp%2Fo%2Fsite%20plan.pdf&expires=3600");
    }
}
