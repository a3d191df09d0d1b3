// src/models/file.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "file_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileType {
    Drawing,
    Photo,
    Document,
    Other,
}

impl FileType {
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Drawing => "DRAWING",
            FileType::Photo => "PHOTO",
            FileType::Document => "DOCUMENT",
            FileType::Other => "OTHER",
        }
    }
}

// Metadados de documentos do projeto (o binário fica no storage)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub filename: String,
    pub file_type: FileType,
    pub mime_type: Option<String>,
    #[validate(range(min = 0))]
    pub size_bytes: Option<i64>,
    pub storage_key: String,
    pub storage_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Nomes sem separadores de caminho
fn validate_filename(name: &str) -> Result<(), ValidationError> {
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        let mut err = ValidationError::new("filename");
        err.message = Some("Filename must not contain path separators.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UploadUrlQuery {
    pub project_id: Uuid,
    #[validate(length(min = 1, max = 255), custom(function = "validate_filename"))]
    pub filename: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    pub upload_url: String,
    pub storage_key: String,
    pub expires_in: u32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadUrlResponse {
    pub download_url: String,
    pub expires_in: u32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFilePayload {
    pub project_id: Uuid,
    #[validate(length(min = 1, max = 255), custom(function = "validate_filename"))]
    #[schema(example = "site-plan-rev2.pdf")]
    pub filename: String,
    pub file_type: FileType,
    #[validate(length(max = 100))]
    pub mime_type: Option<String>,
    #[validate(range(min = 0, message = "File size cannot be negative."))]
    pub size_bytes: Option<i64>,
    #[validate(length(min = 1, max = 500))]
    pub storage_key: String,
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct FileFilter {
    pub project_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_cannot_escape_their_folder() {
        assert!(validate_filename("plan.pdf").is_ok());
        assert!(validate_filename("../etc/passwd").is_err());
        assert!(validate_filename("a\\b").is_err());
    }

    #[test]
    fn negative_sizes_are_rejected() {
        let payload = CreateFilePayload {
            project_id: Uuid::new_v4(),
            filename: "photo.jpg".into(),
            file_type: FileType::Photo,
            mime_type: Some("image/jpeg".into()),
            size_bytes: Some(-1),
            storage_key: "t/p/x/photo.jpg".into(),
        };
        assert!(payload.validate().is_err());
    }
}
