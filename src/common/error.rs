// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

use crate::common::schema::flatten_validation_errors;

// Nosso tipo de erro interno. Serviços e repositórios só conhecem este.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed")]
    ValidationError(#[from] validator::ValidationErrors),

    // Falha de formato (tipo errado, enum desconhecido, UUID inválido) antes do validate()
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Calculation error: {0}")]
    Calculation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Email already in use")]
    EmailAlreadyExists,

    #[error("Tenant slug '{0}' already in use")]
    TenantSlugAlreadyExists(String),

    #[error("User is already a member of this tenant")]
    MemberAlreadyExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("User is not a member of this tenant")]
    NotTenantMember,

    #[error("Insufficient permissions. Required: {required}, Current: {current}")]
    InsufficientRole { required: String, current: String },

    #[error("A tenant must keep at least one owner")]
    LastOwner,

    #[error("{0} not found")]
    ResourceNotFound(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Report is not ready for download")]
    ReportNotReady,

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// O "envelope" de erro que sai para o cliente:
// { "error": { "code": "...", "message": "...", "details": {...} } }
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    #[schema(example = "VALIDATION_ERROR")]
    pub code: String,
    #[schema(example = "One or more fields are invalid.")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorBody {
    pub error: ErrorDetail,
}

// Erro pronto para virar resposta HTTP (é o que os handlers retornam)
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into(), details: None }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }
}

impl AppError {
    pub fn to_api_error(self) -> ApiError {
        match self {
            AppError::ValidationError(errors) => {
                let details = flatten_validation_errors(&errors);
                ApiError {
                    status: StatusCode::BAD_REQUEST,
                    code: "VALIDATION_ERROR",
                    message: "One or more fields are invalid.".into(),
                    details: Some(serde_json::to_value(details).unwrap_or(Value::Null)),
                }
            }
            AppError::MalformedRecord(msg) => ApiError {
                status: StatusCode::BAD_REQUEST,
                code: "VALIDATION_ERROR",
                message: "The record does not match the expected schema.".into(),
                details: Some(serde_json::json!({ "__record": [msg] })),
            },
            AppError::Calculation(msg) => {
                ApiError::new(StatusCode::BAD_REQUEST, "CALCULATION_ERROR", format!("Calculation error: {}", msg))
            }
            AppError::BadRequest(msg) => ApiError::bad_request(msg),
            AppError::EmailAlreadyExists => {
                ApiError::new(StatusCode::CONFLICT, "CONFLICT", "This email is already in use.")
            }
            AppError::TenantSlugAlreadyExists(slug) => ApiError::new(
                StatusCode::CONFLICT,
                "CONFLICT",
                format!("The slug '{}' is already in use.", slug),
            ),
            AppError::MemberAlreadyExists => ApiError::new(
                StatusCode::CONFLICT,
                "CONFLICT",
                "This user is already a member of the tenant.",
            ),
            AppError::InvalidCredentials => ApiError::unauthorized("Invalid email or password."),
            AppError::InvalidToken => {
                ApiError::unauthorized("Authentication token is invalid or missing.")
            }
            AppError::NotTenantMember => ApiError::new(
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "You do not have access to this tenant.",
            ),
            e @ AppError::InsufficientRole { .. } => {
                ApiError::new(StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
            }
            e @ AppError::LastOwner => ApiError::new(StatusCode::CONFLICT, "CONFLICT", e.to_string()),
            AppError::ResourceNotFound(what) => {
                ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", format!("{} not found", what))
            }
            e @ AppError::InvalidStateTransition { .. } => {
                ApiError::new(StatusCode::CONFLICT, "INVALID_STATE_TRANSITION", e.to_string())
            }
            e @ AppError::ReportNotReady => {
                ApiError::new(StatusCode::CONFLICT, "CONFLICT", e.to_string())
            }
            AppError::DatabaseError(e) => {
                tracing::error!("Database error: {}", e);
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred",
                )
            }
            // Todos os outros erros viram 500. O detalhe vai só para o log.
            e => {
                tracing::error!("Internal server error: {}", e);
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred",
                )
            }
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        err.to_api_error()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
                details: self.details,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::{ValidationError, ValidationErrors};

    #[test]
    fn validation_errors_list_every_failing_field() {
        let mut errors = ValidationErrors::new();
        let mut wastage = ValidationError::new("range");
        wastage.message = Some("Wastage factor must be between 0 and 1.".into());
        errors.add("wastageFactor", wastage);
        errors.add("quantity", ValidationError::new("range"));

        let api = AppError::ValidationError(errors).to_api_error();
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.code, "VALIDATION_ERROR");

        let details = api.details.expect("details");
        assert_eq!(details["wastageFactor"][0], "Wastage factor must be between 0 and 1.");
        assert_eq!(details["quantity"][0], "range");
    }

    #[test]
    fn internal_errors_hide_their_cause() {
        let api = AppError::InternalServerError(anyhow::anyhow!("segredo")).to_api_error();
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.code, "INTERNAL_ERROR");
        assert!(!api.message.contains("segredo"));
    }

    #[test]
    fn state_transition_maps_to_conflict() {
        let api = AppError::InvalidStateTransition { from: "COMPLETED".into(), to: "PENDING".into() }
            .to_api_error();
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert_eq!(api.code, "INVALID_STATE_TRANSITION");
        assert!(api.message.contains("COMPLETED"));
    }

    #[test]
    fn not_found_names_the_resource() {
        let api = AppError::ResourceNotFound("Project".into()).to_api_error();
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert_eq!(api.message, "Project not found");
    }
}
