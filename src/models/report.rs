// src/models/report.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "report_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    Progress,
    BudgetVsActual,
    TakeoffSummary,
    OmBinder,
}

impl ReportType {
    pub fn title(self) -> &'static str {
        match self {
            ReportType::Progress => "Progress Report",
            ReportType::BudgetVsActual => "Budget vs Actual",
            ReportType::TakeoffSummary => "Takeoff Summary",
            ReportType::OmBinder => "O&M Binder",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            ReportType::Progress => "progress",
            ReportType::BudgetVsActual => "budget-vs-actual",
            ReportType::TakeoffSummary => "takeoff-summary",
            ReportType::OmBinder => "om-binder",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Default, ToSchema)]
#[sqlx(type_name = "report_format", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportFormat {
    #[default]
    Pdf,
    Csv,
    Xlsx,
}

impl ReportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ReportFormat::Pdf => "application/pdf",
            ReportFormat::Csv => "text/csv; charset=utf-8",
            ReportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Csv => "csv",
            ReportFormat::Xlsx => "xlsx",
        }
    }
}

// ---
// Máquina de estados: PENDING -> PROCESSING -> {COMPLETED, FAILED}
// ---
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "report_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ReportStatus {
    pub fn can_transition_to(self, next: ReportStatus) -> bool {
        matches!(
            (self, next),
            (ReportStatus::Pending, ReportStatus::Processing)
                | (ReportStatus::Processing, ReportStatus::Completed)
                | (ReportStatus::Processing, ReportStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Pending => "PENDING",
            ReportStatus::Processing => "PROCESSING",
            ReportStatus::Completed => "COMPLETED",
            ReportStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "check_report_state"))]
pub struct Report {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub report_type: ReportType,
    pub format: ReportFormat,
    pub status: ReportStatus,
    #[validate(length(min = 1, max = 1000))]
    pub download_url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// PENDING com as seções pedidas na geração (reenfileirado no boot).
#[derive(Debug, Clone, FromRow)]
pub struct QueuedReport {
    #[sqlx(flatten)]
    pub report: Report,
    pub include_materials: bool,
    pub include_schedule: bool,
}

// downloadUrl só existe em COMPLETED; errorMessage só em FAILED
fn check_report_state(r: &Report) -> Result<(), ValidationError> {
    if r.download_url.is_some() && r.status != ReportStatus::Completed {
        let mut err = ValidationError::new("report_state");
        err.message = Some("downloadUrl is only allowed when status is COMPLETED.".into());
        return Err(err);
    }
    if r.error_message.is_some() && r.status != ReportStatus::Failed {
        let mut err = ValidationError::new("report_state");
        err.message = Some("errorMessage is only allowed when status is FAILED.".into());
        return Err(err);
    }
    Ok(())
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportRequest {
    pub project_id: Uuid,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    #[serde(default)]
    pub format: ReportFormat,
    #[serde(default = "default_true")]
    pub include_materials: bool,
    #[serde(default = "default_true")]
    pub include_schedule: bool,
}

#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReportFilter {
    pub project_id: Option<Uuid>,
}

// Arquivo renderizado, servido por /download
#[derive(Debug, Clone, FromRow)]
pub struct ReportArtifact {
    pub report_id: Uuid,
    pub content_type: String,
    pub file_name: String,
    pub content: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::schema::parse_record;
    use serde_json::json;

    const ALL: [ReportStatus; 4] = [
        ReportStatus::Pending,
        ReportStatus::Processing,
        ReportStatus::Completed,
        ReportStatus::Failed,
    ];

    #[test]
    fn only_forward_transitions_are_allowed() {
        let allowed: Vec<(ReportStatus, ReportStatus)> = ALL
            .iter()
            .flat_map(|a| ALL.iter().map(move |b| (*a, *b)))
            .filter(|(a, b)| a.can_transition_to(*b))
            .collect();
        assert_eq!(
            allowed,
            vec![
                (ReportStatus::Pending, ReportStatus::Processing),
                (ReportStatus::Processing, ReportStatus::Completed),
                (ReportStatus::Processing, ReportStatus::Failed),
            ]
        );
    }

    #[test]
    fn terminal_states_have_no_exit() {
        for s in [ReportStatus::Completed, ReportStatus::Failed] {
            assert!(ALL.iter().all(|n| !s.can_transition_to(*n)));
        }
    }

    fn record(status: &str, url: Option<&str>, error: Option<&str>) -> serde_json::Value {
        json!({
            "id": "0d4c3b2a-1f0e-4d9c-8b7a-6f5e4d3c2b1a",
            "tenantId": "7a0e3d52-2c1b-4f0e-8d4e-2b6b0f1a9c22",
            "projectId": "1f0c6b1e-5b4e-4c36-9f1a-3f7c2c0d9a11",
            "type": "PROGRESS",
            "format": "PDF",
            "status": status,
            "downloadUrl": url,
            "errorMessage": error,
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        })
    }

    #[test]
    fn download_url_only_when_completed() {
        let url = Some("https://api.example.com/api/reports/x/download");
        assert!(parse_record::<Report>(record("COMPLETED", url, None)).is_ok());
        assert!(parse_record::<Report>(record("PROCESSING", url, None)).is_err());
    }

    #[test]
    fn error_message_only_when_failed() {
        assert!(parse_record::<Report>(record("FAILED", None, Some("boom"))).is_ok());
        assert!(parse_record::<Report>(record("PENDING", None, Some("boom"))).is_err());
    }

    #[test]
    fn generate_request_defaults() {
        let req: GenerateReportRequest = serde_json::from_value(json!({
            "projectId": "1f0c6b1e-5b4e-4c36-9f1a-3f7c2c0d9a11",
            "type": "TAKEOFF_SUMMARY"
        }))
        .unwrap();
        assert_eq!(req.format, ReportFormat::Pdf);
        assert!(req.include_materials && req.include_schedule);
    }
}
