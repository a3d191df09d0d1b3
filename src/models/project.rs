// src/models/project.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::common::schema::{check_date_order, validate_non_negative};

// --- Status da obra ---
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Default, ToSchema)]
#[sqlx(type_name = "project_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    #[default]
    Planning,
    Active,
    OnHold,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Planning => "PLANNING",
            ProjectStatus::Active => "ACTIVE",
            ProjectStatus::OnHold => "ON_HOLD",
            ProjectStatus::Completed => "COMPLETED",
            ProjectStatus::Archived => "ARCHIVED",
        }
    }
}

// --- BuildProject (a obra) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "check_project_dates"))]
pub struct BuildProject {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[validate(length(min = 1, max = 255, message = "Title must have 1 to 255 characters."))]
    pub title: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub status: ProjectStatus,
    #[sqlx(rename = "home_area_sqft")]
    #[validate(custom(function = "validate_non_negative"))]
    pub home_area_sq_ft: Option<Decimal>,
    #[validate(custom(function = "validate_non_negative"))]
    pub budget: Option<Decimal>,
    pub baseline_start_date: Option<NaiveDate>,
    pub baseline_end_date: Option<NaiveDate>,
    pub actual_start_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

fn check_project_dates(p: &BuildProject) -> Result<(), ValidationError> {
    check_date_order(
        p.baseline_start_date,
        p.baseline_end_date,
        "Baseline end date must not precede baseline start date.",
    )?;
    check_date_order(
        p.actual_start_date,
        p.actual_end_date,
        "Actual end date must not precede actual start date.",
    )
}

// --- Lote ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    pub id: Uuid,
    pub project_id: Uuid,
    #[validate(length(min = 1, max = 50))]
    pub lot_number: String,
    pub address: Option<String>,
    #[sqlx(rename = "area_sqft")]
    #[validate(custom(function = "validate_non_negative"))]
    pub area_sq_ft: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// Payloads
// ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "check_create_dates"))]
pub struct CreateProjectPayload {
    #[validate(length(min = 1, max = 255, message = "Title must have 1 to 255 characters."))]
    #[schema(example = "Maple Street Residence")]
    pub title: String,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 50))]
    pub state: Option<String>,
    #[validate(length(max = 20))]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[validate(custom(function = "validate_non_negative"))]
    #[schema(value_type = Option<f64>, example = 2400.0)]
    pub home_area_sq_ft: Option<Decimal>,
    #[validate(custom(function = "validate_non_negative"))]
    #[schema(value_type = Option<f64>, example = 320000.0)]
    pub budget: Option<Decimal>,
    pub baseline_start_date: Option<NaiveDate>,
    pub baseline_end_date: Option<NaiveDate>,
    pub actual_start_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
}

fn check_create_dates(p: &CreateProjectPayload) -> Result<(), ValidationError> {
    check_date_order(
        p.baseline_start_date,
        p.baseline_end_date,
        "Baseline end date must not precede baseline start date.",
    )?;
    check_date_order(
        p.actual_start_date,
        p.actual_end_date,
        "Actual end date must not precede actual start date.",
    )
}

// PATCH: só os campos enviados mudam. A ordem das datas é checada
// no registro já mesclado.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectPayload {
    #[validate(length(min = 1, max = 255, message = "Title must have 1 to 255 characters."))]
    pub title: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 50))]
    pub state: Option<String>,
    #[validate(length(max = 20))]
    pub zip_code: Option<String>,
    pub status: Option<ProjectStatus>,
    #[validate(custom(function = "validate_non_negative"))]
    #[schema(value_type = Option<f64>)]
    pub home_area_sq_ft: Option<Decimal>,
    #[validate(custom(function = "validate_non_negative"))]
    #[schema(value_type = Option<f64>)]
    pub budget: Option<Decimal>,
    pub baseline_start_date: Option<NaiveDate>,
    pub baseline_end_date: Option<NaiveDate>,
    pub actual_start_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
}

impl UpdateProjectPayload {
    pub fn apply_to(self, project: &mut BuildProject) {
        if let Some(v) = self.title { project.title = v; }
        if let Some(v) = self.address { project.address = Some(v); }
        if let Some(v) = self.city { project.city = Some(v); }
        if let Some(v) = self.state { project.state = Some(v); }
        if let Some(v) = self.zip_code { project.zip_code = Some(v); }
        if let Some(v) = self.status { project.status = v; }
        if let Some(v) = self.home_area_sq_ft { project.home_area_sq_ft = Some(v); }
        if let Some(v) = self.budget { project.budget = Some(v); }
        if let Some(v) = self.baseline_start_date { project.baseline_start_date = Some(v); }
        if let Some(v) = self.baseline_end_date { project.baseline_end_date = Some(v); }
        if let Some(v) = self.actual_start_date { project.actual_start_date = Some(v); }
        if let Some(v) = self.actual_end_date { project.actual_end_date = Some(v); }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLotPayload {
    #[validate(length(min = 1, max = 50, message = "Lot number must have 1 to 50 characters."))]
    #[schema(example = "L-14")]
    pub lot_number: String,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(custom(function = "validate_non_negative"))]
    #[schema(value_type = Option<f64>)]
    pub area_sq_ft: Option<Decimal>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloneProjectPayload {
    #[validate(length(min = 1, max = 255, message = "Title must have 1 to 255 characters."))]
    pub title: String,
    #[serde(default = "default_true")]
    pub include_materials: bool,
    #[serde(default = "default_true")]
    pub include_schedule: bool,
}

#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
}

// ---
// Visões derivadas (página de detalhe)
// ---

#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFinancials {
    #[schema(value_type = Option<f64>)]
    pub budget: Option<Decimal>,
    #[schema(value_type = f64)]
    pub materials_cost: Decimal,
    /// budget - materialsCost
    #[schema(value_type = Option<f64>)]
    pub variance: Option<Decimal>,
    /// (materialsCost - budget) / budget * 100
    #[schema(value_type = Option<f64>)]
    pub variance_percent: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub cost_per_sq_ft: Option<Decimal>,
    #[schema(value_type = f64)]
    pub avg_completion: Decimal,
    #[schema(value_type = Option<f64>)]
    pub earned_value: Option<Decimal>,
    /// earnedValue - materialsCost
    #[schema(value_type = Option<f64>)]
    pub cost_variance: Option<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildProjectDetail {
    #[serde(flatten)]
    pub project: BuildProject,
    pub lots: Vec<Lot>,
    pub financials: ProjectFinancials,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::schema::parse_record;
    use serde_json::json;

    fn record() -> serde_json::Value {
        json!({
            "id": "1f0c6b1e-5b4e-4c36-9f1a-3f7c2c0d9a11",
            "tenantId": "7a0e3d52-2c1b-4f0e-8d4e-2b6b0f1a9c22",
            "title": "Maple Street Residence",
            "address": null,
            "city": "Austin",
            "state": "TX",
            "zipCode": null,
            "status": "ACTIVE",
            "homeAreaSqFt": 2400,
            "budget": 320000,
            "baselineStartDate": "2024-01-10",
            "baselineEndDate": "2024-09-30",
            "actualStartDate": null,
            "actualEndDate": null,
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z",
            "deletedAt": null
        })
    }

    #[test]
    fn valid_project_record_is_accepted() {
        let p: BuildProject = parse_record(record()).expect("valid record");
        assert_eq!(p.status, ProjectStatus::Active);
        assert_eq!(p.home_area_sq_ft, Some(Decimal::from(2400)));
    }

    #[test]
    fn end_before_start_is_rejected() {
        let mut raw = record();
        raw["baselineEndDate"] = json!("2023-12-31");
        assert!(parse_record::<BuildProject>(raw).is_err());
    }

    #[test]
    fn negative_budget_and_unknown_status_are_rejected() {
        let mut raw = record();
        raw["budget"] = json!(-1);
        assert!(parse_record::<BuildProject>(raw).is_err());

        let mut raw = record();
        raw["status"] = json!("DEMOLISHED");
        assert!(parse_record::<BuildProject>(raw).is_err());
    }

    #[test]
    fn status_defaults_to_planning() {
        let payload: CreateProjectPayload =
            serde_json::from_value(json!({ "title": "New build" })).unwrap();
        assert_eq!(payload.status, ProjectStatus::Planning);
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn patch_merges_only_sent_fields() {
        let mut p: BuildProject = parse_record(record()).unwrap();
        let patch: UpdateProjectPayload =
            serde_json::from_value(json!({ "status": "ON_HOLD", "budget": 350000 })).unwrap();
        patch.apply_to(&mut p);
        assert_eq!(p.status, ProjectStatus::OnHold);
        assert_eq!(p.budget, Some(Decimal::from(350000)));
        assert_eq!(p.city.as_deref(), Some("Austin"));
    }

    #[test]
    fn clone_flags_default_to_true() {
        let payload: CloneProjectPayload =
            serde_json::from_value(json!({ "title": "Copy" })).unwrap();
        assert!(payload.include_materials && payload.include_schedule);
    }
}
