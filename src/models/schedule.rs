// src/models/schedule.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::common::schema::{check_date_order, validate_percentage};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "milestone_phase", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestonePhase {
    Sitework,
    Foundation,
    Framing,
    RoughIn,
    Insulation,
    Drywall,
    InteriorFinish,
    ExteriorFinish,
    Final,
}

impl MilestonePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            MilestonePhase::Sitework => "SITEWORK",
            MilestonePhase::Foundation => "FOUNDATION",
            MilestonePhase::Framing => "FRAMING",
            MilestonePhase::RoughIn => "ROUGH_IN",
            MilestonePhase::Insulation => "INSULATION",
            MilestonePhase::Drywall => "DRYWALL",
            MilestonePhase::InteriorFinish => "INTERIOR_FINISH",
            MilestonePhase::ExteriorFinish => "EXTERIOR_FINISH",
            MilestonePhase::Final => "FINAL",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "check_milestone_dates"))]
pub struct ScheduleMilestone {
    pub id: Uuid,
    pub project_id: Uuid,
    pub phase: MilestonePhase,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub baseline_start_date: NaiveDate,
    pub baseline_end_date: NaiveDate,
    pub actual_start_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
    #[validate(custom(function = "validate_percentage"))]
    pub percent_complete: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

fn check_milestone_dates(m: &ScheduleMilestone) -> Result<(), ValidationError> {
    check_date_order(
        Some(m.baseline_start_date),
        Some(m.baseline_end_date),
        "Baseline end date must not precede baseline start date.",
    )?;
    check_date_order(
        m.actual_start_date,
        m.actual_end_date,
        "Actual end date must not precede actual start date.",
    )
}

// ---
// Payloads
// ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "check_create_dates"))]
pub struct CreateMilestonePayload {
    pub project_id: Uuid,
    pub phase: MilestonePhase,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub baseline_start_date: NaiveDate,
    pub baseline_end_date: NaiveDate,
    pub actual_start_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(custom(function = "validate_percentage"))]
    #[schema(value_type = f64, example = 0)]
    pub percent_complete: Decimal,
}

fn check_create_dates(p: &CreateMilestonePayload) -> Result<(), ValidationError> {
    check_date_order(
        Some(p.baseline_start_date),
        Some(p.baseline_end_date),
        "Baseline end date must not precede baseline start date.",
    )?;
    check_date_order(
        p.actual_start_date,
        p.actual_end_date,
        "Actual end date must not precede actual start date.",
    )
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMilestonePayload {
    pub phase: Option<MilestonePhase>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub baseline_start_date: Option<NaiveDate>,
    pub baseline_end_date: Option<NaiveDate>,
    pub actual_start_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
    #[validate(custom(function = "validate_percentage"))]
    #[schema(value_type = Option<f64>)]
    pub percent_complete: Option<Decimal>,
}

impl UpdateMilestonePayload {
    pub fn apply_to(self, m: &mut ScheduleMilestone) {
        if let Some(v) = self.phase { m.phase = v; }
        if let Some(v) = self.description { m.description = Some(v); }
        if let Some(v) = self.baseline_start_date { m.baseline_start_date = v; }
        if let Some(v) = self.baseline_end_date { m.baseline_end_date = v; }
        if let Some(v) = self.actual_start_date { m.actual_start_date = Some(v); }
        if let Some(v) = self.actual_end_date { m.actual_end_date = Some(v); }
        if let Some(v) = self.percent_complete { m.percent_complete = v; }
    }
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MilestoneFilter {
    pub project_id: Uuid,
}

// ---
// Variância do cronograma
// ---

#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneVariance {
    pub milestone_id: Uuid,
    pub phase: MilestonePhase,
    /// baseline - (real ou hoje); negativo = atrasado
    pub variance_days: i64,
    pub is_late: bool,
    pub baseline_end_date: NaiveDate,
    pub actual_or_current_date: NaiveDate,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleVarianceReport {
    pub project_id: Uuid,
    pub total_milestones: usize,
    pub completed_milestones: usize,
    #[schema(value_type = f64)]
    pub avg_percent_complete: Decimal,
    pub variances: Vec<MilestoneVariance>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::schema::parse_record;
    use serde_json::json;

    fn record() -> serde_json::Value {
        json!({
            "id": "9b2f6a1c-3d4e-4f5a-8b6c-7d8e9f0a1b2c",
            "projectId": "1f0c6b1e-5b4e-4c36-9f1a-3f7c2c0d9a11",
            "phase": "ROUGH_IN",
            "description": "Rough plumbing and electrical",
            "baselineStartDate": "2024-03-01",
            "baselineEndDate": "2024-03-20",
            "actualStartDate": null,
            "actualEndDate": null,
            "percentComplete": 40,
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z",
            "deletedAt": null
        })
    }

    #[test]
    fn milestone_record_round_trips_phase_names() {
        let m: ScheduleMilestone = parse_record(record()).expect("valid");
        assert_eq!(m.phase, MilestonePhase::RoughIn);
        assert_eq!(serde_json::to_value(m.phase).unwrap(), "ROUGH_IN");
    }

    #[test]
    fn percent_outside_bounds_is_rejected() {
        let mut raw = record();
        raw["percentComplete"] = json!(101);
        assert!(parse_record::<ScheduleMilestone>(raw).is_err());
        let mut raw = record();
        raw["percentComplete"] = json!(-5);
        assert!(parse_record::<ScheduleMilestone>(raw).is_err());
    }

    #[test]
    fn baseline_dates_are_required() {
        let mut raw = record();
        raw.as_object_mut().unwrap().remove("baselineEndDate");
        assert!(parse_record::<ScheduleMilestone>(raw).is_err());
    }

    #[test]
    fn actual_end_before_actual_start_is_rejected() {
        let mut raw = record();
        raw["actualStartDate"] = json!("2024-03-05");
        raw["actualEndDate"] = json!("2024-03-01");
        assert!(parse_record::<ScheduleMilestone>(raw).is_err());
    }
}
