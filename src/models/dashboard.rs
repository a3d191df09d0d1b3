// src/models/dashboard.rs

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::project::ProjectStatus;

#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecentProject {
    pub id: Uuid,
    pub title: String,
    pub status: ProjectStatus,
    #[schema(value_type = Option<f64>)]
    pub budget: Option<Decimal>,
    /// Média do percentual dos marcos (0 sem marcos)
    #[schema(value_type = f64)]
    pub completion: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub active_projects: i64,
    #[schema(value_type = f64)]
    pub avg_cost_per_sq_ft: Decimal,
    pub schedule_alerts: i64,
    pub materials_tracked: i64,
    pub recent_projects: Vec<RecentProject>,
}
