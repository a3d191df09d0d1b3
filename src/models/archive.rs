// src/models/archive.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::common::schema::validate_non_negative;
use crate::models::project::{BuildProject, ProjectStatus};

#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ArchiveSearchQuery {
    /// Busca em título, endereço e cidade (sem diferenciar maiúsculas)
    pub q: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub status: Option<ProjectStatus>,
    #[validate(custom(function = "validate_non_negative"))]
    #[param(value_type = Option<f64>)]
    pub min_area: Option<Decimal>,
    #[validate(custom(function = "validate_non_negative"))]
    #[param(value_type = Option<f64>)]
    pub max_area: Option<Decimal>,
}

impl ArchiveSearchQuery {
    // "%termo%" para ILIKE, escapando os curingas do usuário
    pub fn like_pattern(term: &str) -> String {
        let escaped = term
            .trim()
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{}%", escaped)
    }
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CompareQuery {
    pub project_a_id: Uuid,
    pub project_b_id: Uuid,
}

// Diferenças B - A
#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDifferences {
    #[schema(value_type = Option<f64>)]
    pub cost_per_sq_ft: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub area: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub budget: Option<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectComparison {
    pub project_a: BuildProject,
    pub project_b: BuildProject,
    pub differences: ProjectDifferences,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(ArchiveSearchQuery::like_pattern(" maple "), "%maple%");
        assert_eq!(ArchiveSearchQuery::like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
