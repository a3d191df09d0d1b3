// src/services/archive_service.rs

use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::{
        calculations::{cost_per_sqft, round_money},
        error::AppError,
        pagination::{PaginatedResponse, PaginationParams},
    },
    db::ProjectRepository,
    models::{
        archive::{ArchiveSearchQuery, ProjectComparison, ProjectDifferences},
        project::BuildProject,
    },
};

#[derive(Clone)]
pub struct ArchiveService {
    project_repo: ProjectRepository,
}

impl ArchiveService {
    pub fn new(project_repo: ProjectRepository) -> Self {
        Self { project_repo }
    }

    pub async fn search(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        query: &ArchiveSearchQuery,
        params: &PaginationParams,
    ) -> Result<PaginatedResponse<BuildProject>, AppError> {
        if let (Some(min), Some(max)) = (query.min_area, query.max_area) {
            if min > max {
                return Err(AppError::BadRequest("minArea must not exceed maxArea.".into()));
            }
        }
        let projects = self
            .project_repo
            .search(&mut *conn, tenant_id, query, params.limit(), params.offset())
            .await?;
        let total = self.project_repo.count_search(&mut *conn, tenant_id, query).await?;
        Ok(PaginatedResponse::new(projects, params, total))
    }

    pub async fn compare(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        project_a_id: Uuid,
        project_b_id: Uuid,
    ) -> Result<ProjectComparison, AppError> {
        let project_a = self.require(&mut *conn, tenant_id, project_a_id).await?;
        let project_b = self.require(&mut *conn, tenant_id, project_b_id).await?;
        let differences = differences(&project_a, &project_b);
        Ok(ProjectComparison { project_a, project_b, differences })
    }

    async fn require(&self, conn: &mut PgConnection, tenant_id: Uuid, id: Uuid) -> Result<BuildProject, AppError> {
        self.project_repo
            .find_by_id(conn, tenant_id, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Project".into()))
    }
}

// Custo por sq ft do arquivo: orçamento / área
fn budget_per_sqft(p: &BuildProject) -> Option<Decimal> {
    let budget = p.budget?;
    let area = p.home_area_sq_ft.filter(|a| *a > Decimal::ZERO)?;
    cost_per_sqft(budget, area).ok()
}

/// B - A; `None` quando falta o valor em qualquer lado.
pub fn differences(a: &BuildProject, b: &BuildProject) -> ProjectDifferences {
    fn diff(a: Option<Decimal>, b: Option<Decimal>) -> Option<Decimal> {
        Some(round_money(b? - a?))
    }
    ProjectDifferences {
        cost_per_sq_ft: diff(budget_per_sqft(a), budget_per_sqft(b)),
        area: diff(a.home_area_sq_ft, b.home_area_sq_ft),
        budget: diff(a.budget, b.budget),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::project::ProjectStatus;
    use chrono::Utc;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn project(budget: Option<&str>, area: Option<&str>) -> BuildProject {
        let now = Utc::now();
        BuildProject {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            title: "x".into(),
            address: None,
            city: None,
            state: None,
            zip_code: None,
            status: ProjectStatus::Completed,
            home_area_sq_ft: area.map(dec),
            budget: budget.map(dec),
            baseline_start_date: None,
            baseline_end_date: None,
            actual_start_date: None,
            actual_end_date: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn differences_are_b_minus_a() {
        let a = project(Some("300000"), Some("2000"));
        let b = project(Some("330000"), Some("2200"));
        let d = differences(&a, &b);
        assert_eq!(d.budget, Some(dec("30000")));
        assert_eq!(d.area, Some(dec("200")));
        assert_eq!(d.cost_per_sq_ft, Some(dec("0.00")));
    }

    #[test]
    fn missing_inputs_give_null_differences() {
        let a = project(None, Some("2000"));
        let b = project(Some("330000"), None);
        let d = differences(&a, &b);
        assert_eq!(d, ProjectDifferences { cost_per_sq_ft: None, area: None, budget: None });
    }
}
