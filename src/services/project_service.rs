// src/services/project_service.rs

use rust_decimal::Decimal;
use sqlx::{Connection, PgConnection};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        calculations::{
            average_percent, budget_variance_percent, cost_per_sqft, cost_variance, earned_value, line_item_totals,
            round_money,
        },
        error::AppError,
        pagination::{PaginatedResponse, PaginationParams},
    },
    db::{
        material_repo::NewMaterial, AuditRepository, MaterialRepository, ProjectRepository, ScheduleRepository,
    },
    models::{
        audit::{changes, Actor, AuditAction},
        project::{
            BuildProject, BuildProjectDetail, CloneProjectPayload, CreateLotPayload, CreateProjectPayload, Lot,
            ProjectFinancials, ProjectStatus, UpdateProjectPayload,
        },
        schedule::CreateMilestonePayload,
    },
};

const ENTITY: &str = "BuildProject";

#[derive(Clone)]
pub struct ProjectService {
    project_repo: ProjectRepository,
    material_repo: MaterialRepository,
    schedule_repo: ScheduleRepository,
    audit_repo: AuditRepository,
}

impl ProjectService {
    pub fn new(
        project_repo: ProjectRepository,
        material_repo: MaterialRepository,
        schedule_repo: ScheduleRepository,
        audit_repo: AuditRepository,
    ) -> Self {
        Self { project_repo, material_repo, schedule_repo, audit_repo }
    }

    /// Busca a obra viva do tenant ou 404.
    pub async fn require_project(&self, conn: &mut PgConnection, tenant_id: Uuid, id: Uuid) -> Result<BuildProject, AppError> {
        self.project_repo
            .find_by_id(conn, tenant_id, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Project".into()))
    }

    pub async fn create(
        &self,
        conn: &mut PgConnection,
        actor: Actor,
        payload: &CreateProjectPayload,
    ) -> Result<BuildProject, AppError> {
        // 1. Inicia a transação
        let mut tx = conn.begin().await?;

        // 2. Cria
        let project = self.project_repo.create(&mut *tx, actor.tenant_id, payload).await?;

        // 3. Auditoria na mesma transação
        self.audit_repo
            .record(&mut *tx, actor, AuditAction::Create, ENTITY, project.id, changes::<(), _>(None, Some(&project)))
            .await?;

        tx.commit().await?;
        Ok(project)
    }

    pub async fn list(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        status: Option<ProjectStatus>,
        params: &PaginationParams,
    ) -> Result<PaginatedResponse<BuildProject>, AppError> {
        let projects = self
            .project_repo
            .list(&mut *conn, tenant_id, status, params.limit(), params.offset())
            .await?;
        let total = self.project_repo.count(&mut *conn, tenant_id, status).await?;
        Ok(PaginatedResponse::new(projects, params, total))
    }

    pub async fn get_detail(&self, conn: &mut PgConnection, tenant_id: Uuid, id: Uuid) -> Result<BuildProjectDetail, AppError> {
        let project = self.require_project(&mut *conn, tenant_id, id).await?;
        let lots = self.project_repo.list_lots(&mut *conn, id).await?;
        let financials = self.financials(&mut *conn, &project).await?;
        Ok(BuildProjectDetail { project, lots, financials })
    }

    pub async fn financials(&self, conn: &mut PgConnection, project: &BuildProject) -> Result<ProjectFinancials, AppError> {
        let materials_cost = self.material_repo.total_cost(&mut *conn, project.id).await?;
        let percents: Vec<Decimal> = self
            .schedule_repo
            .list_for_project(&mut *conn, project.id)
            .await?
            .into_iter()
            .map(|m| m.percent_complete)
            .collect();
        Ok(compute_financials(project, materials_cost, &percents))
    }

    /// PATCH: mescla, valida o registro resultante e grava.
    pub async fn update(
        &self,
        conn: &mut PgConnection,
        actor: Actor,
        id: Uuid,
        payload: UpdateProjectPayload,
    ) -> Result<BuildProject, AppError> {
        let mut tx = conn.begin().await?;

        let before = self.require_project(&mut *tx, actor.tenant_id, id).await?;
        let mut merged = before.clone();
        payload.apply_to(&mut merged);
        merged.validate()?;

        let after = self.project_repo.update(&mut *tx, &merged).await?;
        self.audit_repo
            .record(&mut *tx, actor, AuditAction::Update, ENTITY, id, changes(Some(&before), Some(&after)))
            .await?;

        tx.commit().await?;
        Ok(after)
    }

    pub async fn delete(&self, conn: &mut PgConnection, actor: Actor, id: Uuid) -> Result<(), AppError> {
        let mut tx = conn.begin().await?;

        let before = self.require_project(&mut *tx, actor.tenant_id, id).await?;
        if !self.project_repo.soft_delete(&mut *tx, actor.tenant_id, id).await? {
            return Err(AppError::ResourceNotFound("Project".into()));
        }
        self.audit_repo
            .record(&mut *tx, actor, AuditAction::Delete, ENTITY, id, changes::<_, ()>(Some(&before), None))
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Copia a obra como nova (PLANNING). Materiais são recalculados e
    /// marcos voltam a 0% sem datas reais. Lotes não são copiados.
    pub async fn clone_project(
        &self,
        conn: &mut PgConnection,
        actor: Actor,
        source_id: Uuid,
        payload: &CloneProjectPayload,
    ) -> Result<BuildProject, AppError> {
        // 1. Inicia a transação
        let mut tx = conn.begin().await?;

        // 2. Origem
        let source = self.require_project(&mut *tx, actor.tenant_id, source_id).await?;

        // 3. Nova obra
        let create = CreateProjectPayload {
            title: payload.title.clone(),
            address: source.address.clone(),
            city: source.city.clone(),
            state: source.state.clone(),
            zip_code: source.zip_code.clone(),
            status: ProjectStatus::Planning,
            home_area_sq_ft: source.home_area_sq_ft,
            budget: source.budget,
            baseline_start_date: source.baseline_start_date,
            baseline_end_date: source.baseline_end_date,
            actual_start_date: None,
            actual_end_date: None,
        };
        let project = self.project_repo.create(&mut *tx, actor.tenant_id, &create).await?;

        // 4. Materiais
        if payload.include_materials {
            for item in self.material_repo.list_for_project(&mut *tx, source.id).await? {
                let (total_qty, total_cost) =
                    line_item_totals(item.quantity, item.wastage_factor, item.unit_cost)?;
                let row = NewMaterial {
                    project_id: project.id,
                    category: item.category,
                    description: &item.description,
                    quantity: item.quantity,
                    unit: item.unit,
                    wastage_factor: item.wastage_factor,
                    total_qty,
                    unit_cost: item.unit_cost,
                    total_cost,
                    notes: item.notes.as_deref(),
                };
                self.material_repo.insert(&mut *tx, &row).await?;
            }
        }

        // 5. Cronograma
        if payload.include_schedule {
            for m in self.schedule_repo.list_for_project(&mut *tx, source.id).await? {
                let copy = CreateMilestonePayload {
                    project_id: project.id,
                    phase: m.phase,
                    description: m.description,
                    baseline_start_date: m.baseline_start_date,
                    baseline_end_date: m.baseline_end_date,
                    actual_start_date: None,
                    actual_end_date: None,
                    percent_complete: Decimal::ZERO,
                };
                self.schedule_repo.create(&mut *tx, &copy).await?;
            }
        }

        // 6. Auditoria
        let audit = serde_json::json!({ "clonedFrom": source.id, "after": project });
        self.audit_repo
            .record(&mut *tx, actor, AuditAction::Create, ENTITY, project.id, audit)
            .await?;

        tx.commit().await?;
        tracing::info!(source_id = %source_id, project_id = %project.id, "Obra clonada");
        Ok(project)
    }

    // ---
    // Lotes
    // ---

    pub async fn create_lot(
        &self,
        conn: &mut PgConnection,
        actor: Actor,
        project_id: Uuid,
        payload: &CreateLotPayload,
    ) -> Result<Lot, AppError> {
        let mut tx = conn.begin().await?;

        self.require_project(&mut *tx, actor.tenant_id, project_id).await?;
        let lot = self.project_repo.create_lot(&mut *tx, project_id, payload).await?;
        self.audit_repo
            .record(&mut *tx, actor, AuditAction::Create, "Lot", lot.id, changes::<(), _>(None, Some(&lot)))
            .await?;

        tx.commit().await?;
        Ok(lot)
    }

    pub async fn list_lots(&self, conn: &mut PgConnection, tenant_id: Uuid, project_id: Uuid) -> Result<Vec<Lot>, AppError> {
        self.require_project(&mut *conn, tenant_id, project_id).await?;
        self.project_repo.list_lots(conn, project_id).await
    }
}

/// Números derivados da página de detalhe.
pub fn compute_financials(project: &BuildProject, materials_cost: Decimal, milestone_percents: &[Decimal]) -> ProjectFinancials {
    let budget = project.budget;
    let avg_completion = average_percent(milestone_percents);

    let cost_per_sq_ft = project
        .home_area_sq_ft
        .filter(|a| *a > Decimal::ZERO)
        .and_then(|area| cost_per_sqft(materials_cost, area).ok());

    let earned = budget.and_then(|b| earned_value(b, avg_completion).ok());

    ProjectFinancials {
        budget,
        materials_cost,
        variance: budget.map(|b| round_money(b - materials_cost)),
        variance_percent: budget.and_then(|b| budget_variance_percent(b, materials_cost)),
        cost_per_sq_ft,
        avg_completion,
        earned_value: earned,
        cost_variance: earned.map(|ev| cost_variance(ev, materials_cost)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn project(budget: Option<&str>, area: Option<&str>) -> BuildProject {
        let now = Utc::now();
        BuildProject {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            title: "Maple".into(),
            address: None,
            city: None,
            state: None,
            zip_code: None,
            status: ProjectStatus::Active,
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
    fn financials_for_an_over_budget_project() {
        let f = compute_financials(
            &project(Some("100000"), Some("2000")),
            dec("110000"),
            &[dec("100"), dec("50")],
        );
        assert_eq!(f.variance, Some(dec("-10000")));
        assert_eq!(f.variance_percent, Some(dec("10.00")));
        assert_eq!(f.cost_per_sq_ft, Some(dec("55.00")));
        assert_eq!(f.avg_completion, dec("75.00"));
        assert_eq!(f.earned_value, Some(dec("75000.00")));
        assert_eq!(f.cost_variance, Some(dec("-35000.00")));
    }

    #[test]
    fn missing_budget_and_area_leave_gaps() {
        let f = compute_financials(&project(None, None), dec("1200"), &[]);
        assert_eq!(f.variance, None);
        assert_eq!(f.variance_percent, None);
        assert_eq!(f.cost_per_sq_ft, None);
        assert_eq!(f.earned_value, None);
        assert_eq!(f.avg_completion, Decimal::ZERO);
    }

    #[test]
    fn zero_budget_has_no_variance_percent() {
        let f = compute_financials(&project(Some("0"), Some("0")), dec("10"), &[]);
        assert_eq!(f.variance, Some(dec("-10")));
        assert_eq!(f.variance_percent, None);
        assert_eq!(f.cost_per_sq_ft, None);
    }
}
