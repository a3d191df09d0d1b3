// src/services/schedule_service.rs

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{Connection, PgConnection};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        calculations::{average_percent, schedule_variance_days},
        error::AppError,
    },
    db::{AuditRepository, ProjectRepository, ScheduleRepository},
    models::{
        audit::{changes, Actor, AuditAction},
        schedule::{
            CreateMilestonePayload, MilestoneVariance, ScheduleMilestone, ScheduleVarianceReport,
            UpdateMilestonePayload,
        },
    },
};

const ENTITY: &str = "ScheduleMilestone";

#[derive(Clone)]
pub struct ScheduleService {
    schedule_repo: ScheduleRepository,
    project_repo: ProjectRepository,
    audit_repo: AuditRepository,
}

impl ScheduleService {
    pub fn new(schedule_repo: ScheduleRepository, project_repo: ProjectRepository, audit_repo: AuditRepository) -> Self {
        Self { schedule_repo, project_repo, audit_repo }
    }

    async fn ensure_project(&self, conn: &mut PgConnection, tenant_id: Uuid, project_id: Uuid) -> Result<(), AppError> {
        self.project_repo
            .find_by_id(conn, tenant_id, project_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::ResourceNotFound("Project".into()))
    }

    async fn require_milestone(&self, conn: &mut PgConnection, tenant_id: Uuid, id: Uuid) -> Result<ScheduleMilestone, AppError> {
        self.schedule_repo
            .find_by_id(conn, tenant_id, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Milestone".into()))
    }

    pub async fn create(&self, conn: &mut PgConnection, actor: Actor, payload: &CreateMilestonePayload) -> Result<ScheduleMilestone, AppError> {
        let mut tx = conn.begin().await?;

        self.ensure_project(&mut *tx, actor.tenant_id, payload.project_id).await?;
        let milestone = self.schedule_repo.create(&mut *tx, payload).await?;
        self.audit_repo
            .record(&mut *tx, actor, AuditAction::Create, ENTITY, milestone.id, changes::<(), _>(None, Some(&milestone)))
            .await?;

        tx.commit().await?;
        Ok(milestone)
    }

    pub async fn get(&self, conn: &mut PgConnection, tenant_id: Uuid, id: Uuid) -> Result<ScheduleMilestone, AppError> {
        self.require_milestone(conn, tenant_id, id).await
    }

    pub async fn list(&self, conn: &mut PgConnection, tenant_id: Uuid, project_id: Uuid) -> Result<Vec<ScheduleMilestone>, AppError> {
        self.ensure_project(&mut *conn, tenant_id, project_id).await?;
        self.schedule_repo.list_for_project(conn, project_id).await
    }

    pub async fn update(
        &self,
        conn: &mut PgConnection,
        actor: Actor,
        id: Uuid,
        payload: UpdateMilestonePayload,
    ) -> Result<ScheduleMilestone, AppError> {
        let mut tx = conn.begin().await?;

        let before = self.require_milestone(&mut *tx, actor.tenant_id, id).await?;
        let mut merged = before.clone();
        payload.apply_to(&mut merged);
        merged.validate()?;

        let after = self.schedule_repo.update(&mut *tx, &merged).await?;
        self.audit_repo
            .record(&mut *tx, actor, AuditAction::Update, ENTITY, id, changes(Some(&before), Some(&after)))
            .await?;

        tx.commit().await?;
        Ok(after)
    }

    pub async fn delete(&self, conn: &mut PgConnection, actor: Actor, id: Uuid) -> Result<(), AppError> {
        let mut tx = conn.begin().await?;

        let before = self.require_milestone(&mut *tx, actor.tenant_id, id).await?;
        if !self.schedule_repo.soft_delete(&mut *tx, id).await? {
            return Err(AppError::ResourceNotFound("Milestone".into()));
        }
        self.audit_repo
            .record(&mut *tx, actor, AuditAction::Delete, ENTITY, id, changes::<_, ()>(Some(&before), None))
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn variance(&self, conn: &mut PgConnection, tenant_id: Uuid, project_id: Uuid) -> Result<ScheduleVarianceReport, AppError> {
        let milestones = self.list(conn, tenant_id, project_id).await?;
        Ok(variance_report(project_id, &milestones, Utc::now().date_naive()))
    }
}

/// Atraso por marco; marcos sem data real são medidos contra `today`.
pub fn variance_report(project_id: Uuid, milestones: &[ScheduleMilestone], today: NaiveDate) -> ScheduleVarianceReport {
    let variances = milestones
        .iter()
        .map(|m| {
            let variance_days = schedule_variance_days(m.baseline_end_date, m.actual_end_date, today);
            MilestoneVariance {
                milestone_id: m.id,
                phase: m.phase,
                variance_days,
                is_late: variance_days < 0,
                baseline_end_date: m.baseline_end_date,
                actual_or_current_date: m.actual_end_date.unwrap_or(today),
            }
        })
        .collect();

    let percents: Vec<Decimal> = milestones.iter().map(|m| m.percent_complete).collect();

    ScheduleVarianceReport {
        project_id,
        total_milestones: milestones.len(),
        completed_milestones: milestones
            .iter()
            .filter(|m| m.percent_complete == Decimal::ONE_HUNDRED)
            .count(),
        avg_percent_complete: average_percent(&percents),
        variances,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schedule::MilestonePhase;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn milestone(phase: MilestonePhase, baseline_end: &str, actual_end: Option<&str>, percent: i64) -> ScheduleMilestone {
        let now = Utc::now();
        ScheduleMilestone {
            id: Uuid::new_v4(),
            project_id: Uuid::nil(),
            phase,
            description: None,
            baseline_start_date: date("2024-01-01"),
            baseline_end_date: date(baseline_end),
            actual_start_date: None,
            actual_end_date: actual_end.map(date),
            percent_complete: Decimal::from(percent),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn late_and_early_milestones() {
        let today = date("2024-03-01");
        let ms = vec![
            milestone(MilestonePhase::Foundation, "2024-01-31", Some("2024-02-05"), 100),
            milestone(MilestonePhase::Framing, "2024-02-20", Some("2024-02-18"), 100),
            milestone(MilestonePhase::RoughIn, "2024-03-10", None, 40),
        ];
        let r = variance_report(Uuid::nil(), &ms, today);

        assert_eq!(r.total_milestones, 3);
        assert_eq!(r.completed_milestones, 2);
        assert_eq!(r.avg_percent_complete, "80.00".parse::<Decimal>().unwrap());

        assert_eq!(r.variances[0].variance_days, -5);
        assert!(r.variances[0].is_late);
        assert_eq!(r.variances[1].variance_days, 2);
        assert!(!r.variances[1].is_late);
        assert_eq!(r.variances[2].variance_days, 9);
        assert_eq!(r.variances[2].actual_or_current_date, today);
    }

    #[test]
    fn empty_schedule_has_zero_average() {
        let r = variance_report(Uuid::nil(), &[], date("2024-03-01"));
        assert_eq!(r.total_milestones, 0);
        assert_eq!(r.avg_percent_complete, Decimal::ZERO);
        assert!(r.variances.is_empty());
    }
}
