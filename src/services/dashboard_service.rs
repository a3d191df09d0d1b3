// src/services/dashboard_service.rs

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        calculations::{average_percent, round_money, schedule_variance_days},
        error::AppError,
    },
    db::{
        dashboard_repo::{DashboardSnapshot, MilestoneFigures, ProjectFigures},
        DashboardRepository,
    },
    models::{
        dashboard::{DashboardSummary, RecentProject},
        project::ProjectStatus,
    },
};

const RECENT_LIMIT: usize = 5;

#[derive(Clone)]
pub struct DashboardService {
    repo: DashboardRepository,
}

impl DashboardService {
    pub fn new(repo: DashboardRepository) -> Self {
        Self { repo }
    }

    pub async fn get_summary<'a, A>(&self, executor: A, tenant_id: Uuid) -> Result<DashboardSummary, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let snapshot = self.repo.load_snapshot(executor, tenant_id).await?;
        Ok(summarize(&snapshot, Utc::now().date_naive()))
    }
}

/// Agrega o snapshot cru nos números do painel.
pub fn summarize(snapshot: &DashboardSnapshot, today: NaiveDate) -> DashboardSummary {
    DashboardSummary {
        active_projects: snapshot
            .projects
            .iter()
            .filter(|p| p.status == ProjectStatus::Active)
            .count() as i64,
        avg_cost_per_sq_ft: avg_cost_per_sqft(&snapshot.projects),
        schedule_alerts: schedule_alerts(&snapshot.projects, &snapshot.milestones, today),
        materials_tracked: snapshot.materials_tracked,
        recent_projects: recent_projects(&snapshot.projects, &snapshot.milestones),
    }
}

// Média de budget/área entre obras com os dois valores positivos
fn avg_cost_per_sqft(projects: &[ProjectFigures]) -> Decimal {
    let ratios: Vec<Decimal> = projects
        .iter()
        .filter_map(|p| match (p.budget, p.home_area_sqft) {
            (Some(b), Some(a)) if b > Decimal::ZERO && a > Decimal::ZERO => Some(b / a),
            _ => None,
        })
        .collect();
    if ratios.is_empty() {
        return Decimal::ZERO;
    }
    let sum: Decimal = ratios.iter().sum();
    round_money(sum / Decimal::from(ratios.len()))
}

// Marcos abertos e atrasados, fora de obras arquivadas
fn schedule_alerts(projects: &[ProjectFigures], milestones: &[MilestoneFigures], today: NaiveDate) -> i64 {
    let archived: Vec<Uuid> = projects
        .iter()
        .filter(|p| p.status == ProjectStatus::Archived)
        .map(|p| p.id)
        .collect();
    milestones
        .iter()
        .filter(|m| !archived.contains(&m.project_id))
        .filter(|m| m.percent_complete < Decimal::ONE_HUNDRED)
        .filter(|m| schedule_variance_days(m.baseline_end_date, m.actual_end_date, today) < 0)
        .count() as i64
}

fn recent_projects(projects: &[ProjectFigures], milestones: &[MilestoneFigures]) -> Vec<RecentProject> {
    let mut percents: HashMap<Uuid, Vec<Decimal>> = HashMap::new();
    for m in milestones {
        percents.entry(m.project_id).or_default().push(m.percent_complete);
    }

    let mut ordered: Vec<&ProjectFigures> = projects.iter().collect();
    ordered.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));

    ordered
        .into_iter()
        .take(RECENT_LIMIT)
        .map(|p| RecentProject {
            id: p.id,
            title: p.title.clone(),
            status: p.status,
            budget: p.budget,
            completion: percents
                .get(&p.id)
                .map(|v| average_percent(v))
                .unwrap_or(Decimal::ZERO),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn project(title: &str, status: ProjectStatus, budget: Option<&str>, area: Option<&str>, age_days: i64) -> ProjectFigures {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        ProjectFigures {
            id: Uuid::new_v4(),
            title: title.into(),
            status,
            budget: budget.map(dec),
            home_area_sqft: area.map(dec),
            updated_at: base - Duration::days(age_days),
        }
    }

    fn milestone(project_id: Uuid, baseline_end: &str, actual_end: Option<&str>, percent: &str) -> MilestoneFigures {
        MilestoneFigures {
            project_id,
            baseline_end_date: date(baseline_end),
            actual_end_date: actual_end.map(date),
            percent_complete: dec(percent),
        }
    }

    #[test]
    fn average_cost_ignores_projects_without_area_or_budget() {
        let projects = vec![
            project("a", ProjectStatus::Active, Some("300000"), Some("2000"), 0),
            project("b", ProjectStatus::Active, Some("250000"), Some("2500"), 1),
            project("c", ProjectStatus::Planning, None, Some("1800"), 2),
            project("d", ProjectStatus::Planning, Some("100000"), Some("0"), 3),
        ];
        assert_eq!(avg_cost_per_sqft(&projects), dec("125.00"));
        assert_eq!(avg_cost_per_sqft(&[]), Decimal::ZERO);
    }

    #[test]
    fn alerts_count_open_late_milestones_outside_archived_projects() {
        let live = project("live", ProjectStatus::Active, None, None, 0);
        let old = project("old", ProjectStatus::Archived, None, None, 10);
        let today = date("2024-06-01");
        let milestones = vec![
            milestone(live.id, "2024-05-01", None, "50"),
            milestone(live.id, "2024-05-01", Some("2024-05-10"), "100"),
            milestone(live.id, "2024-07-01", None, "10"),
            milestone(old.id, "2024-05-01", None, "20"),
        ];
        assert_eq!(schedule_alerts(&[live, old], &milestones, today), 1);
    }

    #[test]
    fn recent_projects_are_the_five_latest_with_completion() {
        let projects: Vec<ProjectFigures> = (0..7)
            .map(|i| project(&format!("p{}", i), ProjectStatus::Active, None, None, i))
            .collect();
        let milestones = vec![
            milestone(projects[0].id, "2024-05-01", None, "100"),
            milestone(projects[0].id, "2024-05-01", None, "50"),
        ];
        let recent = recent_projects(&projects, &milestones);
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].title, "p0");
        assert_eq!(recent[0].completion, dec("75.00"));
        assert_eq!(recent[1].completion, Decimal::ZERO);
        assert_eq!(recent[4].title, "p4");
    }

    #[test]
    fn summary_counts_active_projects() {
        let snapshot = DashboardSnapshot {
            projects: vec![
                project("a", ProjectStatus::Active, None, None, 0),
                project("b", ProjectStatus::Completed, None, None, 1),
            ],
            milestones: vec![],
            materials_tracked: 42,
        };
        let s = summarize(&snapshot, date("2024-06-01"));
        assert_eq!(s.active_projects, 1);
        assert_eq!(s.materials_tracked, 42);
        assert_eq!(s.recent_projects.len(), 2);
    }
}
