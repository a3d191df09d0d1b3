// src/services/report_service.rs

use std::path::PathBuf;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{Connection, PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::scoped_connection,
        error::AppError,
        pagination::{PaginatedResponse, PaginationParams},
    },
    db::{AuditRepository, FileRepository, MaterialRepository, ProjectRepository, ReportRepository, ScheduleRepository},
    models::{
        audit::{changes, Actor, AuditAction},
        report::{GenerateReportRequest, Report, ReportArtifact, ReportStatus},
    },
    services::{
        project_service::compute_financials,
        report_document::{self, ReportData, SectionOptions},
    },
};

const ENTITY: &str = "Report";

#[derive(Clone)]
pub struct ReportService {
    report_repo: ReportRepository,
    project_repo: ProjectRepository,
    material_repo: MaterialRepository,
    schedule_repo: ScheduleRepository,
    file_repo: FileRepository,
    audit_repo: AuditRepository,
    pool: PgPool,
    fonts_dir: PathBuf,
}

impl ReportService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        report_repo: ReportRepository,
        project_repo: ProjectRepository,
        material_repo: MaterialRepository,
        schedule_repo: ScheduleRepository,
        file_repo: FileRepository,
        audit_repo: AuditRepository,
        pool: PgPool,
        fonts_dir: PathBuf,
    ) -> Self {
        Self { report_repo, project_repo, material_repo, schedule_repo, file_repo, audit_repo, pool, fonts_dir }
    }

    /// Cria o relatório PENDING e dispara o job em segundo plano.
    pub async fn generate(&self, conn: &mut PgConnection, actor: Actor, req: &GenerateReportRequest) -> Result<Report, AppError> {
        // 1. Inicia a transação
        let mut tx = conn.begin().await?;

        // 2. Projeto do tenant
        self.project_repo
            .find_by_id(&mut *tx, actor.tenant_id, req.project_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Project".into()))?;

        // 3. Registro PENDING + auditoria
        let report = self
            .report_repo
            .create(
                &mut *tx,
                actor.tenant_id,
                req.project_id,
                req.report_type,
                req.format,
                req.include_materials,
                req.include_schedule,
            )
            .await?;
        self.audit_repo
            .record(&mut *tx, actor, AuditAction::Create, ENTITY, report.id, changes::<(), _>(None, Some(&report)))
            .await?;

        tx.commit().await?;

        // 4. Job só depois do commit (o worker precisa enxergar a linha)
        let opts = SectionOptions {
            include_materials: req.include_materials,
            include_schedule: req.include_schedule,
        };
        self.spawn_job(Some(actor.user_id), report.clone(), opts);

        tracing::info!(report_id = %report.id, kind = req.report_type.slug(), "Relatório enfileirado");
        Ok(report)
    }

    pub async fn list(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        project_id: Option<Uuid>,
        params: &PaginationParams,
    ) -> Result<PaginatedResponse<Report>, AppError> {
        let reports = self
            .report_repo
            .list(&mut *conn, tenant_id, project_id, params.limit(), params.offset())
            .await?;
        let total = self.report_repo.count(&mut *conn, tenant_id, project_id).await?;
        Ok(PaginatedResponse::new(reports, params, total))
    }

    pub async fn get(&self, conn: &mut PgConnection, tenant_id: Uuid, id: Uuid) -> Result<Report, AppError> {
        self.report_repo
            .find_by_id(conn, tenant_id, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Report".into()))
    }

    /// Só COMPLETED tem arquivo; qualquer outro status é 409.
    pub async fn download(&self, conn: &mut PgConnection, tenant_id: Uuid, id: Uuid) -> Result<ReportArtifact, AppError> {
        let report = self.get(&mut *conn, tenant_id, id).await?;
        if report.status != ReportStatus::Completed {
            return Err(AppError::ReportNotReady);
        }
        self.report_repo
            .find_artifact(conn, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Report file".into()))
    }

    /// Boot: PROCESSING órfãos viram FAILED e PENDING voltam para a fila.
    pub async fn recover_interrupted(&self) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;

        let failed = self.report_repo.fail_interrupted(&mut *conn, INTERRUPTED_MESSAGE).await?;
        if failed > 0 {
            tracing::warn!(count = failed, "Relatórios interrompidos marcados como FAILED");
        }

        let pending = self.report_repo.list_pending(&mut *conn).await?;
        if !pending.is_empty() {
            tracing::info!(count = pending.len(), "Reenfileirando relatórios pendentes");
        }
        for queued in pending {
            let opts = SectionOptions {
                include_materials: queued.include_materials,
                include_schedule: queued.include_schedule,
            };
            self.spawn_job(None, queued.report, opts);
        }
        Ok(())
    }

    // ---
    // Job
    // ---

    fn spawn_job(&self, user_id: Option<Uuid>, report: Report, opts: SectionOptions) {
        let worker = self.clone();
        tokio::spawn(async move {
            worker.run_job(user_id, report, opts).await;
        });
    }

    async fn run_job(self, user_id: Option<Uuid>, report: Report, opts: SectionOptions) {
        match self.process(user_id, &report, opts).await {
            Ok(()) => {}
            Err(JobError::Unclaimed(AppError::InvalidStateTransition { .. })) => {
                tracing::debug!(report_id = %report.id, "Relatório já reivindicado por outro worker");
            }
            Err(JobError::Unclaimed(e)) => {
                // Continua PENDING; o próximo boot reenfileira
                tracing::error!(report_id = %report.id, error = %e, "Job de relatório não iniciou");
            }
            Err(JobError::Claimed(e)) => {
                let message = failure_message(&e);
                tracing::warn!(report_id = %report.id, error = %message, "Relatório falhou");
                if let Err(e) = self.mark_failed(user_id, &report, &message).await {
                    // Continua PROCESSING; o próximo boot marca como FAILED
                    tracing::error!(report_id = %report.id, error = %e, "Não foi possível registrar a falha do relatório");
                }
            }
        }
    }

    async fn process(&self, user_id: Option<Uuid>, report: &Report, opts: SectionOptions) -> Result<(), JobError> {
        let mut conn = scoped_connection(&self.pool, report.tenant_id, user_id)
            .await
            .map_err(JobError::Unclaimed)?;

        // 1. Reivindica (outro worker pode ter chegado antes)
        let claimed = advance(&self.report_repo, &mut conn, report.id, ReportStatus::Pending, ReportStatus::Processing, None, None)
            .await
            .map_err(JobError::Unclaimed)?;
        tracing::info!(report_id = %claimed.id, "Relatório em processamento");

        // 2. Renderiza
        let artifact = self.render(&mut conn, &claimed, opts).await?;

        // 3. Artefato + COMPLETED na mesma transação
        let url = download_path(claimed.id);
        let mut tx = conn.begin().await?;
        self.report_repo.save_artifact(&mut *tx, &artifact).await?;
        advance(&self.report_repo, &mut tx, claimed.id, ReportStatus::Processing, ReportStatus::Completed, Some(&url), None).await?;
        tx.commit().await?;

        tracing::info!(report_id = %claimed.id, bytes = artifact.content.len(), "Relatório concluído");
        Ok(())
    }

    // Conexão nova: a do job pode ter morrido junto com o erro
    async fn mark_failed(&self, user_id: Option<Uuid>, report: &Report, message: &str) -> Result<(), AppError> {
        let mut conn = scoped_connection(&self.pool, report.tenant_id, user_id).await?;
        advance(&self.report_repo, &mut conn, report.id, ReportStatus::Processing, ReportStatus::Failed, None, Some(message)).await?;
        Ok(())
    }

    async fn render(&self, conn: &mut PgConnection, report: &Report, opts: SectionOptions) -> Result<ReportArtifact, AppError> {
        let data = self.load_data(conn, report).await?;
        let doc = report_document::build_document(report.report_type, &data, opts);

        // PDF carrega fontes e compõe páginas: fora do runtime async
        let format = report.format;
        let fonts_dir = self.fonts_dir.clone();
        let content = tokio::task::spawn_blocking(move || report_document::render(&doc, format, &fonts_dir))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de renderização: {}", e))??;

        Ok(ReportArtifact {
            report_id: report.id,
            content_type: report.format.content_type().to_string(),
            file_name: format!("{}-{}.{}", report.report_type.slug(), report.id, report.format.extension()),
            content,
        })
    }

    async fn load_data(&self, conn: &mut PgConnection, report: &Report) -> Result<ReportData, AppError> {
        let project = self
            .project_repo
            .find_by_id(&mut *conn, report.tenant_id, report.project_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Project".into()))?;

        let materials = self.material_repo.list_for_project(&mut *conn, project.id).await?;
        let categories = self.material_repo.totals_by_category(&mut *conn, project.id).await?;
        let milestones = self.schedule_repo.list_for_project(&mut *conn, project.id).await?;
        let lots = self.project_repo.list_lots(&mut *conn, project.id).await?;
        let files = self.file_repo.list_for_project(&mut *conn, report.tenant_id, project.id).await?;

        let materials_cost: Decimal = categories.iter().map(|c| c.total_cost).sum();
        let percents: Vec<_> = milestones.iter().map(|m| m.percent_complete).collect();
        let financials = compute_financials(&project, materials_cost, &percents);

        Ok(ReportData {
            project,
            financials,
            materials,
            categories,
            milestones,
            lots,
            files,
            today: Utc::now().date_naive(),
        })
    }
}

const INTERRUPTED_MESSAGE: &str = "Interrupted by server restart";

// Onde o job parou. `?` depois da reivindicação sempre cai em `Claimed`.
#[derive(Debug)]
enum JobError {
    /// Relatório continua PENDING
    Unclaimed(AppError),
    /// Relatório está PROCESSING e precisa terminar em FAILED
    Claimed(AppError),
}

impl From<AppError> for JobError {
    fn from(e: AppError) -> Self {
        JobError::Claimed(e)
    }
}

impl From<sqlx::Error> for JobError {
    fn from(e: sqlx::Error) -> Self {
        JobError::Claimed(e.into())
    }
}

/// Valida a transição em memória e aplica com compare-and-set no banco.
async fn advance(
    repo: &ReportRepository,
    conn: &mut PgConnection,
    id: Uuid,
    from: ReportStatus,
    to: ReportStatus,
    download_url: Option<&str>,
    error_message: Option<&str>,
) -> Result<Report, AppError> {
    ensure_transition(from, to)?;
    repo.transition(conn, id, from, to, download_url, error_message)
        .await?
        .ok_or_else(|| AppError::InvalidStateTransition { from: from.to_string(), to: to.to_string() })
}

fn ensure_transition(from: ReportStatus, to: ReportStatus) -> Result<(), AppError> {
    if !from.can_transition_to(to) {
        return Err(AppError::InvalidStateTransition { from: from.to_string(), to: to.to_string() });
    }
    Ok(())
}

pub fn download_path(report_id: Uuid) -> String {
    format!("/api/reports/{}/download", report_id)
}

// Mensagem gravada no relatório FAILED
fn failure_message(e: &AppError) -> String {
    match e {
        AppError::BadRequest(msg) | AppError::Calculation(msg) => msg.clone(),
        AppError::ResourceNotFound(what) => format!("{} not found", what),
        AppError::InternalServerError(inner) => inner.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backwards_transitions_are_rejected() {
        assert!(ensure_transition(ReportStatus::Pending, ReportStatus::Processing).is_ok());
        let err = ensure_transition(ReportStatus::Completed, ReportStatus::Processing).unwrap_err();
        match err {
            AppError::InvalidStateTransition { from, to } => {
                assert_eq!(from, "COMPLETED");
                assert_eq!(to, "PROCESSING");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(ensure_transition(ReportStatus::Pending, ReportStatus::Completed).is_err());
    }

    #[test]
    fn xlsx_failure_keeps_the_plain_message() {
        let e = AppError::BadRequest("XLSX rendering is not supported".into());
        assert_eq!(failure_message(&e), "XLSX rendering is not supported");
    }

    #[test]
    fn errors_after_the_claim_must_end_in_failed() {
        fn save() -> Result<(), AppError> {
            Err(AppError::InternalServerError(anyhow::anyhow!("value too long for type bytea")))
        }
        fn commit() -> Result<(), sqlx::Error> {
            Err(sqlx::Error::PoolClosed)
        }
        fn after_claim(step: u8) -> Result<(), JobError> {
            match step {
                0 => save()?,
                _ => commit()?,
            }
            Ok(())
        }

        assert!(matches!(after_claim(0), Err(JobError::Claimed(_))));
        assert!(matches!(after_claim(1), Err(JobError::Claimed(_))));

        let Err(JobError::Claimed(e)) = after_claim(0) else {
            panic!("expected a claimed failure");
        };
        assert_eq!(failure_message(&e), "value too long for type bytea");
        // PROCESSING -> FAILED é a saída registrada
        assert!(ensure_transition(ReportStatus::Processing, ReportStatus::Failed).is_ok());
    }

    #[test]
    fn download_path_points_at_the_api() {
        let id = Uuid::nil();
        assert_eq!(download_path(id), format!("/api/reports/{}/download", id));
    }
}
