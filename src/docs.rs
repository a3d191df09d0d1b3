// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::common;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(title = "BuildPro API", description = "Gestão de obras multi-tenant"),
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,
        handlers::tenancy::list_members,
        handlers::tenancy::get_member,

        // --- Tenancy ---
        handlers::tenancy::create_tenant,
        handlers::tenancy::list_my_tenants,
        handlers::tenancy::add_member,
        handlers::tenancy::update_member_role,

        // --- Projects ---
        handlers::projects::create_project,
        handlers::projects::list_projects,
        handlers::projects::get_project,
        handlers::projects::update_project,
        handlers::projects::delete_project,
        handlers::projects::clone_project,
        handlers::projects::create_lot,
        handlers::projects::list_lots,

        // --- Materials ---
        handlers::materials::create_material,
        handlers::materials::list_materials,
        handlers::materials::get_material,
        handlers::materials::update_material,
        handlers::materials::delete_material,
        handlers::materials::material_summary,
        handlers::materials::import_materials,
        handlers::materials::import_materials_csv,
        handlers::materials::export_materials_csv,

        // --- Schedule ---
        handlers::milestones::create_milestone,
        handlers::milestones::list_milestones,
        handlers::milestones::get_milestone,
        handlers::milestones::update_milestone,
        handlers::milestones::delete_milestone,
        handlers::milestones::schedule_variance,

        // --- Reports ---
        handlers::reports::generate_report,
        handlers::reports::list_reports,
        handlers::reports::get_report,
        handlers::reports::download_report,

        // --- Files ---
        handlers::files::upload_url,
        handlers::files::register_file,
        handlers::files::list_files,
        handlers::files::download_url,

        // --- Archive ---
        handlers::archive::search_archive,
        handlers::archive::compare_projects,

        // --- Dashboard ---
        handlers::dashboard::get_summary,

        // --- Calculations ---
        handlers::calculations::area,
        handlers::calculations::cubic_volume,
        handlers::calculations::convert,
    ),
    components(
        schemas(
            // --- Envelopes ---
            common::error::ApiErrorBody,
            common::error::ErrorDetail,
            common::pagination::PaginationMeta,

            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,
            models::auth::CurrentUserResponse,

            // --- TENANCY ---
            models::tenancy::UserRole,
            models::tenancy::Tenant,
            models::tenancy::Membership,
            models::tenancy::TenantWithRole,
            models::tenancy::TenantMember,
            models::tenancy::CreateTenantPayload,
            models::tenancy::AddMemberPayload,
            models::tenancy::UpdateMemberRolePayload,

            // --- Projects ---
            models::project::ProjectStatus,
            models::project::BuildProject,
            models::project::Lot,
            models::project::CreateProjectPayload,
            models::project::UpdateProjectPayload,
            models::project::CreateLotPayload,
            models::project::CloneProjectPayload,
            models::project::ProjectFinancials,
            models::project::BuildProjectDetail,

            // --- Materials ---
            models::material::MaterialCategory,
            models::material::UnitOfMeasure,
            models::material::MaterialLineItem,
            models::material::CreateMaterialPayload,
            models::material::UpdateMaterialPayload,
            models::material::MaterialImportPayload,
            models::material::ImportRowError,
            models::material::MaterialImportResult,
            models::material::CategoryTotal,
            models::material::MaterialSummary,

            // --- Schedule ---
            models::schedule::MilestonePhase,
            models::schedule::ScheduleMilestone,
            models::schedule::CreateMilestonePayload,
            models::schedule::UpdateMilestonePayload,
            models::schedule::MilestoneVariance,
            models::schedule::ScheduleVarianceReport,

            // --- Reports ---
            models::report::ReportType,
            models::report::ReportFormat,
            models::report::ReportStatus,
            models::report::Report,
            models::report::GenerateReportRequest,

            // --- Calculations ---
            models::calculation::AreaResult,
            models::calculation::VolumeResult,
            models::calculation::ConversionResult,

            // --- Files ---
            models::file::FileType,
            models::file::ProjectFile,
            models::file::CreateFilePayload,
            models::file::UploadUrlResponse,
            models::file::DownloadUrlResponse,

            // --- Archive ---
            models::archive::ProjectDifferences,
            models::archive::ProjectComparison,

            // --- DASHBOARD ---
            models::dashboard::RecentProject,
            models::dashboard::DashboardSummary,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Usuário logado e membros do tenant"),
        (name = "Tenancy", description = "Tenants e papéis"),
        (name = "Projects", description = "Obras, lotes e números derivados"),
        (name = "Materials", description = "Levantamento de materiais"),
        (name = "Schedule", description = "Marcos e variância do cronograma"),
        (name = "Reports", description = "Relatórios gerados em segundo plano"),
        (name = "Files", description = "Documentos das obras"),
        (name = "Archive", description = "Busca e comparação de obras"),
        (name = "Dashboard", description = "Indicadores do tenant"),
        (name = "Calculations", description = "Área, volume e conversão de unidades")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
