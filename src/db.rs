pub mod audit_repo;
pub use audit_repo::AuditRepository;
pub mod dashboard_repo;
pub use dashboard_repo::DashboardRepository;
pub mod file_repo;
pub use file_repo::FileRepository;
pub mod material_repo;
pub use material_repo::MaterialRepository;
pub mod project_repo;
pub use project_repo::ProjectRepository;
pub mod report_repo;
pub use report_repo::ReportRepository;
pub mod schedule_repo;
pub use schedule_repo::ScheduleRepository;
pub mod tenancy_repo;
pub use tenancy_repo::TenantRepository;
pub mod user_repo;
pub use user_repo::UserRepository;
