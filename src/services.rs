pub mod archive_service;
pub mod auth;
pub mod dashboard_service;
pub mod file_service;
pub mod material_service;
pub mod project_service;
pub mod report_document;
pub mod report_service;
pub mod schedule_service;
pub mod tenancy_service;
