pub mod archive;
pub mod audit;
pub mod auth;
pub mod calculation;
pub mod dashboard;
pub mod file;
pub mod material;
pub mod project;
pub mod report;
pub mod schedule;
pub mod tenancy;
