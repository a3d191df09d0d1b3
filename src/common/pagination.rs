// src/common/pagination.rs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

// ?page=2&pageSize=20
#[derive(Debug, Clone, Copy, Deserialize, Validate, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "Page must be at least 1."))]
    pub page: u32,

    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100, message = "Page size must be between 1 and 100."))]
    pub page_size: u32,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: 1, page_size: DEFAULT_PAGE_SIZE }
    }
}

impl PaginationParams {
    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl PaginationMeta {
    pub fn new(params: &PaginationParams, total: u64) -> Self {
        Self {
            page: params.page,
            page_size: params.page_size,
            total,
            total_pages: total_pages(total, params.page_size),
        }
    }
}

/// ceil(total / page_size). Zero registros = zero páginas.
pub fn total_pages(total: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(u64::from(page_size))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T: ToSchema> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T: ToSchema> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, params: &PaginationParams, total: i64) -> Self {
        Self {
            data,
            pagination: PaginationMeta::new(params, total.max(0) as u64),
        }
    }
}

// { "data": ... }
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiSuccess<T: ToSchema> {
    pub data: T,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(45, 20), 3);
        assert_eq!(total_pages(40, 20), 2);
        assert_eq!(total_pages(1, 20), 1);
        assert_eq!(total_pages(0, 20), 0);
    }

    #[test]
    fn offsets_follow_page_numbers() {
        let params = PaginationParams { page: 3, page_size: 20 };
        assert_eq!(params.offset(), 40);
        assert_eq!(params.limit(), 20);
    }

    #[test]
    fn page_size_is_bounded() {
        assert!(PaginationParams { page: 1, page_size: 101 }.validate().is_err());
        assert!(PaginationParams { page: 0, page_size: 20 }.validate().is_err());
        assert!(PaginationParams { page: 1, page_size: 100 }.validate().is_ok());
    }

    #[test]
    fn defaults_apply_when_query_is_empty() {
        let params: PaginationParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, 20);
    }

    #[test]
    fn envelope_shape() {
        let params = PaginationParams { page: 1, page_size: 20 };
        let body = PaginatedResponse::<String>::new(vec!["a".into()], &params, 45);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["pagination"]["totalPages"], 3);
        assert_eq!(json["pagination"]["pageSize"], 20);
        assert_eq!(json["data"][0], "a");
    }
}
