// src/common/extract.rs
//
// Json/Query que rejeitam no nosso envelope de erro e já rodam o validate().

use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, StatusCode},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::common::error::{ApiError, AppError};

fn malformed(message: String) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
}

/// Corpo JSON deserializado e validado.
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| malformed(rejection.body_text()))?;
        value.validate().map_err(AppError::ValidationError)?;
        Ok(ValidJson(value))
    }
}

/// Query string deserializada e validada.
pub struct ValidQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| malformed(rejection.body_text()))?;
        value.validate().map_err(AppError::ValidationError)?;
        Ok(ValidQuery(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::pagination::PaginationParams;
    use crate::models::tenancy::CreateTenantPayload;
    use axum::body::Body;

    fn json_request(body: &str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn json_is_validated_after_parsing() {
        let ok = ValidJson::<CreateTenantPayload>::from_request(json_request(r#"{"name":"Acme","slug":"acme"}"#), &()).await;
        assert!(ok.is_ok());

        let err = ValidJson::<CreateTenantPayload>::from_request(json_request(r#"{"name":"Acme","slug":"Bad Slug"}"#), &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.details.unwrap()["slug"].is_array());
    }

    #[tokio::test]
    async fn syntax_errors_become_validation_envelopes() {
        let err = ValidJson::<CreateTenantPayload>::from_request(json_request("{"), &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn query_bounds_are_checked() {
        let (mut parts, _) = axum::http::Request::builder()
            .uri("/?page=1&pageSize=500")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        let err = ValidQuery::<PaginationParams>::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.code, "VALIDATION_ERROR");
        assert!(err.details.unwrap()["pageSize"].is_array());
    }
}
