// src/handlers/calculations.rs
//
// Calculadora de obra: só o motor de cálculo, sem banco nem tenant.

use axum::Json;

use crate::{
    common::{
        calculations::{convert_units, floor_area, volume},
        error::ApiError,
        extract::ValidQuery,
    },
    models::calculation::{AreaQuery, AreaResult, ConversionResult, ConvertQuery, VolumeQuery, VolumeResult},
};

// ---
// Handler: area
// ---
#[utoipa::path(
    get,
    path = "/api/calculations/area",
    tag = "Calculations",
    params(AreaQuery),
    responses(
        (status = 200, description = "Área em pés quadrados (2 casas)", body = AreaResult),
        (status = 400, description = "Medidas precisam ser positivas"),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn area(ValidQuery(query): ValidQuery<AreaQuery>) -> Result<Json<AreaResult>, ApiError> {
    let area_sqft = floor_area(query.length_ft, query.width_ft)?;
    Ok(Json(AreaResult { area_sqft }))
}

// ---
// Handler: volume
// ---
#[utoipa::path(
    get,
    path = "/api/calculations/volume",
    tag = "Calculations",
    params(VolumeQuery),
    responses(
        (status = 200, description = "Volume em pés cúbicos (2 casas)", body = VolumeResult),
        (status = 400, description = "Medidas precisam ser positivas"),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn cubic_volume(ValidQuery(query): ValidQuery<VolumeQuery>) -> Result<Json<VolumeResult>, ApiError> {
    let volume_cuft = volume(query.length_ft, query.width_ft, query.height_ft)?;
    Ok(Json(VolumeResult { volume_cuft }))
}

// ---
// Handler: convert
// ---
#[utoipa::path(
    get,
    path = "/api/calculations/convert",
    tag = "Calculations",
    params(ConvertQuery),
    responses(
        (status = 200, description = "Valor convertido (SQ→SF, LF→SF ou mesma unidade)", body = ConversionResult),
        (status = 400, description = "Conversão não suportada"),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn convert(ValidQuery(query): ValidQuery<ConvertQuery>) -> Result<Json<ConversionResult>, ApiError> {
    let value = convert_units(query.value, query.from, query.to)?;
    Ok(Json(ConversionResult { value, unit: query.to }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, routing::get, Router};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/area", get(area))
            .route("/volume", get(cubic_volume))
            .route("/convert", get(convert))
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let resp = app()
            .oneshot(axum::http::Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn area_and_volume_use_the_calculation_engine() {
        let (status, body) = get_json("/area?lengthFt=10.5&widthFt=20.75").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["areaSqft"], 217.88);

        let (status, body) = get_json("/volume?lengthFt=10.5&widthFt=20.5&heightFt=8.25").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["volumeCuft"], 1775.81);
    }

    #[tokio::test]
    async fn non_positive_dimensions_are_calculation_errors() {
        let (status, body) = get_json("/area?lengthFt=10&widthFt=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "CALCULATION_ERROR");
    }

    #[tokio::test]
    async fn squares_convert_to_square_feet() {
        let (status, body) = get_json("/convert?value=3&from=SQ&to=SF").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["value"], 300.0);
        assert_eq!(body["unit"], "SF");

        let (status, body) = get_json("/convert?value=3&from=SF&to=SQ").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "CALCULATION_ERROR");
    }

    #[tokio::test]
    async fn missing_dimensions_are_rejected() {
        let (status, body) = get_json("/volume?lengthFt=10&widthFt=2").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}
