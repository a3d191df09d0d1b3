// src/models/calculation.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::material::UnitOfMeasure;

// Medidas em pés; a positividade é checada no motor de cálculo
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AreaQuery {
    #[param(value_type = f64, example = 40)]
    pub length_ft: Decimal,
    #[param(value_type = f64, example = 30)]
    pub width_ft: Decimal,
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct VolumeQuery {
    #[param(value_type = f64, example = 40)]
    pub length_ft: Decimal,
    #[param(value_type = f64, example = 30)]
    pub width_ft: Decimal,
    #[param(value_type = f64, example = 0.5)]
    pub height_ft: Decimal,
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ConvertQuery {
    #[param(value_type = f64, example = 24)]
    pub value: Decimal,
    pub from: UnitOfMeasure,
    pub to: UnitOfMeasure,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AreaResult {
    #[schema(value_type = f64, example = 1200)]
    pub area_sqft: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VolumeResult {
    #[schema(value_type = f64, example = 600)]
    pub volume_cuft: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    #[schema(value_type = f64)]
    pub value: Decimal,
    pub unit: UnitOfMeasure,
}
