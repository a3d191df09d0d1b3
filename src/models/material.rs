// src/models/material.rs

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::common::calculations::line_item_totals;
use crate::common::error::AppError;
use crate::common::schema::{check_numeric_column, de_decimal_lenient, validate_fraction, validate_non_negative};

// --- Categorias ---
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, PartialOrd, Ord, Hash, ToSchema,
)]
#[sqlx(type_name = "material_category", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaterialCategory {
    Framing,
    Concrete,
    Electrical,
    Plumbing,
    Hvac,
    Roofing,
    Siding,
    Drywall,
    Flooring,
    Fixtures,
    Other,
}

impl MaterialCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            MaterialCategory::Framing => "FRAMING",
            MaterialCategory::Concrete => "CONCRETE",
            MaterialCategory::Electrical => "ELECTRICAL",
            MaterialCategory::Plumbing => "PLUMBING",
            MaterialCategory::Hvac => "HVAC",
            MaterialCategory::Roofing => "ROOFING",
            MaterialCategory::Siding => "SIDING",
            MaterialCategory::Drywall => "DRYWALL",
            MaterialCategory::Flooring => "FLOORING",
            MaterialCategory::Fixtures => "FIXTURES",
            MaterialCategory::Other => "OTHER",
        }
    }
}

impl fmt::Display for MaterialCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Unidades (1 SQ = 100 SF) ---
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "unit_of_measure", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitOfMeasure {
    Lf,
    Sf,
    Cf,
    Ea,
    Lb,
    Ton,
    Gal,
    Sq,
}

impl UnitOfMeasure {
    pub fn as_str(self) -> &'static str {
        match self {
            UnitOfMeasure::Lf => "LF",
            UnitOfMeasure::Sf => "SF",
            UnitOfMeasure::Cf => "CF",
            UnitOfMeasure::Ea => "EA",
            UnitOfMeasure::Lb => "LB",
            UnitOfMeasure::Ton => "TON",
            UnitOfMeasure::Gal => "GAL",
            UnitOfMeasure::Sq => "SQ",
        }
    }
}

// --- Linha de takeoff ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "check_material_totals"))]
pub struct MaterialLineItem {
    pub id: Uuid,
    pub project_id: Uuid,
    pub category: MaterialCategory,
    #[validate(length(min = 1, max = 500, message = "Description must have 1 to 500 characters."))]
    pub description: String,
    #[validate(custom(function = "validate_quantity"))]
    pub quantity: Decimal,
    pub unit: UnitOfMeasure,
    #[validate(custom(function = "validate_wastage"))]
    pub wastage_factor: Decimal,
    #[validate(custom(function = "validate_non_negative"))]
    pub total_qty: Decimal,
    #[validate(custom(function = "validate_unit_cost"))]
    pub unit_cost: Decimal,
    #[validate(custom(function = "validate_non_negative"))]
    pub total_cost: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

// --- Regras dos campos numéricos (limites das colunas NUMERIC) ---

// quantity NUMERIC(12,3)
fn validate_quantity(val: &Decimal) -> Result<(), ValidationError> {
    check_numeric_column(val, 1_000_000_000, 3, "Quantity")
}

// unit_cost NUMERIC(10,2)
fn validate_unit_cost(val: &Decimal) -> Result<(), ValidationError> {
    check_numeric_column(val, 100_000_000, 2, "Unit cost")
}

// wastage_factor NUMERIC(5,4)
fn validate_wastage(val: &Decimal) -> Result<(), ValidationError> {
    validate_fraction(val)?;
    check_numeric_column(val, 2, 4, "Wastage factor")
}

fn totals_error(message: String) -> ValidationError {
    let mut err = ValidationError::new("derived_totals");
    err.message = Some(message.into());
    err
}

fn calculation_message(e: AppError) -> String {
    match e {
        AppError::Calculation(msg) => format!("{}.", msg),
        other => other.to_string(),
    }
}

// Meia unidade da última casa arredondada
fn qty_tolerance() -> Decimal {
    Decimal::new(5, 4)
}

fn cost_tolerance() -> Decimal {
    Decimal::new(5, 3)
}

// totalQty e totalCost têm que bater com quantity/wastage/unitCost
fn check_material_totals(m: &MaterialLineItem) -> Result<(), ValidationError> {
    let (qty, cost) = line_item_totals(m.quantity, m.wastage_factor, m.unit_cost)
        .map_err(|e| totals_error(calculation_message(e)))?;
    if (qty - m.total_qty).abs() > qty_tolerance() || (cost - m.total_cost).abs() > cost_tolerance() {
        return Err(totals_error(format!(
            "totalQty/totalCost must equal {}/{} for the given quantity, wastage and unit cost.",
            qty, cost
        )));
    }
    Ok(())
}

// Os totais calculados também precisam caber nas colunas
fn check_totals_fit(quantity: Decimal, wastage_factor: Decimal, unit_cost: Decimal) -> Result<(), ValidationError> {
    line_item_totals(quantity, wastage_factor, unit_cost)
        .map(|_| ())
        .map_err(|e| totals_error(calculation_message(e)))
}

fn check_create_totals(p: &CreateMaterialPayload) -> Result<(), ValidationError> {
    check_totals_fit(p.quantity, p.wastage_factor, p.unit_cost)
}

fn check_import_totals(r: &MaterialImportRow) -> Result<(), ValidationError> {
    check_totals_fit(r.quantity, r.wastage_factor, r.unit_cost)
}

// ---
// Payloads
// ---

// Totais enviados pelo cliente são ignorados: o servidor sempre recalcula.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "check_create_totals"))]
pub struct CreateMaterialPayload {
    pub project_id: Uuid,
    pub category: MaterialCategory,
    #[validate(length(min = 1, max = 500, message = "Description must have 1 to 500 characters."))]
    #[schema(example = "2x4 Lumber - 8ft")]
    pub description: String,
    #[validate(custom(function = "validate_quantity"))]
    #[schema(value_type = f64, example = 500)]
    pub quantity: Decimal,
    pub unit: UnitOfMeasure,
    #[serde(default)]
    #[validate(custom(function = "validate_wastage"))]
    #[schema(value_type = f64, example = 0.1)]
    pub wastage_factor: Decimal,
    #[validate(custom(function = "validate_unit_cost"))]
    #[schema(value_type = f64, example = 8.5)]
    pub unit_cost: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMaterialPayload {
    pub category: Option<MaterialCategory>,
    #[validate(length(min = 1, max = 500, message = "Description must have 1 to 500 characters."))]
    pub description: Option<String>,
    #[validate(custom(function = "validate_quantity"))]
    #[schema(value_type = Option<f64>)]
    pub quantity: Option<Decimal>,
    pub unit: Option<UnitOfMeasure>,
    #[validate(custom(function = "validate_wastage"))]
    #[schema(value_type = Option<f64>)]
    pub wastage_factor: Option<Decimal>,
    #[validate(custom(function = "validate_unit_cost"))]
    #[schema(value_type = Option<f64>)]
    pub unit_cost: Option<Decimal>,
    pub notes: Option<String>,
}

/// Uma linha de importação (JSON ou CSV). Aceita os cabeçalhos snake_case do CSV.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "check_import_totals"))]
pub struct MaterialImportRow {
    pub category: MaterialCategory,
    #[validate(length(min = 1, max = 500, message = "Description must have 1 to 500 characters."))]
    pub description: String,
    #[serde(deserialize_with = "de_decimal_lenient")]
    #[validate(custom(function = "validate_quantity"))]
    pub quantity: Decimal,
    pub unit: UnitOfMeasure,
    #[serde(default, alias = "wastage_factor", deserialize_with = "de_decimal_lenient")]
    #[validate(custom(function = "validate_wastage"))]
    pub wastage_factor: Decimal,
    #[serde(alias = "unit_cost", deserialize_with = "de_decimal_lenient")]
    #[validate(custom(function = "validate_unit_cost"))]
    pub unit_cost: Decimal,
    pub notes: Option<String>,
}

impl MaterialImportRow {
    pub fn into_payload(self, project_id: Uuid) -> CreateMaterialPayload {
        CreateMaterialPayload {
            project_id,
            category: self.category,
            description: self.description,
            quantity: self.quantity,
            unit: self.unit,
            wastage_factor: self.wastage_factor,
            unit_cost: self.unit_cost,
            notes: self.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        }
    }
}

pub const CSV_REQUIRED_HEADERS: [&str; 5] = ["category", "description", "quantity", "unit", "unit_cost"];
pub const CSV_HEADERS: [&str; 7] =
    ["category", "description", "quantity", "unit", "wastage_factor", "unit_cost", "notes"];

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialImportPayload {
    pub project_id: Uuid,
    /// Linhas cruas; cada uma é validada separadamente.
    #[schema(value_type = Vec<Object>)]
    pub materials: Vec<Value>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportRowError {
    /// Número da linha (1 = primeira linha de dados)
    pub row: usize,
    #[schema(value_type = Object)]
    pub errors: Value,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialImportResult {
    pub imported_count: usize,
    pub error_count: usize,
    pub created_ids: Vec<Uuid>,
    pub errors: Vec<ImportRowError>,
}

#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MaterialFilter {
    pub project_id: Option<Uuid>,
    pub category: Option<MaterialCategory>,
}

// --- Resumo por categoria ---

#[derive(Debug, Clone, Serialize, FromRow, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category: MaterialCategory,
    pub item_count: i64,
    pub total_cost: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialSummary {
    pub project_id: Uuid,
    pub item_count: i64,
    pub grand_total: Decimal,
    pub by_category: Vec<CategoryTotal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::schema::{flatten_validation_errors, parse_record};
    use serde_json::json;

    fn record(total_qty: f64, total_cost: f64) -> Value {
        json!({
            "id": "4c1d9f0e-2a7b-4b61-9d3e-8f2a1c0b7e55",
            "projectId": "1f0c6b1e-5b4e-4c36-9f1a-3f7c2c0d9a11",
            "category": "FRAMING",
            "description": "2x4 Lumber - 8ft",
            "quantity": 500,
            "unit": "EA",
            "wastageFactor": 0.1,
            "totalQty": total_qty,
            "unitCost": 8.5,
            "totalCost": total_cost,
            "notes": null,
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z",
            "deletedAt": null
        })
    }

    #[test]
    fn consistent_totals_are_accepted() {
        let item: MaterialLineItem = parse_record(record(550.0, 4675.0)).expect("valid");
        assert_eq!(item.total_cost, Decimal::from(4675));
    }

    #[test]
    fn inconsistent_totals_are_rejected_at_record_level() {
        let err = parse_record::<MaterialLineItem>(record(500.0, 4250.0)).unwrap_err();
        let AppError::ValidationError(errors) = err else {
            panic!("expected validation error");
        };
        let flat = flatten_validation_errors(&errors);
        assert!(flat.contains_key("__all__"));
    }

    #[test]
    fn exact_products_within_half_a_unit_are_accepted() {
        let mut raw = record(1.3333, 1.3333);
        raw["quantity"] = json!(1);
        raw["wastageFactor"] = json!(0.3333);
        raw["unitCost"] = json!(1);
        let item: MaterialLineItem = parse_record(raw).expect("exact product is consistent");
        assert_eq!(item.total_qty, "1.3333".parse::<Decimal>().unwrap());

        let mut raw = record(1.334, 1.33);
        raw["quantity"] = json!(1);
        raw["wastageFactor"] = json!(0.3333);
        raw["unitCost"] = json!(1);
        assert!(parse_record::<MaterialLineItem>(raw).is_err());
    }

    #[test]
    fn huge_values_are_field_errors() {
        let mut raw = record(550.0, 4675.0);
        raw["quantity"] = json!(1e20);
        raw["unitCost"] = json!(1e20);
        let err = parse_record::<MaterialLineItem>(raw).unwrap_err();
        let AppError::ValidationError(errors) = err else {
            panic!("expected validation error");
        };
        let flat = flatten_validation_errors(&errors);
        assert!(flat.contains_key("quantity"));
        assert!(flat.contains_key("unitCost"));
    }

    #[test]
    fn totals_that_do_not_fit_are_rejected_at_record_level() {
        let row = json!({
            "projectId": "1f0c6b1e-5b4e-4c36-9f1a-3f7c2c0d9a11",
            "category": "CONCRETE",
            "description": "Ready mix",
            "quantity": 900000000,
            "unit": "CF",
            "wastageFactor": 0.5,
            "unitCost": 10
        });
        let err = parse_record::<CreateMaterialPayload>(row).unwrap_err();
        let AppError::ValidationError(errors) = err else {
            panic!("expected validation error");
        };
        let flat = flatten_validation_errors(&errors);
        assert_eq!(flat["__all__"], vec!["Total quantity must be less than 1,000,000,000.".to_string()]);
    }

    #[test]
    fn inputs_finer_than_their_columns_are_rejected() {
        let err = parse_record::<CreateMaterialPayload>(json!({
            "projectId": "1f0c6b1e-5b4e-4c36-9f1a-3f7c2c0d9a11",
            "category": "FRAMING",
            "description": "Nails",
            "quantity": 3,
            "unit": "LB",
            "unitCost": 0.125
        }))
        .unwrap_err();
        let AppError::ValidationError(errors) = err else {
            panic!("expected validation error");
        };
        let flat = flatten_validation_errors(&errors);
        assert_eq!(flat.keys().map(String::as_str).collect::<Vec<_>>(), vec!["unitCost"]);

        let row = parse_record::<MaterialImportRow>(json!({
            "category": "FRAMING",
            "description": "Nails",
            "quantity": "1.2345",
            "unit": "LB",
            "wastage_factor": "0.12345",
            "unit_cost": "2.50"
        }));
        let Err(AppError::ValidationError(errors)) = row else {
            panic!("expected validation error");
        };
        let flat = flatten_validation_errors(&errors);
        assert!(flat.contains_key("quantity"));
        assert!(flat.contains_key("wastageFactor"));
        assert!(!flat.contains_key("unitCost"));
    }

    #[test]
    fn update_payload_checks_scale_too() {
        let patch: Result<UpdateMaterialPayload, _> =
            parse_record(json!({ "unitCost": 8.505 }));
        assert!(matches!(patch, Err(AppError::ValidationError(_))));
        assert!(parse_record::<UpdateMaterialPayload>(json!({ "unitCost": 8.5 })).is_ok());
    }

    #[test]
    fn wastage_outside_unit_interval_is_rejected() {
        let mut raw = record(550.0, 4675.0);
        raw["wastageFactor"] = json!(1.5);
        let err = parse_record::<MaterialLineItem>(raw).unwrap_err();
        let AppError::ValidationError(errors) = err else {
            panic!("expected validation error");
        };
        assert!(flatten_validation_errors(&errors).contains_key("wastageFactor"));
    }

    #[test]
    fn unknown_unit_is_malformed() {
        let mut raw = record(550.0, 4675.0);
        raw["unit"] = json!("METERS");
        assert!(matches!(
            parse_record::<MaterialLineItem>(raw),
            Err(AppError::MalformedRecord(_))
        ));
    }

    #[test]
    fn import_rows_accept_csv_header_names() {
        let row: MaterialImportRow = parse_record(json!({
            "category": "ROOFING",
            "description": "Shingles",
            "quantity": "30",
            "unit": "SQ",
            "wastage_factor": "0.15",
            "unit_cost": "95.00"
        }))
        .expect("valid row");
        assert_eq!(row.unit, UnitOfMeasure::Sq);
        assert_eq!(row.wastage_factor, "0.15".parse::<Decimal>().unwrap());
    }

    #[test]
    fn wastage_defaults_to_zero() {
        let row: MaterialImportRow = parse_record(json!({
            "category": "OTHER",
            "description": "Dumpster",
            "quantity": 1,
            "unit": "EA",
            "unitCost": 450
        }))
        .unwrap();
        assert!(row.wastage_factor.is_zero());
    }
}
