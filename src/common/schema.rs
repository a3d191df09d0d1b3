// src/common/schema.rs
//
// Validação de "registros não tipados": deserializa (forma/tipo) e depois
// roda as regras do `validator` (restrições de valor).

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::common::error::AppError;

/// Aceita um registro cru só se todos os campos respeitam tipo e restrições.
pub fn parse_record<T>(value: Value) -> Result<T, AppError>
where
    T: DeserializeOwned + Validate,
{
    let record: T = serde_json::from_value(value)
        .map_err(|e| AppError::MalformedRecord(e.to_string()))?;
    record.validate()?;
    Ok(record)
}

/// Achata os erros do validator em `campo -> [mensagens]`.
/// Structs aninhadas viram `pai.filho`, listas viram `lista[i].campo`.
pub fn flatten_validation_errors(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    let mut out = BTreeMap::new();
    collect(errors, None, &mut out);
    out
}

fn collect(errors: &ValidationErrors, prefix: Option<&str>, out: &mut BTreeMap<String, Vec<String>>) {
    for (field, kind) in errors.errors() {
        let field = camel_case(field.as_ref());
        let path = match prefix {
            Some(p) => format!("{}.{}", p, field),
            None => field,
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                let messages = out.entry(path).or_insert_with(Vec::new);
                messages.extend(field_errors.iter().map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                }));
            }
            ValidationErrorsKind::Struct(inner) => collect(inner, Some(&path), out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(inner, Some(&format!("{}[{}]", path, index)), out);
                }
            }
        }
    }
}

// "wastage_factor" -> "wastageFactor"; "__all__" fica como está
fn camel_case(field: &str) -> String {
    if field.starts_with("__") {
        return field.to_string();
    }
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn error_with(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// Decimal vindo de número JSON ou de texto (células CSV chegam como texto).
pub fn de_decimal_lenient<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(Decimal),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(v) => Ok(v),
        Raw::Text(s) => s
            .trim()
            .parse::<Decimal>()
            .map_err(|_| de::Error::custom(format!("invalid number '{}'", s))),
    }
}

// ---
// Predicados reutilizados pelos `#[validate(custom(...))]`
// ---

pub fn validate_non_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        let mut err = error_with("range", "Value cannot be negative.");
        err.add_param("min".into(), &0);
        return Err(err);
    }
    Ok(())
}

pub fn validate_fraction(val: &Decimal) -> Result<(), ValidationError> {
    if *val < Decimal::ZERO || *val > Decimal::ONE {
        let mut err = error_with("range", "Wastage factor must be between 0 and 1.");
        err.add_param("min".into(), &0);
        err.add_param("max".into(), &1);
        return Err(err);
    }
    Ok(())
}

/// Valor que cabe numa coluna NUMERIC: não negativo, menor que `limit`
/// e com no máximo `scale` casas decimais (zeros à direita não contam).
pub fn check_numeric_column(val: &Decimal, limit: i64, scale: u32, label: &str) -> Result<(), ValidationError> {
    validate_non_negative(val)?;
    if *val >= Decimal::from(limit) {
        let mut err = ValidationError::new("range");
        err.message = Some(Cow::Owned(format!("{} must be less than {}.", label, limit)));
        err.add_param("max".into(), &limit);
        return Err(err);
    }
    if val.normalize().scale() > scale {
        let mut err = ValidationError::new("scale");
        err.message = Some(Cow::Owned(format!("{} allows at most {} decimal places.", label, scale)));
        err.add_param("scale".into(), &scale);
        return Err(err);
    }
    Ok(())
}

pub fn validate_percentage(val: &Decimal) -> Result<(), ValidationError> {
    if *val < Decimal::ZERO || *val > Decimal::ONE_HUNDRED {
        let mut err = error_with("range", "Percent complete must be between 0 and 100.");
        err.add_param("min".into(), &0);
        err.add_param("max".into(), &100);
        return Err(err);
    }
    Ok(())
}

pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let valid = !slug.is_empty()
        && slug.len() <= 100
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid {
        return Err(error_with(
            "slug",
            "Slug must contain only lowercase letters, digits and inner hyphens.",
        ));
    }
    Ok(())
}

pub fn check_date_order(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    message: &'static str,
) -> Result<(), ValidationError> {
    match (start, end) {
        (Some(s), Some(e)) if e < s => Err(error_with("date_order", message)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[derive(Debug, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    struct Row {
        #[validate(length(min = 1, message = "Description is required."))]
        description: String,
        #[validate(custom(function = "validate_fraction"))]
        wastage_factor: Decimal,
        #[validate(custom(function = "validate_non_negative"))]
        quantity: Decimal,
    }

    #[test]
    fn parse_record_accepts_valid_rows() {
        let row: Row = parse_record(json!({
            "description": "2x4 Lumber",
            "wastageFactor": 0.1,
            "quantity": 500
        }))
        .expect("valid");
        assert_eq!(row.quantity, dec("500"));
    }

    #[test]
    fn parse_record_enumerates_all_failing_fields() {
        let err = parse_record::<Row>(json!({
            "description": "",
            "wastageFactor": 1.5,
            "quantity": -1
        }))
        .unwrap_err();

        let AppError::ValidationError(errors) = err else {
            panic!("expected validation error");
        };
        let flat = flatten_validation_errors(&errors);
        let fields: Vec<&str> = flat.keys().map(|k| k.as_str()).collect();
        assert_eq!(fields, vec!["description", "quantity", "wastageFactor"]);
    }

    #[test]
    fn parse_record_rejects_wrong_types_before_validating() {
        let err = parse_record::<Row>(json!({
            "description": "x",
            "wastageFactor": "lots",
            "quantity": 1
        }))
        .unwrap_err();
        assert!(matches!(err, AppError::MalformedRecord(_)));
    }

    #[test]
    fn fraction_and_percentage_bounds_are_inclusive() {
        assert!(validate_fraction(&dec("0")).is_ok());
        assert!(validate_fraction(&dec("1")).is_ok());
        assert!(validate_fraction(&dec("1.0001")).is_err());
        assert!(validate_fraction(&dec("-0.01")).is_err());
        assert!(validate_percentage(&dec("100")).is_ok());
        assert!(validate_percentage(&dec("100.01")).is_err());
    }

    #[test]
    fn negative_zero_is_not_negative() {
        assert!(validate_non_negative(&dec("-0.00")).is_ok());
        assert!(validate_non_negative(&dec("-0.01")).is_err());
    }

    #[test]
    fn numeric_columns_bound_size_and_scale() {
        assert!(check_numeric_column(&dec("8.50"), 100_000_000, 2, "Unit cost").is_ok());
        assert!(check_numeric_column(&dec("0.125"), 100_000_000, 2, "Unit cost").is_err());
        assert!(check_numeric_column(&dec("100000000"), 100_000_000, 2, "Unit cost").is_err());
        assert!(check_numeric_column(&dec("-1"), 100_000_000, 2, "Unit cost").is_err());

        let err = check_numeric_column(&dec("1.2345"), 1_000_000_000, 3, "Quantity").unwrap_err();
        assert_eq!(err.code, "scale");
        assert_eq!(err.message.as_deref(), Some("Quantity allows at most 3 decimal places."));
    }

    #[test]
    fn slugs() {
        assert!(validate_slug("acme-builders-2").is_ok());
        assert!(validate_slug("Acme").is_err());
        assert!(validate_slug("-acme").is_err());
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn camel_case_keys() {
        assert_eq!(camel_case("wastage_factor"), "wastageFactor");
        assert_eq!(camel_case("home_area_sq_ft"), "homeAreaSqFt");
        assert_eq!(camel_case("__all__"), "__all__");
    }

    #[test]
    fn date_order() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 10);
        let b = NaiveDate::from_ymd_opt(2024, 1, 5);
        assert!(check_date_order(a, b, "end before start").is_err());
        assert!(check_date_order(b, a, "end before start").is_ok());
        assert!(check_date_order(None, a, "end before start").is_ok());
    }
}
