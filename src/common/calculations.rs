// src/common/calculations.rs
//
// Motor de cálculo: tudo em Decimal, arredondamento "half up".

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::common::error::AppError;
use crate::models::material::UnitOfMeasure;

fn round(value: Decimal, places: u32) -> Decimal {
    value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
}

/// Valores monetários: 2 casas, half up.
pub fn round_money(value: Decimal) -> Decimal {
    round(value, 2)
}

fn fail(msg: &str) -> AppError {
    AppError::Calculation(msg.to_string())
}

// --- Áreas e volumes ---

pub fn floor_area(length_ft: Decimal, width_ft: Decimal) -> Result<Decimal, AppError> {
    if length_ft <= Decimal::ZERO || width_ft <= Decimal::ZERO {
        return Err(fail("Length and width must be positive"));
    }
    let area = length_ft.checked_mul(width_ft).ok_or_else(|| fail("Area is too large"))?;
    Ok(round(area, 2))
}

pub fn volume(length_ft: Decimal, width_ft: Decimal, height_ft: Decimal) -> Result<Decimal, AppError> {
    if length_ft <= Decimal::ZERO || width_ft <= Decimal::ZERO || height_ft <= Decimal::ZERO {
        return Err(fail("Dimensions must be positive"));
    }
    let volume = length_ft
        .checked_mul(width_ft)
        .and_then(|area| area.checked_mul(height_ft))
        .ok_or_else(|| fail("Volume is too large"))?;
    Ok(round(volume, 2))
}

// --- Takeoff ---

// Teto de total_qty NUMERIC(12,3) e total_cost NUMERIC(12,2)
const TOTAL_QTY_LIMIT: i64 = 1_000_000_000;
const TOTAL_COST_LIMIT: i64 = 10_000_000_000;

/// quantity * (1 + wastage_factor), 3 casas.
pub fn takeoff_total_qty(quantity: Decimal, wastage_factor: Decimal) -> Result<Decimal, AppError> {
    if quantity < Decimal::ZERO {
        return Err(fail("Quantity cannot be negative"));
    }
    if wastage_factor < Decimal::ZERO || wastage_factor > Decimal::ONE {
        return Err(fail("Wastage factor must be between 0 and 1"));
    }
    let total = quantity
        .checked_mul(Decimal::ONE + wastage_factor)
        .map(|v| round(v, 3))
        .ok_or_else(|| fail("Total quantity is too large"))?;
    if total >= Decimal::from(TOTAL_QTY_LIMIT) {
        return Err(fail("Total quantity must be less than 1,000,000,000"));
    }
    Ok(total)
}

/// total_qty * unit_cost, 2 casas.
pub fn total_cost(total_qty: Decimal, unit_cost: Decimal) -> Result<Decimal, AppError> {
    if total_qty < Decimal::ZERO || unit_cost < Decimal::ZERO {
        return Err(fail("Quantity and cost cannot be negative"));
    }
    let cost = total_qty
        .checked_mul(unit_cost)
        .map(|v| round(v, 2))
        .ok_or_else(|| fail("Total cost is too large"))?;
    if cost >= Decimal::from(TOTAL_COST_LIMIT) {
        return Err(fail("Total cost must be less than 10,000,000,000"));
    }
    Ok(cost)
}

/// (total_qty, total_cost) de uma linha de material.
pub fn line_item_totals(
    quantity: Decimal,
    wastage_factor: Decimal,
    unit_cost: Decimal,
) -> Result<(Decimal, Decimal), AppError> {
    let total_qty = takeoff_total_qty(quantity, wastage_factor)?;
    let cost = total_cost(total_qty, unit_cost)?;
    Ok((total_qty, cost))
}

// --- Custos ---

pub fn cost_per_sqft(total_cost: Decimal, area_sqft: Decimal) -> Result<Decimal, AppError> {
    if area_sqft <= Decimal::ZERO {
        return Err(fail("Area must be positive"));
    }
    if total_cost < Decimal::ZERO {
        return Err(fail("Cost cannot be negative"));
    }
    Ok(round(total_cost / area_sqft, 2))
}

/// budget * (percent / 100)
pub fn earned_value(budget: Decimal, percent_complete: Decimal) -> Result<Decimal, AppError> {
    if budget < Decimal::ZERO {
        return Err(fail("Budget cannot be negative"));
    }
    if percent_complete < Decimal::ZERO || percent_complete > Decimal::ONE_HUNDRED {
        return Err(fail("Percent complete must be between 0 and 100"));
    }
    Ok(round(budget * percent_complete / Decimal::ONE_HUNDRED, 2))
}

/// Positivo = abaixo do orçamento, negativo = estourado.
pub fn cost_variance(earned_value: Decimal, actual_cost: Decimal) -> Decimal {
    round(earned_value - actual_cost, 2)
}

/// (actual - budget) / budget * 100. Sem orçamento não há percentual.
pub fn budget_variance_percent(budget: Decimal, actual_cost: Decimal) -> Option<Decimal> {
    if budget.is_zero() {
        return None;
    }
    Some(round((actual_cost - budget) / budget * Decimal::ONE_HUNDRED, 2))
}

// --- Cronograma ---

/// Dias entre a linha de base e o real (ou hoje). Positivo = adiantado.
pub fn schedule_variance_days(
    baseline_end: NaiveDate,
    actual_end: Option<NaiveDate>,
    today: NaiveDate,
) -> i64 {
    let actual = actual_end.unwrap_or(today);
    (baseline_end - actual).num_days()
}

pub fn average_percent(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    let sum: Decimal = values.iter().sum();
    round(sum / Decimal::from(values.len()), 2)
}

// --- Conversão de unidades ---

pub fn convert_units(value: Decimal, from: UnitOfMeasure, to: UnitOfMeasure) -> Result<Decimal, AppError> {
    if from == to {
        return Ok(value);
    }
    let factor = match (from, to) {
        (UnitOfMeasure::Sq, UnitOfMeasure::Sf) => Decimal::ONE_HUNDRED,
        // Linear -> área assumindo 1 ft de largura
        (UnitOfMeasure::Lf, UnitOfMeasure::Sf) => Decimal::ONE,
        _ => {
            return Err(AppError::Calculation(format!(
                "No conversion available from {:?} to {:?}",
                from, to
            )));
        }
    };
    value
        .checked_mul(factor)
        .ok_or_else(|| fail("Converted value is too large"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn takeoff_example_from_the_field() {
        let (qty, cost) = line_item_totals(dec("500"), dec("0.1"), dec("8.50")).unwrap();
        assert_eq!(qty, dec("550"));
        assert_eq!(cost, dec("4675.00"));
    }

    #[test]
    fn takeoff_rounds_to_three_places() {
        assert_eq!(takeoff_total_qty(dec("50.5"), dec("0.15")).unwrap(), dec("58.075"));
        assert_eq!(takeoff_total_qty(dec("100"), dec("0")).unwrap(), dec("100.000"));
    }

    #[test]
    fn takeoff_rejects_out_of_range_inputs() {
        assert!(takeoff_total_qty(dec("-10"), dec("0.10")).is_err());
        assert!(takeoff_total_qty(dec("100"), dec("1.5")).is_err());
    }

    #[test]
    fn oversized_takeoff_is_an_error_not_a_panic() {
        let huge = dec("100000000000000000000");
        assert!(matches!(line_item_totals(huge, dec("0"), huge), Err(AppError::Calculation(_))));
        assert!(takeoff_total_qty(dec("79228162514264337593543950335"), dec("1")).is_err());
        assert!(total_cost(dec("79228162514264337593543950335"), dec("2")).is_err());
    }

    #[test]
    fn totals_must_fit_their_columns() {
        assert_eq!(takeoff_total_qty(dec("999999999.999"), dec("0")).unwrap(), dec("999999999.999"));
        assert!(takeoff_total_qty(dec("600000000"), dec("1")).is_err());
        assert_eq!(total_cost(dec("99999999.999"), dec("100")).unwrap(), dec("9999999999.90"));
        assert!(total_cost(dec("1000000"), dec("10000")).is_err());
    }

    #[test]
    fn total_cost_rounds_half_up() {
        assert_eq!(total_cost(dec("110.5"), dec("12.75")).unwrap(), dec("1408.88"));
        assert_eq!(total_cost(dec("10.333"), dec("3.999")).unwrap(), dec("41.32"));
        assert!(total_cost(dec("100"), dec("-5")).is_err());
    }

    #[test]
    fn areas_and_volumes() {
        assert_eq!(floor_area(dec("10.5"), dec("20.75")).unwrap(), dec("217.88"));
        assert_eq!(volume(dec("10.5"), dec("20.5"), dec("8.25")).unwrap(), dec("1775.81"));
        assert!(floor_area(dec("10"), dec("0")).is_err());
        assert!(volume(dec("10"), dec("20"), dec("-5")).is_err());
        let huge = dec("79228162514264337593543950335");
        assert!(floor_area(huge, dec("2")).is_err());
        assert!(volume(huge, dec("1"), dec("2")).is_err());
    }

    #[test]
    fn cost_per_square_foot() {
        assert_eq!(cost_per_sqft(dec("250000"), dec("2000")).unwrap(), dec("125.00"));
        assert_eq!(cost_per_sqft(dec("275500"), dec("2150")).unwrap(), dec("128.14"));
        assert!(cost_per_sqft(dec("250000"), dec("0")).is_err());
    }

    #[test]
    fn earned_value_and_variance() {
        assert_eq!(earned_value(dec("100000"), dec("33.33")).unwrap(), dec("33330.00"));
        assert!(earned_value(dec("100000"), dec("150")).is_err());
        assert_eq!(cost_variance(dec("50000"), dec("55000")), dec("-5000.00"));
        assert_eq!(cost_variance(dec("50000"), dec("45000")), dec("5000.00"));
    }

    #[test]
    fn budget_variance_sign() {
        assert_eq!(budget_variance_percent(dec("1000"), dec("1100")), Some(dec("10.00")));
        assert_eq!(budget_variance_percent(dec("1000"), dec("900")), Some(dec("-10.00")));
        assert_eq!(budget_variance_percent(dec("0"), dec("900")), None);
    }

    #[test]
    fn schedule_variance() {
        assert_eq!(schedule_variance_days(day(2024, 12, 31), Some(day(2024, 12, 25)), day(2025, 6, 1)), 6);
        assert_eq!(schedule_variance_days(day(2024, 12, 31), Some(day(2025, 1, 5)), day(2025, 6, 1)), -5);
        assert_eq!(schedule_variance_days(day(2024, 12, 31), None, day(2024, 12, 30)), 1);
    }

    #[test]
    fn averages() {
        assert_eq!(average_percent(&[]), Decimal::ZERO);
        assert_eq!(average_percent(&[dec("100"), dec("50"), dec("0")]), dec("50.00"));
    }

    #[test]
    fn unit_conversions() {
        assert_eq!(convert_units(dec("3"), UnitOfMeasure::Sq, UnitOfMeasure::Sf).unwrap(), dec("300"));
        assert_eq!(convert_units(dec("3"), UnitOfMeasure::Ea, UnitOfMeasure::Ea).unwrap(), dec("3"));
        assert!(convert_units(dec("3"), UnitOfMeasure::Sf, UnitOfMeasure::Sq).is_err());
        assert!(convert_units(dec("79228162514264337593543950335"), UnitOfMeasure::Sq, UnitOfMeasure::Sf).is_err());
    }
}
