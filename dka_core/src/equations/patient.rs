//! # Patient Formulas
//!
//! Age and weight estimation, and insulin infusion rate.
//!
//! ## References
//!
//! - Advanced Paediatric Life Support (APLS), weight estimate (age + 4) × 2
//! - BSPED DKA protocol: insulin 0.05-0.1 units/kg/hour, 1 unit/mL infusion

/// Mean length of a calendar year in days
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Ceiling for the APLS weight estimate (kg)
pub const ESTIMATED_WEIGHT_CAP_KG: f64 = 75.0;

/// Decimal age in years from a whole number of days
#[inline]
pub fn decimal_age(days: i64) -> f64 {
    days as f64 / DAYS_PER_YEAR
}

/// Age rounded to the nearest whole year, ties to even.
///
/// A whole number of days never lands exactly on a half year
/// (365.25 = 1461/4), so the tie rule only matters for direct callers.
#[inline]
pub fn nearest_year(decimal_age: f64) -> f64 {
    decimal_age.round_ties_even()
}

/// APLS weight estimate
///
/// # Formula
/// w = (age + 4) × 2, capped at 75 kg
#[inline]
pub fn apls_weight(age_years: f64) -> f64 {
    ((age_years + 4.0) * 2.0).min(ESTIMATED_WEIGHT_CAP_KG)
}

/// Insulin infusion rate
///
/// # Formula
/// rate (units/hour) = w × dose (units/kg/hour)
#[inline]
pub fn insulin_rate(w: f64, dose: f64) -> f64 {
    w * dose
}
