//! # Fluid Formulas
//!
//! Maintenance, deficit and bolus formulas from the BSPED paediatric DKA
//! protocol. Everything here is a plain `f64` function with no validation;
//! input checks live in the `calculations` layer.
//!
//! ## Notation
//!
//! - `w` = Body weight (kg)
//! - `V_m` = Daily maintenance volume (mL/24 hours)
//! - `p` = Deficit percentage (%)
//! - `V_d` = Deficit volume (mL)
//! - `V_b` = Bolus volume (mL)
//!
//! ## References
//!
//! - Holliday MA, Segar WE. Pediatrics 1957;19(5):823-832
//! - BSPED Integrated Care Pathway for the Management of Children and Young
//!   People with Diabetic Ketoacidosis

/// Upper weight used by the Holliday-Segar equation (kg)
pub const MAINTENANCE_WEIGHT_CAP_KG: f64 = 75.0;

/// Hours over which the daily maintenance volume is given
pub const MAINTENANCE_HOURS: f64 = 24.0;

/// Hours over which the fluid deficit is replaced
pub const DEFICIT_REPLACEMENT_HOURS: f64 = 48.0;

/// Standard bolus allowance (mL/kg)
pub const STANDARD_BOLUS_ML_PER_KG: f64 = 10.0;

// =============================================================================
// MAINTENANCE
// =============================================================================

/// Weight band of the Holliday-Segar equation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceBand {
    /// w ≤ 10 kg: 100 mL/kg
    UpToTen,
    /// 10 < w ≤ 20 kg: 1000 mL + 50 mL/kg over 10 kg
    TenToTwenty,
    /// w > 20 kg: 1500 mL + 20 mL/kg over 20 kg
    OverTwenty,
}

/// Holliday-Segar band for a (capped) weight. Exactly 10 kg and exactly
/// 20 kg fall in the lower band.
#[inline]
pub fn maintenance_band(w: f64) -> MaintenanceBand {
    if w > 20.0 {
        MaintenanceBand::OverTwenty
    } else if w > 10.0 {
        MaintenanceBand::TenToTwenty
    } else {
        MaintenanceBand::UpToTen
    }
}

/// Cap weight at the Holliday-Segar ceiling.
#[inline]
pub fn cap_maintenance_weight(w: f64) -> f64 {
    w.min(MAINTENANCE_WEIGHT_CAP_KG)
}

/// Daily maintenance volume by the Holliday-Segar rule
///
/// # Formula
/// - V_m = 100w                   for w ≤ 10
/// - V_m = 1000 + 50(w - 10)      for 10 < w ≤ 20
/// - V_m = 1500 + 20(w - 20)      for w > 20
///
/// Weight is capped at 75 kg first, so the maximum is 2600 mL.
#[inline]
pub fn holliday_segar_volume(w: f64) -> f64 {
    let w = cap_maintenance_weight(w);
    match maintenance_band(w) {
        MaintenanceBand::OverTwenty => 1500.0 + (w - 20.0) * 20.0,
        MaintenanceBand::TenToTwenty => 1000.0 + (w - 10.0) * 50.0,
        MaintenanceBand::UpToTen => w * 100.0,
    }
}

// =============================================================================
// DEFICIT
// =============================================================================

/// Deficit volume from percentage dehydration
///
/// # Formula
/// V_d = p × w × 10
///
/// (p% of body weight in kg, expressed in mL.) Weight is not capped.
#[inline]
pub fn deficit_volume(p: f64, w: f64) -> f64 {
    p * w * 10.0
}

/// Deficit volume after the bolus allowance is removed, never below zero.
#[inline]
pub fn deficit_less_bolus(v_d: f64, v_b: f64) -> f64 {
    (v_d - v_b).max(0.0)
}

/// Hourly rate for a volume given over a number of hours
#[inline]
pub fn rate_over(volume: f64, hours: f64) -> f64 {
    volume / hours
}

/// Total fluid replacement over 48 hours
///
/// # Formula
/// V_48 = 2V_m + V_d - V_b (bolus only subtracted when a shock bolus was given)
#[inline]
pub fn forty_eight_hour_total(v_m: f64, v_d: f64, v_b: f64, shocked: bool) -> f64 {
    let total = v_m * 2.0 + v_d;
    if shocked {
        total - v_b
    } else {
        total
    }
}

// =============================================================================
// BOLUS
// =============================================================================

/// Crystalloid bolus volume
///
/// # Formula
/// V_b = w × dose (mL/kg)
#[inline]
pub fn bolus_volume(w: f64, ml_per_kg: f64) -> f64 {
    w * ml_per_kg
}
