//! # Unit Types
//!
//! Type-safe wrappers for the clinical units used by the calculator. These
//! are plain `f64` newtypes that serialize as bare numbers and print with
//! their unit suffix, which is how they appear inside working strings.
//!
//! ## Units
//!
//! - Mass: kilograms (kg)
//! - Volume: millilitres (mL)
//! - Time: hours
//! - Fluid rate: millilitres per hour (mL/hour)
//! - Insulin rate: units per hour, units per kilogram per hour
//! - Bolus dose: millilitres per kilogram (mL/kg)
//!
//! ## Example
//!
//! ```rust
//! use dka_core::units::{Hours, Millilitres, MillilitresPerHour};
//!
//! let rate: MillilitresPerHour = Millilitres(1560.0) / Hours(24.0);
//! assert_eq!(rate.0, 65.0);
//! assert_eq!(rate.to_string(), "65mL/hour");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul};

use crate::equations::{bolus_volume, insulin_rate};

/// Format a value for a working string: at most two decimal places, with
/// trailing zeros dropped (`65.0` prints as `65`, `47.9166` as `47.92`).
pub fn format_quantity(value: f64) -> String {
    let text = format!("{:.2}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Round to a fixed number of decimal places, halves away from zero.
///
/// Only applied at the presentation boundary; chained formulas always work
/// at full precision.
pub fn round_dp(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

macro_rules! unit_display {
    ($name:ident, $suffix:expr) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", format_quantity(self.0), $suffix)
            }
        }
    };
}

// ============================================================================
// Mass
// ============================================================================

/// Body weight in kilograms
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kilograms(pub f64);

unit_display!(Kilograms, "kg");

impl Kilograms {
    /// Clamp to an upper ceiling. Capping twice equals capping once.
    pub fn capped_at(self, ceiling: Kilograms) -> Kilograms {
        Kilograms(self.0.min(ceiling.0))
    }
}

// ============================================================================
// Volume and Time
// ============================================================================

/// Fluid volume in millilitres
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Millilitres(pub f64);

unit_display!(Millilitres, "mL");

/// Duration in hours
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hours(pub f64);

impl fmt::Display for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} hours", format_quantity(self.0))
    }
}

// ============================================================================
// Rates
// ============================================================================

/// Fluid rate in millilitres per hour
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MillilitresPerHour(pub f64);

unit_display!(MillilitresPerHour, "mL/hour");

impl Div<Hours> for Millilitres {
    type Output = MillilitresPerHour;
    fn div(self, rhs: Hours) -> MillilitresPerHour {
        MillilitresPerHour(self.0 / rhs.0)
    }
}

impl Add for MillilitresPerHour {
    type Output = MillilitresPerHour;
    fn add(self, rhs: MillilitresPerHour) -> MillilitresPerHour {
        MillilitresPerHour(self.0 + rhs.0)
    }
}

/// Bolus dose in millilitres per kilogram
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MillilitresPerKg(pub f64);

unit_display!(MillilitresPerKg, "mL/kg");

impl Mul<Kilograms> for MillilitresPerKg {
    type Output = Millilitres;
    fn mul(self, rhs: Kilograms) -> Millilitres {
        Millilitres(bolus_volume(rhs.0, self.0))
    }
}

/// Insulin dose in units per kilogram per hour
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitsPerKgPerHour(pub f64);

unit_display!(UnitsPerKgPerHour, " Units/kg/hour");

/// Insulin infusion rate in units per hour.
///
/// At the standard 1 unit in 1 mL concentration this is numerically the
/// pump rate in mL/hour.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitsPerHour(pub f64);

unit_display!(UnitsPerHour, " Units/hour");

impl Mul<Kilograms> for UnitsPerKgPerHour {
    type Output = UnitsPerHour;
    fn mul(self, rhs: Kilograms) -> UnitsPerHour {
        UnitsPerHour(insulin_rate(rhs.0, self.0))
    }
}
