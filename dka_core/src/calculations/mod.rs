//! # DKA Calculations
//!
//! Each calculation follows the pattern:
//!
//! - `*Input` - Input parameters (JSON-serializable)
//! - `*Result` - Calculation results (JSON-serializable)
//! - `calculate(input) -> Result<*Result, CalcError>` - Pure calculation function
//!
//! Every clinical output is a [`DerivedValue`]: the number, the arithmetic
//! with the patient's values substituted, and the generic formula, so each
//! figure can be checked by the prescriber.
//!
//! ## Available Calculations
//!
//! - [`age`] - Whole-year age from dates
//! - [`weight`] - Estimated weight when none is measured
//! - [`maintenance`] - Holliday-Segar maintenance volume and rate
//! - [`deficit`] - Severity, deficit percentage, volume and rate
//! - [`bolus`] - Crystalloid bolus volume
//! - [`insulin`] - Insulin infusion rate
//! - [`dka`] - The full calculation chaining all of the above

pub mod age;
pub mod bolus;
pub mod deficit;
pub mod dka;
pub mod insulin;
pub mod maintenance;
pub mod weight;

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::units::round_dp;

// Re-export commonly used types
pub use age::{age_in_years, AgeInput, AgeResult};
pub use bolus::{BolusInput, BolusResult};
pub use deficit::{
    BolusSubtraction, DeficitInput, DeficitPolicy, DeficitResult, Severity, SeveritySource,
};
pub use dka::{AgeSource, DkaResult, PatientInputs, ResolvedPatient, WeightSource};
pub use insulin::{InsulinInput, InsulinResult};
pub use maintenance::{MaintenanceInput, MaintenanceResult};
pub use weight::{AplsWeightEstimator, Sex, WeightEstimator, WeightInput, WeightResult};

/// A calculated value with its derivation.
///
/// ## JSON Example
///
/// ```json
/// {
///   "output": 230.0,
///   "working": "[10mL/kg] x [23kg] = 230mL",
///   "formula": "[10mL/kg] x [Patient weight (kg)]",
///   "limit": "750mL"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedValue {
    /// Full-precision value
    pub output: f64,
    /// The arithmetic with this patient's values substituted
    pub working: String,
    /// The generic formula
    pub formula: String,
    /// Reference upper limit shown alongside the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
}

impl DerivedValue {
    pub fn new(output: f64, working: impl Into<String>, formula: impl Into<String>) -> Self {
        DerivedValue {
            output,
            working: working.into(),
            formula: formula.into(),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: impl Into<String>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    /// Copy with the output rounded for display
    pub fn rounded(&self, places: u32) -> Self {
        DerivedValue {
            output: round_dp(self.output, places),
            ..self.clone()
        }
    }
}

/// Unwrap a required input or fail with `MissingInput`.
pub(crate) fn require(value: Option<f64>, field: &str) -> CalcResult<f64> {
    value.ok_or_else(|| CalcError::missing_input(field))
}

/// Reject NaN, infinities and negative values.
pub(crate) fn require_non_negative(value: f64, field: &str) -> CalcResult<f64> {
    if !value.is_finite() {
        return Err(CalcError::out_of_range(
            field,
            value.to_string(),
            "Value must be a finite number",
        ));
    }
    if value < 0.0 {
        return Err(CalcError::out_of_range(field, value.to_string(), "Value cannot be negative"));
    }
    Ok(value)
}

/// Reject NaN, infinities, zero and negative values.
pub(crate) fn require_positive(value: f64, field: &str) -> CalcResult<f64> {
    require_non_negative(value, field)?;
    if value == 0.0 {
        return Err(CalcError::out_of_range(field, value.to_string(), "Value must be positive"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_value_rounding_keeps_strings() {
        let value = DerivedValue::new(
            43.125,
            "[2070mL] ÷ [48 hours] = 43.13mL/hour",
            "[Deficit] ÷ [48 hours]",
        )
        .with_limit("none");
        let rounded = value.rounded(1);
        assert_eq!(rounded.output, 43.1);
        assert_eq!(rounded.working, value.working);
        assert_eq!(rounded.limit.as_deref(), Some("none"));
    }

    #[test]
    fn test_limit_omitted_from_json_when_absent() {
        let value = DerivedValue::new(65.0, "w", "f");
        let json = serde_json::to_string(&value).unwrap();
        assert!(!json.contains("limit"));
    }

    #[test]
    fn test_require_helpers() {
        assert_eq!(require(None, "weight_kg").unwrap_err().error_code(), "MISSING_INPUT");
        assert_eq!(require(Some(1.0), "weight_kg").unwrap(), 1.0);
        assert!(require_non_negative(f64::NAN, "x").is_err());
        assert!(require_non_negative(-1.0, "x").is_err());
        assert!(require_non_negative(0.0, "x").is_ok());
        assert!(require_positive(0.0, "x").is_err());
    }
}
