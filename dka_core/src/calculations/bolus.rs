//! # Bolus Calculation
//!
//! Crystalloid bolus volume per kg body weight. Usable for a single bolus
//! or retrospectively for the total given.
//!
//! ## Example
//!
//! ```rust
//! use dka_core::calculations::bolus::{calculate, BolusInput};
//!
//! let result = calculate(&BolusInput { weight_kg: Some(23.0), ml_per_kg: Some(10.0) }).unwrap();
//! assert_eq!(result.volume.output, 230.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::CalcResult;
use crate::units::{Kilograms, MillilitresPerKg};

use super::{require, require_non_negative, DerivedValue};

/// Reference maximum bolus volume
pub const BOLUS_VOLUME_LIMIT: &str = "750mL";

/// Input for a bolus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BolusInput {
    pub weight_kg: Option<f64>,
    /// Dose (mL/kg), typically 10
    pub ml_per_kg: Option<f64>,
}

impl BolusInput {
    pub fn validate(&self) -> CalcResult<(f64, f64)> {
        let weight = require_non_negative(require(self.weight_kg, "weight_kg")?, "weight_kg")?;
        let dose = require_non_negative(require(self.ml_per_kg, "ml_per_kg")?, "ml_per_kg")?;
        Ok((weight, dose))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BolusResult {
    /// Bolus volume (mL)
    pub volume: DerivedValue,
}

pub fn calculate(input: &BolusInput) -> CalcResult<BolusResult> {
    let (weight, dose) = input.validate()?;
    let dose = MillilitresPerKg(dose);
    let volume = dose * Kilograms(weight);

    Ok(BolusResult {
        volume: DerivedValue::new(
            volume.0,
            format!("[{}] x [{}] = {}", dose, Kilograms(weight), volume),
            format!("[{}] x [Patient weight (kg)]", dose),
        )
        .with_limit(BOLUS_VOLUME_LIMIT),
    })
}
