//! # Insulin Infusion Rate
//!
//! Infusion rate for a requested dose per kg. With the standard 1 unit in
//! 1 mL infusion the rate in units/hour is also the pump rate in mL/hour.
//!
//! No upper limit is enforced here; the 0.05-0.1 units/kg/hour range is
//! checked when patient inputs are validated.
//!
//! ## Example
//!
//! ```rust
//! use dka_core::calculations::insulin::{calculate, InsulinInput};
//!
//! let result = calculate(&InsulinInput {
//!     weight_kg: Some(23.0),
//!     units_per_kg_per_hour: Some(0.05),
//! })
//! .unwrap();
//! assert!((result.rate.output - 1.15).abs() < 1e-12);
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::CalcResult;
use crate::units::{Kilograms, UnitsPerKgPerHour};

use super::{require, require_non_negative, DerivedValue};

/// Reference maximum infusion rate
pub const INSULIN_RATE_LIMIT: &str = "3.75 Units/hour (for 0.05 Units/kg/hour)";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InsulinInput {
    pub weight_kg: Option<f64>,
    pub units_per_kg_per_hour: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsulinResult {
    /// Infusion rate (units/hour)
    pub rate: DerivedValue,
}

pub fn calculate(input: &InsulinInput) -> CalcResult<InsulinResult> {
    let weight = require_non_negative(require(input.weight_kg, "weight_kg")?, "weight_kg")?;
    let dose = require_non_negative(
        require(input.units_per_kg_per_hour, "units_per_kg_per_hour")?,
        "units_per_kg_per_hour",
    )?;

    let dose = UnitsPerKgPerHour(dose);
    let rate = dose * Kilograms(weight);

    Ok(InsulinResult {
        rate: DerivedValue::new(
            rate.0,
            format!("{} (for {})", rate, dose),
            "[Insulin rate (Units/kg/hour)] x [Patient weight]",
        )
        .with_limit(INSULIN_RATE_LIMIT),
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn rate_over_weight_is_dose(weight in 0.5_f64..220.0, dose in 0.05_f64..=0.1) {
            let result = calculate(&InsulinInput {
                weight_kg: Some(weight),
                units_per_kg_per_hour: Some(dose),
            }).unwrap();
            prop_assert!((result.rate.output / weight - dose).abs() < 1e-12);
        }
    }
}
