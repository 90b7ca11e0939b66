//! # Weight Estimation
//!
//! Estimated weight for when no measured weight is available. The
//! estimator is a strategy behind [`WeightEstimator`] so the APLS formula
//! can be replaced by an age/sex lookup table without changing callers.
//!
//! ## Example
//!
//! ```rust
//! use dka_core::calculations::weight::{calculate, AplsWeightEstimator, Sex, WeightInput};
//!
//! let input = WeightInput { age_years: 7.0, sex: Some(Sex::Female) };
//! let result = calculate(&input, &AplsWeightEstimator).unwrap();
//! assert_eq!(result.weight_kg, 22.0);
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::equations::{apls_weight, patient::ESTIMATED_WEIGHT_CAP_KG, Equation};
use crate::errors::{CalcError, CalcResult};
use crate::units::{format_quantity, Kilograms};

use super::{require_non_negative, DerivedValue};

/// Sex of the patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl std::fmt::Display for Sex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sex::Male => write!(f, "male"),
            Sex::Female => write!(f, "female"),
        }
    }
}

/// Strategy mapping (age, sex) to an estimated weight.
pub trait WeightEstimator {
    /// Estimated weight in kg
    fn estimate_kg(&self, age_years: f64, sex: Sex) -> CalcResult<f64>;

    /// Short name shown in the working string
    fn name(&self) -> &'static str;

    /// Generic formula shown alongside the estimate
    fn formula(&self) -> &'static str;

    /// Registry entry for the formula, if it has one
    fn equation(&self) -> Option<Equation> {
        None
    }
}

/// APLS estimate: (age + 4) × 2, capped at 75 kg. Ignores sex.
#[derive(Debug, Clone, Copy, Default)]
pub struct AplsWeightEstimator;

impl WeightEstimator for AplsWeightEstimator {
    fn estimate_kg(&self, age_years: f64, _sex: Sex) -> CalcResult<f64> {
        let age_years = require_non_negative(age_years, "age_years")?;
        Ok(apls_weight(age_years))
    }

    fn name(&self) -> &'static str {
        "APLS"
    }

    fn formula(&self) -> &'static str {
        "([Age (years)] + 4) x 2, maximum 75kg"
    }

    fn equation(&self) -> Option<Equation> {
        Some(Equation::AplsWeight)
    }
}

/// Input for weight estimation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightInput {
    pub age_years: f64,
    /// Required: the estimate is defined per sex
    pub sex: Option<Sex>,
}

/// Estimated weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightResult {
    pub weight_kg: f64,
    /// Estimator that produced the value
    pub estimator: String,
    pub weight: DerivedValue,
}

pub fn calculate(input: &WeightInput, estimator: &dyn WeightEstimator) -> CalcResult<WeightResult> {
    let sex = input.sex.ok_or_else(|| CalcError::missing_input("sex"))?;
    let weight_kg = estimator.estimate_kg(input.age_years, sex)?;
    let weight_kg = require_non_negative(weight_kg, "estimated_weight_kg")?;

    if weight_kg >= ESTIMATED_WEIGHT_CAP_KG {
        warn!(age_years = input.age_years, weight_kg, "estimated weight at ceiling");
    }

    let working = format!(
        "{} estimate for a {} year old {}: {}",
        estimator.name(),
        format_quantity(input.age_years),
        sex,
        Kilograms(weight_kg)
    );

    Ok(WeightResult {
        weight_kg,
        estimator: estimator.name().to_string(),
        weight: DerivedValue::new(weight_kg, working, estimator.formula()),
    })
}
