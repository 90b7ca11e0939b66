//! # Maintenance Fluid Calculation
//!
//! Daily maintenance volume by the Holliday-Segar rule, and the hourly rate.
//!
//! ## Assumptions
//!
//! - Weight is capped at 75 kg for this calculation only; the deficit and
//!   insulin calculations use the uncapped weight
//! - Exactly 10 kg and exactly 20 kg use the lower band
//!
//! ## Example
//!
//! ```rust
//! use dka_core::calculations::maintenance::{calculate, MaintenanceInput};
//!
//! let result = calculate(&MaintenanceInput { weight_kg: Some(23.0) }).unwrap();
//! assert_eq!(result.volume.output, 1560.0);
//! assert_eq!(result.rate.output, 65.0);
//! assert_eq!(result.volume.working, "(([23kg] - 20kg) x 20mL) + 1500mL = 1560mL");
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::equations::{
    holliday_segar_volume, maintenance_band, MaintenanceBand, MAINTENANCE_HOURS,
    MAINTENANCE_WEIGHT_CAP_KG,
};
use crate::errors::CalcResult;
use crate::units::{Hours, Kilograms, Millilitres};

use super::{require, require_positive, DerivedValue};

/// Reference maximum daily maintenance volume
pub const MAINTENANCE_VOLUME_LIMIT: &str = "2600mL";

/// Input for maintenance fluid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceInput {
    pub weight_kg: Option<f64>,
}

impl MaintenanceInput {
    pub fn validate(&self) -> CalcResult<f64> {
        let weight = require(self.weight_kg, "weight_kg")?;
        require_positive(weight, "weight_kg")
    }
}

/// Maintenance fluid results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceResult {
    /// Weight used in the formula, after capping
    pub capped_weight_kg: f64,
    pub weight_capped: bool,
    /// Daily volume (mL/24 hours)
    pub volume: DerivedValue,
    /// Hourly rate (mL/hour)
    pub rate: DerivedValue,
}

pub fn calculate(input: &MaintenanceInput) -> CalcResult<MaintenanceResult> {
    let weight = input.validate()?;
    let ceiling = Kilograms(MAINTENANCE_WEIGHT_CAP_KG);
    let w = Kilograms(weight).capped_at(ceiling);
    let weight_capped = w.0 < weight;
    if weight_capped {
        warn!(weight_kg = weight, cap_kg = ceiling.0, "maintenance weight capped");
    }

    let volume = Millilitres(holliday_segar_volume(w.0));

    let (working, formula) = match maintenance_band(w.0) {
        MaintenanceBand::OverTwenty => (
            format!("(([{}] - 20kg) x 20mL) + 1500mL = {}", w, volume),
            "(([Patient weight (kg)] - 20kg) x 20mL) + 1500mL",
        ),
        MaintenanceBand::TenToTwenty => (
            format!("(([{}] - 10kg) x 50mL) + 1000mL = {}", w, volume),
            "(([Patient weight (kg)] - 10kg) x 50mL) + 1000mL",
        ),
        MaintenanceBand::UpToTen => (
            format!("([{}] x 100mL) = {}", w, volume),
            "([Patient weight (kg)] x 100mL)",
        ),
    };

    let (working, formula) = if weight_capped {
        (
            format!("Weight has been capped at {}. {}", ceiling, working),
            format!("{}. Weight is capped at {}.", formula, ceiling),
        )
    } else {
        (working, formula.to_string())
    };

    let hours = Hours(MAINTENANCE_HOURS);
    let rate = volume / hours;

    Ok(MaintenanceResult {
        capped_weight_kg: w.0,
        weight_capped,
        volume: DerivedValue::new(volume.0, working, formula).with_limit(MAINTENANCE_VOLUME_LIMIT),
        rate: DerivedValue::new(
            rate.0,
            format!("[{}] ÷ [{}] = {}", volume, hours, rate),
            "[Daily maintenance volume] ÷ [24 hours]",
        ),
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::equations::cap_maintenance_weight;
    use proptest::prelude::*;

    fn volume(weight: f64) -> f64 {
        calculate(&MaintenanceInput { weight_kg: Some(weight) }).unwrap().volume.output
    }

    proptest! {
        #[test]
        fn lowest_band_is_100ml_per_kg(weight in 0.01_f64..=10.0) {
            prop_assert!((volume(weight) - 100.0 * weight).abs() < 1e-9);
        }

        #[test]
        fn middle_band_adds_50ml_per_kg_over_10(weight in 10.0_f64..=20.0) {
            prop_assume!(weight > 10.0);
            prop_assert!((volume(weight) - (1000.0 + 50.0 * (weight - 10.0))).abs() < 1e-9);
        }

        #[test]
        fn upper_band_adds_20ml_per_kg_over_20(weight in 20.0_f64..=75.0) {
            prop_assume!(weight > 20.0);
            prop_assert!((volume(weight) - (1500.0 + 20.0 * (weight - 20.0))).abs() < 1e-9);
        }

        #[test]
        fn above_cap_matches_75kg(weight in 75.0_f64..220.0) {
            prop_assume!(weight > 75.0);
            let result = calculate(&MaintenanceInput { weight_kg: Some(weight) }).unwrap();
            prop_assert_eq!(result.volume.output, volume(75.0));
            prop_assert_eq!(result.volume.output, 2600.0);
            prop_assert_eq!(result.rate.output, volume(75.0) / 24.0);
            prop_assert!(result.weight_capped);
        }

        #[test]
        fn capping_is_idempotent(weight in 0.5_f64..220.0) {
            let once = cap_maintenance_weight(weight);
            prop_assert_eq!(cap_maintenance_weight(once), once);

            let ceiling = Kilograms(MAINTENANCE_WEIGHT_CAP_KG);
            let capped = Kilograms(weight).capped_at(ceiling);
            prop_assert_eq!(capped.capped_at(ceiling), capped);
            prop_assert_eq!(capped.0, once);
        }
    }
}
