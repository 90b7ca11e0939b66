//! # Full DKA Calculation
//!
//! Chains the individual calculations into one result:
//!
//! 1. Resolve protocol settings
//! 2. Validate patient inputs against the settings' validation profile
//! 3. Age from dates, if dates were given
//! 4. Measured weight, or an estimate from age and sex
//! 5. Severity, deficit percentage and deficit volume
//! 6. Bolus volume
//! 7. Bolus subtraction and deficit rate
//! 8. Maintenance volume and rate
//! 9. Starting fluid rate = maintenance rate + deficit rate
//! 10. 48 hour total
//! 11. Insulin infusion rate
//!
//! Values are kept at full precision. [`DkaResult::presented`] rounds them
//! for display. Any failure aborts the whole calculation.
//!
//! ## Example
//!
//! ```rust
//! use dka_core::calculations::dka::{calculate, AgeSource, PatientInputs};
//! use dka_core::settings::ProtocolSettings;
//!
//! let inputs = PatientInputs {
//!     age: AgeSource::Years(7.0),
//!     sex: None,
//!     ph: Some(6.86),
//!     bicarbonate: None,
//!     weight_kg: Some(23.0),
//!     shocked: true,
//!     insulin_dose: Some(0.05),
//! };
//! let result = calculate(&inputs, &ProtocolSettings::default()).unwrap();
//! assert_eq!(result.daily_maintenance_volume.output, 1560.0);
//! assert_eq!(result.deficit_volume.output, 2300.0);
//! assert_eq!(result.bolus_volume.output, 230.0);
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::equations::{Equation, EquationTracker, STANDARD_BOLUS_ML_PER_KG};
use crate::errors::{CalcError, CalcResult};
use crate::settings::{CalculatorLabel, InputLimits, ProtocolSettings, ResolvedSettings};
use crate::units::MillilitresPerHour;

use super::age::{self, AgeInput};
use super::bolus::{self, BolusInput};
use super::deficit::{self, DeficitInput, Severity, SeveritySource};
use super::insulin::{self, InsulinInput};
use super::maintenance::{self, MaintenanceInput};
use super::weight::{self, AplsWeightEstimator, Sex, WeightEstimator, WeightInput};
use super::{require, DerivedValue};

/// Oldest age accepted (exclusive), in years
pub const MAX_AGE_YEARS: f64 = 19.0;

/// Accepted insulin dose range (units/kg/hour), inclusive
pub const MIN_INSULIN_DOSE: f64 = 0.05;
pub const MAX_INSULIN_DOSE: f64 = 0.1;

/// Insulin dose used when none is given
pub const DEFAULT_INSULIN_DOSE: f64 = 0.05;

/// Upper bound on bicarbonate (mmol/L), exclusive
pub const MAX_BICARBONATE: f64 = 35.0;

// ============================================================================
// Inputs
// ============================================================================

/// Age as given by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeSource {
    /// Age in (decimal) years
    Years(f64),
    /// Date of birth and the date treatment started
    Dates(AgeInput),
}

/// Patient measurements for one calculation.
///
/// ## JSON Example
///
/// ```json
/// {
///   "age": { "dates": { "birth_date": "2015-04-12", "observation_date": "2022-02-06" } },
///   "sex": "male",
///   "ph": 6.86,
///   "weight_kg": 23.0,
///   "shocked": true,
///   "insulin_dose": 0.05
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatientInputs {
    pub age: AgeSource,
    /// Needed only when weight is estimated
    #[serde(default)]
    pub sex: Option<Sex>,
    pub ph: Option<f64>,
    /// mmol/L
    #[serde(default)]
    pub bicarbonate: Option<f64>,
    /// Measured weight; estimated from age and sex when absent
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub shocked: bool,
    /// Units/kg/hour, 0.05 when absent
    #[serde(default)]
    pub insulin_dose: Option<f64>,
}

impl PatientInputs {
    /// Range checks for the directly supplied values.
    pub fn validate(&self, limits: &InputLimits) -> CalcResult<()> {
        if let AgeSource::Years(years) = self.age {
            check_age(years)?;
        }

        let ph = require(self.ph, "ph")?;
        check_finite(ph, "ph")?;
        if ph < limits.ph_min || ph >= limits.ph_max {
            return Err(CalcError::out_of_range(
                "ph",
                ph.to_string(),
                format!("pH must be at least {} and below {}", limits.ph_min, limits.ph_max),
            ));
        }

        if let Some(bicarbonate) = self.bicarbonate {
            check_finite(bicarbonate, "bicarbonate")?;
            if !(0.0..MAX_BICARBONATE).contains(&bicarbonate) {
                return Err(CalcError::out_of_range(
                    "bicarbonate",
                    bicarbonate.to_string(),
                    format!("Bicarbonate must be at least 0 and below {} mmol/L", MAX_BICARBONATE),
                ));
            }
        }

        if let Some(weight) = self.weight_kg {
            check_weight(weight, limits)?;
        }

        if let Some(dose) = self.insulin_dose {
            check_finite(dose, "insulin_dose")?;
            if !(MIN_INSULIN_DOSE..=MAX_INSULIN_DOSE).contains(&dose) {
                return Err(CalcError::out_of_range(
                    "insulin_dose",
                    dose.to_string(),
                    format!(
                        "Insulin dose must be between {} and {} Units/kg/hour",
                        MIN_INSULIN_DOSE, MAX_INSULIN_DOSE
                    ),
                ));
            }
        }

        Ok(())
    }
}

fn check_finite(value: f64, field: &str) -> CalcResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CalcError::out_of_range(field, value.to_string(), "Value must be a finite number"))
    }
}

fn check_age(years: f64) -> CalcResult<()> {
    check_finite(years, "age")?;
    if !(0.0..MAX_AGE_YEARS).contains(&years) {
        return Err(CalcError::out_of_range(
            "age",
            years.to_string(),
            format!("Age must be at least 0 and below {} years", MAX_AGE_YEARS),
        ));
    }
    Ok(())
}

fn check_weight(weight: f64, limits: &InputLimits) -> CalcResult<()> {
    check_finite(weight, "weight_kg")?;
    if weight < limits.weight_min_kg || weight >= limits.weight_max_kg {
        return Err(CalcError::out_of_range(
            "weight_kg",
            weight.to_string(),
            format!(
                "Weight must be at least {}kg and below {}kg",
                limits.weight_min_kg, limits.weight_max_kg
            ),
        ));
    }
    Ok(())
}

// ============================================================================
// Results
// ============================================================================

/// Where the weight used in the calculation came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum WeightSource {
    Measured,
    Estimated { estimator: String },
}

/// Inputs as actually used, after age and weight were resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedPatient {
    pub age_years: f64,
    pub weight_kg: f64,
    pub weight_source: WeightSource,
    pub severity: Severity,
    pub severity_source: SeveritySource,
    pub shocked: bool,
    pub insulin_dose: f64,
    pub bolus_subtracted: bool,
    pub settings: ResolvedSettings,
}

/// Complete calculation result.
///
/// `label` is new for every call: the same inputs and settings give the same
/// numbers, working strings and equations but a different `calculation_id`
/// and `request_timestamp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DkaResult {
    pub label: CalculatorLabel,
    pub patient: ResolvedPatient,
    /// Present when the weight was estimated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_weight: Option<DerivedValue>,
    /// Percentage dehydration (%)
    pub deficit_percentage: DerivedValue,
    /// Deficit volume (mL)
    pub deficit_volume: DerivedValue,
    /// Bolus volume (mL)
    pub bolus_volume: DerivedValue,
    /// Deficit volume used for the deficit rate (mL)
    pub deficit_volume_less_bolus: DerivedValue,
    /// Daily maintenance volume (mL)
    pub daily_maintenance_volume: DerivedValue,
    /// Maintenance rate (mL/hour)
    pub maintenance_rate: DerivedValue,
    /// Deficit replacement rate (mL/hour)
    pub deficit_rate: DerivedValue,
    /// Starting fluid rate (mL/hour)
    pub starting_fluid_rate: DerivedValue,
    /// Total fluid over 48 hours (mL)
    pub forty_eight_hour_total: DerivedValue,
    /// Insulin infusion rate (Units/hour)
    pub insulin_infusion_rate: DerivedValue,
    /// Formulas used to reach this result
    pub equations: EquationTracker,
}

impl DkaResult {
    /// Copy rounded for display: fluids to 1 decimal place, insulin to 2.
    pub fn presented(&self) -> DkaResult {
        DkaResult {
            estimated_weight: self.estimated_weight.as_ref().map(|w| w.rounded(1)),
            deficit_percentage: self.deficit_percentage.rounded(1),
            deficit_volume: self.deficit_volume.rounded(1),
            bolus_volume: self.bolus_volume.rounded(1),
            deficit_volume_less_bolus: self.deficit_volume_less_bolus.rounded(1),
            daily_maintenance_volume: self.daily_maintenance_volume.rounded(1),
            maintenance_rate: self.maintenance_rate.rounded(1),
            deficit_rate: self.deficit_rate.rounded(1),
            starting_fluid_rate: self.starting_fluid_rate.rounded(1),
            forty_eight_hour_total: self.forty_eight_hour_total.rounded(1),
            insulin_infusion_rate: self.insulin_infusion_rate.rounded(2),
            ..self.clone()
        }
    }
}

// ============================================================================
// Calculation
// ============================================================================

/// Run the full calculation with the APLS weight estimate.
///
/// Repeating a call reproduces every derived value. Only the result label
/// differs, since [`CalculatorLabel::new`] draws a fresh uuid and timestamp.
pub fn calculate(inputs: &PatientInputs, settings: &ProtocolSettings) -> CalcResult<DkaResult> {
    calculate_with(inputs, settings, &AplsWeightEstimator)
}

/// Run the full calculation with a chosen weight estimator.
pub fn calculate_with(
    inputs: &PatientInputs,
    settings: &ProtocolSettings,
    estimator: &dyn WeightEstimator,
) -> CalcResult<DkaResult> {
    let settings = settings.resolve()?;
    let limits = settings.validation.limits();
    inputs.validate(&limits)?;

    let mut tracker = EquationTracker::new();

    // Age
    let age_years = match inputs.age {
        AgeSource::Years(years) => years,
        AgeSource::Dates(dates) => {
            let age = age::calculate(&dates)?;
            tracker.record(Equation::AgeToNearestYear, "Age from dates");
            debug!(days = age.days, age_years = age.age_years, "age derived from dates");
            let years = f64::from(age.age_years);
            check_age(years)?;
            years
        }
    };

    // Weight
    let (weight_kg, weight_source, estimated_weight) = match inputs.weight_kg {
        Some(weight) => (weight, WeightSource::Measured, None),
        None => {
            let estimate = weight::calculate(
                &WeightInput {
                    age_years,
                    sex: inputs.sex,
                },
                estimator,
            )?;
            check_weight(estimate.weight_kg, &limits)?;
            if let Some(equation) = estimator.equation() {
                tracker.record(equation, "Estimated weight");
            }
            warn!(
                age_years,
                weight_kg = estimate.weight_kg,
                estimator = estimator.name(),
                "no measured weight, using estimate"
            );
            let source = WeightSource::Estimated {
                estimator: estimate.estimator.clone(),
            };
            (estimate.weight_kg, source, Some(estimate.weight))
        }
    };
    debug!(weight_kg, ?weight_source, "weight resolved");

    // Bolus
    let bolus = bolus::calculate(&BolusInput {
        weight_kg: Some(weight_kg),
        ml_per_kg: Some(STANDARD_BOLUS_ML_PER_KG),
    })?;
    tracker.record(Equation::BolusVolume, "Bolus volume");

    // Deficit
    let deficit = deficit::calculate(
        &DeficitInput {
            ph: inputs.ph,
            bicarbonate: inputs.bicarbonate,
            weight_kg: Some(weight_kg),
            shocked: inputs.shocked,
        },
        settings.deficit_policy,
        settings.bolus_subtraction,
    )?;
    tracker.record(Equation::SeverityGrading, "DKA severity");
    tracker.record(Equation::DeficitPercentage, "Deficit percentage");
    tracker.record(Equation::DeficitVolume, "Deficit volume");
    if deficit.bolus_subtracted {
        tracker.record(Equation::DeficitLessBolus, "Deficit volume less bolus");
    }
    tracker.record(Equation::DeficitRate, "Deficit replacement rate");

    // Maintenance
    let maintenance = maintenance::calculate(&MaintenanceInput {
        weight_kg: Some(weight_kg),
    })?;
    tracker.record(Equation::HollidaySegarVolume, "Daily maintenance volume");
    tracker.record(Equation::MaintenanceRate, "Maintenance rate");
    debug!(
        volume_ml = maintenance.volume.output,
        rate_ml_per_hour = maintenance.rate.output,
        weight_capped = maintenance.weight_capped,
        "maintenance calculated"
    );

    // Starting rate
    let maintenance_rate = MillilitresPerHour(maintenance.rate.output);
    let deficit_rate = MillilitresPerHour(deficit.rate.output);
    let starting_rate = maintenance_rate + deficit_rate;
    let starting_fluid_rate = DerivedValue::new(
        starting_rate.0,
        format!("[{}] + [{}] = {}", maintenance_rate, deficit_rate, starting_rate),
        "[Maintenance rate] + [Deficit replacement rate]",
    );
    tracker.record(Equation::StartingFluidRate, "Starting fluid rate");

    // 48 hour total
    let forty_eight_hour_total = deficit::forty_eight_hour_volume(
        maintenance.volume.output,
        &deficit,
        bolus.volume.output,
        inputs.shocked,
    );
    tracker.record(Equation::FortyEightHourTotal, "Total fluid over 48 hours");

    // Insulin
    let insulin_dose = inputs.insulin_dose.unwrap_or(DEFAULT_INSULIN_DOSE);
    let insulin = insulin::calculate(&InsulinInput {
        weight_kg: Some(weight_kg),
        units_per_kg_per_hour: Some(insulin_dose),
    })?;
    tracker.record(Equation::InsulinRate, "Insulin infusion rate");

    let label = CalculatorLabel::new();
    info!(
        calculation_id = %label.calculation_id,
        weight_kg,
        severity = deficit.severity.label(),
        starting_rate_ml_per_hour = starting_rate.0,
        insulin_units_per_hour = insulin.rate.output,
        "DKA calculation complete"
    );

    Ok(DkaResult {
        label,
        patient: ResolvedPatient {
            age_years,
            weight_kg,
            weight_source,
            severity: deficit.severity,
            severity_source: deficit.severity_source,
            shocked: inputs.shocked,
            insulin_dose,
            bolus_subtracted: deficit.bolus_subtracted,
            settings,
        },
        estimated_weight,
        deficit_percentage: deficit.percentage,
        deficit_volume: deficit.volume,
        bolus_volume: bolus.volume,
        deficit_volume_less_bolus: deficit.volume_less_bolus,
        daily_maintenance_volume: maintenance.volume,
        maintenance_rate: maintenance.rate,
        deficit_rate: deficit.rate,
        starting_fluid_rate,
        forty_eight_hour_total,
        insulin_infusion_rate: insulin.rate,
        equations: tracker,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::deficit::{BolusSubtraction, DeficitPolicy};
    use crate::settings::ValidationProfile;

    fn reference_inputs() -> PatientInputs {
        PatientInputs {
            age: AgeSource::Years(7.0),
            sex: Some(Sex::Male),
            ph: Some(6.86),
            bicarbonate: None,
            weight_kg: Some(23.0),
            shocked: true,
            insulin_dose: Some(0.05),
        }
    }

    #[test]
    fn test_reference_scenario() {
        let result = calculate(&reference_inputs(), &ProtocolSettings::default()).unwrap();
        assert_eq!(result.daily_maintenance_volume.output, 1560.0);
        assert_eq!(result.maintenance_rate.output, 65.0);
        assert_eq!(result.deficit_percentage.output, 10.0);
        assert_eq!(result.deficit_volume.output, 2300.0);
        assert_eq!(result.bolus_volume.output, 230.0);
        assert!((result.insulin_infusion_rate.output - 1.15).abs() < 1e-12);
        assert_eq!(result.patient.weight_source, WeightSource::Measured);
        assert!(result.estimated_weight.is_none());

        // Shocked under the canonical policy keeps the full deficit
        assert!(!result.patient.bolus_subtracted);
        let expected_rate = 65.0 + 2300.0 / 48.0;
        assert!((result.starting_fluid_rate.output - expected_rate).abs() < 1e-9);
        assert_eq!(result.forty_eight_hour_total.output, 5190.0);
    }

    #[test]
    fn test_repeat_calculation_differs_only_in_label() {
        let first = calculate(&reference_inputs(), &ProtocolSettings::default()).unwrap();
        let second = calculate(&reference_inputs(), &ProtocolSettings::default()).unwrap();
        assert_ne!(first.label.calculation_id, second.label.calculation_id);

        let mut first = serde_json::to_value(&first).unwrap();
        let mut second = serde_json::to_value(&second).unwrap();
        first["label"] = serde_json::Value::Null;
        second["label"] = serde_json::Value::Null;
        assert_eq!(first, second);
    }

    #[test]
    fn test_presented_rounding() {
        let result = calculate(&reference_inputs(), &ProtocolSettings::default()).unwrap();
        let presented = result.presented();
        assert_eq!(presented.deficit_rate.output, 47.9);
        assert_eq!(presented.starting_fluid_rate.output, 112.9);
        assert_eq!(presented.insulin_infusion_rate.output, 1.15);
        assert_eq!(presented.label.calculation_id, result.label.calculation_id);
        // Unrounded values stay untouched
        assert!((result.deficit_rate.output - 47.916666).abs() < 1e-5);
    }

    #[test]
    fn test_default_insulin_dose() {
        let inputs = PatientInputs {
            insulin_dose: None,
            ..reference_inputs()
        };
        let result = calculate(&inputs, &ProtocolSettings::default()).unwrap();
        assert_eq!(result.patient.insulin_dose, 0.05);
    }

    #[test]
    fn test_estimated_weight() {
        let inputs = PatientInputs {
            weight_kg: None,
            ..reference_inputs()
        };
        let result = calculate(&inputs, &ProtocolSettings::default()).unwrap();
        assert_eq!(result.patient.weight_kg, 22.0);
        assert_eq!(
            result.patient.weight_source,
            WeightSource::Estimated {
                estimator: "APLS".to_string()
            }
        );
        assert!(result.estimated_weight.is_some());
        assert!(result.equations.unique_equations().contains(&Equation::AplsWeight));
    }

    #[test]
    fn test_missing_weight_and_sex() {
        let inputs = PatientInputs {
            weight_kg: None,
            sex: None,
            ..reference_inputs()
        };
        let err = calculate(&inputs, &ProtocolSettings::default()).unwrap_err();
        assert_eq!(err, CalcError::missing_input("sex"));
    }

    #[test]
    fn test_unresolved_settings_rejected() {
        let err = calculate(&reference_inputs(), &ProtocolSettings::unresolved()).unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_AMBIGUITY");
    }

    #[test]
    fn test_validation_profiles() {
        let inputs = PatientInputs {
            ph: Some(7.6),
            ..reference_inputs()
        };
        assert_eq!(
            calculate(&inputs, &ProtocolSettings::default()).unwrap_err().error_code(),
            "OUT_OF_RANGE"
        );
        let permissive = ProtocolSettings::default().with_validation(ValidationProfile::Permissive);
        assert!(calculate(&inputs, &permissive).is_ok());

        let heavy = PatientInputs {
            weight_kg: Some(180.0),
            ..reference_inputs()
        };
        assert!(calculate(&heavy, &ProtocolSettings::default()).is_err());
        assert!(calculate(&heavy, &permissive).is_ok());
    }

    #[test]
    fn test_input_range_checks() {
        let limits = ValidationProfile::Strict.limits();
        let bad_age = PatientInputs {
            age: AgeSource::Years(19.0),
            ..reference_inputs()
        };
        assert!(bad_age.validate(&limits).is_err());

        let bad_dose = PatientInputs {
            insulin_dose: Some(0.2),
            ..reference_inputs()
        };
        assert!(bad_dose.validate(&limits).is_err());

        let bad_bicarbonate = PatientInputs {
            bicarbonate: Some(35.0),
            ..reference_inputs()
        };
        assert!(bad_bicarbonate.validate(&limits).is_err());

        let nan_ph = PatientInputs {
            ph: Some(f64::NAN),
            ..reference_inputs()
        };
        assert!(nan_ph.validate(&limits).is_err());

        let missing_ph = PatientInputs {
            ph: None,
            ..reference_inputs()
        };
        assert_eq!(missing_ph.validate(&limits).unwrap_err(), CalcError::missing_input("ph"));
    }

    #[test]
    fn test_alternate_policies() {
        let settings = ProtocolSettings::default()
            .with_deficit_policy(DeficitPolicy::TwoTier)
            .with_bolus_subtraction(BolusSubtraction::Shocked);
        let result = calculate(&reference_inputs(), &settings).unwrap();
        assert!(result.patient.bolus_subtracted);
        assert_eq!(result.deficit_volume_less_bolus.output, 2070.0);
        assert!(result.equations.unique_equations().contains(&Equation::DeficitLessBolus));
    }

    #[test]
    fn test_tracker_records_chain() {
        let result = calculate(&reference_inputs(), &ProtocolSettings::default()).unwrap();
        let used = result.equations.unique_equations();
        assert!(used.contains(&Equation::HollidaySegarVolume));
        assert!(used.contains(&Equation::StartingFluidRate));
        assert!(used.contains(&Equation::InsulinRate));
        assert!(!used.contains(&Equation::AgeToNearestYear));
    }

    #[test]
    fn test_inputs_json() {
        let json = r#"{
            "age": { "dates": { "birth_date": "2015-04-12", "observation_date": "2022-02-06" } },
            "sex": "female",
            "ph": 7.15
        }"#;
        let inputs: PatientInputs = serde_json::from_str(json).unwrap();
        assert!(!inputs.shocked);
        assert_eq!(inputs.weight_kg, None);

        let result = calculate(&inputs, &ProtocolSettings::default()).unwrap();
        assert_eq!(result.patient.age_years, 7.0);
        assert_eq!(result.patient.weight_kg, 22.0);
        assert_eq!(result.deficit_percentage.output, 7.0);
    }

    #[test]
    fn test_result_serializes() {
        let result = calculate(&reference_inputs(), &ProtocolSettings::default()).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["bolus_volume"]["limit"], "750mL");
        assert_eq!(json["patient"]["weight_source"]["source"], "measured");
        assert_eq!(json["patient"]["settings"]["deficit_policy"], "ThreeTier");
    }
}
