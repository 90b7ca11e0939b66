//! # Fluid Deficit Calculation
//!
//! Grades DKA severity, maps it to a percentage dehydration, converts that to
//! a deficit volume, removes the bolus allowance where the selected policy
//! calls for it, and spreads the result over 48 hours.
//!
//! ## Policies
//!
//! Two deficit mappings are in use and they disagree for mild and moderate
//! DKA, so the caller must choose one:
//!
//! | Severity | pH          | [`DeficitPolicy::ThreeTier`] | [`DeficitPolicy::TwoTier`] |
//! |----------|-------------|------------------------------|----------------------------|
//! | Mild     | ≥ 7.2       | 5%                           | 0%                         |
//! | Moderate | 7.1 to 7.2  | 7%                           | 5%                         |
//! | Severe   | < 7.1       | 10%                          | 10%                        |
//!
//! Likewise [`BolusSubtraction`] selects whether the 10 mL/kg bolus is taken
//! off the deficit for non-shocked or for shocked patients.
//!
//! ## Example
//!
//! ```rust
//! use dka_core::calculations::deficit::{calculate, BolusSubtraction, DeficitInput, DeficitPolicy};
//!
//! let input = DeficitInput {
//!     ph: Some(6.86),
//!     bicarbonate: None,
//!     weight_kg: Some(23.0),
//!     shocked: true,
//! };
//! let result = calculate(&input, DeficitPolicy::ThreeTier, BolusSubtraction::NonShocked).unwrap();
//! assert_eq!(result.percentage.output, 10.0);
//! assert_eq!(result.volume.output, 2300.0);
//! assert!(!result.bolus_subtracted);
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::equations::{
    deficit_less_bolus, deficit_volume, forty_eight_hour_total, rate_over,
    DEFICIT_REPLACEMENT_HOURS, STANDARD_BOLUS_ML_PER_KG,
};
use crate::errors::{CalcError, CalcResult};
use crate::units::{format_quantity, Hours, Kilograms, Millilitres, MillilitresPerKg};

use super::{require, require_non_negative, require_positive, DerivedValue};

/// pH at or below which the two-tier path refuses to calculate
pub const IMPLAUSIBLE_PH: f64 = 6.5;

/// Reference maximum deficit volume
pub const DEFICIT_VOLUME_LIMIT: &str = "7500mL (for 10% deficit)";

// ============================================================================
// Severity
// ============================================================================

/// DKA severity grade. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

/// Which measurement set the severity grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeveritySource {
    Ph,
    Bicarbonate,
}

impl Severity {
    /// Grade from pH alone
    pub fn from_ph(ph: f64) -> Severity {
        if ph >= 7.2 {
            Severity::Mild
        } else if ph >= 7.1 {
            Severity::Moderate
        } else {
            Severity::Severe
        }
    }

    /// Grade from bicarbonate (mmol/L) alone
    pub fn from_bicarbonate(bicarbonate: f64) -> Severity {
        if bicarbonate < 5.0 {
            Severity::Severe
        } else if bicarbonate < 10.0 {
            Severity::Moderate
        } else {
            Severity::Mild
        }
    }

    /// Grade from pH, replaced by the bicarbonate grade only when bicarbonate
    /// is present and indicates greater severity.
    pub fn grade(ph: f64, bicarbonate: Option<f64>) -> (Severity, SeveritySource) {
        let by_ph = Severity::from_ph(ph);
        match bicarbonate.map(Severity::from_bicarbonate) {
            Some(by_bicarbonate) if by_bicarbonate > by_ph => {
                (by_bicarbonate, SeveritySource::Bicarbonate)
            }
            _ => (by_ph, SeveritySource::Ph),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }
}

/// pH band text used in working strings
fn ph_range(ph: f64) -> &'static str {
    if ph < 7.1 {
        "less than 7.1"
    } else if ph < 7.2 {
        "7.1 to 7.2"
    } else if ph <= 7.4 {
        "7.2 to 7.4"
    } else {
        ">7.4"
    }
}

// ============================================================================
// Policies
// ============================================================================

/// Mapping from severity to percentage dehydration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeficitPolicy {
    /// Mild 5%, moderate 7%, severe 10%
    ThreeTier,
    /// Mild 0%, moderate 5%, severe 10%; rejects pH ≤ 6.5
    TwoTier,
}

impl DeficitPolicy {
    pub const CANONICAL: DeficitPolicy = DeficitPolicy::ThreeTier;

    pub fn percentage(&self, severity: Severity) -> f64 {
        match (self, severity) {
            (DeficitPolicy::ThreeTier, Severity::Mild) => 5.0,
            (DeficitPolicy::ThreeTier, Severity::Moderate) => 7.0,
            (DeficitPolicy::TwoTier, Severity::Mild) => 0.0,
            (DeficitPolicy::TwoTier, Severity::Moderate) => 5.0,
            (_, Severity::Severe) => 10.0,
        }
    }

    /// Policy-specific plausibility check on pH
    pub fn check_ph(&self, ph: f64) -> CalcResult<()> {
        if *self == DeficitPolicy::TwoTier && ph <= IMPLAUSIBLE_PH {
            return Err(CalcError::out_of_range(
                "ph",
                ph.to_string(),
                format!("A pH of {} is very low. Please check accuracy.", ph),
            ));
        }
        Ok(())
    }

    pub fn formula(&self) -> &'static str {
        match self {
            DeficitPolicy::ThreeTier => {
                "pH range [7.2 or above = 5%] or [7.1 to 7.2 = 7%] or [below 7.1 = 10%]"
            }
            DeficitPolicy::TwoTier => {
                "pH range [7.2 or above = 0%] or [7.1 to 7.2 = 5%] or [6.5 to 7.1 = 10%]"
            }
        }
    }
}

/// Which patients have the bolus allowance taken off the deficit before the
/// 48 hour rate is calculated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BolusSubtraction {
    /// Non-shocked patients have the 10 mL/kg allowance subtracted
    NonShocked,
    /// Shocked patients have the bolus they received subtracted
    Shocked,
}

impl BolusSubtraction {
    pub const CANONICAL: BolusSubtraction = BolusSubtraction::NonShocked;

    /// Whether the bolus is subtracted for this patient
    pub fn applies(&self, shocked: bool) -> bool {
        match self {
            BolusSubtraction::NonShocked => !shocked,
            BolusSubtraction::Shocked => shocked,
        }
    }

    fn patient_group(&self) -> &'static str {
        match self {
            BolusSubtraction::NonShocked => "non-shocked",
            BolusSubtraction::Shocked => "shocked",
        }
    }
}

// ============================================================================
// Calculation
// ============================================================================

/// Input for the deficit calculation.
///
/// ## JSON Example
///
/// ```json
/// { "ph": 6.86, "bicarbonate": null, "weight_kg": 23.0, "shocked": true }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeficitInput {
    pub ph: Option<f64>,
    /// mmol/L
    pub bicarbonate: Option<f64>,
    /// Uncapped body weight
    pub weight_kg: Option<f64>,
    pub shocked: bool,
}

/// Deficit results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeficitResult {
    pub severity: Severity,
    pub severity_source: SeveritySource,
    /// Percentage dehydration (%)
    pub percentage: DerivedValue,
    /// Deficit volume before any bolus adjustment (mL)
    pub volume: DerivedValue,
    /// Deficit volume used for the rate (mL)
    pub volume_less_bolus: DerivedValue,
    pub bolus_subtracted: bool,
    /// Deficit replacement rate over 48 hours (mL/hour)
    pub rate: DerivedValue,
}

pub fn calculate(
    input: &DeficitInput,
    policy: DeficitPolicy,
    subtraction: BolusSubtraction,
) -> CalcResult<DeficitResult> {
    let ph = require(input.ph, "ph")?;
    let ph = require_positive(ph, "ph")?;
    let weight = require_positive(require(input.weight_kg, "weight_kg")?, "weight_kg")?;
    let bicarbonate = input
        .bicarbonate
        .map(|b| require_non_negative(b, "bicarbonate"))
        .transpose()?;
    let allowance_dose = MillilitresPerKg(STANDARD_BOLUS_ML_PER_KG);
    let bolus = allowance_dose * Kilograms(weight);

    policy.check_ph(ph)?;

    // Severity and percentage
    let (severity, source) = Severity::grade(ph, bicarbonate);
    let percentage = policy.percentage(severity);
    let percentage_working = match (source, bicarbonate) {
        (SeveritySource::Bicarbonate, Some(b)) => format!(
            "[pH {}] is in range {}, but [bicarbonate {}mmol/L] indicates {} DKA ==> {}%",
            ph,
            ph_range(ph),
            format_quantity(b),
            severity.label(),
            format_quantity(percentage)
        ),
        _ => format!(
            "[pH {}] is in range {} ==> {}%",
            ph,
            ph_range(ph),
            format_quantity(percentage)
        ),
    };

    // Volume
    let volume = Millilitres(deficit_volume(percentage, weight));
    let volume_value = DerivedValue::new(
        volume.0,
        format!("[{}%] x [{}] x 10 = {}", format_quantity(percentage), Kilograms(weight), volume),
        "[Deficit percentage] x [Patient weight (kg)] x 10",
    )
    .with_limit(DEFICIT_VOLUME_LIMIT);

    // Bolus adjustment
    let bolus_subtracted = subtraction.applies(input.shocked);
    let less_bolus_formula = format!(
        "[Deficit volume] - [{} bolus (only for {} patients)]",
        allowance_dose,
        subtraction.patient_group()
    );
    let (adjusted, less_bolus_working) = if bolus_subtracted {
        let adjusted = Millilitres(deficit_less_bolus(volume.0, bolus.0));
        (adjusted, format!("[{}] - [{}] = {}", volume, bolus, adjusted))
    } else {
        let status = if input.shocked { "has" } else { "has not" };
        (
            volume,
            format!(
                "No subtraction has been made for fluid boluses as the child or young person \
                 {} been reported as shocked.",
                status
            ),
        )
    };

    // Rate
    let hours = Hours(DEFICIT_REPLACEMENT_HOURS);
    let rate = adjusted / hours;

    debug!(
        ph,
        ?severity,
        ?source,
        ?policy,
        percentage,
        deficit_ml = volume.0,
        adjusted_ml = adjusted.0,
        bolus_subtracted,
        "deficit calculated"
    );

    Ok(DeficitResult {
        severity,
        severity_source: source,
        percentage: DerivedValue::new(percentage, percentage_working, policy.formula()),
        volume: volume_value,
        volume_less_bolus: DerivedValue::new(adjusted.0, less_bolus_working, less_bolus_formula),
        bolus_subtracted,
        rate: DerivedValue::new(
            rate_over(adjusted.0, hours.0),
            format!("[{}] ÷ [{}] = {}", adjusted, hours, rate),
            "[Deficit volume less bolus] ÷ [48 hours]",
        ),
    })
}

/// Total fluid over the 48 hour replacement period.
///
/// The bolus comes off the total only when the patient was shocked, since
/// only then was a bolus actually given. This is independent of
/// [`BolusSubtraction`], which only affects the deficit rate.
pub fn forty_eight_hour_volume(
    maintenance_ml: f64,
    deficit: &DeficitResult,
    bolus_ml: f64,
    shocked: bool,
) -> DerivedValue {
    let total = forty_eight_hour_total(maintenance_ml, deficit.volume.output, bolus_ml, shocked);
    let total = Millilitres(total);
    let maintenance = Millilitres(maintenance_ml);
    let deficit_volume = Millilitres(deficit.volume.output);
    let bolus = Millilitres(bolus_ml);

    let (working, formula) = if shocked {
        (
            format!("([{}] x 2) + [{}] - [{}] = {}", maintenance, deficit_volume, bolus, total),
            "([Daily maintenance volume] x 2) + [Deficit volume] - [Bolus volume]",
        )
    } else {
        (
            format!("([{}] x 2) + [{}] = {}", maintenance, deficit_volume, total),
            "([Daily maintenance volume] x 2) + [Deficit volume]",
        )
    };

    DerivedValue::new(total.0, working, formula)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(ph: f64, weight: f64, shocked: bool) -> DeficitInput {
        DeficitInput {
            ph: Some(ph),
            bicarbonate: None,
            weight_kg: Some(weight),
            shocked,
        }
    }

    /// Three-tier mapping, bolus subtracted for non-shocked patients
    fn canonical(ph: f64, weight: f64, shocked: bool) -> CalcResult<DeficitResult> {
        let (policy, subtraction) = (DeficitPolicy::ThreeTier, BolusSubtraction::NonShocked);
        calculate(&input(ph, weight, shocked), policy, subtraction)
    }

    /// Two-tier mapping, bolus subtracted for shocked patients
    fn alternate(ph: f64, weight: f64, shocked: bool) -> CalcResult<DeficitResult> {
        calculate(&input(ph, weight, shocked), DeficitPolicy::TwoTier, BolusSubtraction::Shocked)
    }

    #[test]
    fn test_severity_from_ph() {
        assert_eq!(Severity::from_ph(7.3), Severity::Mild);
        assert_eq!(Severity::from_ph(7.2), Severity::Mild);
        assert_eq!(Severity::from_ph(7.15), Severity::Moderate);
        assert_eq!(Severity::from_ph(7.1), Severity::Moderate);
        assert_eq!(Severity::from_ph(7.09), Severity::Severe);
    }

    #[test]
    fn test_bicarbonate_only_used_when_more_severe() {
        use SeveritySource::{Bicarbonate, Ph};
        assert_eq!(Severity::grade(7.25, Some(4.0)), (Severity::Severe, Bicarbonate));
        assert_eq!(Severity::grade(7.25, Some(8.0)), (Severity::Moderate, Bicarbonate));
        assert_eq!(Severity::grade(7.0, Some(8.0)), (Severity::Severe, Ph));
        assert_eq!(Severity::grade(7.15, Some(20.0)), (Severity::Moderate, Ph));
        assert_eq!(Severity::grade(7.15, None), (Severity::Moderate, Ph));
    }

    #[test]
    fn test_policy_percentages() {
        use Severity::*;
        let percentages = |policy: DeficitPolicy| -> Vec<f64> {
            [Mild, Moderate, Severe].iter().map(|s| policy.percentage(*s)).collect()
        };
        assert_eq!(percentages(DeficitPolicy::ThreeTier), vec![5.0, 7.0, 10.0]);
        assert_eq!(percentages(DeficitPolicy::TwoTier), vec![0.0, 5.0, 10.0]);
    }

    #[test]
    fn test_reference_patient_shocked() {
        let result = canonical(6.86, 23.0, true).unwrap();
        assert_eq!(result.percentage.output, 10.0);
        assert_eq!(result.percentage.working, "[pH 6.86] is in range less than 7.1 ==> 10%");
        assert_eq!(result.volume.output, 2300.0);
        assert_eq!(result.volume.working, "[10%] x [23kg] x 10 = 2300mL");
        assert!(!result.bolus_subtracted);
        assert_eq!(result.volume_less_bolus.output, 2300.0);
        assert!((result.rate.output - 2300.0 / 48.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_shocked_subtracts_allowance() {
        let result = canonical(6.86, 23.0, false).unwrap();
        assert!(result.bolus_subtracted);
        assert_eq!(result.volume_less_bolus.output, 2070.0);
        assert_eq!(result.volume_less_bolus.working, "[2300mL] - [230mL] = 2070mL");
        assert!((result.rate.output - 2070.0 / 48.0).abs() < 1e-9);
    }

    #[test]
    fn test_allowance_is_ten_ml_per_kg() {
        for weight in [8.0, 23.0, 80.0] {
            let result = canonical(6.86, weight, false).unwrap();
            assert_eq!(result.volume_less_bolus.output, weight * 100.0 - weight * 10.0);
        }
        let result = canonical(6.86, 23.0, false).unwrap();
        assert_eq!(
            result.volume_less_bolus.formula,
            "[Deficit volume] - [10mL/kg bolus (only for non-shocked patients)]"
        );
    }

    #[test]
    fn test_shocked_policy_reverses_polarity() {
        let shocked = alternate(6.86, 23.0, true).unwrap();
        assert!(shocked.bolus_subtracted);
        assert_eq!(shocked.volume_less_bolus.output, 2070.0);
        assert!(shocked.volume_less_bolus.formula.contains("only for shocked patients"));

        let not_shocked = alternate(6.86, 23.0, false).unwrap();
        assert!(!not_shocked.bolus_subtracted);
        assert!(not_shocked.volume_less_bolus.working.contains("has not been reported as shocked"));
    }

    #[test]
    fn test_adjusted_volume_never_negative() {
        // Two-tier mild DKA has no deficit at all
        let result = calculate(
            &input(7.3, 20.0, false),
            DeficitPolicy::TwoTier,
            BolusSubtraction::NonShocked,
        )
        .unwrap();
        assert_eq!(result.percentage.output, 0.0);
        assert_eq!(result.volume_less_bolus.output, 0.0);
        assert_eq!(result.rate.output, 0.0);
    }

    #[test]
    fn test_two_tier_rejects_implausible_ph() {
        let err = alternate(6.5, 20.0, false).unwrap_err();
        assert_eq!(err.error_code(), "OUT_OF_RANGE");
        assert!(canonical(6.5, 20.0, false).is_ok());
    }

    #[test]
    fn test_bicarbonate_working_string() {
        let mut i = input(7.25, 20.0, true);
        i.bicarbonate = Some(4.0);
        let result = calculate(&i, DeficitPolicy::ThreeTier, BolusSubtraction::NonShocked).unwrap();
        assert_eq!(result.severity, Severity::Severe);
        assert_eq!(result.percentage.output, 10.0);
        assert!(result.percentage.working.contains("[bicarbonate 4mmol/L] indicates severe DKA"));
    }

    #[test]
    fn test_forty_eight_hour_volume() {
        let shocked = canonical(6.86, 23.0, true).unwrap();
        let total = forty_eight_hour_volume(1560.0, &shocked, 230.0, true);
        assert_eq!(total.output, 5190.0);
        assert_eq!(total.working, "([1560mL] x 2) + [2300mL] - [230mL] = 5190mL");

        let not_shocked = canonical(6.86, 23.0, false).unwrap();
        let total = forty_eight_hour_volume(1560.0, &not_shocked, 230.0, false);
        assert_eq!(total.output, 5420.0);
    }

    #[test]
    fn test_missing_inputs() {
        let mut i = input(7.0, 20.0, false);
        i.ph = None;
        assert_eq!(
            calculate(&i, DeficitPolicy::ThreeTier, BolusSubtraction::NonShocked).unwrap_err(),
            CalcError::missing_input("ph")
        );
        let mut i = input(7.0, 20.0, false);
        i.weight_kg = None;
        assert_eq!(
            calculate(&i, DeficitPolicy::ThreeTier, BolusSubtraction::NonShocked).unwrap_err(),
            CalcError::missing_input("weight_kg")
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn percentage_non_increasing_in_ph(a in 6.0_f64..8.0, b in 6.0_f64..8.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            for policy in [DeficitPolicy::ThreeTier, DeficitPolicy::TwoTier] {
                let p_lo = policy.percentage(Severity::from_ph(lo));
                let p_hi = policy.percentage(Severity::from_ph(hi));
                prop_assert!(p_hi <= p_lo);
            }
        }

        #[test]
        fn rate_times_48_is_adjusted_volume(
            ph in 6.6_f64..7.5,
            weight in 0.5_f64..150.0,
            shocked in any::<bool>(),
        ) {
            let input = DeficitInput {
                ph: Some(ph),
                bicarbonate: None,
                weight_kg: Some(weight),
                shocked,
            };
            let result =
                calculate(&input, DeficitPolicy::ThreeTier, BolusSubtraction::NonShocked).unwrap();
            let back = result.rate.output * 48.0;
            prop_assert!((back - result.volume_less_bolus.output).abs() < 1e-9);
        }
    }
}
