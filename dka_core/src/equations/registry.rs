//! # Equation Registry
//!
//! Central registry of every formula the calculator applies. Each equation
//! carries a clinical reference, its plain-text formula and variable
//! definitions, so a clinician can audit a result line by line.
//!
//! ## Usage
//!
//! ```rust
//! use dka_core::equations::registry::{Equation, EquationTracker};
//!
//! let mut tracker = EquationTracker::new();
//! tracker.record(Equation::HollidaySegarVolume, "Daily maintenance volume");
//!
//! let meta = Equation::HollidaySegarVolume.metadata();
//! assert!(meta.formula_plain.contains("1500"));
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

// ============================================================================
// Clinical References
// ============================================================================

/// Source of a formula.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ClinicalReference {
    /// Holliday MA, Segar WE (1957) maintenance fluid requirement
    HollidaySegar,
    /// BSPED DKA Integrated Care Pathway
    Bsped { year: u16, section: &'static str },
    /// Advanced Paediatric Life Support weight estimate
    Apls,
    /// Unit arithmetic with no clinical source
    Arithmetic,
}

impl ClinicalReference {
    /// Format the reference for display
    pub fn citation(&self) -> String {
        match self {
            ClinicalReference::HollidaySegar => {
                "Holliday & Segar, Pediatrics 1957;19:823".to_string()
            }
            ClinicalReference::Bsped { year, section } => {
                format!("BSPED DKA Guideline {}, {}", year, section)
            }
            ClinicalReference::Apls => "APLS weight estimation".to_string(),
            ClinicalReference::Arithmetic => "Unit arithmetic".to_string(),
        }
    }
}

// ============================================================================
// Equation Categories
// ============================================================================

/// Groups for the equations reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquationCategory {
    /// Age and weight derivation
    Patient,
    /// Daily maintenance fluid
    Maintenance,
    /// Severity, deficit volume and replacement rate
    Deficit,
    /// Crystalloid boluses
    Bolus,
    /// Combined fluid rates
    FluidRates,
    /// Insulin infusion
    Insulin,
}

impl EquationCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            EquationCategory::Patient => "Patient",
            EquationCategory::Maintenance => "Maintenance Fluid",
            EquationCategory::Deficit => "Fluid Deficit",
            EquationCategory::Bolus => "Bolus",
            EquationCategory::FluidRates => "Fluid Rates",
            EquationCategory::Insulin => "Insulin",
        }
    }

    /// Sort order in the reference (lower = earlier)
    pub fn sort_order(&self) -> u8 {
        match self {
            EquationCategory::Patient => 1,
            EquationCategory::Deficit => 2,
            EquationCategory::Bolus => 3,
            EquationCategory::Maintenance => 4,
            EquationCategory::FluidRates => 5,
            EquationCategory::Insulin => 6,
        }
    }
}

// ============================================================================
// Variable Definition
// ============================================================================

/// Definition of a variable used in an equation.
#[derive(Debug, Clone)]
pub struct Variable {
    pub symbol: &'static str,
    pub description: &'static str,
    pub units: &'static str,
}

impl Variable {
    pub const fn new(symbol: &'static str, description: &'static str, units: &'static str) -> Self {
        Self { symbol, description, units }
    }
}

// ============================================================================
// Equation Metadata
// ============================================================================

/// Complete metadata for a formula.
#[derive(Debug, Clone)]
pub struct EquationMetadata {
    /// Human-readable name
    pub name: &'static str,
    /// What the equation calculates
    pub description: &'static str,
    /// The formula in plain text
    pub formula_plain: &'static str,
    pub reference: ClinicalReference,
    pub variables: Vec<Variable>,
    /// Assumptions or limits
    pub assumptions: Vec<&'static str>,
    pub category: EquationCategory,
    /// Source module where the equation implementation lives
    pub source_module: &'static str,
    /// Function implementing the equation
    pub source_function: &'static str,
}

// ============================================================================
// Equation Enum
// ============================================================================

/// All formulas used by the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Equation {
    /// age = round(days / 365.25)
    AgeToNearestYear,
    /// w = (age + 4) × 2, max 75 kg
    AplsWeight,
    /// Severity from pH, or bicarbonate when worse
    SeverityGrading,
    /// Deficit % from severity
    DeficitPercentage,
    /// V_d = p × w × 10
    DeficitVolume,
    /// V_b = w × 10 mL/kg
    BolusVolume,
    /// V_d - V_b
    DeficitLessBolus,
    /// V_d / 48
    DeficitRate,
    /// Holliday-Segar daily volume
    HollidaySegarVolume,
    /// V_m / 24
    MaintenanceRate,
    /// maintenance rate + deficit rate
    StartingFluidRate,
    /// 2V_m + V_d (- V_b if shocked)
    FortyEightHourTotal,
    /// w × dose
    InsulinRate,
}

impl Equation {
    /// Get the full metadata for this equation
    pub fn metadata(&self) -> EquationMetadata {
        match self {
            Equation::AgeToNearestYear => EquationMetadata {
                name: "Age to Nearest Year",
                description: "Whole-year age from date of birth and date of observation",
                formula_plain: "age = round((observation date - birth date) / 365.25)",
                reference: ClinicalReference::Arithmetic,
                variables: vec![
                    Variable::new("days", "Days between birth and observation", "days"),
                    Variable::new("age", "Age", "years"),
                ],
                assumptions: vec![
                    "Observation date is on or after birth date",
                    "Ties round to even",
                ],
                category: EquationCategory::Patient,
                source_module: "calculations/age.rs",
                source_function: "age_in_years",
            },

            Equation::AplsWeight => EquationMetadata {
                name: "Estimated Weight (APLS)",
                description: "Weight estimate used when no measured weight is available",
                formula_plain: "w = (age + 4) x 2, max 75kg",
                reference: ClinicalReference::Apls,
                variables: vec![
                    Variable::new("age", "Age", "years"),
                    Variable::new("w", "Estimated weight", "kg"),
                ],
                assumptions: vec![
                    "Placeholder until the BSPED age/sex lookup table is available",
                    "Sex does not change the estimate",
                ],
                category: EquationCategory::Patient,
                source_module: "equations/patient.rs",
                source_function: "apls_weight",
            },

            Equation::SeverityGrading => EquationMetadata {
                name: "DKA Severity",
                description: "Severity grade from pH, replaced by the bicarbonate grade only \
                              when that is more severe",
                formula_plain: "pH >= 7.2 mild, 7.1 <= pH < 7.2 moderate, pH < 7.1 severe; \
                                bicarbonate < 10 moderate, < 5 severe",
                reference: ClinicalReference::Bsped {
                    year: 2021,
                    section: "Assessment of severity",
                },
                variables: vec![
                    Variable::new("pH", "Venous blood pH", "-"),
                    Variable::new("HCO3", "Bicarbonate", "mmol/L"),
                ],
                assumptions: vec!["Bicarbonate is only used when supplied"],
                category: EquationCategory::Deficit,
                source_module: "calculations/deficit.rs",
                source_function: "Severity::grade",
            },

            Equation::DeficitPercentage => EquationMetadata {
                name: "Deficit Percentage",
                description: "Assumed percentage dehydration for the severity grade",
                formula_plain: "three-tier: mild 5%, moderate 7%, severe 10%; \
                                two-tier: mild 0%, moderate 5%, severe 10%",
                reference: ClinicalReference::Bsped { year: 2021, section: "Fluid deficit" },
                variables: vec![Variable::new("p", "Deficit percentage", "%")],
                assumptions: vec!["Policy selected explicitly in protocol settings"],
                category: EquationCategory::Deficit,
                source_module: "calculations/deficit.rs",
                source_function: "DeficitPolicy::percentage",
            },

            Equation::DeficitVolume => EquationMetadata {
                name: "Deficit Volume",
                description: "Fluid deficit volume from percentage dehydration and weight",
                formula_plain: "V_d = p x w x 10",
                reference: ClinicalReference::Bsped { year: 2021, section: "Fluid deficit" },
                variables: vec![
                    Variable::new("p", "Deficit percentage", "%"),
                    Variable::new("w", "Body weight (uncapped)", "kg"),
                    Variable::new("V_d", "Deficit volume", "mL"),
                ],
                assumptions: vec!["Weight is not capped for the deficit"],
                category: EquationCategory::Deficit,
                source_module: "equations/fluid.rs",
                source_function: "deficit_volume",
            },

            Equation::BolusVolume => EquationMetadata {
                name: "Bolus Volume",
                description: "Crystalloid bolus for the patient's weight",
                formula_plain: "V_b = w x 10mL/kg",
                reference: ClinicalReference::Bsped { year: 2021, section: "Resuscitation" },
                variables: vec![
                    Variable::new("w", "Body weight", "kg"),
                    Variable::new("V_b", "Bolus volume", "mL"),
                ],
                assumptions: vec!["10 mL/kg unless configured otherwise"],
                category: EquationCategory::Bolus,
                source_module: "equations/fluid.rs",
                source_function: "bolus_volume",
            },

            Equation::DeficitLessBolus => EquationMetadata {
                name: "Deficit Less Bolus",
                description: "Deficit volume after the bolus allowance is removed",
                formula_plain: "V_d' = max(V_d - V_b, 0)",
                reference: ClinicalReference::Bsped { year: 2021, section: "Fluid deficit" },
                variables: vec![
                    Variable::new("V_d", "Deficit volume", "mL"),
                    Variable::new("V_b", "Bolus volume", "mL"),
                ],
                assumptions: vec!["Applied according to the bolus subtraction policy"],
                category: EquationCategory::Bolus,
                source_module: "equations/fluid.rs",
                source_function: "deficit_less_bolus",
            },

            Equation::DeficitRate => EquationMetadata {
                name: "Deficit Replacement Rate",
                description: "Hourly rate replacing the deficit over 48 hours",
                formula_plain: "R_d = V_d' / 48",
                reference: ClinicalReference::Bsped { year: 2021, section: "Fluid deficit" },
                variables: vec![
                    Variable::new("V_d'", "Deficit volume after any bolus adjustment", "mL"),
                    Variable::new("R_d", "Deficit rate", "mL/hour"),
                ],
                assumptions: vec!["Deficit replaced evenly over 48 hours"],
                category: EquationCategory::FluidRates,
                source_module: "equations/fluid.rs",
                source_function: "rate_over",
            },

            Equation::HollidaySegarVolume => EquationMetadata {
                name: "Daily Maintenance Volume",
                description: "Holliday-Segar maintenance volume per 24 hours",
                formula_plain: "V_m = 100w (w <= 10); 1000 + 50(w - 10) (10 < w <= 20); \
                                1500 + 20(w - 20) (w > 20)",
                reference: ClinicalReference::HollidaySegar,
                variables: vec![
                    Variable::new("w", "Body weight, capped at 75kg", "kg"),
                    Variable::new("V_m", "Daily maintenance volume", "mL"),
                ],
                assumptions: vec!["Weight capped at 75kg (maximum 2600mL)"],
                category: EquationCategory::Maintenance,
                source_module: "equations/fluid.rs",
                source_function: "holliday_segar_volume",
            },

            Equation::MaintenanceRate => EquationMetadata {
                name: "Maintenance Rate",
                description: "Hourly maintenance rate",
                formula_plain: "R_m = V_m / 24",
                reference: ClinicalReference::Arithmetic,
                variables: vec![
                    Variable::new("V_m", "Daily maintenance volume", "mL"),
                    Variable::new("R_m", "Maintenance rate", "mL/hour"),
                ],
                assumptions: vec![],
                category: EquationCategory::FluidRates,
                source_module: "equations/fluid.rs",
                source_function: "rate_over",
            },

            Equation::StartingFluidRate => EquationMetadata {
                name: "Starting Fluid Rate",
                description: "Total hourly fluid rate at the start of treatment",
                formula_plain: "R = R_d + R_m",
                reference: ClinicalReference::Bsped { year: 2021, section: "Fluid management" },
                variables: vec![
                    Variable::new("R_d", "Deficit rate", "mL/hour"),
                    Variable::new("R_m", "Maintenance rate", "mL/hour"),
                ],
                assumptions: vec![],
                category: EquationCategory::FluidRates,
                source_module: "calculations/dka.rs",
                source_function: "calculate_with",
            },

            Equation::FortyEightHourTotal => EquationMetadata {
                name: "48 Hour Fluid Total",
                description: "Total fluid replacement over the first 48 hours",
                formula_plain: "V_48 = 2V_m + V_d - V_b (V_b only when shocked)",
                reference: ClinicalReference::Bsped { year: 2021, section: "Fluid management" },
                variables: vec![
                    Variable::new("V_m", "Daily maintenance volume", "mL"),
                    Variable::new("V_d", "Deficit volume", "mL"),
                    Variable::new("V_b", "Bolus volume", "mL"),
                ],
                assumptions: vec!["Shock boluses count towards the 48 hour total"],
                category: EquationCategory::FluidRates,
                source_module: "equations/fluid.rs",
                source_function: "forty_eight_hour_total",
            },

            Equation::InsulinRate => EquationMetadata {
                name: "Insulin Infusion Rate",
                description: "Insulin infusion rate for the requested dose",
                formula_plain: "rate = w x dose",
                reference: ClinicalReference::Bsped { year: 2021, section: "Insulin therapy" },
                variables: vec![
                    Variable::new("w", "Body weight", "kg"),
                    Variable::new("dose", "Insulin dose", "units/kg/hour"),
                ],
                assumptions: vec!["1 unit in 1mL, so units/hour equals mL/hour"],
                category: EquationCategory::Insulin,
                source_module: "equations/patient.rs",
                source_function: "insulin_rate",
            },
        }
    }

    /// Get all equations in a given category
    pub fn in_category(category: EquationCategory) -> Vec<Equation> {
        ALL_EQUATIONS
            .iter()
            .filter(|eq| eq.metadata().category == category)
            .copied()
            .collect()
    }

    /// All categories in reference order
    pub fn all_categories() -> Vec<EquationCategory> {
        use EquationCategory::*;
        let mut cats = vec![Patient, Maintenance, Deficit, Bolus, FluidRates, Insulin];
        cats.sort_by_key(|c| c.sort_order());
        cats
    }
}

/// All equations in the registry (for iteration)
pub static ALL_EQUATIONS: &[Equation] = &[
    Equation::AgeToNearestYear,
    Equation::AplsWeight,
    Equation::SeverityGrading,
    Equation::DeficitPercentage,
    Equation::DeficitVolume,
    Equation::BolusVolume,
    Equation::DeficitLessBolus,
    Equation::DeficitRate,
    Equation::HollidaySegarVolume,
    Equation::MaintenanceRate,
    Equation::StartingFluidRate,
    Equation::FortyEightHourTotal,
    Equation::InsulinRate,
];

// ============================================================================
// Equation Usage Tracking
// ============================================================================

/// Record of an equation being used in a calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquationUsage {
    pub equation: Equation,
    /// Where/why it was used (e.g., "Deficit replacement rate")
    pub context: String,
}

impl EquationUsage {
    pub fn new(equation: Equation, context: impl Into<String>) -> Self {
        Self {
            equation,
            context: context.into(),
        }
    }
}

/// Collector for equation usage during a calculation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EquationTracker {
    usages: Vec<EquationUsage>,
}

impl EquationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that an equation was used
    pub fn record(&mut self, equation: Equation, context: impl Into<String>) {
        self.usages.push(EquationUsage::new(equation, context));
    }

    pub fn usages(&self) -> &[EquationUsage] {
        &self.usages
    }

    /// Unique equations used, in first-use order
    pub fn unique_equations(&self) -> Vec<Equation> {
        let mut seen = HashSet::new();
        self.usages
            .iter()
            .filter(|u| seen.insert(u.equation))
            .map(|u| u.equation)
            .collect()
    }

    /// Group unique equations by category
    pub fn by_category(&self) -> Vec<(EquationCategory, Vec<Equation>)> {
        let mut by_cat: HashMap<EquationCategory, Vec<Equation>> = HashMap::new();
        for eq in self.unique_equations() {
            by_cat.entry(eq.metadata().category).or_default().push(eq);
        }

        let mut result: Vec<_> = by_cat.into_iter().collect();
        result.sort_by_key(|(cat, _)| cat.sort_order());
        result
    }
}

// ============================================================================
// Markdown Reference
// ============================================================================

/// Generate the equations reference (EQUATIONS.md).
///
/// ```rust
/// use dka_core::equations::registry::generate_equations_markdown;
///
/// let markdown = generate_equations_markdown();
/// assert!(markdown.contains("DKA Calculator Equations Reference"));
/// assert!(markdown.contains("Maintenance Fluid"));
/// ```
pub fn generate_equations_markdown() -> String {
    let mut output = String::with_capacity(8_000);

    output.push_str(
        r#"# DKA Calculator Equations Reference

> **Auto-generated from source code. Do not edit manually.**
>
> Regenerate with: `cargo run --bin gen-equations`

Every formula used to derive fluid and insulin rates, with its clinical
reference, implementation and assumptions.

---

"#,
    );

    let categories = Equation::all_categories();

    for category in &categories {
        let equations = Equation::in_category(*category);
        if equations.is_empty() {
            continue;
        }

        output.push_str(&format!("## {}\n\n", category.display_name()));

        for equation in equations {
            let meta = equation.metadata();

            output.push_str(&format!("### {}\n\n", meta.name));
            output.push_str(&format!("{}\n\n", meta.description));
            output.push_str(&format!("**Formula:** `{}`\n\n", meta.formula_plain));

            if !meta.variables.is_empty() {
                output.push_str("**Variables:**\n\n");
                output.push_str("| Symbol | Description | Units |\n");
                output.push_str("|--------|-------------|-------|\n");
                for var in &meta.variables {
                    output.push_str(&format!(
                        "| {} | {} | {} |\n",
                        var.symbol, var.description, var.units
                    ));
                }
                output.push('\n');
            }

            output.push_str(&format!("**Reference:** {}\n\n", meta.reference.citation()));
            output.push_str(&format!(
                "**Source:** [`{}`]({})\n\n",
                meta.source_function, meta.source_module
            ));

            if !meta.assumptions.is_empty() {
                output.push_str("**Assumptions:**\n");
                for assumption in &meta.assumptions {
                    output.push_str(&format!("- {}\n", assumption));
                }
                output.push('\n');
            }

            output.push_str("---\n\n");
        }
    }

    output.push_str(&format!(
        "## Statistics\n\n- **Total Equations:** {}\n- **Categories:** {}\n",
        ALL_EQUATIONS.len(),
        categories.len()
    ));

    output
}
