//! # Protocol Settings
//!
//! Two parts of the protocol have drifted into incompatible variants: the
//! pH-to-deficit mapping and whether the 10 mL/kg bolus is subtracted for
//! shocked or for non-shocked patients. Both are named policies here and a
//! calculation only runs once each one is selected.
//!
//! `ProtocolSettings::default()` selects the canonical policies. A settings
//! file that leaves a policy out is rejected with
//! [`CalcError::ConfigurationAmbiguity`] instead of being filled in.
//!
//! ```rust
//! use dka_core::settings::{ProtocolSettings, ValidationProfile};
//!
//! let settings = ProtocolSettings::default();
//! let resolved = settings.resolve().unwrap();
//! assert_eq!(resolved.validation, ValidationProfile::Strict);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calculations::deficit::{BolusSubtraction, DeficitPolicy};
use crate::errors::{CalcError, CalcResult};

/// Current schema version for settings files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Calculator version reported in every result label
pub const CALCULATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol settings as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolSettings {
    /// Schema version (for migration compatibility)
    #[serde(default = "schema_version")]
    pub version: String,

    /// pH-to-deficit mapping; must be set explicitly
    #[serde(default)]
    pub deficit_policy: Option<DeficitPolicy>,

    /// Which patients have the bolus allowance subtracted; must be set explicitly
    #[serde(default)]
    pub bolus_subtraction: Option<BolusSubtraction>,

    /// Range checks applied to patient inputs
    #[serde(default)]
    pub validation: ValidationProfile,
}

fn schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        ProtocolSettings {
            version: schema_version(),
            deficit_policy: Some(DeficitPolicy::CANONICAL),
            bolus_subtraction: Some(BolusSubtraction::CANONICAL),
            validation: ValidationProfile::default(),
        }
    }
}

impl ProtocolSettings {
    /// Settings with no policy selected. Useful as a starting point for a
    /// settings file that must be completed by a clinician.
    pub fn unresolved() -> Self {
        ProtocolSettings {
            deficit_policy: None,
            bolus_subtraction: None,
            ..ProtocolSettings::default()
        }
    }

    pub fn with_deficit_policy(mut self, policy: DeficitPolicy) -> Self {
        self.deficit_policy = Some(policy);
        self
    }

    pub fn with_bolus_subtraction(mut self, policy: BolusSubtraction) -> Self {
        self.bolus_subtraction = Some(policy);
        self
    }

    pub fn with_validation(mut self, validation: ValidationProfile) -> Self {
        self.validation = validation;
        self
    }

    /// Check every policy is selected.
    pub fn resolve(&self) -> CalcResult<ResolvedSettings> {
        let deficit_policy = self.deficit_policy.ok_or_else(|| {
            CalcError::configuration_ambiguity(
                "deficit_policy",
                "Select ThreeTier (5/7/10%) or TwoTier (0/5/10%); \
                 the two mappings disagree for mild and moderate DKA",
            )
        })?;
        let bolus_subtraction = self.bolus_subtraction.ok_or_else(|| {
            CalcError::configuration_ambiguity(
                "bolus_subtraction",
                "Select NonShocked or Shocked; \
                 the protocol variants subtract the bolus for opposite patient groups",
            )
        })?;
        Ok(ResolvedSettings {
            deficit_policy,
            bolus_subtraction,
            validation: self.validation,
        })
    }
}

/// Settings with every policy selected, as used by a calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSettings {
    pub deficit_policy: DeficitPolicy,
    pub bolus_subtraction: BolusSubtraction,
    pub validation: ValidationProfile,
}

/// Input range checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValidationProfile {
    /// pH 6.2 to < 7.5, weight 0.5 to < 150 kg
    #[default]
    Strict,
    /// pH 6.0 to < 8.0, weight 0.5 to < 220 kg
    Permissive,
}

/// Accepted ranges for one validation profile. Lower bounds are inclusive,
/// upper bounds exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputLimits {
    pub ph_min: f64,
    pub ph_max: f64,
    pub weight_min_kg: f64,
    pub weight_max_kg: f64,
}

impl ValidationProfile {
    pub fn limits(&self) -> InputLimits {
        match self {
            ValidationProfile::Strict => InputLimits {
                ph_min: 6.2,
                ph_max: 7.5,
                weight_min_kg: 0.5,
                weight_max_kg: 150.0,
            },
            ValidationProfile::Permissive => InputLimits {
                ph_min: 6.0,
                ph_max: 8.0,
                weight_min_kg: 0.5,
                weight_max_kg: 220.0,
            },
        }
    }
}

/// Metadata attached to each result. Built per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculatorLabel {
    pub calculator_version: String,
    pub calculator_url: String,
    pub author: String,
    pub author_url: String,
    pub author_email: String,
    /// When this calculation was requested
    pub request_timestamp: DateTime<Utc>,
    /// Unique id for this calculation, for audit trails
    pub calculation_id: Uuid,
}

impl CalculatorLabel {
    /// Label for a new calculation. Each call takes the current time and a
    /// fresh v4 uuid, so no two results share a label.
    pub fn new() -> Self {
        CalculatorLabel {
            calculator_version: CALCULATOR_VERSION.to_string(),
            calculator_url: "https://api.dka-calculator.co.uk".to_string(),
            author: "Daniel Leach".to_string(),
            author_url: "https://danleach.uk".to_string(),
            author_email: "web@danleach.uk".to_string(),
            request_timestamp: Utc::now(),
            calculation_id: Uuid::new_v4(),
        }
    }
}

impl Default for CalculatorLabel {
    fn default() -> Self {
        CalculatorLabel::new()
    }
}
