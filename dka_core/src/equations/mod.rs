//! # DKA Equations
//!
//! Every formula the calculator applies lives here as a pure function, so
//! the arithmetic can be checked against the protocol in one place.
//!
//! ## Modules
//!
//! - [`fluid`] - Holliday-Segar maintenance, deficit, bolus and rate formulas
//! - [`patient`] - Age, weight estimate and insulin rate
//! - [`registry`] - Equation metadata, usage tracking and EQUATIONS.md generation
//!
//! ## References
//!
//! - Holliday MA, Segar WE. The maintenance need for water in parenteral
//!   fluid therapy. Pediatrics 1957
//! - BSPED Integrated Care Pathway for DKA in Children and Young People
//! - Advanced Paediatric Life Support

pub mod fluid;
pub mod patient;
pub mod registry;

pub use fluid::{
    bolus_volume,
    cap_maintenance_weight,
    deficit_less_bolus,
    deficit_volume,
    forty_eight_hour_total,
    holliday_segar_volume,
    maintenance_band,
    rate_over,
    MaintenanceBand,
    DEFICIT_REPLACEMENT_HOURS,
    MAINTENANCE_HOURS,
    MAINTENANCE_WEIGHT_CAP_KG,
    STANDARD_BOLUS_ML_PER_KG,
};

pub use patient::{apls_weight, decimal_age, insulin_rate, nearest_year};

pub use registry::{
    ClinicalReference,
    Equation,
    EquationCategory,
    EquationMetadata,
    EquationTracker,
    EquationUsage,
    Variable,
    ALL_EQUATIONS,
    generate_equations_markdown,
};
