//! # dka_core - Paediatric DKA Fluid and Insulin Calculation Engine
//!
//! `dka_core` computes fluid and insulin infusion recommendations for
//! children and young people with diabetic ketoacidosis. Every value comes
//! back with the arithmetic used to reach it and the generic formula, so a
//! prescriber can check each step.
//!
//! ## Design Philosophy
//!
//! - **Stateless**: Pure functions that take input and return results
//! - **JSON-First**: All types implement Serialize/Deserialize
//! - **Rich Errors**: Structured error types, not just strings
//! - **Explicit Protocol**: Disputed protocol choices are named settings
//!
//! ## Quick Start
//!
//! ```rust
//! use dka_core::{calculate, AgeSource, PatientInputs, ProtocolSettings};
//!
//! let inputs = PatientInputs {
//!     age: AgeSource::Years(7.0),
//!     sex: None,
//!     ph: Some(6.86),
//!     bicarbonate: None,
//!     weight_kg: Some(23.0),
//!     shocked: true,
//!     insulin_dose: None,
//! };
//!
//! let result = calculate(&inputs, &ProtocolSettings::default()).unwrap();
//! let presented = result.presented();
//! assert_eq!(presented.maintenance_rate.output, 65.0);
//! assert_eq!(presented.insulin_infusion_rate.output, 1.15);
//! ```
//!
//! ## Modules
//!
//! - [`calculations`] - Age, weight, maintenance, deficit, bolus, insulin and the full chain
//! - [`equations`] - Pure formulas and the equation registry
//! - [`settings`] - Protocol settings and the result label
//! - [`units`] - Type-safe unit wrappers
//! - [`errors`] - Structured error types
//! - [`file_io`] - Settings and input files

pub mod calculations;
pub mod equations;
pub mod errors;
pub mod file_io;
pub mod settings;
pub mod units;

// Re-export commonly used types at crate root for convenience
pub use calculations::dka::{calculate, calculate_with};
pub use calculations::{AgeSource, DerivedValue, DkaResult, PatientInputs, Sex, WeightSource};
pub use errors::{CalcError, CalcResult};
pub use file_io::{load_patient_inputs, load_settings, save_settings};
pub use settings::{CalculatorLabel, ProtocolSettings, ValidationProfile};
