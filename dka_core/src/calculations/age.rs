//! # Age Calculation
//!
//! Whole-year age from the date of birth and the date treatment started.
//! Only day granularity is used.
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use dka_core::calculations::age::{calculate, AgeInput};
//!
//! let input = AgeInput {
//!     birth_date: NaiveDate::from_ymd_opt(2015, 4, 12).unwrap(),
//!     observation_date: NaiveDate::from_ymd_opt(2022, 2, 6).unwrap(),
//! };
//! let result = calculate(&input).unwrap();
//! assert_eq!(result.days, 2492);
//! assert_eq!(result.age_years, 7);
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::equations::{decimal_age, nearest_year};
use crate::errors::{CalcError, CalcResult};

/// Input dates.
///
/// ## JSON Example
///
/// ```json
/// { "birth_date": "2015-04-12", "observation_date": "2022-02-06" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeInput {
    pub birth_date: NaiveDate,
    /// Date the DKA protocol was started
    pub observation_date: NaiveDate,
}

/// Age derived from dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgeResult {
    /// Days from birth to observation
    pub days: i64,
    /// Days / 365.25
    pub decimal_age_years: f64,
    /// Decimal age rounded to the nearest year
    pub age_years: u32,
    pub working: String,
}

/// Age in whole years, rounded to the nearest year.
///
/// Fails with `InvalidDateRange` when the observation date is before the
/// birth date.
pub fn age_in_years(birth_date: NaiveDate, observation_date: NaiveDate) -> CalcResult<u32> {
    calculate(&AgeInput {
        birth_date,
        observation_date,
    })
    .map(|r| r.age_years)
}

pub fn calculate(input: &AgeInput) -> CalcResult<AgeResult> {
    let days = (input.observation_date - input.birth_date).num_days();
    if days < 0 {
        return Err(CalcError::invalid_date_range(
            input.birth_date.to_string(),
            input.observation_date.to_string(),
        ));
    }

    let decimal = decimal_age(days);
    let age_years = nearest_year(decimal) as u32;

    Ok(AgeResult {
        days,
        decimal_age_years: decimal,
        age_years,
        working: format!(
            "[{} - {}] = {} days ÷ 365.25 = {:.2} years ==> {} years",
            input.observation_date, input.birth_date, days, decimal, age_years
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_reference_example() {
        let result = calculate(&AgeInput {
            birth_date: date(2015, 4, 12),
            observation_date: date(2022, 2, 6),
        })
        .unwrap();
        assert_eq!(result.days, 2492);
        assert!((result.decimal_age_years - 6.82).abs() < 0.01);
        assert_eq!(result.age_years, 7);
        assert!(result.working.contains("2492 days"));
    }

    #[test]
    fn test_same_day_is_zero() {
        assert_eq!(age_in_years(date(2020, 1, 1), date(2020, 1, 1)).unwrap(), 0);
    }

    #[test]
    fn test_half_year_boundary() {
        // 182 days = 0.498 years, 183 days = 0.501 years
        assert_eq!(age_in_years(date(2015, 4, 12), date(2015, 10, 11)).unwrap(), 0);
        assert_eq!(age_in_years(date(2015, 4, 12), date(2015, 10, 12)).unwrap(), 1);
    }

    #[test]
    fn test_observation_before_birth_rejected() {
        let err = age_in_years(date(2020, 1, 2), date(2020, 1, 1)).unwrap_err();
        assert_eq!(
            err,
            CalcError::InvalidDateRange {
                birth_date: "2020-01-02".to_string(),
                observation_date: "2020-01-01".to_string(),
            }
        );
    }

    #[test]
    fn test_input_deserializes_iso_dates() {
        let json = r#"{ "birth_date": "2015-04-12", "observation_date": "2022-02-06" }"#;
        let input: AgeInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.birth_date, date(2015, 4, 12));
    }
}
