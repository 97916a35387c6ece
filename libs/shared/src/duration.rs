//! Parsing of `<value><unit>` duration strings into seconds.
//!
//! Supported default units:
//!
//! | unit | meaning |
//! |------|---------|
//! | `s`  | seconds |
//! | `m`  | minutes |
//! | `h`  | hours |
//! | `d`  | days (24 hours) |
//! | `M`  | calendar months, measured from `now` |
//!
//! ```rust,ignore
//! use stackit_shared::duration::DurationParser;
//!
//! let seconds = DurationParser::new().min_seconds(60).parse("2h")?;
//! assert_eq!(seconds, 7200);
//! ```

use chrono::{DateTime, Months, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors produced while converting a duration string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationError {
    #[error("invalid time string format {input:?}: {reason}")]
    InvalidFormat { input: String, reason: String },

    #[error("invalid time value {input:?}: {reason}")]
    InvalidValue { input: String, reason: String },

    #[error("invalid time unit {unit:?}, supported units are [{}]", .supported.join(" "))]
    InvalidUnit { unit: String, supported: Vec<String> },

    #[error("duration is below minimum: {value} seconds (minimum: {minimum} seconds)")]
    BelowMinimum { value: u64, minimum: u64 },

    #[error("duration exceeds maximum: {value} seconds (maximum: {maximum} seconds)")]
    AboveMaximum { value: u64, maximum: u64 },

    #[error("calculation result is out of bounds (value: {value}) during {operation}")]
    OutOfBounds { value: u64, operation: &'static str },

    #[error("calculated duration is negative: {0}")]
    NegativeResult(i64),

    #[error("duration multiplier is negative: {0}")]
    NegativeMultiplier(i64),
}

impl DurationError {
    fn invalid_format(input: &str, reason: &str) -> Self {
        Self::InvalidFormat {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    fn invalid_value(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// How a unit turns a numeric value into seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitConverter {
    /// Constant number of seconds per unit.
    Fixed(i64),
    /// Calendar months added to the reference time.
    Months,
}

impl UnitConverter {
    fn to_seconds(self, value: u64, now: DateTime<Utc>) -> Result<i64, DurationError> {
        match self {
            UnitConverter::Fixed(multiplier) if multiplier < 0 => {
                Err(DurationError::NegativeMultiplier(multiplier))
            }
            UnitConverter::Fixed(0) => Ok(0),
            UnitConverter::Fixed(multiplier) => i64::try_from(value)
                .ok()
                .and_then(|v| v.checked_mul(multiplier))
                .ok_or(DurationError::OutOfBounds {
                    value,
                    operation: "multiplication",
                }),
            UnitConverter::Months => {
                let out_of_bounds = DurationError::OutOfBounds {
                    value,
                    operation: "month calculation",
                };
                let months = u32::try_from(value).map_err(|_| out_of_bounds.clone())?;
                let future = now
                    .checked_add_months(Months::new(months))
                    .ok_or(out_of_bounds)?;
                Ok((future - now).num_seconds())
            }
        }
    }
}

fn default_units() -> BTreeMap<String, UnitConverter> {
    BTreeMap::from([
        ("s".to_string(), UnitConverter::Fixed(1)),
        ("m".to_string(), UnitConverter::Fixed(60)),
        ("h".to_string(), UnitConverter::Fixed(60 * 60)),
        ("d".to_string(), UnitConverter::Fixed(24 * 60 * 60)),
        ("M".to_string(), UnitConverter::Months),
    ])
}

/// Configurable duration converter.
#[derive(Debug, Clone)]
pub struct DurationParser {
    units: BTreeMap<String, UnitConverter>,
    min_seconds: Option<u64>,
    max_seconds: Option<u64>,
    now: Option<DateTime<Utc>>,
}

impl Default for DurationParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DurationParser {
    pub fn new() -> Self {
        Self {
            units: default_units(),
            min_seconds: None,
            max_seconds: None,
            now: None,
        }
    }

    /// Replace the unit table. Allows multi-character units.
    pub fn with_units(mut self, units: BTreeMap<String, UnitConverter>) -> Self {
        self.units = units;
        self
    }

    pub fn min_seconds(mut self, min: u64) -> Self {
        self.min_seconds = Some(min);
        self
    }

    /// A maximum of 0 removes the limit.
    pub fn max_seconds(mut self, max: u64) -> Self {
        self.max_seconds = (max != 0).then_some(max);
        self
    }

    /// Fix the reference time used by calendar units.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn parse(&self, input: &str) -> Result<u64, DurationError> {
        let input = input.trim();
        let (value_str, unit) = split_value_and_unit(input)?;

        if value_str.len() > 1 && value_str.starts_with('0') {
            return Err(DurationError::invalid_format(
                input,
                "leading zeros are not allowed",
            ));
        }

        let value: u64 = value_str
            .parse()
            .map_err(|e: std::num::ParseIntError| DurationError::invalid_value(value_str, e.to_string()))?;
        if value == 0 {
            return Err(DurationError::invalid_value("0", "a value of 0 is not allowed"));
        }

        let converter = self
            .units
            .get(unit)
            .ok_or_else(|| DurationError::InvalidUnit {
                unit: unit.to_string(),
                supported: self.units.keys().cloned().collect(),
            })?;

        let now = self.now.unwrap_or_else(Utc::now);
        let total = converter.to_seconds(value, now)?;
        if total < 0 {
            return Err(DurationError::NegativeResult(total));
        }
        let seconds = total.unsigned_abs();

        if let Some(minimum) = self.min_seconds
            && seconds < minimum
        {
            return Err(DurationError::BelowMinimum {
                value: seconds,
                minimum,
            });
        }
        if let Some(maximum) = self.max_seconds
            && seconds > maximum
        {
            return Err(DurationError::AboveMaximum {
                value: seconds,
                maximum,
            });
        }

        Ok(seconds)
    }
}

/// Convert with the default units and no bounds.
pub fn convert_to_seconds(input: &str) -> Result<u64, DurationError> {
    DurationParser::new().parse(input)
}

fn split_value_and_unit(input: &str) -> Result<(&str, &str), DurationError> {
    if input.is_empty() {
        return Err(DurationError::invalid_format(input, "input string is empty"));
    }

    let Some(split) = input.find(|c: char| !c.is_ascii_digit()) else {
        return Err(DurationError::invalid_format(
            input,
            "contains no unit, expected format <value><unit>",
        ));
    };

    let (value, unit) = input.split_at(split);
    if unit.starts_with('.') || unit.starts_with(',') {
        return Err(DurationError::invalid_value(
            input,
            "floating-point values are not supported",
        ));
    }
    if value.is_empty() {
        return Err(DurationError::invalid_format(
            input,
            "must start with a number, expected format <value><unit>",
        ));
    }

    Ok((value, unit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    #[test_case("1s", 1)]
    #[test_case("30m", 1800)]
    #[test_case("2h", 7200)]
    #[test_case("7d", 604_800)]
    #[test_case("  45s  ", 45; "surrounding whitespace")]
    #[test_case("1000000d", 86_400_000_000; "large day count")]
    fn test_fixed_units(input: &str, expected: u64) {
        assert_eq!(convert_to_seconds(input).unwrap(), expected);
    }

    #[test]
    fn test_fixed_units_scale_linearly() {
        let parser = DurationParser::new();
        for (unit, multiplier) in [("s", 1u64), ("m", 60), ("h", 3600), ("d", 86_400)] {
            for n in [1u64, 2, 59, 999, 123_456, 1_000_000] {
                assert_eq!(
                    parser.parse(&format!("{n}{unit}")).unwrap(),
                    n * multiplier,
                    "{n}{unit}"
                );
            }
        }
    }

    #[test]
    fn test_months_are_calendar_aware() {
        let jan = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let parser = DurationParser::new().with_now(jan);
        assert_eq!(parser.parse("1M").unwrap(), 31 * 86_400);

        let feb = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let parser = DurationParser::new().with_now(feb);
        assert_eq!(parser.parse("1M").unwrap(), 28 * 86_400);
        assert_eq!(parser.parse("2M").unwrap(), (28 + 31) * 86_400);
    }

    #[test_case("01s"; "leading zero")]
    #[test_case("-1s"; "negative")]
    #[test_case("ms"; "no number")]
    #[test_case("30"; "no unit")]
    #[test_case(""; "empty")]
    #[test_case("   "; "blank")]
    fn test_invalid_format(input: &str) {
        assert!(matches!(
            convert_to_seconds(input),
            Err(DurationError::InvalidFormat { .. })
        ));
    }

    #[test_case("1.5h"; "decimal point")]
    #[test_case("1,5h"; "decimal comma")]
    #[test_case("0s"; "zero")]
    #[test_case("99999999999999999999s"; "overflowing u64")]
    fn test_invalid_value(input: &str) {
        assert!(matches!(
            convert_to_seconds(input),
            Err(DurationError::InvalidValue { .. })
        ));
    }

    #[test_case("1y")]
    #[test_case("1ms")]
    #[test_case("1H")]
    fn test_invalid_unit(input: &str) {
        assert!(matches!(
            convert_to_seconds(input),
            Err(DurationError::InvalidUnit { .. })
        ));
    }

    #[test]
    fn test_invalid_unit_lists_supported_units() {
        let err = convert_to_seconds("1y").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid time unit \"y\", supported units are [M d h m s]"
        );
    }

    #[test]
    fn test_below_minimum_message() {
        let err = DurationParser::new().min_seconds(60).parse("30s").unwrap_err();
        assert_eq!(
            err,
            DurationError::BelowMinimum {
                value: 30,
                minimum: 60
            }
        );
        assert_eq!(
            err.to_string(),
            "duration is below minimum: 30 seconds (minimum: 60 seconds)"
        );
    }

    #[test]
    fn test_above_maximum() {
        let parser = DurationParser::new().max_seconds(3600);
        assert_eq!(parser.parse("1h").unwrap(), 3600);
        assert_eq!(
            parser.parse("61m").unwrap_err(),
            DurationError::AboveMaximum {
                value: 3660,
                maximum: 3600
            }
        );
    }

    #[test]
    fn test_zero_maximum_means_unbounded() {
        let parser = DurationParser::new().max_seconds(10).max_seconds(0);
        assert_eq!(parser.parse("10d").unwrap(), 864_000);
    }

    #[test]
    fn test_custom_units() {
        let units = BTreeMap::from([
            ("min".to_string(), UnitConverter::Fixed(60)),
            ("neg".to_string(), UnitConverter::Fixed(-1)),
            ("big".to_string(), UnitConverter::Fixed(i64::MAX)),
        ]);
        let parser = DurationParser::new().with_units(units);
        assert_eq!(parser.parse("3min").unwrap(), 180);
        assert!(matches!(
            parser.parse("3s"),
            Err(DurationError::InvalidUnit { .. })
        ));
        assert_eq!(
            parser.parse("1neg").unwrap_err(),
            DurationError::NegativeMultiplier(-1)
        );
        assert!(matches!(
            parser.parse("2big"),
            Err(DurationError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_month_overflow_is_out_of_bounds() {
        assert!(matches!(
            convert_to_seconds("99999999999M"),
            Err(DurationError::OutOfBounds { .. })
        ));
    }
}
