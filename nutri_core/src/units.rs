//! Height and weight unit conversion.
//!
//! All calculations run in centimeters and kilograms; imperial inputs are
//! converted here without rounding.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Centimeters per inch
pub const CM_PER_INCH: f64 = 2.54;

/// Kilograms per avoirdupois pound
pub const KG_PER_POUND: f64 = 0.45359237;

/// Unit a height value was entered in
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HeightUnit {
    Cm,
    In,
}

/// Unit a weight value was entered in
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    Kg,
    Lb,
}

/// Convert a height to centimeters
pub fn to_cm(value: f64, unit: HeightUnit) -> f64 {
    match unit {
        HeightUnit::Cm => value,
        HeightUnit::In => value * CM_PER_INCH,
    }
}

/// Convert a weight to kilograms
pub fn to_kg(value: f64, unit: WeightUnit) -> f64 {
    match unit {
        WeightUnit::Kg => value,
        WeightUnit::Lb => value * KG_PER_POUND,
    }
}

impl HeightUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeightUnit::Cm => "cm",
            HeightUnit::In => "in",
        }
    }
}

impl WeightUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::Lb => "lb",
        }
    }
}

impl FromStr for HeightUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cm" => Ok(HeightUnit::Cm),
            "in" => Ok(HeightUnit::In),
            other => Err(Error::InvalidInput(format!(
                "height unit must be 'cm' or 'in', got '{}'",
                other
            ))),
        }
    }
}

impl FromStr for WeightUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "kg" => Ok(WeightUnit::Kg),
            "lb" => Ok(WeightUnit::Lb),
            other => Err(Error::InvalidInput(format!(
                "weight unit must be 'kg' or 'lb', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for HeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_is_identity() {
        assert_eq!(to_cm(170.0, HeightUnit::Cm), 170.0);
        assert_eq!(to_kg(70.0, WeightUnit::Kg), 70.0);
    }

    #[test]
    fn test_imperial_conversion() {
        assert!((to_cm(10.0, HeightUnit::In) - 25.4).abs() < 1e-9);
        assert!((to_kg(100.0, WeightUnit::Lb) - 45.359237).abs() < 1e-9);
    }

    #[test]
    fn test_parse_units() {
        assert_eq!("CM".parse::<HeightUnit>().unwrap(), HeightUnit::Cm);
        assert_eq!(" in ".parse::<HeightUnit>().unwrap(), HeightUnit::In);
        assert_eq!("lb".parse::<WeightUnit>().unwrap(), WeightUnit::Lb);
    }

    #[test]
    fn test_unknown_unit_is_invalid_input() {
        assert!(matches!(
            "ft".parse::<HeightUnit>(),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            "stone".parse::<WeightUnit>(),
            Err(Error::InvalidInput(_))
        ));
    }
}
