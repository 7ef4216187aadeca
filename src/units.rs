//! Branded numeric types for the weather data model.
//!
//! Every quantity that crosses a module boundary is wrapped in a distinct
//! newtype with a validating constructor, so a stray `f64` can never be
//! passed where a `Celsius` or a `Probability` was expected. Construction
//! failures surface as [`WeatherError::InvalidInput`].

use serde::{Deserialize, Serialize};

use crate::error::WeatherError;

macro_rules! bounded_unit {
    ($name:ident, $lo:expr, $hi:expr, $label:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
        #[serde(try_from = "f64", into = "f64")]
        pub struct $name(f64);

        impl $name {
            pub fn new(value: f64) -> Result<Self, WeatherError> {
                if !value.is_finite() || value < $lo || value > $hi {
                    return Err(WeatherError::InvalidInput(format!(
                        "{} must be in [{}, {}], got {}",
                        $label, $lo, $hi, value
                    )));
                }
                Ok($name(value))
            }

            pub fn value(self) -> f64 {
                self.0
            }
        }

        impl TryFrom<f64> for $name {
            type Error = WeatherError;
            fn try_from(value: f64) -> Result<Self, Self::Error> {
                $name::new(value)
            }
        }

        impl From<$name> for f64 {
            fn from(value: $name) -> f64 {
                value.0
            }
        }
    };
}

bounded_unit!(Celsius, -100.0, 70.0, "temperature");
bounded_unit!(Millimeters, 0.0, f64::MAX, "precipitation amount");
bounded_unit!(MetersPerSecond, 0.0, f64::MAX, "wind speed");
bounded_unit!(DegreesCompass, 0.0, 360.0, "wind direction");
bounded_unit!(Percent, 0.0, 100.0, "percent quantity");
bounded_unit!(Hectopascals, 800.0, 1100.0, "pressure");
bounded_unit!(Meters, 0.0, f64::MAX, "visibility");
bounded_unit!(UvIndex, 0.0, f64::MAX, "UV index");
bounded_unit!(Probability, 0.0, 1.0, "probability");
bounded_unit!(Latitude, -90.0, 90.0, "latitude");
bounded_unit!(Longitude, -180.0, 180.0, "longitude");

/// WMO weather code (0-99), carrying severity ordering for plurality-vote
/// tie-breaks and display helpers shared with the CLI table renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct WmoCode(u16);

impl WmoCode {
    pub fn new(code: u16) -> Result<Self, WeatherError> {
        if code > 99 {
            return Err(WeatherError::InvalidInput(format!(
                "WMO weather code must be in [0, 99], got {code}"
            )));
        }
        Ok(WmoCode(code))
    }

    pub fn value(self) -> u16 {
        self.0
    }

    /// Severity score used to break plurality-vote ties (higher code wins)
    /// and to pick the "most significant" code in a group of readings.
    pub fn severity(self) -> u16 {
        match self.0 {
            95..=99 => 100,
            80..=86 => 80,
            71..=77 => 70,
            51..=67 => 60,
            45 | 48 => 50,
            3 => 30,
            2 => 20,
            1 => 10,
            _ => 0,
        }
    }

    pub fn is_severe(self) -> bool {
        self.0 >= 95
    }

    /// Coarse condition category used by the narrative's dominant-condition
    /// headline (§4.7: dry/rainy/snowy/mixed).
    pub fn category(self) -> WeatherCategory {
        match self.0 {
            0..=3 | 45 | 48 => WeatherCategory::Dry,
            51..=67 | 80..=82 => WeatherCategory::Rainy,
            71..=77 | 85 | 86 => WeatherCategory::Snowy,
            95..=99 => WeatherCategory::Mixed,
            _ => WeatherCategory::Dry,
        }
    }
}

impl TryFrom<u16> for WmoCode {
    type Error = WeatherError;
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        WmoCode::new(value)
    }
}

impl From<WmoCode> for u16 {
    fn from(value: WmoCode) -> u16 {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherCategory {
    Dry,
    Rainy,
    Snowy,
    Mixed,
}

impl WeatherCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            WeatherCategory::Dry => "dry",
            WeatherCategory::Rainy => "rainy",
            WeatherCategory::Snowy => "snowy",
            WeatherCategory::Mixed => "mixed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range() {
        assert!(Latitude::new(91.0).is_err());
        assert!(Longitude::new(-181.0).is_err());
        assert!(Probability::new(1.1).is_err());
        assert!(Percent::new(-1.0).is_err());
    }

    #[test]
    fn accepts_boundary_values() {
        assert!(Latitude::new(90.0).is_ok());
        assert!(Latitude::new(-90.0).is_ok());
        assert!(Probability::new(0.0).is_ok());
        assert!(Probability::new(1.0).is_ok());
    }

    #[test]
    fn wmo_severity_orders_thunderstorm_highest() {
        let clear = WmoCode::new(0).unwrap();
        let storm = WmoCode::new(95).unwrap();
        assert!(storm.severity() > clear.severity());
    }

    #[test]
    fn wmo_category_matches_table() {
        assert_eq!(WmoCode::new(0).unwrap().category().as_str(), "dry");
        assert_eq!(WmoCode::new(61).unwrap().category().as_str(), "rainy");
        assert_eq!(WmoCode::new(71).unwrap().category().as_str(), "snowy");
        assert_eq!(WmoCode::new(95).unwrap().category().as_str(), "mixed");
    }
}
