//! Value trend computation and classification.

use serde::Serialize;
use std::fmt;

use crate::errors::{EngineError, EngineResult};

/// History length at which the trend switches to comparing 3-point means.
const SMOOTHED_WINDOW_MIN: usize = 7;
const SMOOTHED_SPAN: usize = 3;
const MIN_TREND_POINTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendClass {
    RisingFast,
    Rising,
    Stable,
    Falling,
    FallingFast,
    InsufficientData,
}

impl fmt::Display for TrendClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RisingFast => "rising_fast",
            Self::Rising => "rising",
            Self::Stable => "stable",
            Self::Falling => "falling",
            Self::FallingFast => "falling_fast",
            Self::InsufficientData => "insufficient_data",
        };
        f.write_str(s)
    }
}

/// Classify a trend percentage.
pub fn classify_trend(percent: f64) -> TrendClass {
    if percent > 5.0 {
        TrendClass::RisingFast
    } else if percent > 2.0 {
        TrendClass::Rising
    } else if percent < -5.0 {
        TrendClass::FallingFast
    } else if percent < -2.0 {
        TrendClass::Falling
    } else {
        TrendClass::Stable
    }
}

/// Percentage change in value score over a history ordered newest first.
///
/// With 7 or more points the newest 3 are averaged against the oldest 3;
/// otherwise the newest point is compared against the oldest. A
/// non-positive baseline yields 0.
pub fn value_trend(values_newest_first: &[f64]) -> EngineResult<f64> {
    let n = values_newest_first.len();
    if n < MIN_TREND_POINTS {
        return Err(EngineError::insufficient(MIN_TREND_POINTS, n));
    }

    let (recent, older) = if n >= SMOOTHED_WINDOW_MIN {
        (
            mean(&values_newest_first[..SMOOTHED_SPAN]),
            mean(&values_newest_first[n - SMOOTHED_SPAN..]),
        )
    } else {
        (values_newest_first[0], values_newest_first[n - 1])
    };

    if older <= 0.0 {
        return Ok(0.0);
    }
    Ok((recent - older) / older * 100.0)
}

/// A trend percentage with its class. `percent` is `None` only when the
/// history was too short.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendReading {
    pub percent: Option<f64>,
    pub class: TrendClass,
}

impl TrendReading {
    pub fn from_history(values_newest_first: &[f64]) -> Self {
        match value_trend(values_newest_first) {
            Ok(p) => Self {
                percent: Some(p),
                class: classify_trend(p),
            },
            Err(_) => Self::insufficient(),
        }
    }

    pub fn insufficient() -> Self {
        Self {
            percent: None,
            class: TrendClass::InsufficientData,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        self.percent.is_none()
    }

    /// The percentage, with 0 standing in for missing history.
    pub fn percent_or_zero(&self) -> f64 {
        self.percent.unwrap_or(0.0)
    }
}

// =============================================================================
// Shared statistics
// =============================================================================

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n).
pub(crate) fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_history_compares_endpoints() {
        // (55 - 50) / 50 * 100 = 10
        let t = value_trend(&[55.0, 52.0, 50.0]).unwrap();
        assert!((t - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_long_history_compares_three_point_means() {
        // newest 3: 60, 62, 58 -> 60; oldest 3: 48, 50, 52 -> 50
        // (60 - 50) / 50 * 100 = 20
        let t = value_trend(&[60.0, 62.0, 58.0, 55.0, 48.0, 50.0, 52.0]).unwrap();
        assert!((t - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_baseline_is_flat() {
        assert_eq!(value_trend(&[10.0, 0.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_single_point_is_insufficient() {
        assert_eq!(
            value_trend(&[50.0]),
            Err(EngineError::InsufficientData {
                required: 2,
                available: 1
            })
        );
        let reading = TrendReading::from_history(&[]);
        assert!(reading.is_insufficient());
        assert_eq!(reading.class, TrendClass::InsufficientData);
        assert_eq!(reading.percent_or_zero(), 0.0);
    }

    #[test]
    fn test_classification_bands() {
        assert_eq!(classify_trend(5.1), TrendClass::RisingFast);
        assert_eq!(classify_trend(5.0), TrendClass::Rising);
        assert_eq!(classify_trend(2.0), TrendClass::Stable);
        assert_eq!(classify_trend(-2.0), TrendClass::Stable);
        assert_eq!(classify_trend(-2.5), TrendClass::Falling);
        assert_eq!(classify_trend(-5.5), TrendClass::FallingFast);
    }

    #[test]
    fn test_population_std() {
        // mean 30; squared deviations 0,4,4,1,1 -> var 2 -> std 1.414
        let s = population_std(&[30.0, 32.0, 28.0, 31.0, 29.0]);
        assert!((s - 2.0f64.sqrt()).abs() < 1e-9);
        assert_eq!(round_to(1.2345, 2), 1.23);
    }
}
