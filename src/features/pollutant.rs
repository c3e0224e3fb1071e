//! Pollutant ratios and AQI bands.

use serde::{Deserialize, Serialize};

/// The six bands of the Indian national AQI scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AqiCategory {
    Good,
    Satisfactory,
    Moderate,
    Poor,
    VeryPoor,
    Severe,
}

impl AqiCategory {
    /// Band for an AQI value. Upper bounds are inclusive: 50 is `Good`,
    /// 51 is `Satisfactory`.
    pub fn from_aqi(aqi: f64) -> Option<Self> {
        Self::banded(aqi, [50.0, 100.0, 200.0, 300.0, 400.0])
    }

    /// Band for a PM2.5 concentration in µg/m³ (24-hour CPCB breakpoints).
    pub fn from_pm25(pm25: f64) -> Option<Self> {
        Self::banded(pm25, [30.0, 60.0, 90.0, 120.0, 250.0])
    }

    fn banded(value: f64, upper: [f64; 5]) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let band = upper.iter().take_while(|&&u| value > u).count();
        Some(match band {
            0 => AqiCategory::Good,
            1 => AqiCategory::Satisfactory,
            2 => AqiCategory::Moderate,
            3 => AqiCategory::Poor,
            4 => AqiCategory::VeryPoor,
            _ => AqiCategory::Severe,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AqiCategory::Good => "good",
            AqiCategory::Satisfactory => "satisfactory",
            AqiCategory::Moderate => "moderate",
            AqiCategory::Poor => "poor",
            AqiCategory::VeryPoor => "very_poor",
            AqiCategory::Severe => "severe",
        }
    }
}

impl std::fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `numerator / denominator`, null on a missing input or zero denominator.
pub fn safe_ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

/// PM2.5 + PM10.
pub fn total_pm(pm25: Option<f64>, pm10: Option<f64>) -> Option<f64> {
    Some(pm25? + pm10?)
}

/// Approximate NOx from NO2.
pub fn nox_indicator(no2: Option<f64>) -> Option<f64> {
    no2.map(|v| v * 1.5)
}
