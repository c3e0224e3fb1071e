//! Weather-derived features.

/// Apparent temperature in °C from air temperature (°C) and relative
/// humidity (%).
///
/// Uses the NWS procedure: Steadman's simple formula, and the Rothfusz
/// regression once that estimate reaches 80 °F.
pub fn heat_index(temperature_c: f64, humidity: f64) -> f64 {
    let t = temperature_c * 9.0 / 5.0 + 32.0;
    let rh = humidity;

    let simple = 0.5 * (t + 61.0 + (t - 68.0) * 1.2 + rh * 0.094);
    let hi_f = if (simple + t) / 2.0 < 80.0 {
        simple
    } else {
        let mut hi = -42.379 + 2.049_015_23 * t + 10.143_331_27 * rh
            - 0.224_755_41 * t * rh
            - 0.006_837_83 * t * t
            - 0.054_817_17 * rh * rh
            + 0.001_228_74 * t * t * rh
            + 0.000_852_82 * t * rh * rh
            - 0.000_001_99 * t * t * rh * rh;
        if rh < 13.0 && (80.0..=112.0).contains(&t) {
            hi -= (13.0 - rh) / 4.0 * ((17.0 - (t - 95.0).abs()) / 17.0).sqrt();
        } else if rh > 85.0 && (80.0..=87.0).contains(&t) {
            hi += (rh - 85.0) / 10.0 * (87.0 - t) / 5.0;
        }
        hi
    };

    (hi_f - 32.0) * 5.0 / 9.0
}

/// `cold` < 15 ≤ `moderate` < 25 ≤ `warm` < 35 ≤ `hot` (°C).
pub fn temperature_band(temperature_c: f64) -> &'static str {
    if temperature_c < 15.0 {
        "cold"
    } else if temperature_c < 25.0 {
        "moderate"
    } else if temperature_c < 35.0 {
        "warm"
    } else {
        "hot"
    }
}

/// `dry` < 30 ≤ `comfortable` < 60 ≤ `humid` (%).
pub fn humidity_band(humidity: f64) -> &'static str {
    if humidity < 30.0 {
        "dry"
    } else if humidity < 60.0 {
        "comfortable"
    } else {
        "humid"
    }
}

/// `calm` < 5 ≤ `light` < 15 ≤ `moderate` < 25 ≤ `strong`.
pub fn wind_band(speed: f64) -> &'static str {
    if speed < 5.0 {
        "calm"
    } else if speed < 15.0 {
        "light"
    } else if speed < 25.0 {
        "moderate"
    } else {
        "strong"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn heat_index_mild_is_close_to_air_temperature() {
        // 20 °C / 50 % stays on the simple formula and within a degree.
        let hi = heat_index(20.0, 50.0);
        assert!((hi - 20.0).abs() < 1.0, "got {}", hi);
    }

    #[test]
    fn heat_index_hot_humid_uses_regression() {
        // NWS table: 90 °F at 70 % RH reads 106 °F.
        let t_c = (90.0 - 32.0) * 5.0 / 9.0;
        let hi_f = heat_index(t_c, 70.0) * 9.0 / 5.0 + 32.0;
        assert_relative_eq!(hi_f, 106.0, epsilon = 1.0);
    }

    #[test]
    fn bands() {
        assert_eq!(temperature_band(14.9), "cold");
        assert_eq!(temperature_band(15.0), "moderate");
        assert_eq!(temperature_band(35.0), "hot");
        assert_eq!(humidity_band(30.0), "comfortable");
        assert_eq!(humidity_band(60.0), "humid");
        assert_eq!(wind_band(4.9), "calm");
        assert_eq!(wind_band(25.0), "strong");
    }
}
