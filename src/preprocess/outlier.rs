//! Outlier detection and handling for predictor columns.
//!
//! Bounds are computed per column from the non-null values. The target
//! column is never touched.

use crate::core::{Measurement, ObservationTable};
use crate::error::Result;
use crate::utils::stats;
use serde::{Deserialize, Serialize};

/// Rule used to derive per-column bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum OutlierRule {
    /// `[Q1 - m*IQR, Q3 + m*IQR]`.
    Iqr { multiplier: f64 },
    /// `mean ± threshold * std`, i.e. flag `|z| > threshold`.
    ZScore { threshold: f64 },
}

impl Default for OutlierRule {
    fn default() -> Self {
        OutlierRule::Iqr { multiplier: 1.5 }
    }
}

/// What to do with out-of-bound values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierAction {
    /// Clip to the nearest bound. Row count is preserved.
    #[default]
    Cap,
    /// Drop every row holding an out-of-bound value.
    Remove,
    /// Report only.
    Keep,
}

/// Configuration for outlier handling.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OutlierConfig {
    pub rule: OutlierRule,
    pub action: OutlierAction,
}

impl OutlierConfig {
    /// Use the IQR rule with the given multiplier (default 1.5).
    pub fn iqr(multiplier: f64) -> Self {
        Self {
            rule: OutlierRule::Iqr { multiplier },
            action: OutlierAction::Cap,
        }
    }

    /// Use the Z-score rule with the given threshold (default 3.0).
    pub fn z_score(threshold: f64) -> Self {
        Self {
            rule: OutlierRule::ZScore { threshold },
            action: OutlierAction::Cap,
        }
    }

    /// Set the action applied to outliers.
    pub fn with_action(mut self, action: OutlierAction) -> Self {
        self.action = action;
        self
    }
}

/// Bounds and outlier count for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnBounds {
    pub measurement: Measurement,
    pub lower: f64,
    pub upper: f64,
    pub outlier_count: usize,
}

impl ColumnBounds {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    pub fn clip(&self, value: f64) -> f64 {
        value.clamp(self.lower, self.upper)
    }
}

/// Summary of an outlier pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub rule: OutlierRule,
    pub action: OutlierAction,
    /// Columns that had computable bounds.
    pub columns: Vec<ColumnBounds>,
    pub values_capped: usize,
    pub rows_removed: usize,
}

impl OutlierReport {
    /// Total outliers detected across columns.
    pub fn outlier_count(&self) -> usize {
        self.columns.iter().map(|c| c.outlier_count).sum()
    }

    pub fn bounds(&self, measurement: Measurement) -> Option<&ColumnBounds> {
        self.columns.iter().find(|c| c.measurement == measurement)
    }
}

/// Compute `(lower, upper)` bounds for a nullable column.
///
/// Returns `None` when there are too few values to estimate spread: fewer
/// than four for IQR, fewer than two or zero variance for Z-score.
pub fn column_bounds(values: &[Option<f64>], rule: OutlierRule) -> Option<(f64, f64)> {
    let present = stats::present(values);
    match rule {
        OutlierRule::Iqr { multiplier } => {
            if present.len() < 4 {
                return None;
            }
            let q1 = stats::quantile(&present, 0.25);
            let q3 = stats::quantile(&present, 0.75);
            let iqr = q3 - q1;
            Some((q1 - multiplier * iqr, q3 + multiplier * iqr))
        }
        OutlierRule::ZScore { threshold } => {
            let std = stats::std_dev(&present);
            if !std.is_finite() || std < 1e-10 {
                return None;
            }
            let mean = stats::mean(&present);
            Some((mean - threshold * std, mean + threshold * std))
        }
    }
}

/// Detect and handle outliers in every predictor column.
///
/// Bounds are computed once on the input table, so under `Remove` a row
/// dropped for one column does not shift the bounds of another.
pub fn handle_outliers(
    table: &ObservationTable,
    config: &OutlierConfig,
) -> Result<(ObservationTable, OutlierReport)> {
    let mut bounds = Vec::new();
    for &m in Measurement::PREDICTORS.iter() {
        let column = table.column(m);
        if let Some((lower, upper)) = column_bounds(&column, config.rule) {
            let outlier_count = column
                .iter()
                .flatten()
                .filter(|&&v| v < lower || v > upper)
                .count();
            bounds.push(ColumnBounds {
                measurement: m,
                lower,
                upper,
                outlier_count,
            });
        }
    }

    let mut report = OutlierReport {
        rule: config.rule,
        action: config.action,
        columns: bounds,
        values_capped: 0,
        rows_removed: 0,
    };

    let cleaned = match config.action {
        OutlierAction::Keep => table.clone(),
        OutlierAction::Cap => {
            let mut rows = table.rows().to_vec();
            for b in &report.columns {
                for row in rows.iter_mut() {
                    if let Some(v) = row.get(b.measurement) {
                        if !b.contains(v) {
                            row.set(b.measurement, Some(b.clip(v)));
                            report.values_capped += 1;
                        }
                    }
                }
            }
            ObservationTable::from_sorted(rows)?
        }
        OutlierAction::Remove => {
            let before = table.len();
            let rows: Vec<_> = table
                .rows()
                .iter()
                .filter(|row| {
                    report.columns.iter().all(|b| {
                        row.get(b.measurement)
                            .map_or(true, |v| b.contains(v))
                    })
                })
                .cloned()
                .collect();
            report.rows_removed = before - rows.len();
            ObservationTable::from_sorted(rows)?
        }
    };

    tracing::debug!(
        outliers = report.outlier_count(),
        capped = report.values_capped,
        removed = report.rows_removed,
        "outlier pass complete"
    );

    Ok((cleaned, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Observation;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    /// Nine rows whose PM2.5 quartiles are 40 and 60, so IQR bounds are [10, 90].
    fn pm25_table() -> ObservationTable {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let values = [30.0, 35.0, 40.0, 45.0, 50.0, 55.0, 60.0, 65.0, 500.0];
        let rows = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                Observation::new("DL001", "Delhi", base + Duration::hours(i as i64))
                    .with(Measurement::Pm25, v)
                    .with(Measurement::Aqi, 1000.0 + i as f64)
            })
            .collect();
        ObservationTable::new(rows).unwrap()
    }

    #[test]
    fn iqr_bounds_match_quartiles() {
        let table = pm25_table();
        let (lower, upper) =
            column_bounds(&table.column(Measurement::Pm25), OutlierRule::default()).unwrap();
        assert_relative_eq!(lower, 10.0, epsilon = 1e-10);
        assert_relative_eq!(upper, 90.0, epsilon = 1e-10);
    }

    #[test]
    fn cap_clips_to_upper_bound() {
        let table = pm25_table();
        let (capped, report) = handle_outliers(&table, &OutlierConfig::default()).unwrap();

        assert_eq!(capped.len(), table.len());
        assert_eq!(capped.rows()[8].pm25, Some(90.0));
        assert_eq!(report.values_capped, 1);
        assert_eq!(report.bounds(Measurement::Pm25).unwrap().outlier_count, 1);
    }

    #[test]
    fn remove_drops_exactly_one_row() {
        let table = pm25_table();
        let config = OutlierConfig::iqr(1.5).with_action(OutlierAction::Remove);
        let (removed, report) = handle_outliers(&table, &config).unwrap();

        assert_eq!(removed.len(), table.len() - 1);
        assert_eq!(report.rows_removed, 1);
        assert!(removed.rows().iter().all(|r| r.pm25 != Some(500.0)));
    }

    #[test]
    fn keep_reports_without_changing() {
        let table = pm25_table();
        let config = OutlierConfig::default().with_action(OutlierAction::Keep);
        let (kept, report) = handle_outliers(&table, &config).unwrap();
        assert_eq!(kept, table);
        assert_eq!(report.outlier_count(), 1);
    }

    #[test]
    fn target_column_is_never_altered() {
        let table = pm25_table();
        let (capped, report) = handle_outliers(&table, &OutlierConfig::default()).unwrap();
        assert!(report.bounds(Measurement::Aqi).is_none());
        assert_eq!(capped.column(Measurement::Aqi), table.column(Measurement::Aqi));
    }

    #[test]
    fn z_score_flags_extreme_value() {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut rows: Vec<_> = (0..50)
            .map(|i| {
                Observation::new("S", "Agra", base + Duration::hours(i))
                    .with(Measurement::No2, 20.0 + (i % 5) as f64)
            })
            .collect();
        rows.push(Observation::new("S", "Agra", base + Duration::hours(50)).with(Measurement::No2, 400.0));
        let table = ObservationTable::new(rows).unwrap();

        let (capped, report) = handle_outliers(&table, &OutlierConfig::z_score(3.0)).unwrap();
        let b = report.bounds(Measurement::No2).unwrap();
        assert_eq!(b.outlier_count, 1);
        assert_relative_eq!(capped.rows()[50].no2.unwrap(), b.upper, epsilon = 1e-10);
    }

    #[test]
    fn nulls_are_ignored_and_preserved() {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rows = (0..6)
            .map(|i| {
                let obs = Observation::new("S", "Agra", base + Duration::hours(i));
                if i == 2 {
                    obs
                } else {
                    obs.with(Measurement::Pm10, 100.0 + i as f64)
                }
            })
            .collect();
        let table = ObservationTable::new(rows).unwrap();
        let config = OutlierConfig::default().with_action(OutlierAction::Remove);
        let (out, _) = handle_outliers(&table, &config).unwrap();
        assert_eq!(out.len(), 6);
        assert_eq!(out.rows()[2].pm10, None);
    }

    #[test]
    fn too_few_values_have_no_bounds() {
        assert!(column_bounds(&[Some(1.0), Some(2.0), Some(100.0)], OutlierRule::default()).is_none());
        assert!(column_bounds(&[Some(5.0); 10], OutlierRule::ZScore { threshold: 3.0 }).is_none());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = OutlierConfig::z_score(2.5).with_action(OutlierAction::Remove);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("z_score"));
        let back: OutlierConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
