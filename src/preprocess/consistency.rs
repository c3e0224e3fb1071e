//! Cross-source consistency check on the target column.

use crate::core::ObservationTable;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Two or more sources disagree on AQI for the same city and hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyIssue {
    pub city: String,
    pub recorded_at: DateTime<Utc>,
    /// Sources involved, sorted by name.
    pub sources: Vec<String>,
    /// Max minus min of the per-source mean AQI.
    pub spread: f64,
}

/// Flag `(city, recorded_at)` pairs where sources disagree by more than
/// `threshold` AQI points. Advisory only; the table is not modified.
///
/// Rows without a source name or without an AQI value are ignored. When one
/// source reports several stations in the same city, their mean is used.
pub fn consistency_check(table: &ObservationTable, threshold: f64) -> Vec<ConsistencyIssue> {
    let mut groups: BTreeMap<(&str, DateTime<Utc>), BTreeMap<&str, (f64, usize)>> =
        BTreeMap::new();

    for row in table.rows() {
        let (Some(source), Some(aqi)) = (row.source.as_deref(), row.aqi) else {
            continue;
        };
        let entry = groups
            .entry((row.city.as_str(), row.recorded_at))
            .or_default()
            .entry(source)
            .or_insert((0.0, 0));
        entry.0 += aqi;
        entry.1 += 1;
    }

    let mut issues = Vec::new();
    for ((city, recorded_at), sources) in groups {
        if sources.len() < 2 {
            continue;
        }
        let means: Vec<f64> = sources.values().map(|(sum, n)| sum / *n as f64).collect();
        let max = means.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = means.iter().copied().fold(f64::INFINITY, f64::min);
        let spread = max - min;
        if spread > threshold {
            issues.push(ConsistencyIssue {
                city: city.to_string(),
                recorded_at,
                sources: sources.keys().map(|s| s.to_string()).collect(),
                spread,
            });
        }
    }

    if !issues.is_empty() {
        tracing::warn!(
            issues = issues.len(),
            threshold,
            "sources disagree on AQI"
        );
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Measurement, Observation};
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn reading(station: &str, source: &str, aqi: f64) -> Observation {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        Observation::new(station, "Delhi", ts)
            .with_source(source)
            .with(Measurement::Aqi, aqi)
    }

    #[test]
    fn flags_disagreeing_sources() {
        let table = ObservationTable::new(vec![
            reading("DL001", "cpcb", 180.0),
            reading("DL-OW", "openweather", 110.0),
        ])
        .unwrap();
        let issues = consistency_check(&table, 50.0);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].sources, vec!["cpcb", "openweather"]);
        assert_relative_eq!(issues[0].spread, 70.0);
    }

    #[test]
    fn agreement_within_threshold_is_fine() {
        let table = ObservationTable::new(vec![
            reading("DL001", "cpcb", 180.0),
            reading("DL-OW", "openweather", 140.0),
        ])
        .unwrap();
        assert!(consistency_check(&table, 50.0).is_empty());
    }

    #[test]
    fn single_source_never_flags() {
        let table = ObservationTable::new(vec![
            reading("DL001", "cpcb", 100.0),
            reading("DL002", "cpcb", 400.0),
        ])
        .unwrap();
        assert!(consistency_check(&table, 50.0).is_empty());
    }

    #[test]
    fn check_does_not_modify_table() {
        let table = ObservationTable::new(vec![
            reading("DL001", "cpcb", 180.0),
            reading("DL-OW", "openweather", 10.0),
        ])
        .unwrap();
        let before = table.clone();
        let _ = consistency_check(&table, 50.0);
        assert_eq!(table, before);
    }
}
