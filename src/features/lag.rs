//! Per-station lag features.

use crate::core::{Measurement, ObservationTable};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Value of `measurement` exactly `hours` earlier at the same station.
///
/// Lookup is by timestamp rather than by row offset, so a gap in the hourly
/// series yields null instead of a value from the wrong hour.
pub fn lag_by_time(table: &ObservationTable, measurement: Measurement, hours: usize) -> Vec<Option<f64>> {
    let rows = table.rows();
    let offset = Duration::hours(hours as i64);
    let mut out = vec![None; rows.len()];

    for indices in table.station_groups().values() {
        let by_time: HashMap<DateTime<Utc>, usize> =
            indices.iter().map(|&i| (rows[i].recorded_at, i)).collect();
        for &i in indices {
            out[i] = by_time
                .get(&(rows[i].recorded_at - offset))
                .and_then(|&j| rows[j].get(measurement));
        }
    }

    out
}

/// Column name for a lag feature, e.g. `pm25_lag_3h`.
pub fn lag_name(measurement: Measurement, hours: usize) -> String {
    format!("{}_lag_{}h", measurement.name(), hours)
}
