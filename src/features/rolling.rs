//! Per-station rolling statistics and one-step changes.

use crate::core::{Measurement, ObservationTable};
use crate::transform::window;

/// Apply a series function to each station's time-ordered slice of a column
/// and scatter the results back into table order.
pub fn per_station<F>(table: &ObservationTable, column: &[Option<f64>], f: F) -> Vec<Option<f64>>
where
    F: Fn(&[Option<f64>]) -> Vec<Option<f64>>,
{
    let mut out = vec![None; column.len()];
    for indices in table.station_groups().values() {
        let series: Vec<Option<f64>> = indices.iter().map(|&i| column[i]).collect();
        for (&i, v) in indices.iter().zip(f(&series)) {
            out[i] = v;
        }
    }
    out
}

/// Rolling feature columns for one measurement, as `(name, values)` pairs.
///
/// For each window W: `{col}_rolling_mean_{W}h` and `{col}_rolling_std_{W}h`.
/// Then `{col}_change_1h` and `{col}_pct_change_1h`.
pub fn rolling_features(
    table: &ObservationTable,
    measurement: Measurement,
    windows: &[usize],
) -> Vec<(String, Vec<Option<f64>>)> {
    let column = table.column(measurement);
    let name = measurement.name();
    let mut out = Vec::with_capacity(windows.len() * 2 + 2);

    for &w in windows {
        out.push((
            format!("{}_rolling_mean_{}h", name, w),
            per_station(table, &column, |s| window::rolling_mean(s, w, 1)),
        ));
        out.push((
            format!("{}_rolling_std_{}h", name, w),
            per_station(table, &column, |s| window::rolling_std(s, w, 1)),
        ));
    }
    out.push((
        format!("{}_change_1h", name),
        per_station(table, &column, window::diff),
    ));
    out.push((
        format!("{}_pct_change_1h", name),
        per_station(table, &column, window::pct_change),
    ));

    out
}
