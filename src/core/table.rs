//! Time-ordered table of observations across stations.

use crate::core::observation::{Measurement, Observation};
use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

/// An ordered, deduplicated collection of observations.
///
/// Rows are sorted ascending by `recorded_at` (ties broken by station id) and
/// each `(station_id, recorded_at)` pair appears once. Every temporal feature
/// relies on this ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationTable {
    rows: Vec<Observation>,
}

impl ObservationTable {
    /// Build a table, deduplicating and sorting the rows.
    ///
    /// When the same station reports the same timestamp twice the later
    /// row in the input wins.
    pub fn new(rows: Vec<Observation>) -> Result<Self> {
        if rows.is_empty() {
            return Err(PipelineError::EmptyData);
        }

        let mut latest: HashMap<(String, DateTime<Utc>), usize> = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            latest.insert((row.station_id.clone(), row.recorded_at), i);
        }

        let mut rows: Vec<Observation> = rows
            .into_iter()
            .enumerate()
            .filter(|(i, row)| latest[&(row.station_id.clone(), row.recorded_at)] == *i)
            .map(|(_, row)| row)
            .collect();

        rows.sort_by(|a, b| {
            a.recorded_at
                .cmp(&b.recorded_at)
                .then_with(|| a.station_id.cmp(&b.station_id))
        });

        Ok(Self { rows })
    }

    /// Rebuild from rows that are already in table order.
    pub(crate) fn from_sorted(rows: Vec<Observation>) -> Result<Self> {
        if rows.is_empty() {
            return Err(PipelineError::EmptyData);
        }
        debug_assert!(rows.windows(2).all(|w| w[0].recorded_at <= w[1].recorded_at));
        Ok(Self { rows })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false for a constructed table.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows in table order.
    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    /// Consume the table.
    pub fn into_rows(self) -> Vec<Observation> {
        self.rows
    }

    /// Timestamps in table order.
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.rows.iter().map(|r| r.recorded_at).collect()
    }

    /// One numeric column in table order.
    pub fn column(&self, measurement: Measurement) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.get(measurement)).collect()
    }

    /// New table with one column replaced.
    pub fn with_column(&self, measurement: Measurement, values: &[Option<f64>]) -> Result<Self> {
        if values.len() != self.rows.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: self.rows.len(),
                got: values.len(),
            });
        }
        let mut rows = self.rows.clone();
        for (row, &v) in rows.iter_mut().zip(values) {
            row.set(measurement, v);
        }
        Ok(Self { rows })
    }

    /// Row indices grouped by station, each group in time order.
    ///
    /// Groups are keyed by station id and iterate in sorted key order so
    /// downstream feature columns are deterministic.
    pub fn station_groups(&self) -> BTreeMap<&str, Vec<usize>> {
        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, row) in self.rows.iter().enumerate() {
            groups.entry(row.station_id.as_str()).or_default().push(i);
        }
        groups
    }

    /// Count of missing values per numeric column.
    pub fn missing_counts(&self) -> Vec<(Measurement, usize)> {
        Measurement::ALL
            .iter()
            .map(|&m| (m, self.rows.iter().filter(|r| r.get(m).is_none()).count()))
            .collect()
    }

    /// Earliest and latest timestamps.
    pub fn time_range(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        // Non-empty by construction.
        (self.rows[0].recorded_at, self.rows[self.rows.len() - 1].recorded_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ts(hour: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hour)
    }

    #[test]
    fn empty_table_is_rejected() {
        assert_eq!(ObservationTable::new(vec![]), Err(PipelineError::EmptyData));
    }

    #[test]
    fn rows_are_sorted_by_time_then_station() {
        let rows = vec![
            Observation::new("B", "Delhi", ts(2)),
            Observation::new("A", "Delhi", ts(2)),
            Observation::new("A", "Delhi", ts(0)),
        ];
        let table = ObservationTable::new(rows).unwrap();
        let order: Vec<_> = table
            .rows()
            .iter()
            .map(|r| (r.station_id.as_str(), r.recorded_at))
            .collect();
        assert_eq!(order, vec![("A", ts(0)), ("A", ts(2)), ("B", ts(2))]);
    }

    #[test]
    fn duplicates_keep_last_occurrence() {
        let rows = vec![
            Observation::new("A", "Delhi", ts(0)).with(Measurement::Pm25, 10.0),
            Observation::new("A", "Delhi", ts(0)).with(Measurement::Pm25, 20.0),
            Observation::new("B", "Delhi", ts(0)).with(Measurement::Pm25, 30.0),
        ];
        let table = ObservationTable::new(rows).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].pm25, Some(20.0));
    }

    #[test]
    fn station_groups_are_time_ordered() {
        let rows = vec![
            Observation::new("B", "Pune", ts(1)),
            Observation::new("A", "Pune", ts(3)),
            Observation::new("A", "Pune", ts(1)),
            Observation::new("B", "Pune", ts(0)),
        ];
        let table = ObservationTable::new(rows).unwrap();
        let groups = table.station_groups();
        assert_eq!(groups.len(), 2);
        for idx in groups.values() {
            assert!(idx
                .windows(2)
                .all(|w| table.rows()[w[0]].recorded_at < table.rows()[w[1]].recorded_at));
        }
    }

    #[test]
    fn with_column_replaces_values() {
        let rows = vec![
            Observation::new("A", "Delhi", ts(0)),
            Observation::new("A", "Delhi", ts(1)),
        ];
        let table = ObservationTable::new(rows).unwrap();
        let updated = table
            .with_column(Measurement::No2, &[Some(1.0), Some(2.0)])
            .unwrap();
        assert_eq!(updated.column(Measurement::No2), vec![Some(1.0), Some(2.0)]);
        assert_eq!(table.column(Measurement::No2), vec![None, None]);

        assert!(table.with_column(Measurement::No2, &[Some(1.0)]).is_err());
    }
}
