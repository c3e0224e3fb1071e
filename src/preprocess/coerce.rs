//! Type coercion from raw ingestion records to typed observations.

use crate::core::{parse_timestamp, Measurement, Observation, ObservationTable, RawObservation};
use crate::error::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Counts produced by [`coerce`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoercionReport {
    /// Records received.
    pub input_rows: usize,
    /// Records dropped for an unparsable timestamp or a blank station id.
    pub dropped_rows: usize,
    /// Present-but-unparsable values turned into nulls, per column.
    pub invalid_values: Vec<(Measurement, usize)>,
}

impl CoercionReport {
    pub fn total_invalid(&self) -> usize {
        self.invalid_values.iter().map(|(_, n)| n).sum()
    }
}

/// Parse every numeric field and timestamp.
///
/// Unparsable or non-finite values become nulls and are counted, never an
/// error. Only an input with no usable rows fails, with `EmptyData`.
pub fn coerce(raw: &[RawObservation]) -> Result<(ObservationTable, CoercionReport)> {
    let mut invalid = [0usize; 12];
    let mut rows = Vec::with_capacity(raw.len());
    let mut dropped = 0;

    for record in raw {
        let station_id = record.station_id.trim();
        let recorded_at = match parse_timestamp(&record.recorded_at) {
            Some(ts) if !station_id.is_empty() => ts,
            _ => {
                dropped += 1;
                continue;
            }
        };

        let mut obs = Observation::new(station_id, record.city.trim(), recorded_at.with_timezone(&Utc))
            .with_utc_offset(*recorded_at.offset());
        obs.source = record
            .source
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        for (slot, &m) in invalid.iter_mut().zip(Measurement::ALL.iter()) {
            if let Some(value) = record.get(m) {
                let parsed = value.to_f64();
                if parsed.is_none() {
                    *slot += 1;
                }
                obs.set(m, parsed);
            }
        }
        rows.push(obs);
    }

    if dropped > 0 {
        tracing::warn!(dropped, "dropped records with unusable timestamp or station id");
    }

    let report = CoercionReport {
        input_rows: raw.len(),
        dropped_rows: dropped,
        invalid_values: Measurement::ALL
            .iter()
            .zip(invalid)
            .filter(|(_, n)| *n > 0)
            .map(|(&m, n)| (m, n))
            .collect(),
    };

    Ok((ObservationTable::new(rows)?, report))
}
