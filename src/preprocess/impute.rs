//! Missing-value imputation for predictor columns.
//!
//! The target column is never imputed: rows with a missing AQI stay in the
//! table with a null target and are dropped later, at split time.

use crate::core::{Measurement, ObservationTable};
use crate::error::Result;
use crate::utils::stats;
use serde::{Deserialize, Serialize};

/// Imputation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ImputeMethod {
    /// Mean of the k nearest rows under nan-euclidean distance.
    Knn { k: usize },
    /// Column mean over the whole table.
    Mean,
    /// Column median over the whole table.
    Median,
    /// Per station: carry the last value forward, then fill leading gaps backward.
    ForwardFill,
    /// Per station: linear interpolation by row position, edges take the nearest value.
    Interpolate,
}

impl Default for ImputeMethod {
    fn default() -> Self {
        ImputeMethod::Knn { k: 5 }
    }
}

/// Number of values filled in one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnImputation {
    pub measurement: Measurement,
    pub filled: usize,
    /// Values that fell back to the column median (or zero) for lack of donors.
    pub fallback: usize,
}

/// Summary of an imputation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationReport {
    pub method: ImputeMethod,
    pub columns: Vec<ColumnImputation>,
}

impl ImputationReport {
    pub fn total_filled(&self) -> usize {
        self.columns.iter().map(|c| c.filled).sum()
    }
}

/// Fill every missing predictor value.
///
/// A table without missing predictors comes back unchanged.
pub fn impute(
    table: &ObservationTable,
    method: ImputeMethod,
) -> Result<(ObservationTable, ImputationReport)> {
    let columns: Vec<Vec<Option<f64>>> = Measurement::PREDICTORS
        .iter()
        .map(|&m| table.column(m))
        .collect();

    let filled: Vec<Vec<Option<f64>>> = match method {
        ImputeMethod::Knn { k } => knn_impute(&columns, k.max(1)),
        ImputeMethod::Mean => columns
            .iter()
            .map(|c| fill_constant(c, stats::mean(&stats::present(c))))
            .collect(),
        ImputeMethod::Median => columns
            .iter()
            .map(|c| fill_constant(c, stats::median(&stats::present(c))))
            .collect(),
        ImputeMethod::ForwardFill => per_station(table, &columns, forward_fill),
        ImputeMethod::Interpolate => per_station(table, &columns, interpolate),
    };

    let mut report = ImputationReport {
        method,
        columns: Vec::new(),
    };
    let mut rows = table.rows().to_vec();

    for ((&m, before), after) in Measurement::PREDICTORS.iter().zip(&columns).zip(filled) {
        let missing = before.iter().filter(|v| v.is_none()).count();
        if missing == 0 {
            continue;
        }
        // Whatever the method left behind gets the global median, then zero.
        let median = stats::median(&stats::present(before));
        let fallback_value = if median.is_finite() { median } else { 0.0 };
        let mut fallback = 0;
        for (row, value) in rows.iter_mut().zip(after) {
            let value = value.unwrap_or_else(|| {
                fallback += 1;
                fallback_value
            });
            row.set(m, Some(value));
        }
        report.columns.push(ColumnImputation {
            measurement: m,
            filled: missing,
            fallback,
        });
    }

    if report.columns.is_empty() {
        return Ok((table.clone(), report));
    }

    tracing::debug!(
        method = ?method,
        filled = report.total_filled(),
        "imputation complete"
    );

    Ok((ObservationTable::from_sorted(rows)?, report))
}

fn fill_constant(column: &[Option<f64>], value: f64) -> Vec<Option<f64>> {
    let value = value.is_finite().then_some(value);
    column.iter().map(|v| v.or(value)).collect()
}

/// k-nearest-neighbour imputation over all predictor columns.
///
/// Distance between two rows uses only coordinates present in both and is
/// scaled up by `total / shared` so rows with few shared readings are not
/// favoured. Donors must have the column being filled. Ties go to the
/// earlier row so results are deterministic.
fn knn_impute(columns: &[Vec<Option<f64>>], k: usize) -> Vec<Vec<Option<f64>>> {
    let n_cols = columns.len();
    let n_rows = columns.first().map_or(0, |c| c.len());
    let mut out = columns.to_vec();

    let distance = |a: usize, b: usize| -> Option<f64> {
        let mut sum = 0.0;
        let mut shared = 0usize;
        for col in columns {
            if let (Some(x), Some(y)) = (col[a], col[b]) {
                sum += (x - y).powi(2);
                shared += 1;
            }
        }
        (shared > 0).then(|| (sum * n_cols as f64 / shared as f64).sqrt())
    };

    for row in 0..n_rows {
        let missing: Vec<usize> = (0..n_cols).filter(|&c| columns[c][row].is_none()).collect();
        if missing.is_empty() {
            continue;
        }

        let mut neighbours: Vec<(f64, usize)> = (0..n_rows)
            .filter(|&other| other != row)
            .filter_map(|other| distance(row, other).map(|d| (d, other)))
            .collect();
        neighbours.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });

        for c in missing {
            let donors: Vec<f64> = neighbours
                .iter()
                .filter_map(|&(_, other)| columns[c][other])
                .take(k)
                .collect();
            if !donors.is_empty() {
                out[c][row] = Some(stats::mean(&donors));
            }
        }
    }

    out
}

fn per_station(
    table: &ObservationTable,
    columns: &[Vec<Option<f64>>],
    fill: fn(&[Option<f64>]) -> Vec<Option<f64>>,
) -> Vec<Vec<Option<f64>>> {
    let groups = table.station_groups();
    columns
        .iter()
        .map(|column| {
            let mut out = column.clone();
            for idx in groups.values() {
                let series: Vec<Option<f64>> = idx.iter().map(|&i| column[i]).collect();
                for (&i, v) in idx.iter().zip(fill(&series)) {
                    out[i] = v;
                }
            }
            out
        })
        .collect()
}

fn forward_fill(series: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(series.len());
    let mut last = None;
    for &v in series {
        if v.is_some() {
            last = v;
        }
        out.push(v.or(last));
    }
    let first = series.iter().flatten().next().copied();
    out.iter().map(|v| v.or(first)).collect()
}

fn interpolate(series: &[Option<f64>]) -> Vec<Option<f64>> {
    let known: Vec<(usize, f64)> = series
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .collect();
    if known.is_empty() {
        return series.to_vec();
    }

    let mut out = series.to_vec();
    let (first_i, first_v) = known[0];
    let (last_i, last_v) = known[known.len() - 1];
    for slot in out.iter_mut().take(first_i) {
        *slot = Some(first_v);
    }
    for slot in out.iter_mut().skip(last_i + 1) {
        *slot = Some(last_v);
    }
    for pair in known.windows(2) {
        let (i0, v0) = pair[0];
        let (i1, v1) = pair[1];
        for (i, slot) in out.iter_mut().enumerate().take(i1).skip(i0 + 1) {
            let t = (i - i0) as f64 / (i1 - i0) as f64;
            *slot = Some(v0 + t * (v1 - v0));
        }
    }
    out
}
