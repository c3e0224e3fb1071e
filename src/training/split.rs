//! Chronological train/validation/test split.

use crate::core::FeatureTable;
use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cut points of a chronological split, as fractions of the usable rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitRatios {
    /// Training block is `[0, floor(n * train_end))`.
    pub train_end: f64,
    /// Validation block ends at `floor(n * validation_end)`; test takes the rest.
    pub validation_end: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train_end: 0.70,
            validation_end: 0.85,
        }
    }
}

impl SplitRatios {
    pub fn new(train_end: f64, validation_end: f64) -> Result<Self> {
        let ratios = Self {
            train_end,
            validation_end,
        };
        ratios.validate()?;
        Ok(ratios)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.train_end > 0.0
            && self.train_end < self.validation_end
            && self.validation_end < 1.0)
        {
            return Err(PipelineError::InvalidParameter(format!(
                "split ratios must satisfy 0 < train_end < validation_end < 1, got {} and {}",
                self.train_end, self.validation_end
            )));
        }
        Ok(())
    }

    /// Row indices where the validation and test blocks start.
    ///
    /// The small offset keeps `floor(90 * 0.7)` at 63 despite 0.7 not being
    /// representable.
    pub fn cut_points(&self, n: usize) -> (usize, usize) {
        let cut = |ratio: f64| ((n as f64 * ratio) + 1e-9).floor() as usize;
        (cut(self.train_end), cut(self.validation_end))
    }
}

/// One contiguous block of a split.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetBlock {
    pub timestamps: Vec<DateTime<Utc>>,
    /// Row-major feature matrix.
    pub x: Vec<Vec<f64>>,
    pub y: Vec<f64>,
}

impl DatasetBlock {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

/// Time-ordered train, validation, and test blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSplit {
    pub features: Vec<String>,
    pub target: String,
    pub train: DatasetBlock,
    pub validation: DatasetBlock,
    pub test: DatasetBlock,
}

impl DatasetSplit {
    /// Usable rows across all blocks.
    pub fn len(&self) -> usize {
        self.train.len() + self.validation.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rows whose target and every listed feature are present, in table order.
pub fn usable_rows(table: &FeatureTable, features: &[String], target: &str) -> Result<Vec<usize>> {
    let target_col = table.require_numeric(target)?;
    let feature_cols = features
        .iter()
        .map(|f| table.require_numeric(f))
        .collect::<Result<Vec<_>>>()?;

    Ok((0..table.len())
        .filter(|&i| {
            target_col[i].is_some() && feature_cols.iter().all(|col| col[i].is_some())
        })
        .collect())
}

/// Split a feature table into train, validation, and test blocks in time
/// order.
///
/// Rows with a null target or feature are dropped first; the remaining rows
/// are never shuffled.
///
/// # Example
///
/// ```
/// use aqi_forecast::core::FeatureTable;
/// use aqi_forecast::training::{chronological_split, SplitRatios};
/// use chrono::{Duration, TimeZone, Utc};
///
/// let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let n = 20;
/// let mut table = FeatureTable::new(
///     vec!["S1".to_string(); n],
///     vec!["Delhi".to_string(); n],
///     (0..n).map(|h| start + Duration::hours(h as i64)).collect(),
/// )
/// .unwrap();
/// table.push_numeric("pm25", (0..n).map(|i| Some(i as f64)).collect()).unwrap();
/// table.push_numeric("aqi", (0..n).map(|i| Some(2.0 * i as f64)).collect()).unwrap();
///
/// let split = chronological_split(&table, &["pm25".to_string()], "aqi", SplitRatios::default()).unwrap();
/// assert_eq!((split.train.len(), split.validation.len(), split.test.len()), (14, 3, 3));
/// ```
pub fn chronological_split(
    table: &FeatureTable,
    features: &[String],
    target: &str,
    ratios: SplitRatios,
) -> Result<DatasetSplit> {
    let rows = usable_rows(table, features, target)?;
    split_rows(table, features, target, &rows, ratios)
}

/// Split the given usable rows (as returned by [`usable_rows`]).
pub fn split_rows(
    table: &FeatureTable,
    features: &[String],
    target: &str,
    rows: &[usize],
    ratios: SplitRatios,
) -> Result<DatasetSplit> {
    ratios.validate()?;
    let n = rows.len();
    let (train_end, validation_end) = ratios.cut_points(n);
    if train_end == 0 || validation_end == train_end || validation_end == n {
        return Err(PipelineError::InsufficientData {
            needed: min_rows(ratios),
            got: n,
        });
    }

    let target_col = table.require_numeric(target)?;
    let feature_cols = features
        .iter()
        .map(|f| table.require_numeric(f))
        .collect::<Result<Vec<_>>>()?;
    let timestamps = table.timestamps();

    let block = |range: &[usize]| {
        let mut out = DatasetBlock::default();
        for &i in range {
            out.timestamps.push(timestamps[i]);
            out.x.push(
                feature_cols
                    .iter()
                    .map(|col| col[i].unwrap_or(f64::NAN))
                    .collect(),
            );
            out.y.push(target_col[i].unwrap_or(f64::NAN));
        }
        out
    };

    let split = DatasetSplit {
        features: features.to_vec(),
        target: target.to_string(),
        train: block(&rows[..train_end]),
        validation: block(&rows[train_end..validation_end]),
        test: block(&rows[validation_end..]),
    };

    debug_assert!(
        split
            .train
            .timestamps
            .iter()
            .chain(&split.validation.timestamps)
            .chain(&split.test.timestamps)
            .collect::<Vec<_>>()
            .windows(2)
            .all(|w| w[0] <= w[1]),
        "split blocks must be time ordered"
    );

    Ok(split)
}

/// Smallest row count that leaves every block non-empty.
fn min_rows(ratios: SplitRatios) -> usize {
    (3..10_000)
        .find(|&n| {
            let (a, b) = ratios.cut_points(n);
            a > 0 && b > a && b < n
        })
        .unwrap_or(3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn table(n: usize) -> FeatureTable {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut t = FeatureTable::new(
            vec!["S1".to_string(); n],
            vec!["Pune".to_string(); n],
            (0..n).map(|h| start + Duration::hours(h as i64)).collect(),
        )
        .unwrap();
        t.push_numeric("x", (0..n).map(|i| Some(i as f64)).collect())
            .unwrap();
        t.push_numeric(
            "aqi",
            (0..n)
                .map(|i| if i % 10 == 3 { None } else { Some(i as f64 * 2.0) })
                .collect(),
        )
        .unwrap();
        t
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn null_targets_dropped_and_order_kept() {
        let t = table(100);
        let split = chronological_split(&t, &names(&["x"]), "aqi", SplitRatios::default()).unwrap();
        assert_eq!(split.len(), 90);
        assert_eq!(split.train.len(), 63);
        assert_eq!(split.validation.len(), 13);
        assert_eq!(split.test.len(), 14);

        let last_train = *split.train.timestamps.last().unwrap();
        assert!(split.validation.timestamps.iter().all(|ts| *ts > last_train));
        let last_val = *split.validation.timestamps.last().unwrap();
        assert!(split.test.timestamps.iter().all(|ts| *ts > last_val));
        assert!(split.train.y.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn unknown_feature_reported() {
        let t = table(20);
        assert_eq!(
            chronological_split(&t, &names(&["nope"]), "aqi", SplitRatios::default()),
            Err(PipelineError::UnknownFeature("nope".into()))
        );
    }

    #[test]
    fn too_few_rows() {
        let t = table(4);
        let err = chronological_split(&t, &names(&["x"]), "aqi", SplitRatios::default());
        assert!(matches!(err, Err(PipelineError::InsufficientData { got: 3, .. })));
    }

    #[test]
    fn ratios_validated() {
        assert!(SplitRatios::new(0.8, 0.7).is_err());
        assert!(SplitRatios::new(0.0, 0.5).is_err());
        assert!(SplitRatios::new(0.6, 0.8).is_ok());
        assert_eq!(SplitRatios::default().cut_points(20), (14, 17));
    }
}
