//! Forward-chaining cross-validation folds for time-ordered rows.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// How the training window moves between folds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CvStrategy {
    /// Training window grows with each fold.
    #[default]
    Expanding,
    /// Training window keeps the size of the first fold and slides forward.
    Rolling,
}

/// One fold: training rows strictly precede validation rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Range<usize>,
    pub validation: Range<usize>,
}

/// Time-series cross-validation splitter.
///
/// The rows after the initial training window are cut into `n_splits`
/// equally sized validation blocks; each fold trains on rows before its
/// validation block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSeriesSplit {
    pub n_splits: usize,
    pub strategy: CvStrategy,
    /// Upper bound on training rows per fold.
    pub max_train_size: Option<usize>,
}

impl Default for TimeSeriesSplit {
    fn default() -> Self {
        Self {
            n_splits: 5,
            strategy: CvStrategy::Expanding,
            max_train_size: None,
        }
    }
}

impl TimeSeriesSplit {
    /// Expanding-window splitter.
    pub fn expanding(n_splits: usize) -> Self {
        Self {
            n_splits,
            ..Default::default()
        }
    }

    /// Rolling-window splitter.
    pub fn rolling(n_splits: usize) -> Self {
        Self {
            n_splits,
            strategy: CvStrategy::Rolling,
            max_train_size: None,
        }
    }

    /// Set the maximum training window size.
    pub fn with_max_train_size(mut self, size: usize) -> Self {
        self.max_train_size = Some(size);
        self
    }

    /// Fold boundaries over `n` time-ordered rows.
    pub fn split(&self, n: usize) -> Result<Vec<Fold>> {
        if self.n_splits < 2 {
            return Err(PipelineError::InvalidParameter(
                "n_splits must be at least 2".into(),
            ));
        }
        if self.max_train_size == Some(0) {
            return Err(PipelineError::InvalidParameter(
                "max_train_size must be positive".into(),
            ));
        }
        let needed = self.n_splits + 1;
        if n < needed {
            return Err(PipelineError::InsufficientData { needed, got: n });
        }

        let fold_size = n / needed;
        let initial = n - self.n_splits * fold_size;
        let window = match (self.strategy, self.max_train_size) {
            (CvStrategy::Rolling, Some(max)) => Some(max.min(initial)),
            (CvStrategy::Rolling, None) => Some(initial),
            (CvStrategy::Expanding, max) => max,
        };

        let folds = (0..self.n_splits)
            .map(|i| {
                let val_start = initial + i * fold_size;
                let train_start = window.map_or(0, |w| val_start.saturating_sub(w));
                Fold {
                    train: train_start..val_start,
                    validation: val_start..val_start + fold_size,
                }
            })
            .collect::<Vec<_>>();

        debug_assert!(folds
            .iter()
            .all(|f| f.train.end <= f.validation.start && !f.train.is_empty()));
        Ok(folds)
    }
}
