//! Accuracy metrics and model comparison.

use crate::error::{PipelineError, Result};
use crate::models::ModelFamily;
use serde::{Deserialize, Serialize};

/// Accuracy of predictions on one block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Coefficient of determination
    pub r2: f64,
}

/// Calculate accuracy metrics between actual and predicted values.
///
/// R² is 1.0 for a constant target predicted exactly and 0.0 for a constant
/// target predicted with any error.
pub fn regression_metrics(actual: &[f64], predicted: &[f64]) -> Result<RegressionMetrics> {
    if actual.is_empty() || predicted.is_empty() {
        return Err(PipelineError::EmptyData);
    }
    if actual.len() != predicted.len() {
        return Err(PipelineError::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }

    let n = actual.len() as f64;
    let mae = mae(actual, predicted);
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    let rmse = (ss_res / n).sqrt();

    let mean_actual = actual.iter().sum::<f64>() / n;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean_actual).powi(2)).sum();
    let r2 = if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    };

    Ok(RegressionMetrics { mae, rmse, r2 })
}

/// Calculate MAE between two slices.
pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64
}

/// Calculate RMSE between two slices.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }
    (actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64)
        .sqrt()
}

/// Metrics on each block of a chronological split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitMetrics {
    pub train: RegressionMetrics,
    pub validation: RegressionMetrics,
    pub test: RegressionMetrics,
}

/// Flags a train/test RMSE gap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverfitCheck {
    /// Test RMSE above `ratio * train RMSE` is flagged.
    pub ratio: f64,
}

impl Default for OverfitCheck {
    fn default() -> Self {
        Self { ratio: 1.3 }
    }
}

/// Outcome of an [`OverfitCheck`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverfitReport {
    pub train_rmse: f64,
    pub test_rmse: f64,
    pub ratio: f64,
    pub overfit: bool,
}

impl OverfitCheck {
    pub fn new(ratio: f64) -> Self {
        Self { ratio }
    }

    /// Compare train and test RMSE, logging a warning when flagged.
    pub fn evaluate(&self, family: ModelFamily, metrics: &SplitMetrics) -> OverfitReport {
        let train_rmse = metrics.train.rmse;
        let test_rmse = metrics.test.rmse;
        let overfit = test_rmse > self.ratio * train_rmse;
        if overfit {
            tracing::warn!(
                %family,
                train_rmse,
                test_rmse,
                ratio = self.ratio,
                "possible overfit: test RMSE exceeds train RMSE by more than the allowed ratio"
            );
        }
        OverfitReport {
            train_rmse,
            test_rmse,
            ratio: self.ratio,
            overfit,
        }
    }
}

/// One row of a [`ModelComparison`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    pub family: ModelFamily,
    pub metrics: SplitMetrics,
    pub overfit: bool,
}

/// Models ranked by test RMSE, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelComparison {
    entries: Vec<ComparisonEntry>,
}

impl ModelComparison {
    pub fn new(mut entries: Vec<ComparisonEntry>) -> Self {
        entries.sort_by(|a, b| {
            a.metrics
                .test
                .rmse
                .partial_cmp(&b.metrics.test.rmse)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.family.cmp(&b.family))
        });
        Self { entries }
    }

    pub fn entries(&self) -> &[ComparisonEntry] {
        &self.entries
    }

    /// Family with the lowest test RMSE.
    pub fn recommended(&self) -> Option<&ComparisonEntry> {
        self.entries.first()
    }

    pub fn get(&self, family: ModelFamily) -> Option<&ComparisonEntry> {
        self.entries.iter().find(|e| e.family == family)
    }
}
