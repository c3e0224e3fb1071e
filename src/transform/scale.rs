//! Standard scaling of feature matrices.
//!
//! The scaler is fitted on the training block only and then applied
//! unchanged to validation, test, and serving rows.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Per-column centering and scaling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    /// Population standard deviation. Zero marks a constant column.
    stds: Vec<f64>,
}

impl StandardScaler {
    /// Fit on row-major data.
    ///
    /// Fails with `ZeroVariance` when every column is constant. A single
    /// constant column is allowed and always scales to zero.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let first = rows.first().ok_or(PipelineError::EmptyData)?;
        let k = first.len();
        if k == 0 {
            return Err(PipelineError::InvalidParameter("no feature columns".into()));
        }
        check_width(rows, k)?;

        let n = rows.len() as f64;
        let mut means = vec![0.0; k];
        for row in rows {
            for (m, &x) in means.iter_mut().zip(row) {
                *m += x;
            }
        }
        for m in &mut means {
            *m /= n;
        }

        let mut stds = vec![0.0; k];
        for row in rows {
            for ((s, &x), &m) in stds.iter_mut().zip(row).zip(&means) {
                *s += (x - m).powi(2);
            }
        }
        for s in &mut stds {
            *s = (*s / n).sqrt();
            if *s < 1e-10 {
                *s = 0.0;
            }
        }

        if stds.iter().all(|&s| s == 0.0) {
            return Err(PipelineError::ZeroVariance);
        }

        Ok(Self { means, stds })
    }

    /// Number of columns the scaler was fitted on.
    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn stds(&self) -> &[f64] {
        &self.stds
    }

    /// Indices of columns that were constant in the fit data.
    pub fn constant_columns(&self) -> Vec<usize> {
        self.stds
            .iter()
            .enumerate()
            .filter(|(_, &s)| s == 0.0)
            .map(|(i, _)| i)
            .collect()
    }

    /// Scale one row.
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.means.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: self.means.len(),
                got: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(&x, (&m, &s))| if s == 0.0 { 0.0 } else { (x - m) / s })
            .collect())
    }

    /// Scale many rows.
    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }
}

fn check_width(rows: &[Vec<f64>], k: usize) -> Result<()> {
    match rows.iter().find(|r| r.len() != k) {
        Some(bad) => Err(PipelineError::DimensionMismatch {
            expected: k,
            got: bad.len(),
        }),
        None => Ok(()),
    }
}
