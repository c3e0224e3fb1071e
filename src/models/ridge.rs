//! Ridge regression solved through the normal equations.

use super::traits::{check_prediction_data, check_training_data, Regressor};
use crate::error::{PipelineError, Result};
use crate::utils::linalg::{dot, solve_symmetric};
use serde::{Deserialize, Serialize};

/// L2-penalised linear regression.
///
/// Fits `y = intercept + x·β` by solving `(XcᵀXc + αI) β = Xcᵀyc` on centred
/// data, so the intercept is not penalised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeRegression {
    alpha: f64,
    coefficients: Option<Vec<f64>>,
    intercept: f64,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            coefficients: None,
            intercept: 0.0,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn coefficients(&self) -> Option<&[f64]> {
        self.coefficients.as_deref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Regressor for RidgeRegression {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        if !(self.alpha >= 0.0) {
            return Err(PipelineError::InvalidParameter("alpha must be non-negative".into()));
        }
        let k = check_training_data(x, y)?;
        let n = x.len() as f64;

        let mut x_mean = vec![0.0; k];
        for row in x {
            for (m, &v) in x_mean.iter_mut().zip(row) {
                *m += v / n;
            }
        }
        let y_mean = y.iter().sum::<f64>() / n;

        let mut xtx = vec![vec![0.0; k]; k];
        let mut xty = vec![0.0; k];
        for (row, &target) in x.iter().zip(y) {
            let centred: Vec<f64> = row.iter().zip(&x_mean).map(|(v, m)| v - m).collect();
            let yc = target - y_mean;
            for i in 0..k {
                xty[i] += centred[i] * yc;
                for j in 0..=i {
                    xtx[i][j] += centred[i] * centred[j];
                }
            }
        }
        for i in 0..k {
            for j in 0..i {
                xtx[j][i] = xtx[i][j];
            }
            // Small jitter keeps alpha = 0 solvable on collinear columns.
            xtx[i][i] += self.alpha + 1e-8;
        }

        let beta = solve_symmetric(&xtx, &xty).ok_or_else(|| {
            PipelineError::ComputationError("ridge system is not positive definite".into())
        })?;

        self.intercept = y_mean - dot(&x_mean, &beta);
        self.coefficients = Some(beta);
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let beta = self.coefficients.as_ref().ok_or(PipelineError::FitRequired)?;
        check_prediction_data(x, beta.len())?;
        Ok(x.iter().map(|row| self.intercept + dot(row, beta)).collect())
    }

    fn name(&self) -> &str {
        "Ridge"
    }

    fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn recovers_linear_relationship() {
        // y = 2 + 3*x1 - x2
        let x: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![i as f64, ((i * 7) % 5) as f64])
            .collect();
        let y: Vec<f64> = x.iter().map(|r| 2.0 + 3.0 * r[0] - r[1]).collect();

        let mut model = RidgeRegression::new(0.0);
        model.fit(&x, &y).unwrap();
        let beta = model.coefficients().unwrap();
        assert_relative_eq!(beta[0], 3.0, epsilon = 1e-5);
        assert_relative_eq!(beta[1], -1.0, epsilon = 1e-5);
        assert_relative_eq!(model.intercept(), 2.0, epsilon = 1e-4);
    }

    #[test]
    fn penalty_shrinks_coefficients() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = x.iter().map(|r| 4.0 * r[0]).collect();

        let mut ols = RidgeRegression::new(0.0);
        ols.fit(&x, &y).unwrap();
        let mut ridge = RidgeRegression::new(100.0);
        ridge.fit(&x, &y).unwrap();

        assert!(ridge.coefficients().unwrap()[0] < ols.coefficients().unwrap()[0]);
        // Intercept keeps predictions centred on the target mean.
        let mean_pred = ridge.predict(&[vec![4.5]]).unwrap()[0];
        assert_relative_eq!(mean_pred, 18.0, epsilon = 1e-9);
    }

    #[test]
    fn predict_requires_fit() {
        let model = RidgeRegression::default();
        assert_eq!(model.predict(&[vec![1.0]]), Err(PipelineError::FitRequired));
        assert!(!model.is_fitted());
    }

    #[test]
    fn negative_alpha_rejected() {
        let mut model = RidgeRegression::new(-1.0);
        assert!(model.fit(&[vec![1.0], vec![2.0]], &[1.0, 2.0]).is_err());
    }
}
