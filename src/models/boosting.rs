//! Gradient boosted regression trees on squared loss.

use super::forest::normalize;
use super::traits::{
    check_known, check_prediction_data, check_training_data, param_f64, param_usize,
    Hyperparameters, ModelFamily, ParamValue, Regressor,
};
use super::tree::{RegressionTree, TreeConfig};
use crate::error::{PipelineError, Result};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Gradient boosting hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostingConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn (without replacement) for each round.
    pub subsample: f64,
    /// Stop after this many rounds without validation improvement.
    pub early_stopping_rounds: usize,
    pub seed: u64,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            learning_rate: 0.1,
            max_depth: 5,
            min_samples_split: 2,
            min_samples_leaf: 1,
            subsample: 1.0,
            early_stopping_rounds: 10,
            seed: 42,
        }
    }
}

/// Additive ensemble of shallow trees fitted to residuals.
///
/// With a validation block, the validation RMSE is recorded after every
/// round; training halts once `early_stopping_rounds` rounds pass without
/// improvement and the ensemble is truncated to the best round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    config: BoostingConfig,
    init: f64,
    trees: Vec<RegressionTree>,
    validation_history: Vec<f64>,
    best_iteration: Option<usize>,
    fitted: bool,
}

impl Default for GradientBoosting {
    fn default() -> Self {
        Self::new(BoostingConfig::default())
    }
}

impl GradientBoosting {
    pub const PARAMS: [&'static str; 8] = [
        "n_estimators",
        "learning_rate",
        "max_depth",
        "min_samples_split",
        "min_samples_leaf",
        "subsample",
        "early_stopping_rounds",
        "seed",
    ];

    pub fn new(config: BoostingConfig) -> Self {
        Self {
            config,
            init: 0.0,
            trees: Vec::new(),
            validation_history: Vec::new(),
            best_iteration: None,
            fitted: false,
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.config.n_estimators = n;
        self
    }

    pub fn with_learning_rate(mut self, rate: f64) -> Self {
        self.config.learning_rate = rate;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    pub fn with_early_stopping_rounds(mut self, rounds: usize) -> Self {
        self.config.early_stopping_rounds = rounds;
        self
    }

    pub fn from_params(params: &Hyperparameters) -> Result<Self> {
        check_known(params, ModelFamily::GradientBoosting, &Self::PARAMS)?;
        let mut config = BoostingConfig::default();
        if let Some(v) = param_usize(params, "n_estimators")? {
            config.n_estimators = v;
        }
        if let Some(v) = param_f64(params, "learning_rate") {
            config.learning_rate = v;
        }
        if let Some(v) = param_usize(params, "max_depth")? {
            config.max_depth = v;
        }
        if let Some(v) = param_usize(params, "min_samples_split")? {
            config.min_samples_split = v;
        }
        if let Some(v) = param_usize(params, "min_samples_leaf")? {
            config.min_samples_leaf = v;
        }
        if let Some(v) = param_f64(params, "subsample") {
            config.subsample = v;
        }
        if let Some(v) = param_usize(params, "early_stopping_rounds")? {
            config.early_stopping_rounds = v;
        }
        if let Some(v) = param_f64(params, "seed") {
            config.seed = v as u64;
        }
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &BoostingConfig {
        &self.config
    }

    pub fn hyperparameters(&self) -> Hyperparameters {
        let c = &self.config;
        let mut params = Hyperparameters::new();
        params.insert("n_estimators".into(), c.n_estimators.into());
        params.insert("learning_rate".into(), c.learning_rate.into());
        params.insert("max_depth".into(), c.max_depth.into());
        params.insert("min_samples_split".into(), c.min_samples_split.into());
        params.insert("min_samples_leaf".into(), c.min_samples_leaf.into());
        params.insert("subsample".into(), c.subsample.into());
        params.insert("early_stopping_rounds".into(), c.early_stopping_rounds.into());
        params.insert("seed".into(), ParamValue::Int(c.seed as i64));
        params
    }

    /// Trees kept after fitting.
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Validation RMSE after each round, if a validation block was given.
    pub fn validation_history(&self) -> &[f64] {
        &self.validation_history
    }

    /// Zero-based round with the lowest validation RMSE.
    pub fn best_iteration(&self) -> Option<usize> {
        self.best_iteration
    }

    fn validate_config(&self) -> Result<()> {
        let c = &self.config;
        if c.n_estimators == 0 {
            return Err(PipelineError::InvalidParameter(
                "n_estimators must be at least 1".into(),
            ));
        }
        if !(c.learning_rate > 0.0 && c.learning_rate <= 1.0) {
            return Err(PipelineError::InvalidParameter(
                "learning_rate must be in (0, 1]".into(),
            ));
        }
        if !(c.subsample > 0.0 && c.subsample <= 1.0) {
            return Err(PipelineError::InvalidParameter(
                "subsample must be in (0, 1]".into(),
            ));
        }
        Ok(())
    }

    fn boost(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        validation: Option<(&[Vec<f64>], &[f64])>,
    ) -> Result<()> {
        self.validate_config()?;
        check_training_data(x, y)?;
        if let Some((xv, yv)) = validation {
            if xv.len() != yv.len() {
                return Err(PipelineError::DimensionMismatch {
                    expected: xv.len(),
                    got: yv.len(),
                });
            }
            check_prediction_data(xv, x[0].len())?;
        }

        let c = self.config.clone();
        let n = x.len();
        let tree_config = TreeConfig {
            max_depth: c.max_depth,
            min_samples_split: c.min_samples_split,
            min_samples_leaf: c.min_samples_leaf,
            max_features: None,
        };
        let sample_size = ((n as f64 * c.subsample).round() as usize).clamp(1, n);
        let mut rng = StdRng::seed_from_u64(c.seed);

        let init = y.iter().sum::<f64>() / n as f64;
        let mut current = vec![init; n];
        let mut val_current = validation.map(|(xv, _)| vec![init; xv.len()]);

        let mut trees = Vec::with_capacity(c.n_estimators);
        let mut history = Vec::new();
        let mut best: Option<(usize, f64)> = None;

        for round in 0..c.n_estimators {
            let residuals: Vec<f64> = y.iter().zip(&current).map(|(t, p)| t - p).collect();
            let rows: Vec<usize> = if sample_size < n {
                let mut picked = sample(&mut rng, n, sample_size).into_vec();
                picked.sort_unstable();
                picked
            } else {
                (0..n).collect()
            };

            let tree = RegressionTree::fit(x, &residuals, &rows, tree_config, None)?;
            for (p, row) in current.iter_mut().zip(x) {
                *p += c.learning_rate * tree.predict_row(row);
            }

            if let (Some((xv, yv)), Some(vc)) = (validation, val_current.as_mut()) {
                for (p, row) in vc.iter_mut().zip(xv) {
                    *p += c.learning_rate * tree.predict_row(row);
                }
                let rmse = (yv.iter().zip(vc.iter()).map(|(t, p)| (t - p).powi(2)).sum::<f64>()
                    / yv.len().max(1) as f64)
                    .sqrt();
                history.push(rmse);
                trees.push(tree);

                match best {
                    Some((_, score)) if rmse >= score => {}
                    _ => best = Some((round, rmse)),
                }
                if let Some((best_round, _)) = best {
                    if c.early_stopping_rounds > 0 && round - best_round >= c.early_stopping_rounds {
                        tracing::debug!(round, best_round, "early stopping");
                        break;
                    }
                }
            } else {
                trees.push(tree);
            }
        }

        if let Some((best_round, _)) = best {
            trees.truncate(best_round + 1);
        }

        self.init = init;
        self.trees = trees;
        self.validation_history = history;
        self.best_iteration = best.map(|(r, _)| r);
        self.fitted = true;
        Ok(())
    }
}

impl Regressor for GradientBoosting {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        self.boost(x, y, None)
    }

    fn fit_with_validation(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        x_val: &[Vec<f64>],
        y_val: &[f64],
    ) -> Result<()> {
        if x_val.is_empty() {
            return self.boost(x, y, None);
        }
        self.boost(x, y, Some((x_val, y_val)))
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(PipelineError::FitRequired);
        }
        if let Some(first) = self.trees.first() {
            check_prediction_data(x, first.n_features())?;
        }
        let lr = self.config.learning_rate;
        Ok(x.iter()
            .map(|row| self.init + lr * self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>())
            .collect())
    }

    fn name(&self) -> &str {
        "GradientBoosting"
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        let first = self.trees.first()?;
        let mut totals = vec![0.0; first.n_features()];
        for tree in &self.trees {
            for (total, imp) in totals.iter_mut().zip(tree.raw_importances()) {
                *total += imp;
            }
        }
        Some(normalize(totals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine_data(n: usize, offset: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (offset..offset + n).map(|i| vec![(i % 50) as f64]).collect();
        let y: Vec<f64> = x.iter().map(|r| (r[0] / 8.0).sin() * 10.0).collect();
        (x, y)
    }

    #[test]
    fn boosting_reduces_training_error() {
        let (x, y) = sine_data(100, 0);
        let mut model = GradientBoosting::default().with_n_estimators(50).with_max_depth(3);
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x).unwrap();
        let rmse = (pred.iter().zip(&y).map(|(p, t)| (p - t).powi(2)).sum::<f64>() / 100.0).sqrt();
        assert!(rmse < 2.0, "rmse {}", rmse);
        assert_eq!(model.n_trees(), 50);
    }

    #[test]
    fn early_stopping_halts_on_plateau() {
        let (x, y) = sine_data(100, 0);
        // The validation target is the mirror image of the training target,
        // so every round that fits the training data hurts validation.
        let (x_val, mirrored) = sine_data(20, 0);
        let y_val: Vec<f64> = mirrored.iter().map(|v| -v).collect();
        let mut model = GradientBoosting::default()
            .with_n_estimators(200)
            .with_early_stopping_rounds(5);
        model.fit_with_validation(&x, &y, &x_val, &y_val).unwrap();

        let best = model.best_iteration().unwrap();
        assert!(model.validation_history().len() < 200);
        assert_eq!(model.validation_history().len(), best + 6);
        assert_eq!(model.n_trees(), best + 1);
    }

    #[test]
    fn best_iteration_has_lowest_validation_rmse() {
        let (x, y) = sine_data(120, 0);
        let (xv, yv) = sine_data(30, 7);
        let mut model = GradientBoosting::default().with_n_estimators(40);
        model.fit_with_validation(&x, &y, &xv, &yv).unwrap();
        let history = model.validation_history();
        let best = model.best_iteration().unwrap();
        let min = history.iter().copied().fold(f64::INFINITY, f64::min);
        assert_relative_eq!(history[best], min);
    }

    #[test]
    fn config_is_validated() {
        let (x, y) = sine_data(10, 0);
        let mut model = GradientBoosting::default().with_learning_rate(0.0);
        assert!(model.fit(&x, &y).is_err());
        assert!(!model.is_fitted());
    }

    #[test]
    fn importances_cover_features() {
        let x: Vec<Vec<f64>> = (0..60).map(|i| vec![i as f64, 1.0]).collect();
        let y: Vec<f64> = (0..60).map(|i| i as f64).collect();
        let mut model = GradientBoosting::default().with_n_estimators(10);
        model.fit(&x, &y).unwrap();
        let imp = model.feature_importances().unwrap();
        assert_relative_eq!(imp[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(imp[1], 0.0, epsilon = 1e-12);
    }
}
