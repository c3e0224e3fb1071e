//! Stacked ensemble: a ridge meta-learner over out-of-fold base predictions.

use super::boosting::{BoostingConfig, GradientBoosting};
use super::forest::{ForestConfig, RandomForest};
use super::ridge::RidgeRegression;
use super::traits::{
    check_known, check_prediction_data, check_training_data, param_f64, param_usize,
    Hyperparameters, ModelFamily, Regressor,
};
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Stacking hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackingConfig {
    /// Contiguous folds used to produce out-of-fold predictions.
    pub n_folds: usize,
    /// Penalty of the ridge meta-learner.
    pub meta_alpha: f64,
    pub seed: u64,
}

impl Default for StackingConfig {
    fn default() -> Self {
        Self {
            n_folds: 5,
            meta_alpha: 0.5,
            seed: 42,
        }
    }
}

/// Ridge, random forest, and gradient boosting combined by a ridge
/// meta-learner.
///
/// The meta-learner is fitted on predictions each base learner made for
/// rows it was not trained on; the base learners are then refitted on the
/// whole training block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackingEnsemble {
    config: StackingConfig,
    ridge: RidgeRegression,
    forest: RandomForest,
    boosting: GradientBoosting,
    meta: RidgeRegression,
}

impl Default for StackingEnsemble {
    fn default() -> Self {
        Self::new(StackingConfig::default())
    }
}

impl StackingEnsemble {
    pub const PARAMS: [&'static str; 3] = ["n_folds", "meta_alpha", "seed"];

    pub fn new(config: StackingConfig) -> Self {
        let forest = RandomForest::new(ForestConfig {
            n_estimators: 50,
            max_depth: 10,
            seed: config.seed,
            ..Default::default()
        });
        let boosting = GradientBoosting::new(BoostingConfig {
            n_estimators: 50,
            max_depth: 4,
            seed: config.seed,
            ..Default::default()
        });
        Self {
            meta: RidgeRegression::new(config.meta_alpha),
            ridge: RidgeRegression::new(1.0),
            forest,
            boosting,
            config,
        }
    }

    pub fn from_params(params: &Hyperparameters) -> Result<Self> {
        check_known(params, ModelFamily::Stacking, &Self::PARAMS)?;
        let mut config = StackingConfig::default();
        if let Some(v) = param_usize(params, "n_folds")? {
            config.n_folds = v;
        }
        if let Some(v) = param_f64(params, "meta_alpha") {
            config.meta_alpha = v;
        }
        if let Some(v) = param_f64(params, "seed") {
            config.seed = v as u64;
        }
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &StackingConfig {
        &self.config
    }

    pub fn hyperparameters(&self) -> Hyperparameters {
        let mut params = Hyperparameters::new();
        params.insert("n_folds".into(), self.config.n_folds.into());
        params.insert("meta_alpha".into(), self.config.meta_alpha.into());
        params.insert("seed".into(), (self.config.seed as i64).into());
        params
    }

    /// Weights the meta-learner gives to ridge, forest, and boosting.
    pub fn meta_weights(&self) -> Option<&[f64]> {
        self.meta.coefficients()
    }

    fn base_predictions(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let r = self.ridge.predict(x)?;
        let f = self.forest.predict(x)?;
        let b = self.boosting.predict(x)?;
        Ok((0..x.len()).map(|i| vec![r[i], f[i], b[i]]).collect())
    }

    fn fresh_bases(&self) -> (RidgeRegression, RandomForest, GradientBoosting) {
        let fresh = Self::new(self.config.clone());
        (fresh.ridge, fresh.forest, fresh.boosting)
    }
}

/// Contiguous `(start, end)` fold bounds covering `0..n`.
pub(crate) fn contiguous_folds(n: usize, k: usize) -> Vec<(usize, usize)> {
    let base = n / k;
    let extra = n % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for f in 0..k {
        let size = base + usize::from(f < extra);
        folds.push((start, start + size));
        start += size;
    }
    folds
}

impl Regressor for StackingEnsemble {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        check_training_data(x, y)?;
        let k = self.config.n_folds;
        if k < 2 {
            return Err(PipelineError::InvalidParameter("n_folds must be at least 2".into()));
        }
        if x.len() < 2 * k {
            return Err(PipelineError::InsufficientData {
                needed: 2 * k,
                got: x.len(),
            });
        }

        let mut oof = vec![Vec::new(); x.len()];
        for (start, end) in contiguous_folds(x.len(), k) {
            let train_x: Vec<Vec<f64>> = x[..start].iter().chain(&x[end..]).cloned().collect();
            let train_y: Vec<f64> = y[..start].iter().chain(&y[end..]).copied().collect();
            let (mut ridge, mut forest, mut boosting) = self.fresh_bases();
            ridge.fit(&train_x, &train_y)?;
            forest.fit(&train_x, &train_y)?;
            boosting.fit(&train_x, &train_y)?;

            let held = &x[start..end];
            let r = ridge.predict(held)?;
            let f = forest.predict(held)?;
            let b = boosting.predict(held)?;
            for (j, row) in (start..end).enumerate() {
                oof[row] = vec![r[j], f[j], b[j]];
            }
        }

        let mut meta = RidgeRegression::new(self.config.meta_alpha);
        meta.fit(&oof, y)?;

        let (mut ridge, mut forest, mut boosting) = self.fresh_bases();
        ridge.fit(x, y)?;
        forest.fit(x, y)?;
        boosting.fit(x, y)?;

        self.ridge = ridge;
        self.forest = forest;
        self.boosting = boosting;
        self.meta = meta;
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        if !self.meta.is_fitted() {
            return Err(PipelineError::FitRequired);
        }
        let n_features = self.ridge.coefficients().map_or(0, |c| c.len());
        check_prediction_data(x, n_features)?;
        self.meta.predict(&self.base_predictions(x)?)
    }

    fn name(&self) -> &str {
        "Stacking"
    }

    fn is_fitted(&self) -> bool {
        self.meta.is_fitted()
    }
}
