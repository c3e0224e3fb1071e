//! Random forest regression: bagged CART trees.

use super::traits::{
    check_known, check_prediction_data, check_training_data, param_f64, param_usize,
    Hyperparameters, ModelFamily, ParamValue, Regressor,
};
use super::tree::{RegressionTree, TreeConfig};
use crate::error::{PipelineError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Random forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features tried per split; `None` uses all of them.
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 15,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }
}

/// Bootstrap-aggregated regression trees.
///
/// Each tree is grown on a bootstrap sample drawn from a `StdRng` seeded from
/// the configured seed and the tree index, so a forest is reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<RegressionTree>,
    importances: Option<Vec<f64>>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(ForestConfig::default())
    }
}

impl RandomForest {
    pub const PARAMS: [&'static str; 6] = [
        "n_estimators",
        "max_depth",
        "min_samples_split",
        "min_samples_leaf",
        "max_features",
        "seed",
    ];

    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            importances: None,
        }
    }

    /// Set the number of trees.
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.config.n_estimators = n;
        self
    }

    /// Set the maximum tree depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Build from named hyperparameters, starting from the defaults.
    pub fn from_params(params: &Hyperparameters) -> Result<Self> {
        check_known(params, ModelFamily::RandomForest, &Self::PARAMS)?;
        let mut config = ForestConfig::default();
        if let Some(v) = param_usize(params, "n_estimators")? {
            config.n_estimators = v;
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
        if let Some(v) = param_usize(params, "max_features")? {
            config.max_features = Some(v);
        }
        if let Some(v) = param_f64(params, "seed") {
            config.seed = v as u64;
        }
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Current hyperparameters as named values.
    pub fn hyperparameters(&self) -> Hyperparameters {
        let c = &self.config;
        let mut params = Hyperparameters::new();
        params.insert("n_estimators".into(), c.n_estimators.into());
        params.insert("max_depth".into(), c.max_depth.into());
        params.insert("min_samples_split".into(), c.min_samples_split.into());
        params.insert("min_samples_leaf".into(), c.min_samples_leaf.into());
        if let Some(m) = c.max_features {
            params.insert("max_features".into(), m.into());
        }
        params.insert("seed".into(), ParamValue::Int(c.seed as i64));
        params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            min_samples_leaf: self.config.min_samples_leaf,
            max_features: self.config.max_features,
        }
    }
}

impl Regressor for RandomForest {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        if self.config.n_estimators == 0 {
            return Err(PipelineError::InvalidParameter(
                "n_estimators must be at least 1".into(),
            ));
        }
        let k = check_training_data(x, y)?;
        let n = x.len();
        let tree_config = self.tree_config();

        let mut trees = Vec::with_capacity(self.config.n_estimators);
        let mut totals = vec![0.0; k];
        for t in 0..self.config.n_estimators {
            let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(t as u64));
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let tree = RegressionTree::fit(x, y, &sample, tree_config, Some(&mut rng))?;
            for (total, imp) in totals.iter_mut().zip(tree.raw_importances()) {
                *total += imp;
            }
            trees.push(tree);
        }

        self.importances = Some(normalize(totals));
        self.trees = trees;
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let first = self.trees.first().ok_or(PipelineError::FitRequired)?;
        check_prediction_data(x, first.n_features())?;
        let n_trees = self.trees.len() as f64;
        Ok(x.iter()
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees)
            .collect())
    }

    fn name(&self) -> &str {
        "RandomForest"
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.importances.clone()
    }
}

/// Scale to sum to one; all-zero input becomes uniform.
pub(crate) fn normalize(values: Vec<f64>) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.into_iter().map(|v| v / total).collect()
    } else {
        let k = values.len().max(1) as f64;
        vec![1.0 / k; values.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..80)
            .map(|i| vec![i as f64, ((i * 13) % 7) as f64])
            .collect();
        let y: Vec<f64> = x.iter().map(|r| 2.0 * r[0] + 5.0).collect();
        (x, y)
    }

    #[test]
    fn fits_and_predicts_reasonably() {
        let (x, y) = data();
        let mut forest = RandomForest::default().with_n_estimators(20);
        forest.fit(&x, &y).unwrap();
        let pred = forest.predict(&x).unwrap();
        let mae: f64 = pred.iter().zip(&y).map(|(p, t)| (p - t).abs()).sum::<f64>() / y.len() as f64;
        assert!(mae < 5.0, "mae {}", mae);
    }

    #[test]
    fn same_seed_same_forest() {
        let (x, y) = data();
        let mut a = RandomForest::default().with_n_estimators(5).with_seed(3);
        let mut b = RandomForest::default().with_n_estimators(5).with_seed(3);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn importances_sum_to_one_and_favour_signal() {
        let (x, y) = data();
        let mut forest = RandomForest::default().with_n_estimators(10);
        forest.fit(&x, &y).unwrap();
        let imp = forest.feature_importances().unwrap();
        assert_relative_eq!(imp.iter().sum::<f64>(), 1.0, epsilon = 1e-10);
        assert!(imp[0] > imp[1]);
    }

    #[test]
    fn params_are_validated() {
        let mut params = Hyperparameters::new();
        params.insert("max_depth".into(), ParamValue::Int(4));
        let forest = RandomForest::from_params(&params).unwrap();
        assert_eq!(forest.config().max_depth, 4);
        assert_eq!(forest.hyperparameters()["max_depth"], ParamValue::Int(4));

        params.insert("learning_rate".into(), ParamValue::Float(0.1));
        assert!(RandomForest::from_params(&params).is_err());
    }

    #[test]
    fn predict_before_fit_fails() {
        assert_eq!(
            RandomForest::default().predict(&[vec![1.0]]),
            Err(PipelineError::FitRequired)
        );
    }
}
