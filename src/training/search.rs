//! Grid and randomized hyperparameter search scored on time-series folds.

use super::cross_validation::TimeSeriesSplit;
use super::metrics::rmse;
use crate::error::{PipelineError, Result};
use crate::models::{Hyperparameters, Model, ModelFamily, ParamValue, Regressor};
use crate::transform::StandardScaler;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declared values per hyperparameter; candidates are the cartesian product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    params: BTreeMap<String, Vec<ParamValue>>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hyperparameter and the values to try.
    pub fn with(mut self, name: impl Into<String>, values: Vec<ParamValue>) -> Self {
        self.params.insert(name.into(), values);
        self
    }

    /// Random forest grid used for tuning the production model.
    pub fn random_forest() -> Self {
        let ints = |v: &[i64]| v.iter().map(|&i| ParamValue::Int(i)).collect();
        Self::new()
            .with("n_estimators", ints(&[50, 100, 150]))
            .with("max_depth", ints(&[10, 15, 20]))
            .with("min_samples_split", ints(&[2, 5, 10]))
            .with("min_samples_leaf", ints(&[1, 2, 4]))
    }

    /// Number of candidates the grid expands to.
    pub fn n_candidates(&self) -> usize {
        if self.params.is_empty() {
            return 0;
        }
        self.params.values().map(Vec::len).product()
    }

    /// Every combination, in a stable order (last parameter varies fastest).
    pub fn candidates(&self) -> Vec<Hyperparameters> {
        if self.params.is_empty() {
            return Vec::new();
        }
        let mut out = vec![Hyperparameters::new()];
        for (name, values) in &self.params {
            out = out
                .into_iter()
                .flat_map(|base| {
                    values.iter().map(move |v| {
                        let mut next = base.clone();
                        next.insert(name.clone(), *v);
                        next
                    })
                })
                .collect();
        }
        out
    }
}

/// Sampling distribution for one hyperparameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamDistribution {
    /// Pick one of the listed values.
    Choice { values: Vec<ParamValue> },
    /// Integer in `[low, high]`.
    IntRange { low: i64, high: i64 },
    /// Float in `[low, high)`.
    Uniform { low: f64, high: f64 },
}

impl ParamDistribution {
    fn validate(&self, name: &str) -> Result<()> {
        let ok = match self {
            ParamDistribution::Choice { values } => !values.is_empty(),
            ParamDistribution::IntRange { low, high } => low <= high,
            ParamDistribution::Uniform { low, high } => low < high,
        };
        if ok {
            Ok(())
        } else {
            Err(PipelineError::InvalidParameter(format!(
                "empty distribution for '{}'",
                name
            )))
        }
    }

    fn sample(&self, rng: &mut StdRng) -> ParamValue {
        match self {
            ParamDistribution::Choice { values } => values[rng.gen_range(0..values.len())],
            ParamDistribution::IntRange { low, high } => ParamValue::Int(rng.gen_range(*low..=*high)),
            ParamDistribution::Uniform { low, high } => ParamValue::Float(rng.gen_range(*low..*high)),
        }
    }
}

/// Score of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub params: Hyperparameters,
    /// Validation RMSE on each fold.
    pub fold_rmse: Vec<f64>,
    pub mean_rmse: f64,
}

/// Outcome of a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub best_params: Hyperparameters,
    /// Mean fold RMSE of the best candidate.
    pub best_score: f64,
    /// Every candidate in evaluation order.
    pub candidates: Vec<CandidateScore>,
}

/// A hyperparameter search for one model family.
///
/// Implementations take time-ordered, unscaled rows. Each fold fits its own
/// scaler on its training rows, so no fold sees statistics from its
/// validation rows.
pub trait HyperparameterSearch {
    fn family(&self) -> ModelFamily;

    fn search(&self, x: &[Vec<f64>], y: &[f64]) -> Result<SearchResult>;
}

/// Exhaustive search over a [`ParamGrid`].
#[derive(Debug, Clone, PartialEq)]
pub struct GridSearch {
    pub family: ModelFamily,
    pub grid: ParamGrid,
    pub cv: TimeSeriesSplit,
}

impl GridSearch {
    pub fn new(family: ModelFamily, grid: ParamGrid) -> Self {
        Self {
            family,
            grid,
            cv: TimeSeriesSplit::default(),
        }
    }

    pub fn with_cv(mut self, cv: TimeSeriesSplit) -> Self {
        self.cv = cv;
        self
    }

    /// Score every grid candidate on `x`/`y`, which must be time ordered
    /// and unscaled.
    pub fn fit(&self, x: &[Vec<f64>], y: &[f64]) -> Result<SearchResult> {
        let candidates = self.grid.candidates();
        tracing::info!(
            family = %self.family,
            candidates = candidates.len(),
            "starting grid search"
        );
        score_candidates(self.family, candidates, x, y, &self.cv)
    }
}

/// Search over `n_iter` candidates sampled from seeded distributions.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomizedSearch {
    pub family: ModelFamily,
    pub distributions: BTreeMap<String, ParamDistribution>,
    pub n_iter: usize,
    pub seed: u64,
    pub cv: TimeSeriesSplit,
}

impl RandomizedSearch {
    pub fn new(family: ModelFamily, n_iter: usize) -> Self {
        Self {
            family,
            distributions: BTreeMap::new(),
            n_iter,
            seed: 42,
            cv: TimeSeriesSplit::default(),
        }
    }

    pub fn with_distribution(mut self, name: impl Into<String>, dist: ParamDistribution) -> Self {
        self.distributions.insert(name.into(), dist);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_cv(mut self, cv: TimeSeriesSplit) -> Self {
        self.cv = cv;
        self
    }

    /// Draw the candidates this search would evaluate.
    pub fn sample_candidates(&self) -> Result<Vec<Hyperparameters>> {
        for (name, dist) in &self.distributions {
            dist.validate(name)?;
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        Ok((0..self.n_iter)
            .map(|_| {
                self.distributions
                    .iter()
                    .map(|(name, dist)| (name.clone(), dist.sample(&mut rng)))
                    .collect()
            })
            .collect())
    }

    pub fn fit(&self, x: &[Vec<f64>], y: &[f64]) -> Result<SearchResult> {
        let candidates = self.sample_candidates()?;
        tracing::info!(
            family = %self.family,
            n_iter = self.n_iter,
            seed = self.seed,
            "starting randomized search"
        );
        score_candidates(self.family, candidates, x, y, &self.cv)
    }
}

impl HyperparameterSearch for GridSearch {
    fn family(&self) -> ModelFamily {
        self.family
    }

    fn search(&self, x: &[Vec<f64>], y: &[f64]) -> Result<SearchResult> {
        self.fit(x, y)
    }
}

impl HyperparameterSearch for RandomizedSearch {
    fn family(&self) -> ModelFamily {
        self.family
    }

    fn search(&self, x: &[Vec<f64>], y: &[f64]) -> Result<SearchResult> {
        self.fit(x, y)
    }
}

fn score_candidates(
    family: ModelFamily,
    candidates: Vec<Hyperparameters>,
    x: &[Vec<f64>],
    y: &[f64],
    cv: &TimeSeriesSplit,
) -> Result<SearchResult> {
    if candidates.is_empty() {
        return Err(PipelineError::InvalidParameter(
            "search has no candidates".into(),
        ));
    }
    if x.len() != y.len() {
        return Err(PipelineError::DimensionMismatch {
            expected: x.len(),
            got: y.len(),
        });
    }
    let folds = cv.split(x.len())?;
    let scaled_folds = folds
        .iter()
        .map(|fold| -> Result<(Vec<Vec<f64>>, Vec<Vec<f64>>)> {
            let scaler = StandardScaler::fit(&x[fold.train.clone()])?;
            Ok((
                scaler.transform(&x[fold.train.clone()])?,
                scaler.transform(&x[fold.validation.clone()])?,
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut scored = Vec::with_capacity(candidates.len());
    for params in candidates {
        // Reject unknown names before spending time on folds.
        Model::with_params(family, &params)?;

        let mut fold_rmse = Vec::with_capacity(folds.len());
        for (fold, (train_x, val_x)) in folds.iter().zip(&scaled_folds) {
            let mut model = Model::with_params(family, &params)?;
            model.fit(train_x, &y[fold.train.clone()])?;
            let pred = model.predict(val_x)?;
            fold_rmse.push(rmse(&y[fold.validation.clone()], &pred));
        }
        let mean_rmse = fold_rmse.iter().sum::<f64>() / fold_rmse.len() as f64;
        tracing::debug!(%family, ?params, mean_rmse, "scored candidate");
        scored.push(CandidateScore {
            params,
            fold_rmse,
            mean_rmse,
        });
    }

    let best = scored
        .iter()
        .enumerate()
        .min_by(|(ia, a), (ib, b)| {
            a.mean_rmse
                .partial_cmp(&b.mean_rmse)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(ia.cmp(ib))
        })
        .map(|(_, c)| c.clone())
        .ok_or_else(|| PipelineError::ComputationError("no candidate scored".into()))?;

    Ok(SearchResult {
        best_params: best.params,
        best_score: best.mean_rmse,
        candidates: scored,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn data(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..n)
            .map(|i| vec![(i % 24) as f64, ((i * 7) % 11) as f64])
            .collect();
        let y = x.iter().map(|r| 4.0 * r[0] + r[1]).collect();
        (x, y)
    }

    #[test]
    fn grid_expands_cartesian_product() {
        let grid = ParamGrid::random_forest();
        assert_eq!(grid.n_candidates(), 81);
        let candidates = grid.candidates();
        assert_eq!(candidates.len(), 81);
        assert_eq!(candidates[0]["max_depth"], ParamValue::Int(10));
        assert_eq!(candidates[1]["n_estimators"], ParamValue::Int(100));
        assert!(ParamGrid::new().candidates().is_empty());
    }

    #[test]
    fn grid_search_prefers_less_regularised_ridge() {
        let (x, y) = data(60);
        let grid = ParamGrid::new().with(
            "alpha",
            vec![ParamValue::Float(1000.0), ParamValue::Float(0.01)],
        );
        let result = GridSearch::new(ModelFamily::Ridge, grid)
            .with_cv(TimeSeriesSplit::expanding(3))
            .fit(&x, &y)
            .unwrap();
        assert_eq!(result.candidates.len(), 2);
        assert_eq!(result.best_params["alpha"], ParamValue::Float(0.01));
        assert_eq!(result.candidates[0].fold_rmse.len(), 3);
        assert!(result.best_score < result.candidates[0].mean_rmse);
    }

    #[test]
    fn folds_are_scaled_on_their_own_training_rows() {
        let (x, y) = data(60);
        let stretched: Vec<Vec<f64>> = x
            .iter()
            .map(|r| vec![r[0] * 1000.0 + 5.0, r[1] * 0.001])
            .collect();
        let grid = ParamGrid::new().with("alpha", vec![ParamValue::Float(1.0)]);
        let search = GridSearch::new(ModelFamily::Ridge, grid).with_cv(TimeSeriesSplit::expanding(3));

        let a = search.fit(&x, &y).unwrap();
        let b = search.search(&stretched, &y).unwrap();
        for (fa, fb) in a.candidates[0].fold_rmse.iter().zip(&b.candidates[0].fold_rmse) {
            assert_relative_eq!(*fa, *fb, epsilon = 1e-6);
        }
    }

    #[test]
    fn randomized_search_is_seeded() {
        let search = RandomizedSearch::new(ModelFamily::RandomForest, 4)
            .with_distribution("n_estimators", ParamDistribution::IntRange { low: 3, high: 8 })
            .with_distribution(
                "max_depth",
                ParamDistribution::Choice {
                    values: vec![ParamValue::Int(3), ParamValue::Int(5)],
                },
            );
        let a = search.sample_candidates().unwrap();
        let b = search.sample_candidates().unwrap();
        assert_eq!(a, b);
        for c in &a {
            let n = c["n_estimators"].as_usize().unwrap();
            assert!((3..=8).contains(&n));
        }

        let (x, y) = data(48);
        let result = search.with_cv(TimeSeriesSplit::expanding(2)).fit(&x, &y).unwrap();
        assert_eq!(result.candidates.len(), 4);
        assert!(result.best_score.is_finite());
    }

    #[test]
    fn unknown_parameter_rejected() {
        let (x, y) = data(30);
        let grid = ParamGrid::new().with("depth", vec![ParamValue::Int(3)]);
        assert!(GridSearch::new(ModelFamily::RandomForest, grid).fit(&x, &y).is_err());
    }

    #[test]
    fn empty_uniform_rejected() {
        let search = RandomizedSearch::new(ModelFamily::Ridge, 2)
            .with_distribution("alpha", ParamDistribution::Uniform { low: 1.0, high: 1.0 });
        assert!(search.sample_candidates().is_err());
    }
}
