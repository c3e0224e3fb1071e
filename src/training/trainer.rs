//! End-to-end training of one model family on a feature table.

use super::feature_set::FeatureSet;
use super::metrics::{
    regression_metrics, ComparisonEntry, ModelComparison, OverfitCheck, OverfitReport,
    RegressionMetrics, SplitMetrics,
};
use super::search::{HyperparameterSearch, SearchResult};
use super::split::{split_rows, usable_rows, DatasetBlock, DatasetSplit, SplitRatios};
use crate::core::FeatureTable;
use crate::error::{PipelineError, Result};
use crate::models::{Hyperparameters, Model, ModelFamily, Regressor};
use crate::transform::StandardScaler;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Trainer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub feature_set: FeatureSet,
    pub target: String,
    pub ratios: SplitRatios,
    /// Usable rows required before anything is fitted.
    pub min_training_rows: usize,
    pub overfit: OverfitCheck,
    /// Hyperparameters per family; missing families use defaults.
    pub params: BTreeMap<ModelFamily, Hyperparameters>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            feature_set: FeatureSet::Recommended,
            target: "aqi".to_string(),
            ratios: SplitRatios::default(),
            min_training_rows: 50,
            overfit: OverfitCheck::default(),
            params: BTreeMap::new(),
        }
    }
}

impl TrainerConfig {
    pub fn with_feature_set(mut self, set: FeatureSet) -> Self {
        self.feature_set = set;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_ratios(mut self, ratios: SplitRatios) -> Self {
        self.ratios = ratios;
        self
    }

    pub fn with_min_training_rows(mut self, rows: usize) -> Self {
        self.min_training_rows = rows;
        self
    }

    pub fn with_overfit_ratio(mut self, ratio: f64) -> Self {
        self.overfit = OverfitCheck::new(ratio);
        self
    }

    pub fn with_params(mut self, family: ModelFamily, params: Hyperparameters) -> Self {
        self.params.insert(family, params);
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.ratios.validate()?;
        if self.target.is_empty() {
            return Err(PipelineError::InvalidParameter("target is empty".into()));
        }
        if !(self.overfit.ratio.is_finite() && self.overfit.ratio >= 1.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "overfit ratio must be at least 1, got {}",
                self.overfit.ratio
            )));
        }
        Ok(())
    }
}

/// A fitted model with everything needed to register it.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    pub family: ModelFamily,
    pub model: Model,
    /// Scaler fitted on the training block.
    pub scaler: StandardScaler,
    pub features: Vec<String>,
    pub metrics: SplitMetrics,
    pub overfit: OverfitReport,
    /// Usable rows across all three blocks.
    pub training_rows: usize,
    pub trained_at: DateTime<Utc>,
    pub feature_importances: Option<Vec<(String, f64)>>,
    pub hyperparameters: Hyperparameters,
}

impl TrainingOutcome {
    /// Feature importances sorted from most to least important.
    pub fn ranked_importances(&self) -> Option<Vec<(String, f64)>> {
        let mut ranked = self.feature_importances.clone()?;
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Some(ranked)
    }
}

/// Search result together with the model trained on the winning candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct TuningOutcome {
    pub search: SearchResult,
    pub outcome: TrainingOutcome,
}

/// Resolved features and the split they were cut into.
struct Prepared {
    features: Vec<String>,
    rows: usize,
    split: DatasetSplit,
}

/// Trains and evaluates model families on a feature table.
///
/// # Example
///
/// ```no_run
/// use aqi_forecast::models::ModelFamily;
/// use aqi_forecast::training::{Trainer, TrainerConfig};
/// # fn demo(table: &aqi_forecast::core::FeatureTable) -> aqi_forecast::Result<()> {
/// let trainer = Trainer::new(TrainerConfig::default())?;
/// let outcome = trainer.train(table, ModelFamily::RandomForest)?;
/// println!("test RMSE {:.2}", outcome.metrics.test.rmse);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Fit one family.
    ///
    /// The scaler sees the training block only; validation drives early
    /// stopping and test is touched once for the final metrics.
    pub fn train(&self, table: &FeatureTable, family: ModelFamily) -> Result<TrainingOutcome> {
        let prepared = self.prepare(table, family)?;
        let model = self.configured_model(family, None)?;
        self.fit_prepared(family, model, prepared)
    }

    /// Search hyperparameters, then train with the best candidate.
    ///
    /// The search runs on the training block of the chronological split, so
    /// validation and test rows never influence the chosen parameters. The
    /// winning parameters override any configured for the family.
    pub fn tune(
        &self,
        table: &FeatureTable,
        search: &impl HyperparameterSearch,
    ) -> Result<TuningOutcome> {
        let family = search.family();
        let prepared = self.prepare(table, family)?;
        let result = search.search(&prepared.split.train.x, &prepared.split.train.y)?;
        tracing::info!(
            %family,
            best_score = result.best_score,
            params = ?result.best_params,
            "selected hyperparameters"
        );

        let model = self.configured_model(family, Some(&result.best_params))?;
        let outcome = self.fit_prepared(family, model, prepared)?;
        Ok(TuningOutcome {
            search: result,
            outcome,
        })
    }

    fn prepare(&self, table: &FeatureTable, family: ModelFamily) -> Result<Prepared> {
        let target = self.config.target.as_str();
        table.require_numeric(target)?;
        let features = self.config.feature_set.resolve(table, target)?;

        let rows = usable_rows(table, &features, target)?;
        if rows.len() < self.config.min_training_rows {
            return Err(PipelineError::InsufficientData {
                needed: self.config.min_training_rows,
                got: rows.len(),
            });
        }
        let split = split_rows(table, &features, target, &rows, self.config.ratios)?;
        tracing::debug!(
            %family,
            train = split.train.len(),
            validation = split.validation.len(),
            test = split.test.len(),
            features = features.len(),
            "split feature table"
        );
        Ok(Prepared {
            features,
            rows: rows.len(),
            split,
        })
    }

    fn configured_model(
        &self,
        family: ModelFamily,
        overrides: Option<&Hyperparameters>,
    ) -> Result<Model> {
        let mut params = self.config.params.get(&family).cloned().unwrap_or_default();
        if let Some(overrides) = overrides {
            params.extend(overrides.iter().map(|(k, v)| (k.clone(), *v)));
        }
        if params.is_empty() {
            Ok(Model::new(family))
        } else {
            Model::with_params(family, &params)
        }
    }

    fn fit_prepared(
        &self,
        family: ModelFamily,
        mut model: Model,
        prepared: Prepared,
    ) -> Result<TrainingOutcome> {
        let Prepared {
            features,
            rows,
            split,
        } = prepared;

        let scaler = StandardScaler::fit(&split.train.x)?;
        let train_x = scaler.transform(&split.train.x)?;
        let val_x = scaler.transform(&split.validation.x)?;
        let test_x = scaler.transform(&split.test.x)?;

        model.fit_with_validation(&train_x, &split.train.y, &val_x, &split.validation.y)?;

        let metrics = SplitMetrics {
            train: evaluate(&model, &train_x, &split.train)?,
            validation: evaluate(&model, &val_x, &split.validation)?,
            test: evaluate(&model, &test_x, &split.test)?,
        };
        let overfit = self.config.overfit.evaluate(family, &metrics);

        let feature_importances = model
            .feature_importances()
            .map(|imp| features.iter().cloned().zip(imp).collect());

        tracing::info!(
            %family,
            rows,
            train_rmse = metrics.train.rmse,
            test_rmse = metrics.test.rmse,
            test_r2 = metrics.test.r2,
            "trained model"
        );

        Ok(TrainingOutcome {
            family,
            hyperparameters: model.hyperparameters(),
            model,
            scaler,
            features,
            metrics,
            overfit,
            training_rows: rows,
            trained_at: Utc::now(),
            feature_importances,
        })
    }

    /// Fit each listed family, stopping at the first failure.
    pub fn train_families(
        &self,
        table: &FeatureTable,
        families: &[ModelFamily],
    ) -> Result<Vec<TrainingOutcome>> {
        families.iter().map(|&f| self.train(table, f)).collect()
    }

    /// Fit every family and rank them by test RMSE.
    pub fn train_all(&self, table: &FeatureTable) -> Result<ModelComparison> {
        let outcomes = self.train_families(table, &ModelFamily::ALL)?;
        Ok(compare(&outcomes))
    }
}

/// Rank outcomes by test RMSE.
pub fn compare(outcomes: &[TrainingOutcome]) -> ModelComparison {
    ModelComparison::new(
        outcomes
            .iter()
            .map(|o| ComparisonEntry {
                family: o.family,
                metrics: o.metrics,
                overfit: o.overfit.overfit,
            })
            .collect(),
    )
}

fn evaluate(
    model: &Model,
    x: &[Vec<f64>],
    block: &DatasetBlock,
) -> Result<RegressionMetrics> {
    let predicted = model.predict(x)?;
    regression_metrics(&block.y, &predicted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParamValue;
    use crate::training::{GridSearch, ParamGrid, TimeSeriesSplit};
    use chrono::{Duration, TimeZone};

    fn table(n: usize) -> FeatureTable {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut t = FeatureTable::new(
            vec!["S1".to_string(); n],
            vec!["Delhi".to_string(); n],
            (0..n).map(|h| start + Duration::hours(h as i64)).collect(),
        )
        .unwrap();
        let pm25: Vec<Option<f64>> = (0..n).map(|i| Some(40.0 + ((i * 13) % 50) as f64)).collect();
        let hour: Vec<Option<f64>> = (0..n).map(|i| Some((i % 24) as f64)).collect();
        let aqi = pm25
            .iter()
            .zip(&hour)
            .map(|(p, h)| Some(1.5 * p.unwrap_or(0.0) + h.unwrap_or(0.0)))
            .collect();
        t.push_numeric("pm25", pm25).unwrap();
        t.push_numeric("hour", hour).unwrap();
        t.push_numeric("flat", vec![Some(1.0); n]).unwrap();
        t.push_numeric("aqi", aqi).unwrap();
        t
    }

    fn custom(names: &[&str]) -> TrainerConfig {
        TrainerConfig::default()
            .with_feature_set(FeatureSet::Custom(names.iter().map(|s| s.to_string()).collect()))
    }

    #[test]
    fn ridge_learns_linear_target() {
        let trainer = Trainer::new(custom(&["pm25", "hour"])).unwrap();
        let outcome = trainer.train(&table(120), ModelFamily::Ridge).unwrap();
        assert_eq!(outcome.training_rows, 120);
        assert_eq!(outcome.features, vec!["pm25", "hour"]);
        assert!(outcome.metrics.test.rmse < 1.0, "{:?}", outcome.metrics);
        assert!(outcome.metrics.test.r2 > 0.99);
        assert_eq!(outcome.scaler.n_features(), 2);
    }

    #[test]
    fn forest_reports_importances() {
        let config = custom(&["pm25", "hour"]).with_params(
            ModelFamily::RandomForest,
            [("n_estimators".to_string(), 10usize.into())].into_iter().collect(),
        );
        let outcome = Trainer::new(config)
            .unwrap()
            .train(&table(100), ModelFamily::RandomForest)
            .unwrap();
        let ranked = outcome.ranked_importances().unwrap();
        assert_eq!(ranked[0].0, "pm25");
        let total: f64 = ranked.iter().map(|(_, v)| v).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn too_few_rows() {
        let trainer = Trainer::new(custom(&["pm25"])).unwrap();
        assert_eq!(
            trainer.train(&table(30), ModelFamily::Ridge).unwrap_err(),
            PipelineError::InsufficientData { needed: 50, got: 30 }
        );
    }

    #[test]
    fn constant_features_fail() {
        let trainer = Trainer::new(custom(&["flat"])).unwrap();
        assert_eq!(
            trainer.train(&table(80), ModelFamily::Ridge).unwrap_err(),
            PipelineError::ZeroVariance
        );
    }

    #[test]
    fn unknown_feature_fails() {
        let trainer = Trainer::new(custom(&["pm25", "no2"])).unwrap();
        assert_eq!(
            trainer.train(&table(80), ModelFamily::Ridge).unwrap_err(),
            PipelineError::UnknownFeature("no2".into())
        );
    }

    #[test]
    fn tuning_searches_the_training_block_only() {
        let trainer = Trainer::new(custom(&["pm25", "hour"])).unwrap();
        let table = table(120);
        let grid = ParamGrid::new().with(
            "alpha",
            vec![ParamValue::Float(1000.0), ParamValue::Float(0.01)],
        );
        let search = GridSearch::new(ModelFamily::Ridge, grid).with_cv(TimeSeriesSplit::expanding(3));

        let tuned = trainer.tune(&table, &search).unwrap();
        assert_eq!(tuned.search.best_params["alpha"], ParamValue::Float(0.01));
        assert_eq!(tuned.outcome.hyperparameters["alpha"], ParamValue::Float(0.01));
        assert_eq!(tuned.outcome.family, ModelFamily::Ridge);
        assert!(tuned.outcome.metrics.test.rmse < 1.0);

        // 120 usable rows leave 84 for training; 84 folds need 85 rows.
        let single = ParamGrid::new().with("alpha", vec![ParamValue::Float(1.0)]);
        let wide = GridSearch::new(ModelFamily::Ridge, single).with_cv(TimeSeriesSplit::expanding(84));
        assert_eq!(
            trainer.tune(&table, &wide).unwrap_err(),
            PipelineError::InsufficientData { needed: 85, got: 84 }
        );
    }

    #[test]
    fn config_validation() {
        assert!(Trainer::new(TrainerConfig::default().with_overfit_ratio(0.5)).is_err());
        assert!(Trainer::new(TrainerConfig::default().with_target("")).is_err());
    }
}
