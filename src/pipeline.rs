//! Raw records to registered models in one call.

use crate::config::PipelineConfig;
use crate::core::{FeatureTable, RawObservation};
use crate::error::Result;
use crate::features::FeatureEngineer;
use crate::models::ModelFamily;
use crate::preprocess::{PreprocessReport, Preprocessor};
use crate::registry::ModelRegistry;
use crate::training::{compare, ModelComparison, Trainer};
use chrono::{DateTime, Utc};

/// What one pipeline run did.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    pub preprocess: PreprocessReport,
    /// Rows in the feature table.
    pub feature_rows: usize,
    pub comparison: ModelComparison,
    /// Registered `(family, version)` pairs in training order.
    pub registered: Vec<(ModelFamily, u32)>,
    /// Set only when `promote_best` is enabled and the new artifact is no
    /// worse than the family's active one.
    pub promoted: Option<(ModelFamily, u32)>,
}

/// Preprocessing, feature engineering, training, and registration.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    preprocessor: Preprocessor,
    engineer: FeatureEngineer,
    trainer: Trainer,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            preprocessor: Preprocessor::new(config.preprocess.clone())?,
            engineer: FeatureEngineer::new(config.features.clone())?,
            trainer: Trainer::new(config.trainer.clone())?,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Clean raw records and derive features.
    pub fn prepare(&self, raw: &[RawObservation]) -> Result<(FeatureTable, PreprocessReport)> {
        let (table, report) = self.preprocessor.run(raw)?;
        let features = self.engineer.engineer(&table)?;
        Ok((features, report))
    }

    /// Train every configured family and register the results.
    ///
    /// All families are trained before anything is registered, so a failure
    /// leaves `registry` exactly as it was. New artifacts stay `Trained`
    /// unless `promote_best` is set.
    pub fn run(&self, raw: &[RawObservation], registry: &mut ModelRegistry) -> Result<PipelineRun> {
        let (features, preprocess) = self.prepare(raw)?;
        tracing::info!(
            rows = features.len(),
            columns = features.column_names().len(),
            "prepared feature table"
        );

        let outcomes = self.trainer.train_families(&features, &self.config.families)?;
        let comparison = compare(&outcomes);

        let mut registered = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            let family = outcome.family;
            registered.push((family, registry.register(outcome)?));
        }

        let promoted = match comparison.recommended() {
            Some(best) if self.config.promote_best => registered
                .iter()
                .find(|(f, _)| *f == best.family)
                .map(|&(_, v)| (best.family, v))
                .filter(|&(family, version)| no_worse_than_active(registry, family, version)),
            _ => None,
        };
        if let Some((family, version)) = promoted {
            registry.promote(family, version)?;
        }

        Ok(PipelineRun {
            preprocess,
            feature_rows: features.len(),
            comparison,
            registered,
            promoted,
        })
    }

    /// Run only when the retrain policy says a retrain is due.
    ///
    /// `new_samples` counts rows collected since the last training run. The
    /// last run is the newest artifact of any configured family, promoted or
    /// not.
    pub fn run_if_due(
        &self,
        raw: &[RawObservation],
        registry: &mut ModelRegistry,
        new_samples: usize,
        now: DateTime<Utc>,
    ) -> Result<Option<PipelineRun>> {
        let last = self.last_trained_at(registry);
        if !self.config.retrain.should_retrain(last, new_samples, now) {
            tracing::debug!(new_samples, ?last, "retrain not due");
            return Ok(None);
        }
        self.run(raw, registry).map(Some)
    }

    /// Newest training time across the configured families.
    pub fn last_trained_at(&self, registry: &ModelRegistry) -> Option<DateTime<Utc>> {
        self.config
            .families
            .iter()
            .filter_map(|&family| registry.latest(family))
            .map(|artifact| artifact.trained_at())
            .max()
    }
}

/// A candidate may only replace an active artifact whose test RMSE is no lower.
fn no_worse_than_active(registry: &ModelRegistry, family: ModelFamily, version: u32) -> bool {
    let (Some(candidate), Some(active)) = (registry.get(family, version), registry.active(family))
    else {
        return true;
    };
    let no_worse = candidate.metrics().test.rmse <= active.metrics().test.rmse;
    if !no_worse {
        tracing::warn!(
            %family,
            version,
            active = active.version(),
            candidate_rmse = candidate.metrics().test.rmse,
            active_rmse = active.metrics().test.rmse,
            "new artifact is worse than the active one; not promoting"
        );
    }
    no_worse
}
