//! Versioned model artifacts and serving-side prediction.

use crate::core::{FeatureSchema, FeatureTable};
use crate::error::{PipelineError, Result};
use crate::features::AqiCategory;
use crate::models::{Hyperparameters, Model, ModelFamily, Regressor};
use crate::training::{SplitMetrics, TrainingOutcome};
use crate::transform::StandardScaler;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactState {
    /// Registered but never served.
    Trained,
    /// The artifact served for its family.
    Active,
    /// Was active, replaced by a later promotion.
    Superseded,
}

/// Named feature values for one prediction, in the caller's order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    entries: Vec<(String, f64)>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a feature.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.entries.push((name.into(), value));
        self
    }

    /// Vector for one row of a feature table, in schema order.
    ///
    /// Fails if a feature is missing from the table or null at that row.
    pub fn from_table_row(table: &FeatureTable, row: usize, schema: &FeatureSchema) -> Result<Self> {
        let values = table.row_values(row, schema.names())?;
        schema
            .names()
            .iter()
            .zip(values)
            .map(|(name, value)| {
                value.map(|v| (name.clone(), v)).ok_or_else(|| {
                    PipelineError::InvalidParameter(format!(
                        "feature '{}' is null at row {}",
                        name, row
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(|entries| Self { entries })
    }

    pub fn push(&mut self, name: impl Into<String>, value: f64) {
        self.entries.push((name.into(), value));
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(n, v)| (n.into(), v)).collect(),
        }
    }
}

/// A prediction with its AQI band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub value: f64,
    pub category: AqiCategory,
}

/// A fitted model frozen together with its scaler, schema, and metrics.
///
/// Only the lifecycle state changes after registration, and only through
/// the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    family: ModelFamily,
    version: u32,
    state: ArtifactState,
    model: Model,
    scaler: StandardScaler,
    schema: FeatureSchema,
    metrics: SplitMetrics,
    trained_at: DateTime<Utc>,
    training_rows: usize,
    feature_importances: Option<Vec<(String, f64)>>,
    hyperparameters: Option<Hyperparameters>,
}

impl ModelArtifact {
    pub(crate) fn from_outcome(
        outcome: TrainingOutcome,
        version: u32,
        schema: FeatureSchema,
    ) -> Self {
        Self {
            family: outcome.family,
            version,
            state: ArtifactState::Trained,
            model: outcome.model,
            scaler: outcome.scaler,
            schema,
            metrics: outcome.metrics,
            trained_at: outcome.trained_at,
            training_rows: outcome.training_rows,
            feature_importances: outcome.feature_importances,
            hyperparameters: Some(outcome.hyperparameters),
        }
    }

    pub(crate) fn set_state(&mut self, state: ArtifactState) {
        self.state = state;
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn state(&self) -> ArtifactState {
        self.state
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn metrics(&self) -> &SplitMetrics {
        &self.metrics
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn training_rows(&self) -> usize {
        self.training_rows
    }

    pub fn feature_importances(&self) -> Option<&[(String, f64)]> {
        self.feature_importances.as_deref()
    }

    pub fn hyperparameters(&self) -> Option<&Hyperparameters> {
        self.hyperparameters.as_ref()
    }

    /// Predict one row.
    ///
    /// The vector's names must match the schema exactly, in order.
    pub fn predict(&self, features: &FeatureVector) -> Result<f64> {
        let row = self.scaled_row(features)?;
        let out = self.model.predict(&[row])?;
        out.first()
            .copied()
            .ok_or_else(|| PipelineError::ComputationError("model returned no prediction".into()))
    }

    /// Predict many rows; any mismatched row fails the whole batch.
    pub fn predict_batch(&self, rows: &[FeatureVector]) -> Result<Vec<f64>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let scaled = rows
            .iter()
            .map(|r| self.scaled_row(r))
            .collect::<Result<Vec<_>>>()?;
        self.model.predict(&scaled)
    }

    /// Predict one row and attach its AQI band.
    pub fn forecast(&self, features: &FeatureVector) -> Result<Forecast> {
        let value = self.predict(features)?;
        let category = AqiCategory::from_aqi(value).ok_or_else(|| {
            PipelineError::ComputationError(format!("non-finite prediction {}", value))
        })?;
        Ok(Forecast { value, category })
    }

    fn scaled_row(&self, features: &FeatureVector) -> Result<Vec<f64>> {
        self.schema.validate(&features.names())?;
        let values = features.values();
        if let Some((name, _)) = features.entries.iter().find(|(_, v)| !v.is_finite()) {
            return Err(PipelineError::InvalidParameter(format!(
                "feature '{}' is not finite",
                name
            )));
        }
        self.scaler.transform_row(&values)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::training::{OverfitReport, RegressionMetrics};

    pub(crate) fn fitted_outcome(family: ModelFamily, features: &[&str]) -> TrainingOutcome {
        let k = features.len();
        let x: Vec<Vec<f64>> = (0..40)
            .map(|i| (0..k).map(|j| ((i * (j + 3)) % 17) as f64).collect())
            .collect();
        let y: Vec<f64> = x.iter().map(|r| 10.0 + r.iter().sum::<f64>() * 3.0).collect();
        let scaler = StandardScaler::fit(&x).unwrap();
        let mut model = Model::new(family);
        model.fit(&scaler.transform(&x).unwrap(), &y).unwrap();
        let block = RegressionMetrics {
            mae: 1.0,
            rmse: 1.0,
            r2: 0.9,
        };
        TrainingOutcome {
            family,
            hyperparameters: model.hyperparameters(),
            model,
            scaler,
            features: features.iter().map(|s| s.to_string()).collect(),
            metrics: SplitMetrics {
                train: block,
                validation: block,
                test: block,
            },
            overfit: OverfitReport {
                train_rmse: 1.0,
                test_rmse: 1.0,
                ratio: 1.3,
                overfit: false,
            },
            training_rows: 40,
            trained_at: Utc::now(),
            feature_importances: None,
        }
    }

    fn artifact() -> ModelArtifact {
        let outcome = fitted_outcome(ModelFamily::Ridge, &["pm25", "hour"]);
        let schema = FeatureSchema::new(1, outcome.features.clone()).unwrap();
        ModelArtifact::from_outcome(outcome, 1, schema)
    }

    #[test]
    fn predicts_with_matching_schema() {
        let a = artifact();
        let v = FeatureVector::new().with("pm25", 4.0).with("hour", 2.0);
        let pred = a.predict(&v).unwrap();
        assert!((pred - 28.0).abs() < 1.5, "prediction {}", pred);

        let f = a.forecast(&v).unwrap();
        assert_eq!(f.category, AqiCategory::Good);
        assert_eq!(a.predict_batch(&[v.clone(), v]).unwrap().len(), 2);
    }

    #[test]
    fn rejects_reordered_and_partial_vectors() {
        let a = artifact();
        let reordered = FeatureVector::new().with("hour", 2.0).with("pm25", 4.0);
        assert!(matches!(
            a.predict(&reordered),
            Err(PipelineError::FeatureMismatch { .. })
        ));
        let partial: FeatureVector = [("pm25", 4.0)].into_iter().collect();
        assert!(matches!(
            a.predict(&partial),
            Err(PipelineError::FeatureMismatch { .. })
        ));
    }

    #[test]
    fn rejects_non_finite_values() {
        let a = artifact();
        let v = FeatureVector::new().with("pm25", f64::NAN).with("hour", 2.0);
        assert!(matches!(a.predict(&v), Err(PipelineError::InvalidParameter(_))));
    }
}
