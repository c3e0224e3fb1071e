//! Configuration for a full pipeline run.

use crate::error::{PipelineError, Result};
use crate::features::FeatureConfig;
use crate::models::ModelFamily;
use crate::preprocess::PreprocessConfig;
use crate::training::{RetrainPolicy, TrainerConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for every stage. Missing JSON fields take their defaults.
///
/// # Example
///
/// ```
/// use aqi_forecast::config::PipelineConfig;
/// use aqi_forecast::models::ModelFamily;
///
/// let config = PipelineConfig::from_json(
///     r#"{"families": ["ridge"], "trainer": {"min_training_rows": 80}}"#,
/// )
/// .unwrap();
/// assert_eq!(config.families, vec![ModelFamily::Ridge]);
/// assert_eq!(config.trainer.min_training_rows, 80);
/// assert_eq!(config.trainer.target, "aqi");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub preprocess: PreprocessConfig,
    pub features: FeatureConfig,
    pub trainer: TrainerConfig,
    pub retrain: RetrainPolicy,
    /// Families trained on each run.
    pub families: Vec<ModelFamily>,
    /// Promote the family with the lowest test RMSE after training. Off by
    /// default: new artifacts stay `Trained` until promoted by the caller.
    pub promote_best: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            preprocess: PreprocessConfig::default(),
            features: FeatureConfig::default(),
            trainer: TrainerConfig::default(),
            retrain: RetrainPolicy::default(),
            families: ModelFamily::ALL.to_vec(),
            promote_best: false,
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_families(mut self, families: Vec<ModelFamily>) -> Self {
        self.families = families;
        self
    }

    pub fn with_trainer(mut self, trainer: TrainerConfig) -> Self {
        self.trainer = trainer;
        self
    }

    pub fn with_retrain(mut self, retrain: RetrainPolicy) -> Self {
        self.retrain = retrain;
        self
    }

    pub fn with_promote_best(mut self, promote: bool) -> Self {
        self.promote_best = promote;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.preprocess.validate()?;
        self.features.validate()?;
        self.trainer.validate()?;
        if self.families.is_empty() {
            return Err(PipelineError::InvalidParameter(
                "at least one model family is required".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_json() {
        let config = PipelineConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(PipelineConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn empty_document_is_default() {
        let config = PipelineConfig::from_json("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert!(!config.promote_best);
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(PipelineConfig::from_json(r#"{"families": []}"#).is_err());
        assert!(PipelineConfig::from_json(r#"{"families": ["arima"]}"#).is_err());
        assert!(matches!(
            PipelineConfig::from_json("not json"),
            Err(PipelineError::Serialization(_))
        ));
    }
}
