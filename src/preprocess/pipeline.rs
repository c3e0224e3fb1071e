//! The preprocessing stage: coerce, handle outliers, check, impute.

use super::coerce::{coerce, CoercionReport};
use super::consistency::{consistency_check, ConsistencyIssue};
use super::impute::{impute, ImputationReport, ImputeMethod};
use super::outlier::{handle_outliers, OutlierConfig, OutlierReport};
use crate::core::{ObservationTable, RawObservation};
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for [`Preprocessor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub outlier: OutlierConfig,
    pub imputation: ImputeMethod,
    /// AQI spread between sources above which a consistency issue is raised.
    pub consistency_threshold: f64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            outlier: OutlierConfig::default(),
            imputation: ImputeMethod::default(),
            consistency_threshold: 50.0,
        }
    }
}

impl PreprocessConfig {
    pub fn with_outlier(mut self, outlier: OutlierConfig) -> Self {
        self.outlier = outlier;
        self
    }

    pub fn with_imputation(mut self, method: ImputeMethod) -> Self {
        self.imputation = method;
        self
    }

    pub fn with_consistency_threshold(mut self, threshold: f64) -> Self {
        self.consistency_threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<()> {
        match self.outlier.rule {
            super::OutlierRule::Iqr { multiplier } if !(multiplier > 0.0) => {
                return Err(PipelineError::InvalidParameter(
                    "IQR multiplier must be positive".into(),
                ))
            }
            super::OutlierRule::ZScore { threshold } if !(threshold > 0.0) => {
                return Err(PipelineError::InvalidParameter(
                    "z-score threshold must be positive".into(),
                ))
            }
            _ => {}
        }
        if let ImputeMethod::Knn { k: 0 } = self.imputation {
            return Err(PipelineError::InvalidParameter(
                "KNN imputation needs k >= 1".into(),
            ));
        }
        if !(self.consistency_threshold >= 0.0) {
            return Err(PipelineError::InvalidParameter(
                "consistency threshold must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// Everything the preprocessing stage observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessReport {
    pub coercion: CoercionReport,
    pub outliers: OutlierReport,
    pub consistency: Vec<ConsistencyIssue>,
    pub imputation: ImputationReport,
    pub output_rows: usize,
}

/// Runs the preprocessing stages in order.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Coerce raw records, then clean them.
    pub fn run(&self, raw: &[RawObservation]) -> Result<(ObservationTable, PreprocessReport)> {
        tracing::info!(records = raw.len(), "preprocessing started");
        let (table, coercion) = coerce(raw)?;
        tracing::debug!(
            rows = table.len(),
            invalid = coercion.total_invalid(),
            "type coercion complete"
        );
        self.clean_with(table, coercion)
    }

    /// Clean an already typed table.
    pub fn clean(&self, table: &ObservationTable) -> Result<(ObservationTable, PreprocessReport)> {
        let coercion = CoercionReport {
            input_rows: table.len(),
            ..Default::default()
        };
        self.clean_with(table.clone(), coercion)
    }

    fn clean_with(
        &self,
        table: ObservationTable,
        coercion: CoercionReport,
    ) -> Result<(ObservationTable, PreprocessReport)> {
        let (table, outliers) = handle_outliers(&table, &self.config.outlier)?;
        let consistency = consistency_check(&table, self.config.consistency_threshold);
        let (table, imputation) = impute(&table, self.config.imputation)?;

        tracing::info!(
            rows = table.len(),
            outliers = outliers.outlier_count(),
            imputed = imputation.total_filled(),
            consistency_issues = consistency.len(),
            "preprocessing complete"
        );

        let report = PreprocessReport {
            coercion,
            outliers,
            consistency,
            imputation,
            output_rows: table.len(),
        };
        Ok((table, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Measurement;
    use crate::preprocess::OutlierAction;

    fn raw_series() -> Vec<RawObservation> {
        let values = [30.0, 35.0, 40.0, 45.0, 50.0, 55.0, 60.0, 65.0, 500.0];
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let raw = RawObservation::new("DL001", "Delhi", format!("2024-01-01 {:02}:00:00", i))
                    .with(Measurement::Pm25, v)
                    .with(Measurement::Aqi, 100.0 + i as f64);
                if i == 3 {
                    raw.with(Measurement::Pm10, "n/a")
                } else {
                    raw.with(Measurement::Pm10, 80.0 + i as f64)
                }
            })
            .collect()
    }

    #[test]
    fn run_cleans_and_fills() {
        let pre = Preprocessor::default();
        let (table, report) = pre.run(&raw_series()).unwrap();

        assert_eq!(table.len(), 9);
        assert_eq!(report.output_rows, 9);
        assert_eq!(report.coercion.total_invalid(), 1);
        assert_eq!(report.outliers.values_capped, 1);
        assert!(table.rows().iter().all(|r| r.pm10.is_some()));
        assert_eq!(table.rows()[8].pm25, Some(90.0));
    }

    #[test]
    fn remove_action_shrinks_table() {
        let config = PreprocessConfig::default()
            .with_outlier(OutlierConfig::default().with_action(OutlierAction::Remove))
            .with_imputation(ImputeMethod::Median);
        let pre = Preprocessor::new(config).unwrap();
        let (table, report) = pre.run(&raw_series()).unwrap();
        assert_eq!(table.len(), 8);
        assert_eq!(report.outliers.rows_removed, 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = PreprocessConfig::default().with_imputation(ImputeMethod::Knn { k: 0 });
        assert!(Preprocessor::new(config).is_err());
        let config = PreprocessConfig::default().with_outlier(OutlierConfig::iqr(-1.0));
        assert!(Preprocessor::new(config).is_err());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: PreprocessConfig =
            serde_json::from_str(r#"{"imputation": {"method": "forward_fill"}}"#).unwrap();
        assert_eq!(config.imputation, ImputeMethod::ForwardFill);
        assert_eq!(config.consistency_threshold, 50.0);
    }
}
