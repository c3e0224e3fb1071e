//! Regressor trait defining the common interface for all model families.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Common interface for all regression models.
///
/// Inputs are row-major: `x[i]` is the scaled feature vector of row `i`.
/// This trait is object-safe and can be used with `Box<dyn Regressor>`.
pub trait Regressor {
    /// Fit the model.
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()>;

    /// Fit with a held-out validation block.
    ///
    /// Models that support early stopping track the validation loss; the
    /// rest ignore it.
    fn fit_with_validation(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        x_val: &[Vec<f64>],
        y_val: &[f64],
    ) -> Result<()> {
        let _ = (x_val, y_val);
        self.fit(x, y)
    }

    /// Predict one value per row.
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>>;

    /// Get the model name.
    fn name(&self) -> &str;

    /// Check if the model has been fitted.
    fn is_fitted(&self) -> bool;

    /// Relative importance per feature, summing to one, if the family
    /// provides it.
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }
}

/// Type alias for boxed regressor trait objects.
pub type BoxedRegressor = Box<dyn Regressor>;

/// Supported model families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    Ridge,
    RandomForest,
    GradientBoosting,
    Stacking,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 4] = [
        ModelFamily::Ridge,
        ModelFamily::RandomForest,
        ModelFamily::GradientBoosting,
        ModelFamily::Stacking,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelFamily::Ridge => "ridge",
            ModelFamily::RandomForest => "random_forest",
            ModelFamily::GradientBoosting => "gradient_boosting",
            ModelFamily::Stacking => "stacking",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_str() == name)
    }
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single hyperparameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
}

impl ParamValue {
    pub fn as_f64(self) -> f64 {
        match self {
            ParamValue::Int(v) => v as f64,
            ParamValue::Float(v) => v,
        }
    }

    /// Non-negative integer view. Floats must be whole numbers.
    pub fn as_usize(self) -> Option<usize> {
        match self {
            ParamValue::Int(v) if v >= 0 => Some(v as usize),
            ParamValue::Float(v) if v >= 0.0 && v.fract() == 0.0 => Some(v as usize),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

/// Named hyperparameters, ordered by name.
pub type Hyperparameters = BTreeMap<String, ParamValue>;

/// Read a non-negative integer parameter.
pub(crate) fn param_usize(params: &Hyperparameters, name: &str) -> Result<Option<usize>> {
    params
        .get(name)
        .map(|v| {
            v.as_usize().ok_or_else(|| {
                PipelineError::InvalidParameter(format!("{} must be a non-negative integer, got {}", name, v))
            })
        })
        .transpose()
}

/// Read a floating point parameter.
pub(crate) fn param_f64(params: &Hyperparameters, name: &str) -> Option<f64> {
    params.get(name).map(|v| v.as_f64())
}

/// Reject names outside `known`.
pub(crate) fn check_known(params: &Hyperparameters, family: ModelFamily, known: &[&str]) -> Result<()> {
    match params.keys().find(|k| !known.contains(&k.as_str())) {
        Some(unknown) => Err(PipelineError::InvalidParameter(format!(
            "unknown hyperparameter '{}' for {}",
            unknown, family
        ))),
        None => Ok(()),
    }
}

/// Check that `x` is non-empty, rectangular, and matches `y`.
pub(crate) fn check_training_data(x: &[Vec<f64>], y: &[f64]) -> Result<usize> {
    let first = x.first().ok_or(PipelineError::EmptyData)?;
    if x.len() != y.len() {
        return Err(PipelineError::DimensionMismatch {
            expected: x.len(),
            got: y.len(),
        });
    }
    let k = first.len();
    if k == 0 {
        return Err(PipelineError::InvalidParameter("no feature columns".into()));
    }
    if let Some(bad) = x.iter().find(|r| r.len() != k) {
        return Err(PipelineError::DimensionMismatch {
            expected: k,
            got: bad.len(),
        });
    }
    if x.iter().flatten().chain(y).any(|v| !v.is_finite()) {
        return Err(PipelineError::ComputationError(
            "training data contains non-finite values".into(),
        ));
    }
    Ok(k)
}

/// Check prediction rows against the fitted width.
pub(crate) fn check_prediction_data(x: &[Vec<f64>], n_features: usize) -> Result<()> {
    match x.iter().find(|r| r.len() != n_features) {
        Some(bad) => Err(PipelineError::DimensionMismatch {
            expected: n_features,
            got: bad.len(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_names_round_trip() {
        for family in ModelFamily::ALL {
            assert_eq!(ModelFamily::from_name(family.as_str()), Some(family));
        }
        let json = serde_json::to_string(&ModelFamily::RandomForest).unwrap();
        assert_eq!(json, "\"random_forest\"");
    }

    #[test]
    fn param_values() {
        assert_eq!(ParamValue::Int(3).as_usize(), Some(3));
        assert_eq!(ParamValue::Float(3.0).as_usize(), Some(3));
        assert_eq!(ParamValue::Float(0.5).as_usize(), None);
        assert_eq!(ParamValue::Int(-1).as_usize(), None);

        let params: Hyperparameters =
            serde_json::from_str(r#"{"alpha": 0.5, "max_depth": 4}"#).unwrap();
        assert_eq!(params["alpha"], ParamValue::Float(0.5));
        assert_eq!(params["max_depth"], ParamValue::Int(4));
    }

    #[test]
    fn unknown_params_rejected() {
        let mut params = Hyperparameters::new();
        params.insert("depth".into(), ParamValue::Int(3));
        assert!(check_known(&params, ModelFamily::Ridge, &["alpha"]).is_err());
        assert!(param_usize(&params, "depth").unwrap() == Some(3));
    }

    #[test]
    fn training_data_checks() {
        assert_eq!(check_training_data(&[], &[]), Err(PipelineError::EmptyData));
        assert!(check_training_data(&[vec![1.0]], &[1.0, 2.0]).is_err());
        assert!(check_training_data(&[vec![f64::NAN]], &[1.0]).is_err());
        assert_eq!(check_training_data(&[vec![1.0, 2.0]], &[1.0]), Ok(2));
    }
}
