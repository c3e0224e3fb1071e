//! Regression model families.
//!
//! - **Ridge**: L2-penalised linear regression
//! - **RandomForest**: bagged CART trees with impurity importances
//! - **GradientBoosting**: boosted trees with validation early stopping
//! - **Stacking**: ridge meta-learner over the three families above
//!
//! [`Model`] wraps every family in one serializable enum so fitted models can
//! be stored in artifacts.

pub mod boosting;
pub mod forest;
pub mod ridge;
pub mod stacking;
pub mod traits;
pub mod tree;

pub use boosting::{BoostingConfig, GradientBoosting};
pub use forest::{ForestConfig, RandomForest};
pub use ridge::RidgeRegression;
pub use stacking::{StackingConfig, StackingEnsemble};
pub use traits::{BoxedRegressor, Hyperparameters, ModelFamily, ParamValue, Regressor};
pub use tree::{RegressionTree, TreeConfig};

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Any supported model, fitted or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Model {
    Ridge(RidgeRegression),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
    Stacking(StackingEnsemble),
}

impl Model {
    /// Unfitted model with default hyperparameters.
    pub fn new(family: ModelFamily) -> Self {
        match family {
            ModelFamily::Ridge => Model::Ridge(RidgeRegression::default()),
            ModelFamily::RandomForest => Model::RandomForest(RandomForest::default()),
            ModelFamily::GradientBoosting => Model::GradientBoosting(GradientBoosting::default()),
            ModelFamily::Stacking => Model::Stacking(StackingEnsemble::default()),
        }
    }

    /// Unfitted model with the given hyperparameters over the defaults.
    pub fn with_params(family: ModelFamily, params: &Hyperparameters) -> Result<Self> {
        Ok(match family {
            ModelFamily::Ridge => {
                traits::check_known(params, family, &["alpha"])?;
                let alpha = traits::param_f64(params, "alpha").unwrap_or(1.0);
                Model::Ridge(RidgeRegression::new(alpha))
            }
            ModelFamily::RandomForest => Model::RandomForest(RandomForest::from_params(params)?),
            ModelFamily::GradientBoosting => {
                Model::GradientBoosting(GradientBoosting::from_params(params)?)
            }
            ModelFamily::Stacking => Model::Stacking(StackingEnsemble::from_params(params)?),
        })
    }

    pub fn family(&self) -> ModelFamily {
        match self {
            Model::Ridge(_) => ModelFamily::Ridge,
            Model::RandomForest(_) => ModelFamily::RandomForest,
            Model::GradientBoosting(_) => ModelFamily::GradientBoosting,
            Model::Stacking(_) => ModelFamily::Stacking,
        }
    }

    /// Current hyperparameters as named values.
    pub fn hyperparameters(&self) -> Hyperparameters {
        match self {
            Model::Ridge(m) => {
                let mut params = Hyperparameters::new();
                params.insert("alpha".into(), m.alpha().into());
                params
            }
            Model::RandomForest(m) => m.hyperparameters(),
            Model::GradientBoosting(m) => m.hyperparameters(),
            Model::Stacking(m) => m.hyperparameters(),
        }
    }

    fn inner(&self) -> &dyn Regressor {
        match self {
            Model::Ridge(m) => m,
            Model::RandomForest(m) => m,
            Model::GradientBoosting(m) => m,
            Model::Stacking(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Regressor {
        match self {
            Model::Ridge(m) => m,
            Model::RandomForest(m) => m,
            Model::GradientBoosting(m) => m,
            Model::Stacking(m) => m,
        }
    }
}

impl Regressor for Model {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn fit_with_validation(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        x_val: &[Vec<f64>],
        y_val: &[f64],
    ) -> Result<()> {
        self.inner_mut().fit_with_validation(x, y, x_val, y_val)
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        self.inner().predict(x)
    }

    fn name(&self) -> &str {
        self.inner().name()
    }

    fn is_fitted(&self) -> bool {
        self.inner().is_fitted()
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.inner().feature_importances()
    }
}
