//! Model training and evaluation.
//!
//! Rows are split chronologically, never shuffled. The scaler is fitted on
//! the training block only, tuning uses forward-chaining folds, and the test
//! block is only used for the reported metrics.
//!
//! # Example
//!
//! ```
//! use aqi_forecast::training::TimeSeriesSplit;
//!
//! let folds = TimeSeriesSplit::expanding(3).split(12).unwrap();
//! assert!(folds.iter().all(|f| f.train.end <= f.validation.start));
//! ```

mod cross_validation;
mod feature_set;
mod metrics;
mod retrain;
mod search;
mod split;
mod trainer;

pub use cross_validation::{CvStrategy, Fold, TimeSeriesSplit};
pub use feature_set::FeatureSet;
pub use metrics::{
    mae, regression_metrics, rmse, ComparisonEntry, ModelComparison, OverfitCheck,
    OverfitReport, RegressionMetrics, SplitMetrics,
};
pub use retrain::{RetrainPolicy, RetrainReason};
pub use search::{
    CandidateScore, GridSearch, HyperparameterSearch, ParamDistribution, ParamGrid,
    RandomizedSearch, SearchResult,
};
pub use split::{
    chronological_split, split_rows, usable_rows, DatasetBlock, DatasetSplit, SplitRatios,
};
pub use trainer::{compare, Trainer, TrainerConfig, TrainingOutcome, TuningOutcome};
