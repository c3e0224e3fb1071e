//! # aqi-forecast
//!
//! Preprocessing, feature engineering, and time-series-safe model training
//! for hourly air-quality observations.
//!
//! Raw station readings are coerced, cleaned of outliers, checked across
//! sources, and imputed. Temporal, pollutant, weather, rolling, and lag
//! features are derived per station. Ridge, random forest, gradient
//! boosting, and stacked models are trained on chronological splits,
//! registered as versioned artifacts, and served behind a feature schema
//! check.

#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]

pub mod config;
pub mod core;
pub mod error;
pub mod features;
pub mod models;
pub mod pipeline;
pub mod preprocess;
pub mod registry;
pub mod training;
pub mod transform;
pub mod utils;

pub use error::{PipelineError, Result};

pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::core::{
        FeatureSchema, FeatureTable, Measurement, Observation, ObservationTable, RawObservation,
    };
    pub use crate::error::{PipelineError, Result};
    pub use crate::features::{AqiCategory, FeatureConfig, FeatureEngineer};
    pub use crate::models::{Model, ModelFamily, Regressor};
    pub use crate::pipeline::{Pipeline, PipelineRun};
    pub use crate::preprocess::{PreprocessConfig, Preprocessor};
    pub use crate::registry::{FeatureVector, FileStore, ModelArtifact, ModelRegistry};
    pub use crate::training::{FeatureSet, Trainer, TrainerConfig};
}
