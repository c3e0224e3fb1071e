//! Versioned model artifacts, promotion, persistence, and serving.
//!
//! Training outcomes are registered as new versions in state `Trained`.
//! Promotion makes one version `Active` per family; serving always goes
//! through the active artifact's schema check.

mod artifact;
mod store;

pub use artifact::{ArtifactState, FeatureVector, Forecast, ModelArtifact};
pub use store::{FileStore, ModelRegistry};
