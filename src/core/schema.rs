//! Versioned feature schema shared by training and serving.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// The exact, ordered feature list a model was fitted on.
///
/// Both the trainer and the serving side validate against the same schema,
/// so a caller can never feed a reordered or partial vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    /// Incremented whenever the feature list changes for a model family.
    pub version: u32,
    names: Vec<String>,
}

impl FeatureSchema {
    /// Create a schema. Names must be unique and non-empty.
    pub fn new(version: u32, names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(PipelineError::InvalidParameter(
                "feature schema needs at least one feature".into(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(PipelineError::InvalidParameter(format!(
                    "duplicate feature '{}' in schema",
                    name
                )));
            }
        }
        Ok(Self { version, names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of a feature in the vector.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// True if the other schema lists the same features in the same order.
    pub fn same_features(&self, other: &FeatureSchema) -> bool {
        self.names == other.names
    }

    /// Reject any feature list that is not exactly this schema.
    pub fn validate<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        let matches = names.len() == self.names.len()
            && names.iter().zip(&self.names).all(|(a, b)| a.as_ref() == b);
        if matches {
            Ok(())
        } else {
            Err(PipelineError::FeatureMismatch {
                expected: self.names.clone(),
                got: names.iter().map(|n| n.as_ref().to_string()).collect(),
            })
        }
    }

    /// Schema for the next training run given a previous one.
    pub fn next_after(previous: Option<&FeatureSchema>, names: Vec<String>) -> Result<Self> {
        let version = match previous {
            Some(prev) if prev.names == names => prev.version,
            Some(prev) => prev.version + 1,
            None => 1,
        };
        Self::new(version, names)
    }
}
