//! When to retrain.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Why a retrain is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrainReason {
    /// Nothing has been trained yet.
    NoModel,
    /// Enough new rows arrived since the last run.
    NewSamples,
    /// The active model is older than the allowed age.
    ModelAge,
}

/// Retrain when enough new samples have arrived or the model is too old.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrainPolicy {
    pub min_new_samples: usize,
    pub max_model_age_hours: i64,
}

impl Default for RetrainPolicy {
    fn default() -> Self {
        Self {
            min_new_samples: 100,
            max_model_age_hours: 24,
        }
    }
}

impl RetrainPolicy {
    pub fn max_model_age(&self) -> Duration {
        Duration::hours(self.max_model_age_hours)
    }

    /// Reason to retrain now, if any.
    pub fn reason(
        &self,
        last_trained_at: Option<DateTime<Utc>>,
        new_samples: usize,
        now: DateTime<Utc>,
    ) -> Option<RetrainReason> {
        let Some(last) = last_trained_at else {
            return Some(RetrainReason::NoModel);
        };
        if new_samples >= self.min_new_samples {
            Some(RetrainReason::NewSamples)
        } else if now - last >= self.max_model_age() {
            Some(RetrainReason::ModelAge)
        } else {
            None
        }
    }

    pub fn should_retrain(
        &self,
        last_trained_at: Option<DateTime<Utc>>,
        new_samples: usize,
        now: DateTime<Utc>,
    ) -> bool {
        let reason = self.reason(last_trained_at, new_samples, now);
        if let Some(reason) = reason {
            tracing::info!(?reason, new_samples, "retrain due");
        }
        reason.is_some()
    }
}
