//! Named feature selections.

use crate::core::FeatureTable;
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

const MINIMAL: [&str; 8] = [
    "pm25",
    "pm10",
    "no2",
    "temperature",
    "humidity",
    "hour",
    "day_of_week",
    "is_weekend",
];

const RECOMMENDED: [&str; 26] = [
    "pm25",
    "pm10",
    "no2",
    "so2",
    "co",
    "o3",
    "temperature",
    "humidity",
    "wind_speed",
    "pressure",
    "hour",
    "day_of_week",
    "month",
    "is_weekend",
    "is_rush_hour",
    "hour_sin",
    "hour_cos",
    "pm25_lag_1h",
    "pm25_lag_3h",
    "pm25_lag_24h",
    "temperature_lag_1h",
    "pm25_rolling_mean_6h",
    "pm25_rolling_std_6h",
    "pm25_rolling_mean_24h",
    "pm25_pm10_ratio",
    "heat_index",
];

/// Calendar columns that identify a row rather than describe it.
const IDENTITY_LIKE: [&str; 4] = ["year", "day", "day_of_year", "week_of_year"];

/// Which numeric columns a model is trained on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "set", content = "features", rename_all = "snake_case")]
pub enum FeatureSet {
    /// Current pollutants, weather, and basic calendar columns.
    Minimal,
    /// Pollutants, weather, calendar, short lags, rolling PM2.5, and ratios.
    #[default]
    Recommended,
    /// Every numeric column except the target, identity-like calendar
    /// columns, and target-derived columns that see the current value.
    Complete,
    Custom(Vec<String>),
}

impl FeatureSet {
    /// Ordered feature names for `table`.
    ///
    /// Fails with `UnknownFeature` if a declared name is not a numeric column.
    pub fn resolve(&self, table: &FeatureTable, target: &str) -> Result<Vec<String>> {
        let names: Vec<String> = match self {
            FeatureSet::Minimal => MINIMAL.iter().map(|s| s.to_string()).collect(),
            FeatureSet::Recommended => RECOMMENDED.iter().map(|s| s.to_string()).collect(),
            FeatureSet::Custom(list) => list.clone(),
            FeatureSet::Complete => table
                .numeric_names()
                .into_iter()
                .filter(|name| {
                    *name != target
                        && !IDENTITY_LIKE.contains(name)
                        && !sees_current_target(name, target)
                })
                .map(str::to_string)
                .collect(),
        };

        if names.is_empty() {
            return Err(PipelineError::InvalidParameter(
                "feature set is empty".into(),
            ));
        }
        if let Some(name) = names.iter().find(|n| n.as_str() == target) {
            return Err(PipelineError::InvalidParameter(format!(
                "target '{}' listed as a feature",
                name
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for name in &names {
            table.require_numeric(name)?;
            if !seen.insert(name.as_str()) {
                return Err(PipelineError::InvalidParameter(format!(
                    "feature '{}' listed twice",
                    name
                )));
            }
        }
        Ok(names)
    }
}

/// Rolling and change features of the target include the row's own value.
fn sees_current_target(name: &str, target: &str) -> bool {
    name.strip_prefix(target)
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|rest| {
            rest.starts_with("rolling_") || rest == "change_1h" || rest == "pct_change_1h"
        })
}
