//! Assembles every derived feature into a [`FeatureTable`].

use super::lag::{lag_by_time, lag_name};
use super::pollutant::{nox_indicator, safe_ratio, total_pm, AqiCategory};
use super::rolling::rolling_features;
use super::temporal::{self, Season, TimeOfDay};
use super::weather;
use crate::core::{FeatureTable, Measurement, Observation, ObservationTable};
use crate::error::{PipelineError, Result};
use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Which rolling and lag features to derive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub rolling_windows: Vec<usize>,
    pub rolling_columns: Vec<Measurement>,
    pub lags: Vec<usize>,
    pub lag_columns: Vec<Measurement>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            rolling_windows: vec![3, 6, 12, 24],
            rolling_columns: vec![
                Measurement::Pm25,
                Measurement::Pm10,
                Measurement::No2,
                Measurement::Aqi,
                Measurement::Temperature,
            ],
            lags: vec![1, 3, 6, 12, 24],
            lag_columns: vec![
                Measurement::Pm25,
                Measurement::Pm10,
                Measurement::Aqi,
                Measurement::Temperature,
                Measurement::Humidity,
            ],
        }
    }
}

impl FeatureConfig {
    pub fn with_rolling_windows(mut self, windows: Vec<usize>) -> Self {
        self.rolling_windows = windows;
        self
    }

    pub fn with_rolling_columns(mut self, columns: Vec<Measurement>) -> Self {
        self.rolling_columns = columns;
        self
    }

    pub fn with_lags(mut self, lags: Vec<usize>) -> Self {
        self.lags = lags;
        self
    }

    pub fn with_lag_columns(mut self, columns: Vec<Measurement>) -> Self {
        self.lag_columns = columns;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.rolling_windows.contains(&0) {
            return Err(PipelineError::InvalidParameter(
                "rolling windows must be at least 1".into(),
            ));
        }
        if self.lags.contains(&0) {
            return Err(PipelineError::InvalidParameter("lags must be at least 1 hour".into()));
        }
        Ok(())
    }
}

/// Derives temporal, pollutant, weather, rolling, and lag features.
#[derive(Debug, Clone, Default)]
pub struct FeatureEngineer {
    config: FeatureConfig,
}

impl FeatureEngineer {
    pub fn new(config: FeatureConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Build the feature table. Pure: the same input always gives an equal
    /// table, with one output row per input row.
    pub fn engineer(&self, table: &ObservationTable) -> Result<FeatureTable> {
        let rows = table.rows();
        let mut out = FeatureTable::new(
            rows.iter().map(|r| r.station_id.clone()).collect(),
            rows.iter().map(|r| r.city.clone()).collect(),
            table.timestamps(),
        )?;

        for m in Measurement::ALL {
            out.push_numeric(m.name(), table.column(m))?;
        }

        self.push_temporal(table, &mut out)?;
        self.push_pollutant(table, &mut out)?;
        self.push_weather(table, &mut out)?;

        for &m in &self.config.rolling_columns {
            for (name, values) in rolling_features(table, m, &self.config.rolling_windows) {
                out.push_numeric(name, values)?;
            }
        }
        for &m in &self.config.lag_columns {
            for &lag in &self.config.lags {
                out.push_numeric(lag_name(m, lag), lag_by_time(table, m, lag))?;
            }
        }

        tracing::debug!(
            rows = out.len(),
            columns = out.column_names().len(),
            "feature engineering complete"
        );
        Ok(out)
    }

    fn push_temporal(&self, table: &ObservationTable, out: &mut FeatureTable) -> Result<()> {
        let stamps: Vec<NaiveDateTime> =
            table.rows().iter().map(Observation::local_time).collect();
        let values: Vec<[f64; 13]> = stamps.iter().map(temporal::numeric_values).collect();

        // Calendar columns first, then the buckets, then the flags and cycles.
        for (k, name) in temporal::NUMERIC_COLUMNS.iter().enumerate().take(7) {
            out.push_numeric(*name, values.iter().map(|v| Some(v[k])).collect())?;
        }
        out.push_numeric("is_weekend", values.iter().map(|v| Some(v[7])).collect())?;
        out.push_categorical(
            "time_of_day",
            stamps
                .iter()
                .map(|ts| Some(TimeOfDay::from_hour(ts.hour()).as_str().to_string()))
                .collect(),
        )?;
        out.push_categorical(
            "season",
            stamps
                .iter()
                .map(|ts| Some(Season::from_month(ts.month()).as_str().to_string()))
                .collect(),
        )?;
        for (k, name) in temporal::NUMERIC_COLUMNS.iter().enumerate().skip(8) {
            out.push_numeric(*name, values.iter().map(|v| Some(v[k])).collect())?;
        }
        Ok(())
    }

    fn push_pollutant(&self, table: &ObservationTable, out: &mut FeatureTable) -> Result<()> {
        let rows = table.rows();
        out.push_numeric(
            "pm25_pm10_ratio",
            rows.iter().map(|r| safe_ratio(r.pm25, r.pm10)).collect(),
        )?;
        out.push_numeric(
            "no2_so2_ratio",
            rows.iter().map(|r| safe_ratio(r.no2, r.so2)).collect(),
        )?;
        out.push_numeric("total_pm", rows.iter().map(|r| total_pm(r.pm25, r.pm10)).collect())?;
        out.push_numeric("nox_indicator", rows.iter().map(|r| nox_indicator(r.no2)).collect())?;
        out.push_categorical(
            "pm25_category",
            rows.iter()
                .map(|r| r.pm25.and_then(AqiCategory::from_pm25).map(|c| c.as_str().to_string()))
                .collect(),
        )?;
        out.push_categorical(
            "aqi_category",
            rows.iter()
                .map(|r| r.aqi.and_then(AqiCategory::from_aqi).map(|c| c.as_str().to_string()))
                .collect(),
        )?;
        Ok(())
    }

    fn push_weather(&self, table: &ObservationTable, out: &mut FeatureTable) -> Result<()> {
        let rows = table.rows();
        out.push_numeric(
            "heat_index",
            rows.iter()
                .map(|r| Some(weather::heat_index(r.temperature?, r.humidity?)))
                .collect(),
        )?;
        out.push_categorical(
            "temp_category",
            rows.iter()
                .map(|r| r.temperature.map(|t| weather::temperature_band(t).to_string()))
                .collect(),
        )?;
        out.push_categorical(
            "humidity_category",
            rows.iter()
                .map(|r| r.humidity.map(|h| weather::humidity_band(h).to_string()))
                .collect(),
        )?;
        out.push_categorical(
            "wind_category",
            rows.iter()
                .map(|r| r.wind_speed.map(|w| weather::wind_band(w).to_string()))
                .collect(),
        )?;
        Ok(())
    }
}
