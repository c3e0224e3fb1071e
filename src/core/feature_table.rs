//! Column-major table of observations plus derived features.

use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A single named column.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Numeric values, `None` is null.
    Numeric(Vec<Option<f64>>),
    /// Categorical labels, `None` is unknown.
    Categorical(Vec<Option<String>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of null entries.
    pub fn null_count(&self) -> usize {
        match self {
            Column::Numeric(v) => v.iter().filter(|x| x.is_none()).count(),
            Column::Categorical(v) => v.iter().filter(|x| x.is_none()).count(),
        }
    }
}

/// Observations augmented with derived feature columns.
///
/// Identity columns (`station_id`, `city`, `recorded_at`) are stored apart
/// from the named columns. Named columns keep insertion order, so two tables
/// built by the same steps compare equal.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    station_ids: Vec<String>,
    cities: Vec<String>,
    timestamps: Vec<DateTime<Utc>>,
    names: Vec<String>,
    columns: Vec<Column>,
    index: HashMap<String, usize>,
}

impl FeatureTable {
    /// Create a table with identity columns only.
    pub fn new(
        station_ids: Vec<String>,
        cities: Vec<String>,
        timestamps: Vec<DateTime<Utc>>,
    ) -> Result<Self> {
        let n = timestamps.len();
        if n == 0 {
            return Err(PipelineError::EmptyData);
        }
        for len in [station_ids.len(), cities.len()] {
            if len != n {
                return Err(PipelineError::DimensionMismatch { expected: n, got: len });
            }
        }
        Ok(Self {
            station_ids,
            cities,
            timestamps,
            names: Vec::new(),
            columns: Vec::new(),
            index: HashMap::new(),
        })
    }

    fn push(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if column.len() != self.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: self.len(),
                got: column.len(),
            });
        }
        if self.index.contains_key(&name) {
            return Err(PipelineError::InvalidParameter(format!(
                "duplicate column '{}'",
                name
            )));
        }
        self.index.insert(name.clone(), self.names.len());
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    /// Append a numeric column.
    pub fn push_numeric(&mut self, name: impl Into<String>, values: Vec<Option<f64>>) -> Result<()> {
        self.push(name, Column::Numeric(values))
    }

    /// Append a categorical column.
    pub fn push_categorical(
        &mut self,
        name: impl Into<String>,
        values: Vec<Option<String>>,
    ) -> Result<()> {
        self.push(name, Column::Categorical(values))
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn station_ids(&self) -> &[String] {
        &self.station_ids
    }

    pub fn cities(&self) -> &[String] {
        &self.cities
    }

    /// Named column names in insertion order.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Names of numeric columns in insertion order.
    pub fn numeric_names(&self) -> Vec<&str> {
        self.names
            .iter()
            .zip(&self.columns)
            .filter(|(_, c)| matches!(c, Column::Numeric(_)))
            .map(|(n, _)| n.as_str())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Numeric column by name; `None` if absent or categorical.
    pub fn numeric(&self, name: &str) -> Option<&[Option<f64>]> {
        match self.column(name)? {
            Column::Numeric(v) => Some(v),
            Column::Categorical(_) => None,
        }
    }

    /// Categorical column by name; `None` if absent or numeric.
    pub fn categorical(&self, name: &str) -> Option<&[Option<String>]> {
        match self.column(name)? {
            Column::Categorical(v) => Some(v),
            Column::Numeric(_) => None,
        }
    }

    /// Numeric column or an `UnknownFeature` error.
    pub fn require_numeric(&self, name: &str) -> Result<&[Option<f64>]> {
        self.numeric(name)
            .ok_or_else(|| PipelineError::UnknownFeature(name.to_string()))
    }

    /// Values of the given numeric columns at one row.
    pub fn row_values(&self, row: usize, names: &[String]) -> Result<Vec<Option<f64>>> {
        if row >= self.len() {
            return Err(PipelineError::InvalidParameter(format!(
                "row {} out of bounds ({} rows)",
                row,
                self.len()
            )));
        }
        names
            .iter()
            .map(|n| self.require_numeric(n).map(|col| col[row]))
            .collect()
    }
}
