//! Data preprocessing: type coercion, outlier handling, consistency checks,
//! and missing-value imputation.
//!
//! # Example
//!
//! ```
//! use aqi_forecast::core::{Measurement, RawObservation};
//! use aqi_forecast::preprocess::Preprocessor;
//!
//! let raw: Vec<RawObservation> = (0..6)
//!     .map(|h| {
//!         RawObservation::new("DL001", "Delhi", format!("2024-01-01 {:02}:00:00", h))
//!             .with(Measurement::Pm25, 40.0 + h as f64)
//!             .with(Measurement::Aqi, 90.0 + h as f64)
//!     })
//!     .collect();
//!
//! let (table, report) = Preprocessor::default().run(&raw).unwrap();
//! assert_eq!(table.len(), 6);
//! assert_eq!(report.coercion.dropped_rows, 0);
//! ```

mod coerce;
mod consistency;
mod impute;
mod outlier;
mod pipeline;

pub use coerce::{coerce, CoercionReport};
pub use consistency::{consistency_check, ConsistencyIssue};
pub use impute::{impute, ColumnImputation, ImputationReport, ImputeMethod};
pub use outlier::{
    column_bounds, handle_outliers, ColumnBounds, OutlierAction, OutlierConfig, OutlierReport,
    OutlierRule,
};
pub use pipeline::{PreprocessConfig, PreprocessReport, Preprocessor};
