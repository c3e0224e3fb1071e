//! Core data structures: observations, tables, and the feature schema.

mod feature_table;
mod observation;
mod schema;
mod table;

pub use feature_table::{Column, FeatureTable};
pub use observation::{parse_timestamp, Measurement, Observation, RawObservation, RawValue};
pub use schema::FeatureSchema;
pub use table::ObservationTable;
