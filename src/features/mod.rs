//! Feature engineering for hourly air-quality observations.
//!
//! Produces temporal, pollutant, weather, rolling-window, and lag features.
//! Rolling and lag features are computed per station and only look backward
//! in time.
//!
//! # Example
//!
//! ```
//! use aqi_forecast::core::{Measurement, Observation, ObservationTable};
//! use aqi_forecast::features::FeatureEngineer;
//! use chrono::{Duration, TimeZone, Utc};
//!
//! let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let rows = (0..4)
//!     .map(|h| {
//!         Observation::new("DL001", "Delhi", base + Duration::hours(h))
//!             .with(Measurement::Pm25, 50.0)
//!             .with(Measurement::Pm10, 0.0)
//!     })
//!     .collect();
//! let table = ObservationTable::new(rows).unwrap();
//!
//! let features = FeatureEngineer::default().engineer(&table).unwrap();
//! // A zero PM10 reading gives a null ratio, not infinity.
//! assert_eq!(features.numeric("pm25_pm10_ratio").unwrap()[0], None);
//! ```

pub mod engineer;
pub mod lag;
pub mod pollutant;
pub mod rolling;
pub mod temporal;
pub mod weather;

pub use engineer::{FeatureConfig, FeatureEngineer};
pub use pollutant::AqiCategory;
pub use temporal::{Season, TimeOfDay};
