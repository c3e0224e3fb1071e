//! Data transformations: feature scaling and trailing window functions.
//!
//! # Example
//!
//! ```
//! use aqi_forecast::transform::{rolling_mean, StandardScaler};
//!
//! let series = vec![Some(1.0), Some(2.0), None, Some(4.0)];
//! let rm = rolling_mean(&series, 2, 1);
//! assert_eq!(rm, vec![Some(1.0), Some(1.5), Some(2.0), Some(4.0)]);
//!
//! let scaler = StandardScaler::fit(&[vec![1.0], vec![3.0]]).unwrap();
//! assert_eq!(scaler.transform_row(&[3.0]).unwrap(), vec![1.0]);
//! ```

pub mod scale;
pub mod window;

pub use scale::StandardScaler;
pub use window::{diff, pct_change, rolling_mean, rolling_std};
