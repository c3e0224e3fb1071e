//! Numeric helpers shared by preprocessing, features, and models.

pub mod linalg;
pub mod stats;

pub use linalg::{dot, solve_symmetric};
pub use stats::{mean, median, population_std, quantile, std_dev, variance};
