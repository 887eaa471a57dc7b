//! Incremental aggregate operators.
//!
//! - Basic: count, sum, avg, min, max
//! - Statistics: standard deviation, geometric mean
//! - Distinct: count of distinct operands

mod aggregate;
mod distinct;
mod statistics;

pub use aggregate::{IncrementalAvg, IncrementalCount, IncrementalMax, IncrementalMin, IncrementalSum};
pub use distinct::IncrementalCountDistinct;
pub use statistics::{IncrementalGeoMean, IncrementalStdDev};
