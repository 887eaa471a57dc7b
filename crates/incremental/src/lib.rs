//! Rivulet Incremental - incremental aggregate state for windowed stream queries.
//!
//! Every aggregate function of a query owns one accumulator per (group key, window
//! instance). Records are merged one at a time with `Accumulator::update`; the result is
//! read once with `Accumulator::finish` when the owning window flushes.
//!
//! # Accumulators
//!
//! - `IncrementalCount`: counts every record, or only non-null operands
//! - `IncrementalCountDistinct`: counts distinct non-null operands
//! - `IncrementalSum`: integral while every operand is integral, float or decimal otherwise
//! - `IncrementalAvg`: running sum and count, divided at finish
//! - `IncrementalMin` / `IncrementalMax`: numeric-aware extremes, original value preserved
//! - `IncrementalStdDev`: Welford's online population standard deviation
//! - `IncrementalGeoMean`: geometric mean via a running log-sum
//!
//! # Example
//!
//! ```rust
//! use rivulet_core::Value;
//! use rivulet_incremental::{Accumulator, IncrementalAvg};
//!
//! let mut avg = IncrementalAvg::new();
//! for v in 1..=4i64 {
//!     avg.update(&Value::Int64(v)).unwrap();
//! }
//! assert_eq!(avg.finish(), Value::Float64(2.5));
//! ```

pub mod accumulator;
pub mod operators;

pub use accumulator::Accumulator;
pub use operators::{
    IncrementalAvg, IncrementalCount, IncrementalCountDistinct, IncrementalGeoMean,
    IncrementalMax, IncrementalMin, IncrementalStdDev, IncrementalSum,
};
