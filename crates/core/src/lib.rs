//! Rivulet Core - dynamic values and records for the rivulet stream query engine.
//!
//! This crate provides the foundational types shared by every other crate:
//!
//! - `Value`: a dynamically typed stream element (null, boolean, integers, floats,
//!   decimal, string, timestamp, list, nested record)
//! - `Record`: a string-keyed mapping of values, the usual shape of a stream element
//! - `DataType`: the targets of `cast(x as T)`
//! - `numeric`: numeric coercion shared by arithmetic and aggregates
//! - `Error`: error kinds crossing component boundaries
//!
//! # Example
//!
//! ```rust
//! use rivulet_core::{Record, Value};
//!
//! let record = Record::new()
//!     .with("deviceId", "d-1")
//!     .with("temperature", 21.5);
//!
//! assert_eq!(record.get("deviceId"), Some(&Value::from("d-1")));
//! assert_eq!(Value::Int64(1).sql_cmp(&Value::Float64(1.0)), Some(core::cmp::Ordering::Equal));
//! ```

pub mod cast;
pub mod error;
pub mod numeric;
pub mod pattern_match;
pub mod record;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use numeric::Number;
pub use record::Record;
pub use types::DataType;
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_record() {
        let record = Record::new().with("id", 1i64).with("name", "Alice");
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("id"), Some(&Value::Int64(1)));
    }

    #[test]
    fn test_value_into_record() {
        let value = Value::from(Record::new().with("a", 1i64));
        assert_eq!(value.as_record().and_then(|r| r.get("a")), Some(&Value::Int64(1)));
    }
}
