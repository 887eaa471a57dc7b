//! The accumulator contract shared by all aggregate operators.

use core::fmt;
use rivulet_core::{Error, Number, Result, Value};

/// Per-group, per-aggregate mutable state.
///
/// An accumulator is owned by exactly one group of one window instance. A fresh
/// accumulator's `finish` is the aggregate's value over zero records (`0` for count,
/// null for the others).
pub trait Accumulator: Send + fmt::Debug {
    /// Fails exactly when `update` would fail for `value`, without touching state.
    ///
    /// The outcome depends only on the operand, so callers may check once per
    /// record and then update every owning group.
    fn check(&self, _value: &Value) -> Result<()> {
        Ok(())
    }

    /// Merges one operand. Null operands are skipped unless the aggregate counts rows.
    fn update(&mut self, value: &Value) -> Result<()>;

    /// Returns the aggregate over everything merged so far.
    fn finish(&self) -> Value;
}

/// Lifts an operand to a number, failing with a cast error for non-numeric input.
pub(crate) fn numeric_operand(value: &Value, aggregate: &str) -> Result<Number> {
    Number::from_value(value).ok_or_else(|| Error::cast(value, format!("number ({})", aggregate)))
}

/// `check` for aggregates over numeric operands.
pub(crate) fn check_numeric(value: &Value, aggregate: &str) -> Result<()> {
    if value.is_null() {
        return Ok(());
    }
    numeric_operand(value, aggregate).map(|_| ())
}
