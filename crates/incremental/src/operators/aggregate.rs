//! Incremental aggregate operators.

use crate::accumulator::{check_numeric, numeric_operand, Accumulator};
use core::cmp::Ordering;
use rivulet_core::numeric::{arithmetic, ArithOp};
use rivulet_core::{Number, Result, Value};

/// Incremental COUNT aggregate.
///
/// `count(*)` and `count(1)` count every record; `count(expr)` skips nulls.
#[derive(Clone, Debug, Default)]
pub struct IncrementalCount {
    count: i64,
    include_nulls: bool,
}

impl IncrementalCount {
    /// Counts every merged record, null or not.
    pub fn rows() -> Self {
        Self {
            count: 0,
            include_nulls: true,
        }
    }

    /// Counts only non-null operands.
    pub fn non_null() -> Self {
        Self {
            count: 0,
            include_nulls: false,
        }
    }
}

impl Accumulator for IncrementalCount {
    fn update(&mut self, value: &Value) -> Result<()> {
        if self.include_nulls || !value.is_null() {
            self.count += 1;
        }
        Ok(())
    }

    fn finish(&self) -> Value {
        Value::Int64(self.count)
    }
}

/// Incremental SUM aggregate.
///
/// Stays integral while every operand is integral, then widens to float (or decimal
/// once a decimal operand arrives). The sum of zero operands is null.
#[derive(Clone, Debug, Default)]
pub struct IncrementalSum {
    sum: Option<Number>,
}

impl IncrementalSum {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Accumulator for IncrementalSum {
    fn check(&self, value: &Value) -> Result<()> {
        check_numeric(value, "sum")
    }

    fn update(&mut self, value: &Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        let operand = numeric_operand(value, "sum")?;
        self.sum = match self.sum.take() {
            None => Some(operand),
            Some(acc) => arithmetic(ArithOp::Add, &acc, &operand),
        };
        Ok(())
    }

    fn finish(&self) -> Value {
        self.sum.clone().map_or(Value::Null, Number::into_value)
    }
}

/// Incremental AVG aggregate.
///
/// Maintains both sum and count; the quotient is computed at finish (float division).
#[derive(Clone, Debug, Default)]
pub struct IncrementalAvg {
    sum: f64,
    count: i64,
}

impl IncrementalAvg {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current average, or None if count is 0.
    fn get(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

impl Accumulator for IncrementalAvg {
    fn check(&self, value: &Value) -> Result<()> {
        check_numeric(value, "avg")
    }

    fn update(&mut self, value: &Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        self.sum += numeric_operand(value, "avg")?.to_f64();
        self.count += 1;
        Ok(())
    }

    fn finish(&self) -> Value {
        self.get().map_or(Value::Null, Value::Float64)
    }
}

/// Keeps the operand that wins `keep` against the current extreme.
#[derive(Clone, Debug)]
struct Extreme {
    current: Option<Value>,
    keep: Ordering,
}

impl Extreme {
    fn update(&mut self, value: &Value) {
        if value.is_null() {
            return;
        }
        let replace = match &self.current {
            None => true,
            // incomparable operands fall back to the total order
            Some(current) => value.sql_cmp(current).unwrap_or_else(|| value.cmp(current)) == self.keep,
        };
        if replace {
            self.current = Some(value.clone());
        }
    }
}

/// Incremental MIN aggregate.
///
/// Comparison is numeric-aware; the winning operand is returned unchanged.
#[derive(Clone, Debug)]
pub struct IncrementalMin {
    inner: Extreme,
}

impl IncrementalMin {
    pub fn new() -> Self {
        Self {
            inner: Extreme {
                current: None,
                keep: Ordering::Less,
            },
        }
    }
}

impl Default for IncrementalMin {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator for IncrementalMin {
    fn update(&mut self, value: &Value) -> Result<()> {
        self.inner.update(value);
        Ok(())
    }

    fn finish(&self) -> Value {
        self.inner.current.clone().unwrap_or(Value::Null)
    }
}

/// Incremental MAX aggregate.
#[derive(Clone, Debug)]
pub struct IncrementalMax {
    inner: Extreme,
}

impl IncrementalMax {
    pub fn new() -> Self {
        Self {
            inner: Extreme {
                current: None,
                keep: Ordering::Greater,
            },
        }
    }
}

impl Default for IncrementalMax {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator for IncrementalMax {
    fn update(&mut self, value: &Value) -> Result<()> {
        self.inner.update(value);
        Ok(())
    }

    fn finish(&self) -> Value {
        self.inner.current.clone().unwrap_or(Value::Null)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_sum_min_max_match_iterator(values in prop::collection::vec(-1000i64..1000, 1..100)) {
            let mut sum = IncrementalSum::new();
            let mut min = IncrementalMin::new();
            let mut max = IncrementalMax::new();
            for v in &values {
                let v = Value::Int64(*v);
                sum.update(&v).unwrap();
                min.update(&v).unwrap();
                max.update(&v).unwrap();
            }
            prop_assert_eq!(sum.finish(), Value::Int64(values.iter().sum()));
            prop_assert_eq!(min.finish(), Value::Int64(*values.iter().min().unwrap()));
            prop_assert_eq!(max.finish(), Value::Int64(*values.iter().max().unwrap()));
        }
    }
}
