//! Statistical aggregates maintained in one pass.

use crate::accumulator::{check_numeric, numeric_operand, Accumulator};
use rivulet_core::{Error, Result, Value};

/// Population standard deviation using Welford's online algorithm.
#[derive(Clone, Debug, Default)]
pub struct IncrementalStdDev {
    count: u64,
    mean: f64,
    m2: f64,
}

impl IncrementalStdDev {
    pub fn new() -> Self {
        Self::default()
    }

    /// Population variance, or None before the first operand.
    pub fn variance(&self) -> Option<f64> {
        (self.count > 0).then(|| self.m2 / self.count as f64)
    }
}

impl Accumulator for IncrementalStdDev {
    fn check(&self, value: &Value) -> Result<()> {
        check_numeric(value, "stddev")
    }

    fn update(&mut self, value: &Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        let x = numeric_operand(value, "stddev")?.to_f64();
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
        Ok(())
    }

    fn finish(&self) -> Value {
        self.variance().map_or(Value::Null, |v| Value::Float64(libm::sqrt(v)))
    }
}

/// Geometric mean over strictly positive operands.
#[derive(Clone, Debug, Default)]
pub struct IncrementalGeoMean {
    count: u64,
    log_sum: f64,
}

impl IncrementalGeoMean {
    pub fn new() -> Self {
        Self::default()
    }

    fn operand(value: &Value) -> Result<f64> {
        let x = numeric_operand(value, "geomean")?.to_f64();
        if x <= 0.0 {
            return Err(Error::cast(value, "positive number (geomean)"));
        }
        Ok(x)
    }
}

impl Accumulator for IncrementalGeoMean {
    fn check(&self, value: &Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        Self::operand(value).map(|_| ())
    }

    fn update(&mut self, value: &Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        let x = Self::operand(value)?;
        self.count += 1;
        self.log_sum += libm::log(x);
        Ok(())
    }

    fn finish(&self) -> Value {
        if self.count == 0 {
            return Value::Null;
        }
        Value::Float64(libm::exp(self.log_sum / self.count as f64))
    }
}
