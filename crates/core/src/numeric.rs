//! Numeric coercion shared by arithmetic operators and aggregates.
//!
//! Values are lifted into `Number`, which keeps integral arithmetic integral, widens to
//! float as soon as a float is involved, and widens to decimal as soon as a decimal is.

use crate::value::Value;
use bigdecimal::BigDecimal;
use core::cmp::Ordering;
use std::str::FromStr;

/// A numeric operand in its widest required representation.
#[derive(Clone, Debug, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
    Decimal(BigDecimal),
}

/// Binary arithmetic operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl Number {
    /// Lifts numeric values, timestamps (epoch millis) and numeric strings.
    pub fn from_value(value: &Value) -> Option<Number> {
        match value {
            Value::String(s) => Number::parse(s),
            Value::DateTime(ms) => Some(Number::Int(*ms)),
            other => Number::from_numeric(other),
        }
    }

    /// Lifts only genuinely numeric variants.
    pub fn from_numeric(value: &Value) -> Option<Number> {
        match value {
            Value::Int32(v) => Some(Number::Int(i64::from(*v))),
            Value::Int64(v) => Some(Number::Int(*v)),
            Value::Float32(v) => Some(Number::Float(f64::from(*v))),
            Value::Float64(v) => Some(Number::Float(*v)),
            Value::Decimal(v) => Some(Number::Decimal(v.clone())),
            _ => None,
        }
    }

    /// Parses an integer, then a float.
    pub fn parse(text: &str) -> Option<Number> {
        let text = text.trim();
        if let Ok(v) = text.parse::<i64>() {
            return Some(Number::Int(v));
        }
        text.parse::<f64>().ok().map(Number::Float)
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Int(v) => *v == 0,
            Number::Float(v) => *v == 0.0,
            Number::Decimal(v) => *v == BigDecimal::from(0),
        }
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, Number::Int(_))
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            Number::Int(v) => *v as f64,
            Number::Float(v) => *v,
            Number::Decimal(v) => v.to_string().parse::<f64>().unwrap_or(f64::NAN),
        }
    }

    /// Truncates toward zero. None for NaN, infinities and out-of-range values.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Number::Int(v) => Some(*v),
            Number::Float(v) => {
                let t = v.trunc();
                if t.is_finite() && t >= i64::MIN as f64 && t <= i64::MAX as f64 {
                    Some(t as i64)
                } else {
                    None
                }
            }
            Number::Decimal(v) => v.with_scale(0).to_string().parse::<i64>().ok(),
        }
    }

    /// None for NaN and infinities.
    pub fn to_decimal(&self) -> Option<BigDecimal> {
        match self {
            Number::Int(v) => Some(BigDecimal::from(*v)),
            Number::Float(v) if v.is_finite() => BigDecimal::from_str(&v.to_string()).ok(),
            Number::Float(_) => None,
            Number::Decimal(v) => Some(v.clone()),
        }
    }

    /// One representative per numeric value: integral floats and decimals become
    /// `Int`, decimals that survive a round trip through `f64` become `Float`.
    pub fn canonical(self) -> Number {
        match self {
            Number::Float(v) if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 => {
                Number::Int(v as i64)
            }
            Number::Decimal(v) => {
                let decimal = Number::Decimal(v.clone());
                if v == v.with_scale(0) {
                    if let Some(int) = decimal.to_i64() {
                        return Number::Int(int);
                    }
                }
                let float = decimal.to_f64();
                if Number::Float(float).to_decimal().as_ref() == Some(&v) {
                    Number::Float(float).canonical()
                } else {
                    decimal
                }
            }
            other => other,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Number::Int(v) => Value::Int64(v),
            Number::Float(v) => Value::Float64(v),
            Number::Decimal(v) => Value::Decimal(v),
        }
    }

    /// Value comparison with widening. None when a NaN is involved.
    pub fn compare(&self, other: &Number) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(b)),
            (Number::Decimal(_), _) | (_, Number::Decimal(_)) => {
                Some(self.to_decimal()?.cmp(&other.to_decimal()?))
            }
            _ => self.to_f64().partial_cmp(&other.to_f64()),
        }
    }

    /// Total order: NaN sorts after every other number.
    pub fn total_cmp(&self, other: &Number) -> Ordering {
        match self.compare(other) {
            Some(ord) => ord,
            None => self.to_f64().total_cmp(&other.to_f64()),
        }
    }

    /// Negation in the same representation.
    pub fn negate(self) -> Number {
        match self {
            Number::Int(v) => v.checked_neg().map_or(Number::Float(-(v as f64)), Number::Int),
            Number::Float(v) => Number::Float(-v),
            Number::Decimal(v) => Number::Decimal(-v),
        }
    }
}

/// Applies `op`, returning None for a zero divisor.
///
/// Integral overflow widens to float rather than wrapping.
pub fn arithmetic(op: ArithOp, left: &Number, right: &Number) -> Option<Number> {
    if matches!(op, ArithOp::Div | ArithOp::Rem) && right.is_zero() {
        return None;
    }
    match (left, right) {
        (Number::Int(a), Number::Int(b)) => {
            let exact = match op {
                ArithOp::Add => a.checked_add(*b),
                ArithOp::Sub => a.checked_sub(*b),
                ArithOp::Mul => a.checked_mul(*b),
                ArithOp::Div => a.checked_div(*b),
                ArithOp::Rem => a.checked_rem(*b),
            };
            Some(exact.map_or_else(|| float_op(op, *a as f64, *b as f64), Number::Int))
        }
        (Number::Decimal(_), _) | (_, Number::Decimal(_)) => {
            let (a, b) = (left.to_decimal()?, right.to_decimal()?);
            let result = match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
                ArithOp::Div => a / b,
                ArithOp::Rem => a % b,
            };
            Some(Number::Decimal(result))
        }
        _ => Some(float_op(op, left.to_f64(), right.to_f64())),
    }
}

fn float_op(op: ArithOp, a: f64, b: f64) -> Number {
    Number::Float(match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => a / b,
        ArithOp::Rem => a % b,
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_int_add_stays_integral(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
            prop_assert_eq!(arithmetic(ArithOp::Add, &Number::Int(a), &Number::Int(b)), Some(Number::Int(a + b)));
        }

        #[test]
        fn prop_compare_ignores_representation(a in -10_000i64..10_000, b in -10_000i64..10_000) {
            prop_assert_eq!(Number::Int(a).compare(&Number::Float(b as f64)), Some(a.cmp(&b)));
        }
    }
}
