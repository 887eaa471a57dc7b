//! Arithmetic operators and the `math.` namespace.

use super::{register_scalar, Arity};
use crate::feature::FeatureRegistry;
use bigdecimal::{BigDecimal, RoundingMode};
use core::cmp::Ordering;
use rivulet_core::numeric::{arithmetic, ArithOp};
use rivulet_core::{Error, Number, Result, Value};

fn number(value: &Value) -> Result<Number> {
    Number::from_value(value).ok_or_else(|| Error::cast(value, "number"))
}

/// Null in, null out. A zero divisor also yields null.
pub(crate) fn binary_arithmetic(op: ArithOp, left: &Value, right: &Value) -> Result<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    let result = arithmetic(op, &number(left)?, &number(right)?);
    Ok(result.map_or(Value::Null, Number::into_value))
}

fn extreme(args: &[Value], wanted: Ordering) -> Result<Value> {
    let mut best: Option<&Value> = None;
    for arg in args.iter().filter(|v| !v.is_null()) {
        number(arg)?;
        best = match best {
            Some(current) if arg.sql_cmp(current) != Some(wanted) => Some(current),
            _ => Some(arg),
        };
    }
    Ok(best.cloned().map_or(Value::Null, |v| number(&v).map_or(Value::Null, Number::into_value)))
}

fn decimal_rounding(value: &BigDecimal, mode: RoundingMode) -> Value {
    Value::Decimal(value.with_scale_round(0, mode))
}

/// floor/ceil/round keep integral operands as they are.
fn rounding(value: &Value, mode: RoundingMode) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    Ok(match number(value)? {
        Number::Int(v) => Value::Int64(v),
        Number::Decimal(d) => decimal_rounding(&d, mode),
        Number::Float(f) => Value::Float64(match mode {
            RoundingMode::Floor => libm::floor(f),
            RoundingMode::Ceiling => libm::ceil(f),
            _ => libm::round(f),
        }),
    })
}

fn unary_float(value: &Value, f: fn(f64) -> f64) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    Ok(Value::Float64(f(number(value)?.to_f64())))
}

fn absolute(value: &Value) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    Ok(match number(value)? {
        Number::Int(v) => v.checked_abs().map_or(Value::Float64((v as f64).abs()), Value::Int64),
        Number::Float(f) => Value::Float64(f.abs()),
        Number::Decimal(d) => Value::Decimal(d.abs()),
    })
}

pub(super) fn register(registry: &mut FeatureRegistry) {
    let ops = [
        (["+", "math.plus"], ArithOp::Add),
        (["-", "math.sub"], ArithOp::Sub),
        (["*", "math.mul"], ArithOp::Mul),
        (["/", "math.divi"], ArithOp::Div),
        (["%", "math.mod"], ArithOp::Rem),
    ];
    for (names, op) in ops {
        register_scalar(registry, &names, Arity::Exact(2), move |args| {
            binary_arithmetic(op, &args[0], &args[1])
        });
    }

    register_scalar(registry, &["math.max"], Arity::AtLeast(1), |args| extreme(args, Ordering::Greater));
    register_scalar(registry, &["math.min"], Arity::AtLeast(1), |args| extreme(args, Ordering::Less));
    register_scalar(registry, &["math.floor"], Arity::Exact(1), |args| rounding(&args[0], RoundingMode::Floor));
    register_scalar(registry, &["math.ceil"], Arity::Exact(1), |args| rounding(&args[0], RoundingMode::Ceiling));
    register_scalar(registry, &["math.round"], Arity::Exact(1), |args| rounding(&args[0], RoundingMode::HalfUp));
    register_scalar(registry, &["math.abs"], Arity::Exact(1), |args| absolute(&args[0]));
    register_scalar(registry, &["math.log"], Arity::Exact(1), |args| unary_float(&args[0], libm::log));
    register_scalar(registry, &["math.sqrt"], Arity::Exact(1), |args| unary_float(&args[0], libm::sqrt));
    register_scalar(registry, &["math.exp"], Arity::Exact(1), |args| unary_float(&args[0], libm::exp));
    register_scalar(registry, &["math.pow"], Arity::Exact(2), |args| {
        if args[0].is_null() || args[1].is_null() {
            return Ok(Value::Null);
        }
        Ok(Value::Float64(libm::pow(number(&args[0])?.to_f64(), number(&args[1])?.to_f64())))
    });
}
