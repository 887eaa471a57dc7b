//! Bitwise operators over 64-bit integers.

use super::{register_scalar, Arity};
use crate::feature::FeatureRegistry;
use rivulet_core::{Error, Number, Result, Value};

fn integral(value: &Value) -> Result<i64> {
    match Number::from_value(value) {
        Some(Number::Int(v)) => Ok(v),
        _ => Err(Error::cast(value, "long")),
    }
}

fn binary(args: &[Value], op: fn(i64, i64) -> i64) -> Result<Value> {
    if args[0].is_null() || args[1].is_null() {
        return Ok(Value::Null);
    }
    Ok(Value::Int64(op(integral(&args[0])?, integral(&args[1])?)))
}

fn unary(args: &[Value], op: fn(i64) -> i64) -> Result<Value> {
    if args[0].is_null() {
        return Ok(Value::Null);
    }
    Ok(Value::Int64(op(integral(&args[0])?)))
}

// only the low six bits of a shift distance count
fn distance(n: i64) -> u32 {
    (n & 63) as u32
}

pub(super) fn register(registry: &mut FeatureRegistry) {
    register_scalar(registry, &["^", "bit_mutex"], Arity::Exact(2), |args| binary(args, |a, b| a ^ b));
    register_scalar(registry, &["&", "bit_and"], Arity::Exact(2), |args| binary(args, |a, b| a & b));
    register_scalar(registry, &["|", "bit_or"], Arity::Exact(2), |args| binary(args, |a, b| a | b));
    register_scalar(registry, &["<<", "bit_left_shift"], Arity::Exact(2), |args| {
        binary(args, |a, b| a.wrapping_shl(distance(b)))
    });
    register_scalar(registry, &[">>", "bit_right_shift"], Arity::Exact(2), |args| {
        binary(args, |a, b| a.wrapping_shr(distance(b)))
    });
    register_scalar(registry, &["bit_unsigned_shift"], Arity::Exact(2), |args| {
        binary(args, |a, b| ((a as u64) >> distance(b)) as i64)
    });
    register_scalar(registry, &["bit_not"], Arity::Exact(1), |args| unary(args, |a| !a));
    register_scalar(registry, &["bit_count"], Arity::Exact(1), |args| {
        unary(args, |a| i64::from(a.count_ones()))
    });
}
