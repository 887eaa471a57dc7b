//! Grouping and windowing.
//!
//! A grouped query splits its input by window instance and, inside each instance, by
//! the evaluated group-by key tuple. `interval(d)` and `_window(..)` in the
//! `group by` list pick the window policy:
//!
//! | call | window |
//! |---|---|
//! | `interval('1s')` | tumbling time window |
//! | `_window('2s')` | tumbling time window |
//! | `_window('200S', '2s')` | sliding time window: the longer duration is the size, the shorter the slide |
//! | `_window(10)` | tumbling count window |
//! | `_window(10, 5)` | sliding count window: size, then skip |
//! | `_window(eq(this, 0))` | closes when the predicate turns true |
//!
//! Time windows are aligned to the start of the execution: instance `j` covers
//! `[j * slide, j * slide + size)` milliseconds of elapsed time.

mod duration;
mod operator;
mod table;

pub use duration::parse_duration;
pub use operator::{group_stream, GroupPlan};
pub use table::{GroupRow, GroupTable};

use crate::ast::{Expr, FunctionCall, Literal};
use crate::compiler::{compile_predicate, RowPredicate};
use crate::feature::{Feature, FeatureId, FeatureRegistry, GroupFeature, QueryMetadata};
use core::fmt;
use rivulet_core::{Error, Result};
use std::time::Duration;

/// Window policy of a grouped query.
#[derive(Clone)]
pub enum WindowSpec {
    Time { size: Duration, slide: Duration },
    Count { size: u64, skip: u64 },
    Predicate(RowPredicate),
}

impl WindowSpec {
    pub fn tumbling(size: Duration) -> Self {
        WindowSpec::Time { size, slide: size }
    }
}

impl fmt::Debug for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowSpec::Time { size, slide } => write!(f, "Time({:?}, {:?})", size, slide),
            WindowSpec::Count { size, skip } => write!(f, "Count({}, {})", size, skip),
            WindowSpec::Predicate(_) => f.write_str("Predicate"),
        }
    }
}

fn duration_arg(call: &FunctionCall, arg: &Expr) -> Result<Duration> {
    let duration = match arg {
        Expr::Literal(Literal::String(text)) => parse_duration(text)?,
        Expr::Literal(Literal::Integer(millis)) if *millis > 0 => Duration::from_millis(*millis as u64),
        _ => return Err(Error::cast(call, "duration")),
    };
    if duration.is_zero() {
        return Err(Error::cast(call, "duration"));
    }
    Ok(duration)
}

fn count_arg(call: &FunctionCall, value: i64) -> Result<u64> {
    u64::try_from(value)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| Error::cast(call, "window size"))
}

/// `interval(duration)`
struct Interval;

impl GroupFeature for Interval {
    fn create_window(&self, call: &FunctionCall, _metadata: &QueryMetadata) -> Result<WindowSpec> {
        match call.args.as_slice() {
            [arg] => Ok(WindowSpec::tumbling(duration_arg(call, arg)?)),
            args => Err(Error::arity(call.to_string(), "1", args.len())),
        }
    }
}

/// `_window(..)`
struct Window;

impl GroupFeature for Window {
    fn create_window(&self, call: &FunctionCall, metadata: &QueryMetadata) -> Result<WindowSpec> {
        match call.args.as_slice() {
            [Expr::Literal(Literal::Integer(size))] => {
                let size = count_arg(call, *size)?;
                Ok(WindowSpec::Count { size, skip: size })
            }
            [arg @ Expr::Literal(Literal::String(_))] => Ok(WindowSpec::tumbling(duration_arg(call, arg)?)),
            [predicate] => Ok(WindowSpec::Predicate(compile_predicate(predicate, metadata)?)),
            [Expr::Literal(Literal::Integer(size)), Expr::Literal(Literal::Integer(skip))] => Ok(WindowSpec::Count {
                size: count_arg(call, *size)?,
                skip: count_arg(call, *skip)?,
            }),
            [first, second] => {
                let (first, second) = (duration_arg(call, first)?, duration_arg(call, second)?);
                // sliding windows overlap: slide <= size
                let (size, slide) = if first >= second { (first, second) } else { (second, first) };
                Ok(WindowSpec::Time { size, slide })
            }
            args => Err(Error::arity(call.to_string(), "1..=2", args.len())),
        }
    }
}

pub fn register_defaults(registry: &mut FeatureRegistry) {
    registry.register(FeatureId::group("interval"), Feature::group(Interval));
    registry.register(FeatureId::group("_window"), Feature::group(Window));
}
