//! Value type definitions for rivulet.
//!
//! `Value` is the dynamically typed element carried by record streams. Two notions of
//! equality coexist:
//!
//! - `PartialEq`/`Eq`/`Hash` are structural (`Int32(1) != Int64(1)`) so values can key
//!   hash maps deterministically.
//! - `sql_cmp`/`sql_eq` are the query-level comparisons: numeric-aware, null-propagating,
//!   timestamp-aware.

use crate::cast;
use crate::numeric::Number;
use crate::record::Record;
use crate::types::DataType;
use bigdecimal::BigDecimal;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};

/// A dynamically typed stream value.
#[derive(Clone, Debug)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 32-bit floating point
    Float32(f32),
    /// 64-bit floating point
    Float64(f64),
    /// Arbitrary precision decimal
    Decimal(BigDecimal),
    /// UTF-8 string
    String(String),
    /// DateTime stored as Unix timestamp in milliseconds (UTC)
    DateTime(i64),
    /// Ordered list
    List(Vec<Value>),
    /// Nested record
    Record(Record),
}

impl Value {
    /// Returns the data type of this value, or None if it's Null.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Int32(_) => Some(DataType::Int32),
            Value::Int64(_) => Some(DataType::Int64),
            Value::Float32(_) => Some(DataType::Float32),
            Value::Float64(_) => Some(DataType::Float64),
            Value::Decimal(_) => Some(DataType::Decimal),
            Value::String(_) => Some(DataType::String),
            Value::DateTime(_) => Some(DataType::DateTime),
            Value::List(_) => Some(DataType::List),
            Value::Record(_) => Some(DataType::Record),
        }
    }

    /// Returns true if this value is Null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for `Int32` and `Int64`.
    #[inline]
    pub fn is_integral(&self) -> bool {
        matches!(self, Value::Int32(_) | Value::Int64(_))
    }

    /// Returns true for integral, floating point and decimal values.
    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Int32(_) | Value::Int64(_) | Value::Float32(_) | Value::Float64(_) | Value::Decimal(_)
        )
    }

    /// Returns the boolean value if this is a Boolean, None otherwise.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the i64 value of an integral value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the f64 value if this is a Float64, None otherwise.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a reference to the string if this is a String, None otherwise.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Returns the datetime timestamp if this is a DateTime, None otherwise.
    pub fn as_datetime(&self) -> Option<i64> {
        match self {
            Value::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the elements if this is a List, None otherwise.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Returns the record if this is a Record, None otherwise.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(v) => Some(v),
            _ => None,
        }
    }

    /// Consumes the value, returning the record if this is a Record.
    pub fn into_record(self) -> Option<Record> {
        match self {
            Value::Record(v) => Some(v),
            _ => None,
        }
    }

    /// Reads a dotted path (`a.b.c`) through nested records.
    ///
    /// An exact key match wins over path traversal, so keys that themselves
    /// contain dots stay addressable.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let record = self.as_record()?;
        if let Some(v) = record.get(path) {
            return Some(v);
        }
        let (head, rest) = path.split_once('.')?;
        record.get(head)?.get_path(rest)
    }

    /// Boolean interpretation used when a value appears in predicate position.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Null => false,
            Value::String(s) => s.eq_ignore_ascii_case("true"),
            other => Number::from_value(other).is_some_and(|n| !n.is_zero()),
        }
    }

    /// Rewrites numbers, including those nested in lists and records, to one
    /// canonical variant per value (see `Number::canonical`).
    ///
    /// Group keys and distinct sets are normalized so that values equal under
    /// `sql_eq`, such as `1`, `1.0` and a decimal `1.00`, land in the same bucket.
    pub fn normalized(self) -> Value {
        match self {
            Value::List(items) => Value::List(items.into_iter().map(Value::normalized).collect()),
            Value::Record(record) => {
                Value::Record(record.into_iter().map(|(k, v)| (k, v.normalized())).collect())
            }
            other => match Number::from_numeric(&other) {
                Some(number) => number.canonical().into_value(),
                None => other,
            },
        }
    }

    /// Query-level comparison.
    ///
    /// Returns None when either side is null or the values are not comparable.
    pub fn sql_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::String(s)) => s.parse::<bool>().ok().map(|b| a.cmp(&b)),
            (Value::String(s), Value::Boolean(b)) => s.parse::<bool>().ok().map(|a| a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::String(s)) => cast::parse_datetime(s).map(|b| a.cmp(&b)),
            (Value::String(s), Value::DateTime(b)) => cast::parse_datetime(s).map(|a| a.cmp(b)),
            (Value::List(a), Value::List(b)) => Some(a.cmp(b)),
            (Value::Record(a), Value::Record(b)) => Some(a.cmp(b)),
            _ => {
                let a = Number::from_value(self)?;
                let b = Number::from_value(other)?;
                a.compare(&b)
            }
        }
    }

    /// Query-level equality: `sql_cmp` reports `Equal`.
    pub fn sql_eq(&self, other: &Value) -> bool {
        self.sql_cmp(other) == Some(Ordering::Equal)
    }

    /// Returns a type ordering value for comparing different types.
    fn type_order(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Int32(_) | Value::Int64(_) => 2,
            Value::Float32(_) | Value::Float64(_) | Value::Decimal(_) => 2,
            Value::String(_) => 3,
            Value::DateTime(_) => 4,
            Value::List(_) => 5,
            Value::Record(_) => 6,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a.to_bits() == b.to_bits() || a == b,
            (Value::Float64(a), Value::Float64(b)) => a.to_bits() == b.to_bits() || a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            Value::Int32(i) => i.hash(state),
            Value::Int64(i) => i.hash(state),
            // -0.0 == 0.0, so both must hash alike
            Value::Float32(f) => (if *f == 0.0 { 0.0f32 } else { *f }).to_bits().hash(state),
            Value::Float64(f) => (if *f == 0.0 { 0.0f64 } else { *f }).to_bits().hash(state),
            Value::Decimal(d) => d.hash(state),
            Value::String(s) => s.hash(state),
            Value::DateTime(d) => d.hash(state),
            Value::List(items) => items.hash(state),
            Value::Record(r) => r.hash(state),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    /// Total order used for sorting: nulls first, numbers compared by value,
    /// NaN after every other number, then by type.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.cmp(b),
            (Value::Record(a), Value::Record(b)) => a.cmp(b),
            _ => match (Number::from_numeric(self), Number::from_numeric(other)) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => self.type_order().cmp(&other.type_order()),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::String(v) => f.write_str(v),
            Value::DateTime(v) => f.write_str(&cast::format_datetime(*v)),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Record(r) => write!(f, "{}", r),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<BigDecimal> for Value {
    fn from(v: BigDecimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}
