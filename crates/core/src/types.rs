//! Data type definitions for rivulet.
//!
//! `DataType` names the kinds a `Value` can hold and doubles as the target of
//! `cast(x as T)`.

use core::fmt;

/// Kinds of runtime values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Boolean type (true/false)
    Boolean,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 32-bit floating point number
    Float32,
    /// 64-bit floating point number
    Float64,
    /// Arbitrary precision decimal
    Decimal,
    /// UTF-8 string
    String,
    /// Date and time stored as Unix timestamp (milliseconds)
    DateTime,
    /// Ordered list of values
    List,
    /// Nested record
    Record,
}

impl DataType {
    /// Resolves a SQL type name used in `cast(x as T)`.
    ///
    /// Matching is case-insensitive.
    pub fn from_sql_name(name: &str) -> Option<Self> {
        let dt = match name.to_ascii_lowercase().as_str() {
            "string" | "varchar" | "text" | "char" => DataType::String,
            "boolean" | "bool" => DataType::Boolean,
            "int" | "integer" => DataType::Int32,
            "long" | "bigint" => DataType::Int64,
            "double" => DataType::Float64,
            "float" => DataType::Float32,
            "decimal" | "numeric" => DataType::Decimal,
            "date" | "datetime" | "timestamp" => DataType::DateTime,
            _ => return None,
        };
        Some(dt)
    }

    /// Returns true for integral and floating point types, and decimal.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Int32 | DataType::Int64 | DataType::Float32 | DataType::Float64 | DataType::Decimal
        )
    }

    /// Lowercase name used in messages.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Boolean => "boolean",
            DataType::Int32 => "int",
            DataType::Int64 => "long",
            DataType::Float32 => "float",
            DataType::Float64 => "double",
            DataType::Decimal => "decimal",
            DataType::String => "string",
            DataType::DateTime => "date",
            DataType::List => "list",
            DataType::Record => "record",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
