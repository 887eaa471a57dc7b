//! Expression AST definitions.
//!
//! The node set mirrors what the SQL grammar produces. `Display` renders the textual
//! form, which serves as the default output key of an unaliased select item and as
//! the expression text carried by compile errors.

use super::select::SelectStatement;
use core::fmt;
use rivulet_core::cast::parse_datetime;
use rivulet_core::{Error, Result, Value};

/// Literal values as written in the query.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    String(String),
    Integer(i64),
    Float(f64),
    /// `{d 'yyyy-MM-dd'}`
    Date(String),
    /// `{ts 'yyyy-MM-dd HH:mm:ss'}`
    Timestamp(String),
    /// `0x1F`, digits only
    Hex(String),
    Boolean(bool),
    Null,
}

impl Literal {
    /// Evaluates the literal to its runtime value.
    pub fn to_value(&self) -> Result<Value> {
        let value = match self {
            Literal::String(s) => Value::String(s.clone()),
            Literal::Integer(v) => Value::Int64(*v),
            Literal::Float(v) => Value::Float64(*v),
            Literal::Date(s) | Literal::Timestamp(s) => {
                Value::DateTime(parse_datetime(s).ok_or_else(|| Error::cast(s, "date"))?)
            }
            Literal::Hex(digits) => {
                let digits = digits.trim_start_matches("0x").trim_start_matches("0X");
                Value::Int64(
                    i64::from_str_radix(digits, 16).map_err(|_| Error::cast(digits, "long"))?,
                )
            }
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Null => Value::Null,
        };
        Ok(value)
    }
}

/// Reference to a column, optionally qualified by a source alias.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    /// Source alias, or `this`.
    pub table: Option<String>,
    /// Column name or dotted path.
    pub name: String,
}

impl ColumnRef {
    /// Parses `name` or `table.name`; only the first dot separates the qualifier.
    pub fn parse(path: &str) -> Self {
        match path.split_once('.') {
            Some((table, name)) => Self {
                table: Some(table.to_string()),
                name: name.to_string(),
            },
            None => Self {
                table: None,
                name: path.to_string(),
            },
        }
    }
}

/// Binary operators.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Bitwise
    BitXor,
    BitAnd,
    BitOr,
    ShiftLeft,
    ShiftRight,
    // String
    Concat,
    Like,
    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    // Logical
    And,
    Or,
    /// Any other operator (JSON/path operators etc.), resolved through the registry.
    Custom(String),
}

impl BinaryOp {
    /// Operator text; also the registry name of the operator's feature.
    pub fn symbol(&self) -> &str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::Concat => "||",
            BinaryOp::Like => "like",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Custom(op) => op,
        }
    }
}

/// Unary sign operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sign {
    Plus,
    Minus,
    BitNot,
}

impl Sign {
    pub fn symbol(&self) -> char {
        match self {
            Sign::Plus => '+',
            Sign::Minus => '-',
            Sign::BitNot => '~',
        }
    }
}

/// A named function call such as `max(1, 2)`, `count(*)` or `math.plus(a, b)`.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expr>,
    /// `count(*)`
    pub star: bool,
    /// `count(distinct x)`
    pub distinct: bool,
}

/// `case [operand] when .. then .. [else ..] end`
#[derive(Clone, Debug, PartialEq)]
pub struct CaseExpr {
    pub operand: Option<Box<Expr>>,
    pub branches: Vec<(Expr, Expr)>,
    pub else_result: Option<Box<Expr>>,
}

/// Expression AST node.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Column(ColumnRef),
    Function(FunctionCall),
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Signed {
        sign: Sign,
        expr: Box<Expr>,
    },
    Cast {
        expr: Box<Expr>,
        /// Type name as written, e.g. `int` or `decimal`.
        data_type: String,
    },
    Case(CaseExpr),
    Parenthesis(Box<Expr>),
    SubQuery(Box<SelectStatement>),
    Not(Box<Expr>),
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    /// `x is [not] true|false`
    IsBoolean {
        expr: Box<Expr>,
        value: bool,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
}

impl Expr {
    /// Column reference from `name` or `table.name`.
    pub fn col(path: &str) -> Self {
        Expr::Column(ColumnRef::parse(path))
    }

    /// The current stream element.
    pub fn this() -> Self {
        Expr::col("this")
    }

    pub fn int(v: i64) -> Self {
        Expr::Literal(Literal::Integer(v))
    }

    pub fn float(v: f64) -> Self {
        Expr::Literal(Literal::Float(v))
    }

    pub fn string(v: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(v.into()))
    }

    pub fn boolean(v: bool) -> Self {
        Expr::Literal(Literal::Boolean(v))
    }

    pub fn null() -> Self {
        Expr::Literal(Literal::Null)
    }

    pub fn date(v: impl Into<String>) -> Self {
        Expr::Literal(Literal::Date(v.into()))
    }

    pub fn timestamp(v: impl Into<String>) -> Self {
        Expr::Literal(Literal::Timestamp(v.into()))
    }

    pub fn hex(v: impl Into<String>) -> Self {
        Expr::Literal(Literal::Hex(v.into()))
    }

    /// Function call.
    pub fn func(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Function(FunctionCall {
            name: name.into(),
            args,
            star: false,
            distinct: false,
        })
    }

    /// `count(*)`
    pub fn count_star() -> Self {
        Expr::Function(FunctionCall {
            name: "count".into(),
            args: Vec::new(),
            star: true,
            distinct: false,
        })
    }

    /// `name(distinct arg)`
    pub fn func_distinct(name: impl Into<String>, arg: Expr) -> Self {
        Expr::Function(FunctionCall {
            name: name.into(),
            args: vec![arg],
            star: false,
            distinct: true,
        })
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn add(left: Expr, right: Expr) -> Self {
        Expr::binary(left, BinaryOp::Add, right)
    }

    pub fn sub(left: Expr, right: Expr) -> Self {
        Expr::binary(left, BinaryOp::Sub, right)
    }

    pub fn mul(left: Expr, right: Expr) -> Self {
        Expr::binary(left, BinaryOp::Mul, right)
    }

    pub fn div(left: Expr, right: Expr) -> Self {
        Expr::binary(left, BinaryOp::Div, right)
    }

    pub fn modulo(left: Expr, right: Expr) -> Self {
        Expr::binary(left, BinaryOp::Mod, right)
    }

    pub fn concat(left: Expr, right: Expr) -> Self {
        Expr::binary(left, BinaryOp::Concat, right)
    }

    /// Creates an equality expression.
    pub fn eq(left: Expr, right: Expr) -> Self {
        Expr::binary(left, BinaryOp::Eq, right)
    }

    /// Creates a not-equal expression.
    pub fn ne(left: Expr, right: Expr) -> Self {
        Expr::binary(left, BinaryOp::NotEq, right)
    }

    /// Creates a less-than expression.
    pub fn lt(left: Expr, right: Expr) -> Self {
        Expr::binary(left, BinaryOp::Lt, right)
    }

    /// Creates a less-than-or-equal expression.
    pub fn le(left: Expr, right: Expr) -> Self {
        Expr::binary(left, BinaryOp::LtEq, right)
    }

    /// Creates a greater-than expression.
    pub fn gt(left: Expr, right: Expr) -> Self {
        Expr::binary(left, BinaryOp::Gt, right)
    }

    /// Creates a greater-than-or-equal expression.
    pub fn ge(left: Expr, right: Expr) -> Self {
        Expr::binary(left, BinaryOp::GtEq, right)
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::binary(left, BinaryOp::And, right)
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::binary(left, BinaryOp::Or, right)
    }

    pub fn like(expr: Expr, pattern: impl Into<String>) -> Self {
        Expr::binary(expr, BinaryOp::Like, Expr::string(pattern))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn neg(expr: Expr) -> Self {
        Expr::Signed {
            sign: Sign::Minus,
            expr: Box::new(expr),
        }
    }

    pub fn bit_not(expr: Expr) -> Self {
        Expr::Signed {
            sign: Sign::BitNot,
            expr: Box::new(expr),
        }
    }

    pub fn paren(expr: Expr) -> Self {
        Expr::Parenthesis(Box::new(expr))
    }

    pub fn cast(expr: Expr, data_type: impl Into<String>) -> Self {
        Expr::Cast {
            expr: Box::new(expr),
            data_type: data_type.into(),
        }
    }

    /// `case [operand] when .. then .. [else ..] end`
    pub fn case(operand: Option<Expr>, branches: Vec<(Expr, Expr)>, else_result: Option<Expr>) -> Self {
        Expr::Case(CaseExpr {
            operand: operand.map(Box::new),
            branches,
            else_result: else_result.map(Box::new),
        })
    }

    pub fn subquery(query: SelectStatement) -> Self {
        Expr::SubQuery(Box::new(query))
    }

    pub fn is_null(expr: Expr) -> Self {
        Expr::IsNull {
            expr: Box::new(expr),
            negated: false,
        }
    }

    pub fn is_not_null(expr: Expr) -> Self {
        Expr::IsNull {
            expr: Box::new(expr),
            negated: true,
        }
    }

    /// `expr is [not] true|false`
    pub fn is_bool(expr: Expr, value: bool, negated: bool) -> Self {
        Expr::IsBoolean {
            expr: Box::new(expr),
            value,
            negated,
        }
    }

    pub fn between(expr: Expr, low: Expr, high: Expr) -> Self {
        Expr::Between {
            expr: Box::new(expr),
            low: Box::new(low),
            high: Box::new(high),
            negated: false,
        }
    }

    pub fn not_between(expr: Expr, low: Expr, high: Expr) -> Self {
        Expr::Between {
            expr: Box::new(expr),
            low: Box::new(low),
            high: Box::new(high),
            negated: true,
        }
    }

    pub fn in_list(expr: Expr, list: Vec<Expr>) -> Self {
        Expr::InList {
            expr: Box::new(expr),
            list,
            negated: false,
        }
    }

    pub fn not_in(expr: Expr, list: Vec<Expr>) -> Self {
        Expr::InList {
            expr: Box::new(expr),
            list,
            negated: true,
        }
    }

    /// Returns the column reference if this is a plain column.
    pub fn as_column(&self) -> Option<&ColumnRef> {
        match self {
            Expr::Column(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the call if this is a function call.
    pub fn as_function(&self) -> Option<&FunctionCall> {
        match self {
            Expr::Function(f) => Some(f),
            _ => None,
        }
    }

    /// True for an unqualified `this`.
    pub fn is_this(&self) -> bool {
        matches!(self, Expr::Column(ColumnRef { table: None, name }) if name == "this")
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Integer(v) => write!(f, "{}", v),
            Literal::Float(v) => write!(f, "{:?}", v),
            Literal::Date(s) => write!(f, "{{d '{}'}}", s),
            Literal::Timestamp(s) => write!(f, "{{ts '{}'}}", s),
            Literal::Hex(s) => write!(f, "0x{}", s.trim_start_matches("0x")),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Null => f.write_str("null"),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        if self.distinct {
            f.write_str("distinct ")?;
        }
        if self.star {
            f.write_str("*")?;
        } else {
            write_list(f, &self.args)?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(lit) => write!(f, "{}", lit),
            Expr::Column(col) => write!(f, "{}", col),
            Expr::Function(call) => write!(f, "{}", call),
            Expr::Binary { left, op, right } => write!(f, "{} {} {}", left, op.symbol(), right),
            Expr::Signed { sign, expr } => write!(f, "{}{}", sign.symbol(), expr),
            Expr::Cast { expr, data_type } => write!(f, "cast({} as {})", expr, data_type),
            Expr::Case(case) => {
                f.write_str("case")?;
                if let Some(operand) = &case.operand {
                    write!(f, " {}", operand)?;
                }
                for (when, then) in &case.branches {
                    write!(f, " when {} then {}", when, then)?;
                }
                if let Some(else_result) = &case.else_result {
                    write!(f, " else {}", else_result)?;
                }
                f.write_str(" end")
            }
            Expr::Parenthesis(inner) => write!(f, "({})", inner),
            Expr::SubQuery(query) => write!(f, "({})", query),
            Expr::Not(inner) => write!(f, "not {}", inner),
            Expr::IsNull { expr, negated } => {
                write!(f, "{} is {}null", expr, if *negated { "not " } else { "" })
            }
            Expr::IsBoolean { expr, value, negated } => write!(
                f,
                "{} is {}{}",
                expr,
                if *negated { "not " } else { "" },
                value
            ),
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => write!(
                f,
                "{} {}between {} and {}",
                expr,
                if *negated { "not " } else { "" },
                low,
                high
            ),
            Expr::InList { expr, list, negated } => {
                write!(f, "{} {}in (", expr, if *negated { "not " } else { "" })?;
                write_list(f, list)?;
                f.write_str(")")
            }
        }
    }
}
