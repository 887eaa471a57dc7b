//! AST module for select statements and expressions.
//!
//! The engine consumes already-parsed trees. SQL text is turned into a
//! `SelectStatement` by a `QueryParser` supplied by the caller.

mod expr;
mod select;

pub use expr::{BinaryOp, CaseExpr, ColumnRef, Expr, FunctionCall, Literal, Sign};
pub use select::{
    FromItem, Join, JoinKind, Limit, OrderByExpr, SelectItem, SelectStatement, SortOrder,
};

use rivulet_core::Result;

/// Grammar collaborator turning query text into a statement.
///
/// Implementations report syntax errors as `Error::Parse`; the engine passes them
/// through unchanged.
pub trait QueryParser: Send + Sync {
    fn parse(&self, sql: &str) -> Result<SelectStatement>;
}

impl<F> QueryParser for F
where
    F: Fn(&str) -> Result<SelectStatement> + Send + Sync,
{
    fn parse(&self, sql: &str) -> Result<SelectStatement> {
        self(sql)
    }
}
