//! Select statement AST.

use super::expr::Expr;
use core::fmt;

/// Sort order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// One item of the select list.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectItem {
    /// `*`
    Wildcard,
    /// `expr [as alias]`
    Expr { expr: Expr, alias: Option<String> },
}

impl SelectItem {
    /// Output key: the alias, or the expression's textual form.
    pub fn output_name(&self) -> String {
        match self {
            SelectItem::Wildcard => "*".to_string(),
            SelectItem::Expr { expr, alias } => alias.clone().unwrap_or_else(|| expr.to_string()),
        }
    }
}

/// A data source in `from` or `join`.
#[derive(Clone, Debug, PartialEq)]
pub enum FromItem {
    Table { name: String, alias: Option<String> },
    SubQuery { query: Box<SelectStatement>, alias: Option<String> },
}

impl FromItem {
    pub fn table(name: impl Into<String>) -> Self {
        FromItem::Table {
            name: name.into(),
            alias: None,
        }
    }

    pub fn table_as(name: impl Into<String>, alias: impl Into<String>) -> Self {
        FromItem::Table {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }

    pub fn subquery(query: SelectStatement, alias: Option<&str>) -> Self {
        FromItem::SubQuery {
            query: Box::new(query),
            alias: alias.map(str::to_string),
        }
    }

    /// Name the source's columns are qualified with: the alias, else the table name.
    pub fn qualifier(&self) -> Option<&str> {
        match self {
            FromItem::Table { name, alias } => Some(alias.as_deref().unwrap_or(name)),
            FromItem::SubQuery { alias, .. } => alias.as_deref(),
        }
    }
}

/// Join kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    /// Comma-separated sources, or `cross join`.
    Cross,
}

impl JoinKind {
    /// Registry name of the join feature.
    pub fn name(&self) -> &'static str {
        match self {
            JoinKind::Inner => "inner",
            JoinKind::Left => "left",
            JoinKind::Right => "right",
            JoinKind::Cross => "cross",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub source: FromItem,
    pub on: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expr,
    pub order: SortOrder,
}

/// `limit [offset,] count`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limit {
    pub offset: u64,
    pub count: Option<u64>,
}

/// A parsed `select` statement.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectStatement {
    pub distinct: bool,
    pub items: Vec<SelectItem>,
    pub from: Option<FromItem>,
    pub joins: Vec<Join>,
    pub selection: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<Limit>,
}

impl SelectStatement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an unaliased select item.
    pub fn select(mut self, expr: Expr) -> Self {
        self.items.push(SelectItem::Expr { expr, alias: None });
        self
    }

    /// Adds an aliased select item.
    pub fn select_as(mut self, expr: Expr, alias: impl Into<String>) -> Self {
        self.items.push(SelectItem::Expr {
            expr,
            alias: Some(alias.into()),
        });
        self
    }

    /// Adds `*`.
    pub fn select_all(mut self) -> Self {
        self.items.push(SelectItem::Wildcard);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.from = Some(FromItem::table(table));
        self
    }

    pub fn from_as(mut self, table: impl Into<String>, alias: impl Into<String>) -> Self {
        self.from = Some(FromItem::table_as(table, alias));
        self
    }

    pub fn from_item(mut self, item: FromItem) -> Self {
        self.from = Some(item);
        self
    }

    pub fn join(mut self, kind: JoinKind, source: FromItem, on: Option<Expr>) -> Self {
        self.joins.push(Join { kind, source, on });
        self
    }

    /// Appends a comma-separated source (`from a, b`).
    pub fn also_from(self, source: FromItem) -> Self {
        self.join(JoinKind::Cross, source, None)
    }

    /// Sets the `where` clause.
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.selection = Some(predicate);
        self
    }

    pub fn group_by(mut self, expr: Expr) -> Self {
        self.group_by.push(expr);
        self
    }

    pub fn having(mut self, predicate: Expr) -> Self {
        self.having = Some(predicate);
        self
    }

    pub fn order_by(mut self, expr: Expr, order: SortOrder) -> Self {
        self.order_by.push(OrderByExpr { expr, order });
        self
    }

    /// `limit offset, count`
    pub fn limit(mut self, offset: u64, count: u64) -> Self {
        self.limit = Some(Limit {
            offset,
            count: Some(count),
        });
        self
    }
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("select ")?;
        if self.distinct {
            f.write_str("distinct ")?;
        }
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match item {
                SelectItem::Wildcard => f.write_str("*")?,
                SelectItem::Expr { expr, alias: None } => write!(f, "{}", expr)?,
                SelectItem::Expr {
                    expr,
                    alias: Some(alias),
                } => write!(f, "{} {}", expr, alias)?,
            }
        }
        if let Some(from) = &self.from {
            write!(f, " from {}", from)?;
        }
        for join in &self.joins {
            match (join.kind, &join.on) {
                (JoinKind::Cross, None) => write!(f, ", {}", join.source)?,
                (kind, on) => {
                    write!(f, " {} join {}", kind.name(), join.source)?;
                    if let Some(on) = on {
                        write!(f, " on {}", on)?;
                    }
                }
            }
        }
        if let Some(selection) = &self.selection {
            write!(f, " where {}", selection)?;
        }
        for (i, expr) in self.group_by.iter().enumerate() {
            f.write_str(if i == 0 { " group by " } else { ", " })?;
            write!(f, "{}", expr)?;
        }
        if let Some(having) = &self.having {
            write!(f, " having {}", having)?;
        }
        for (i, order) in self.order_by.iter().enumerate() {
            f.write_str(if i == 0 { " order by " } else { ", " })?;
            write!(f, "{}", order.expr)?;
            if order.order == SortOrder::Desc {
                f.write_str(" desc")?;
            }
        }
        if let Some(limit) = &self.limit {
            match limit.count {
                Some(count) => write!(f, " limit {},{}", limit.offset, count)?,
                None => write!(f, " offset {}", limit.offset)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for FromItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FromItem::Table { name, alias } => {
                f.write_str(name)?;
                if let Some(alias) = alias {
                    write!(f, " {}", alias)?;
                }
                Ok(())
            }
            FromItem::SubQuery { query, alias } => {
                write!(f, "({})", query)?;
                if let Some(alias) = alias {
                    write!(f, " {}", alias)?;
                }
                Ok(())
            }
        }
    }
}
