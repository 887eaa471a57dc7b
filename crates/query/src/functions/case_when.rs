//! `value-map:case-when`.
//!
//! The searched form (`case when p then ..`) tests each branch as a predicate; the
//! simple form (`case x when v then ..`) compares the subject with `sql_eq`.
//! Branches are tried in order and evaluation stops at the first match.

use crate::ast::Expr;
use crate::compiler::{compile_predicate, compile_value, constant, RowPredicate, ValueMapper};
use crate::context::EvalContext;
use crate::feature::{Feature, FeatureId, FeatureRegistry, QueryMetadata, ValueMapFeature};
use futures::FutureExt;
use rivulet_core::{Error, Result, Value};
use std::sync::Arc;

enum Branches {
    Searched(Vec<(RowPredicate, ValueMapper)>),
    Simple(ValueMapper, Vec<(ValueMapper, ValueMapper)>),
}

struct CaseWhen;

impl ValueMapFeature for CaseWhen {
    fn create_mapper(&self, expr: &Expr, metadata: &QueryMetadata) -> Result<ValueMapper> {
        let Expr::Case(case) = expr else {
            return Err(Error::unsupported_expression(expr.to_string()));
        };
        let branches = match &case.operand {
            None => Branches::Searched(
                case.branches
                    .iter()
                    .map(|(when, then)| Ok((compile_predicate(when, metadata)?, compile_value(then, metadata)?)))
                    .collect::<Result<_>>()?,
            ),
            Some(operand) => Branches::Simple(
                compile_value(operand, metadata)?,
                case.branches
                    .iter()
                    .map(|(when, then)| Ok((compile_value(when, metadata)?, compile_value(then, metadata)?)))
                    .collect::<Result<_>>()?,
            ),
        };
        let otherwise = match &case.else_result {
            Some(else_result) => compile_value(else_result, metadata)?,
            None => constant(Value::Null),
        };
        let branches = Arc::new(branches);

        Ok(Arc::new(move |ctx: &EvalContext| {
            let ctx = ctx.clone();
            let branches = branches.clone();
            let otherwise = otherwise.clone();
            async move {
                match branches.as_ref() {
                    Branches::Searched(branches) => {
                        for (when, then) in branches {
                            if when(&ctx, ctx.row()).await? {
                                return then(&ctx).await;
                            }
                        }
                    }
                    Branches::Simple(subject, branches) => {
                        let subject = subject(&ctx).await?;
                        for (when, then) in branches {
                            if subject.sql_eq(&when(&ctx).await?) {
                                return then(&ctx).await;
                            }
                        }
                    }
                }
                otherwise(&ctx).await
            }
            .boxed()
        }))
    }
}

pub(super) fn register(registry: &mut FeatureRegistry) {
    registry.register(FeatureId::value_map("case-when"), Feature::value_map(CaseWhen));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::test_support::eval;

    #[tokio::test]
    async fn test_searched_case() {
        let expr = Expr::case(
            None,
            vec![
                (Expr::lt(Expr::this(), Expr::int(0)), Expr::string("negative")),
                (Expr::eq(Expr::this(), Expr::int(0)), Expr::string("zero")),
            ],
            Some(Expr::string("positive")),
        );
        assert_eq!(eval(&expr, Value::Int64(-3)).await, Ok(Value::from("negative")));
        assert_eq!(eval(&expr, Value::Int64(0)).await, Ok(Value::from("zero")));
        assert_eq!(eval(&expr, Value::Int64(7)).await, Ok(Value::from("positive")));
    }

    #[tokio::test]
    async fn test_simple_case_without_else() {
        let expr = Expr::case(
            Some(Expr::this()),
            vec![(Expr::int(1), Expr::string("one")), (Expr::string("2"), Expr::string("two"))],
            None,
        );
        assert_eq!(eval(&expr, Value::Int32(1)).await, Ok(Value::from("one")));
        assert_eq!(eval(&expr, Value::Int64(2)).await, Ok(Value::from("two")));
        assert_eq!(eval(&expr, Value::Int64(3)).await, Ok(Value::Null));
    }
}
