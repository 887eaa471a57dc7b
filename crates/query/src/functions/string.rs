//! String functions.

use super::{register_scalar, Arity};
use crate::feature::FeatureRegistry;
use rivulet_core::{Error, Result, Value};

fn push_text(out: &mut String, value: &Value) {
    match value {
        Value::Null => {}
        Value::List(items) => items.iter().for_each(|item| push_text(out, item)),
        other => out.push_str(&other.to_string()),
    }
}

/// Concatenates the text of every operand. Lists are flattened; nulls are skipped.
fn concat(args: &[Value]) -> Value {
    let mut out = String::new();
    for arg in args {
        push_text(&mut out, arg);
    }
    Value::String(out)
}

fn map_text(value: &Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::String(s) => Value::String(f(s)),
        other => Value::String(f(&other.to_string())),
    }
}

fn length(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::List(items) => Value::Int64(items.len() as i64),
        Value::String(s) => Value::Int64(s.chars().count() as i64),
        other => Value::Int64(other.to_string().chars().count() as i64),
    }
}

/// `substr(s, start[, len])`, 1-based and counted in characters.
fn substr(args: &[Value]) -> Result<Value> {
    if args.iter().any(Value::is_null) {
        return Ok(Value::Null);
    }
    let text = args[0].to_string();
    let position = |v: &Value| v.as_i64().ok_or_else(|| Error::cast(v, "int"));
    let start = (position(&args[1])?.max(1) - 1) as usize;
    let chars = text.chars().skip(start);
    let out: String = match args.get(2) {
        Some(len) => chars.take(position(len)?.max(0) as usize).collect(),
        None => chars.collect(),
    };
    Ok(Value::String(out))
}

pub(super) fn register(registry: &mut FeatureRegistry) {
    register_scalar(registry, &["||"], Arity::Exact(2), |args| Ok(concat(args)));
    register_scalar(registry, &["concat"], Arity::AtLeast(0), |args| Ok(concat(args)));
    register_scalar(registry, &["upper"], Arity::Exact(1), |args| Ok(map_text(&args[0], str::to_uppercase)));
    register_scalar(registry, &["lower"], Arity::Exact(1), |args| Ok(map_text(&args[0], str::to_lowercase)));
    register_scalar(registry, &["trim"], Arity::Exact(1), |args| Ok(map_text(&args[0], |s| s.trim().to_string())));
    register_scalar(registry, &["length"], Arity::Exact(1), |args| Ok(length(&args[0])));
    register_scalar(registry, &["substr"], Arity::Range(2, 3), substr);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;
    use crate::compiler::test_support::eval;

    #[tokio::test]
    async fn test_concat() {
        let expr = Expr::func("concat", vec![Expr::int(1), Expr::int(2), Expr::int(3), Expr::int(4)]);
        assert_eq!(eval(&expr, Value::Null).await, Ok(Value::from("1234")));
        let expr = Expr::concat(Expr::int(1), Expr::int(2));
        assert_eq!(eval(&expr, Value::Null).await, Ok(Value::from("12")));
        let expr = Expr::func("concat", vec![Expr::func("new_array", vec![Expr::string("a"), Expr::null()]), Expr::string("b")]);
        assert_eq!(eval(&expr, Value::Null).await, Ok(Value::from("ab")));
    }

    #[tokio::test]
    async fn test_case_and_trim() {
        let row = Value::from("  Mixed ");
        assert_eq!(eval(&Expr::func("upper", vec![Expr::this()]), row.clone()).await, Ok(Value::from("  MIXED ")));
        assert_eq!(eval(&Expr::func("lower", vec![Expr::this()]), row.clone()).await, Ok(Value::from("  mixed ")));
        assert_eq!(eval(&Expr::func("trim", vec![Expr::this()]), row.clone()).await, Ok(Value::from("Mixed")));
        assert_eq!(eval(&Expr::func("length", vec![Expr::this()]), row).await, Ok(Value::Int64(8)));
        assert_eq!(eval(&Expr::func("upper", vec![Expr::null()]), Value::Null).await, Ok(Value::Null));
    }

    #[tokio::test]
    async fn test_substr() {
        let s = || Expr::string("héllo world");
        assert_eq!(
            eval(&Expr::func("substr", vec![s(), Expr::int(2), Expr::int(4)]), Value::Null).await,
            Ok(Value::from("éllo"))
        );
        assert_eq!(
            eval(&Expr::func("substr", vec![s(), Expr::int(7)]), Value::Null).await,
            Ok(Value::from("world"))
        );
        let err = eval(&Expr::func("substr", vec![s()]), Value::Null).await.unwrap_err();
        assert!(matches!(err, Error::Arity { .. }));
    }
}
