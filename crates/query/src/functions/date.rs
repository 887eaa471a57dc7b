//! `now([format])` and `date_format(value, format[, zone])`.
//!
//! Format strings use the `yyyy-MM-dd HH:mm:ss` pattern letters and are translated
//! to chrono's `strftime` syntax. The zone defaults to `QuerySettings::timezone`,
//! else the local zone.

use super::{compile_operands, map_values, Arity};
use crate::ast::Expr;
use crate::compiler::ValueMapper;
use crate::feature::{Feature, FeatureId, FeatureRegistry, QueryMetadata, ValueMapFeature};
use chrono::{DateTime, Local, Utc};
use chrono_tz::Tz;
use rivulet_core::cast::parse_datetime;
use rivulet_core::{Error, Number, Result, Value};
use std::sync::Arc;

#[derive(Clone, Copy, Debug)]
enum Zone {
    Local,
    Named(Tz),
}

impl Zone {
    fn parse(name: &str) -> Result<Zone> {
        name.parse::<Tz>()
            .map(Zone::Named)
            .map_err(|_| Error::cast(name, "timezone"))
    }

    fn from_settings(metadata: &QueryMetadata) -> Result<Zone> {
        match &metadata.settings().timezone {
            Some(name) => Zone::parse(name),
            None => Ok(Zone::Local),
        }
    }

    fn format(&self, millis: i64, pattern: &str) -> Result<String> {
        let utc = DateTime::<Utc>::from_timestamp_millis(millis)
            .ok_or_else(|| Error::cast(millis, "date"))?;
        let format = translate_pattern(pattern);
        Ok(match self {
            Zone::Local => utc.with_timezone(&Local).format(&format).to_string(),
            Zone::Named(tz) => utc.with_timezone(tz).format(&format).to_string(),
        })
    }
}

/// Translates `yyyy-MM-dd HH:mm:ss.SSS` style patterns to `strftime`.
///
/// Text in single quotes is copied literally; `''` is a quote.
pub(crate) fn translate_pattern(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }
        if c == '\'' {
            if run >= 2 {
                out.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            while i < chars.len() && chars[i] != '\'' {
                push_literal(&mut out, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }
        let spec = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('H', 1) => "%-H",
            ('H', _) => "%H",
            ('h', 1) => "%-I",
            ('h', _) => "%I",
            ('m', 1) => "%-M",
            ('m', _) => "%M",
            ('s', 1) => "%-S",
            ('s', _) => "%S",
            ('S', _) => "%3f",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('a', _) => "%p",
            ('Z', _) => "%z",
            ('X', _) => "%:z",
            ('z', _) => "%Z",
            _ => {
                for _ in 0..run {
                    push_literal(&mut out, c);
                }
                i += run;
                continue;
            }
        };
        out.push_str(spec);
        i += run;
    }
    out
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

fn epoch_millis(value: &Value) -> Result<i64> {
    match value {
        Value::DateTime(ms) => Ok(*ms),
        Value::String(s) => parse_datetime(s).ok_or_else(|| Error::cast(value, "date")),
        other => Number::from_value(other)
            .and_then(|n| n.to_i64())
            .ok_or_else(|| Error::cast(value, "date")),
    }
}

fn zone_argument(value: Option<&Value>, default: Zone) -> Result<Zone> {
    match value {
        None | Some(Value::Null) => Ok(default),
        Some(name) => Zone::parse(&name.to_string()),
    }
}

struct Now;

impl ValueMapFeature for Now {
    fn create_mapper(&self, expr: &Expr, metadata: &QueryMetadata) -> Result<ValueMapper> {
        let zone = Zone::from_settings(metadata)?;
        let mappers = compile_operands(expr, Arity::Range(0, 1), metadata)?;
        Ok(map_values(
            mappers,
            Arc::new(move |args: &[Value]| {
                let now = Utc::now().timestamp_millis();
                match args.first() {
                    None | Some(Value::Null) => Ok(Value::DateTime(now)),
                    Some(pattern) => Ok(Value::String(zone.format(now, &pattern.to_string())?)),
                }
            }),
        ))
    }
}

struct DateFormat;

impl ValueMapFeature for DateFormat {
    fn create_mapper(&self, expr: &Expr, metadata: &QueryMetadata) -> Result<ValueMapper> {
        let default_zone = Zone::from_settings(metadata)?;
        let mappers = compile_operands(expr, Arity::Range(2, 3), metadata)?;
        Ok(map_values(
            mappers,
            Arc::new(move |args: &[Value]| {
                if args[0].is_null() {
                    return Ok(Value::Null);
                }
                let zone = zone_argument(args.get(2), default_zone)?;
                let formatted = zone.format(epoch_millis(&args[0])?, &args[1].to_string())?;
                Ok(Value::String(formatted))
            }),
        ))
    }
}

pub(super) fn register(registry: &mut FeatureRegistry) {
    registry.register(FeatureId::value_map("now"), Feature::value_map(Now));
    registry.register(FeatureId::value_map("date_format"), Feature::value_map(DateFormat));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::test_support::{ctx_for, eval};
    use crate::settings::QuerySettings;

    #[test]
    fn test_translate_pattern() {
        assert_eq!(translate_pattern("yyyy-MM-dd"), "%Y-%m-%d");
        assert_eq!(translate_pattern("yyyy-MM-dd HH:mm:ss.SSS"), "%Y-%m-%d %H:%M:%S.%3f");
        assert_eq!(translate_pattern("yyyy'T'HH 100%"), "%YT%H 100%%");
        assert_eq!(translate_pattern("h:mm a"), "%-I:%M %p");
    }

    #[tokio::test]
    async fn test_date_format_with_zone() {
        // 2020-01-01T20:00:00Z is already Jan 2 in Shanghai
        let expr = Expr::func(
            "date_format",
            vec![Expr::this(), Expr::string("yyyy-MM-dd HH:mm"), Expr::string("Asia/Shanghai")],
        );
        let v = eval(&expr, Value::Int64(1_577_908_800_000)).await;
        assert_eq!(v, Ok(Value::from("2020-01-02 04:00")));

        let expr = Expr::func(
            "date_format",
            vec![Expr::string("2020-01-01 20:00:00"), Expr::string("yyyy/M/d"), Expr::string("UTC")],
        );
        assert_eq!(eval(&expr, Value::Null).await, Ok(Value::from("2020/1/1")));
    }

    #[tokio::test]
    async fn test_date_format_uses_settings_zone() {
        let metadata = QueryMetadata::new().with_settings(QuerySettings::default().with_timezone("Asia/Shanghai"));
        let expr = Expr::func("date_format", vec![Expr::this(), Expr::string("HH")]);
        let mapper = crate::compiler::compile_value(&expr, &metadata).unwrap();
        let v = mapper(&ctx_for(Value::DateTime(0))).await;
        assert_eq!(v, Ok(Value::from("08")));
    }

    #[tokio::test]
    async fn test_now() {
        let before = Utc::now().timestamp_millis();
        let v = eval(&Expr::func("now", vec![]), Value::Null).await.unwrap();
        let at = v.as_datetime().unwrap();
        assert!(at >= before);

        let expected = Utc::now().format("%Y").to_string();
        let expr = Expr::func("now", vec![Expr::string("yyyy")]);
        let metadata = QueryMetadata::new().with_settings(QuerySettings::default().with_timezone("UTC"));
        let mapper = crate::compiler::compile_value(&expr, &metadata).unwrap();
        assert_eq!(mapper(&ctx_for(Value::Null)).await, Ok(Value::String(expected)));
    }

    #[tokio::test]
    async fn test_invalid_zone() {
        let expr = Expr::func("date_format", vec![Expr::int(0), Expr::string("yyyy"), Expr::string("Mars/Base")]);
        assert!(matches!(eval(&expr, Value::Null).await, Err(Error::Cast { .. })));
    }
}
