//! Translation of command-line query arguments into [`ListOptions`].
//!
//! A condition is written `field.op=value`, for example `status.eq=done` or
//! `total.gte=100`. Values are typed the way they look: integers, floats,
//! `true`/`false`, and strings otherwise. Wrap a value in double quotes to
//! force a string (`code.eq="100"`). For `in`, the value is a comma-separated
//! list, optionally parenthesized: `tag.in=(a,b)`.

use atmyapp_api_rs::collections::{FilterExpr, FilterValue, ListOptions, Op, Primitive};

use super::{CommandError, Result};
use crate::cli::{OutputArgs, QueryArgs};

/// Parses a scalar value.
fn parse_primitive(raw: &str) -> Primitive {
    let raw = raw.trim();
    if let Some(quoted) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        return Primitive::String(quoted.to_string());
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Primitive::Int(n);
    }
    if let Ok(n) = raw.parse::<f64>() {
        if n.is_finite() {
            return Primitive::Float(n);
        }
    }
    match raw {
        "true" => Primitive::Bool(true),
        "false" => Primitive::Bool(false),
        _ => Primitive::String(raw.to_string()),
    }
}

/// Parses one `field.op=value` condition.
pub fn parse_condition(input: &str) -> Result<FilterExpr> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| CommandError::Query(format!("expected field.op=value, got '{}'", input)))?;
    let (field, op) = key
        .rsplit_once('.')
        .ok_or_else(|| CommandError::Query(format!("missing operator in '{}'", key)))?;
    if field.is_empty() {
        return Err(CommandError::Query(format!("missing field in '{}'", input)));
    }
    let op = Op::parse(op).ok_or_else(|| {
        CommandError::Query(format!(
            "unknown operator '{}' (expected eq, lt, lte, gt, gte or in)",
            op
        ))
    })?;

    let value = match op {
        Op::In => {
            let inner = value
                .strip_prefix('(')
                .and_then(|v| v.strip_suffix(')'))
                .unwrap_or(value);
            let values = if inner.is_empty() {
                Vec::new()
            } else {
                inner.split(',').map(parse_primitive).collect()
            };
            FilterValue::List(values)
        }
        _ => FilterValue::Single(parse_primitive(value)),
    };

    Ok(FilterExpr::Comparison {
        field: field.to_string(),
        op,
        value,
    })
}

/// Combines `--where` conditions (all must hold) with one `--any` group
/// (at least one must hold).
pub fn build_filter(where_: &[String], any: &[String]) -> Result<Option<FilterExpr>> {
    let mut parts = where_
        .iter()
        .map(|c| parse_condition(c))
        .collect::<Result<Vec<_>>>()?;

    if !any.is_empty() {
        let group = any
            .iter()
            .map(|c| parse_condition(c))
            .collect::<Result<Vec<_>>>()?;
        parts.push(FilterExpr::or(group));
    }

    Ok(match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => Some(FilterExpr::and(parts)),
    })
}

/// Parses `START:END`.
pub fn parse_range(input: &str) -> Result<(i64, i64)> {
    let invalid = || CommandError::Query(format!("expected START:END, got '{}'", input));
    let (start, end) = input.split_once(':').ok_or_else(invalid)?;
    let start = start.trim().parse().map_err(|_| invalid())?;
    let end = end.trim().parse().map_err(|_| invalid())?;
    Ok((start, end))
}

/// Applies format, preview key and plugins.
pub fn apply_output(mut options: ListOptions, output: &OutputArgs) -> ListOptions {
    if let Some(format) = output.format {
        options = options.format(format);
    }
    if let Some(preview_key) = &output.preview_key {
        options = options.preview_key(preview_key.as_str());
    }
    if !output.plugins.is_empty() {
        options = options.plugins(output.plugins.iter().map(String::as_str));
    }
    options
}

/// Builds list options from the command-line query arguments.
pub fn list_options(args: &QueryArgs) -> Result<ListOptions> {
    let mut options = ListOptions::new();
    if let Some(filter) = build_filter(&args.where_, &args.any)? {
        options = options.filter(filter);
    }
    if !args.select.is_empty() {
        options = options.select(args.select.clone());
    }
    if let Some(order) = &args.order {
        options = options.order(order.as_str());
    }
    if let Some(range) = &args.range {
        let (start, end) = parse_range(range)?;
        options = options.range(start, end);
    }
    options.limit = args.limit;
    options.offset = args.offset;
    Ok(apply_output(options, &args.output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use atmyapp_api_rs::collections::{Format, Select};

    #[test]
    fn test_parse_primitive_types() {
        assert_eq!(parse_primitive("100"), Primitive::Int(100));
        assert_eq!(parse_primitive("2.5"), Primitive::Float(2.5));
        assert_eq!(parse_primitive("true"), Primitive::Bool(true));
        assert_eq!(parse_primitive("done"), Primitive::from("done"));
        assert_eq!(parse_primitive("\"100\""), Primitive::from("100"));
        assert_eq!(parse_primitive("inf"), Primitive::from("inf"));
    }

    #[test]
    fn test_parse_condition() {
        assert_eq!(
            parse_condition("status.eq=done").unwrap(),
            FilterExpr::eq("status", "done")
        );
        assert_eq!(
            parse_condition("total.gte=100").unwrap(),
            FilterExpr::gte("total", 100)
        );
        assert_eq!(
            parse_condition("customer.name.eq=Ada").unwrap(),
            FilterExpr::eq("customer.name", "Ada")
        );
    }

    #[test]
    fn test_parse_condition_in_list() {
        assert_eq!(
            parse_condition("tag.in=(a,b,3)").unwrap(),
            FilterExpr::Comparison {
                field: "tag".to_string(),
                op: Op::In,
                value: FilterValue::List(vec![
                    Primitive::from("a"),
                    Primitive::from("b"),
                    Primitive::Int(3),
                ]),
            }
        );
        assert_eq!(
            parse_condition("tag.in=a,b").unwrap(),
            FilterExpr::is_in("tag", ["a", "b"])
        );
    }

    #[test]
    fn test_parse_condition_errors() {
        assert!(matches!(parse_condition("status"), Err(CommandError::Query(_))));
        assert!(matches!(parse_condition("status=done"), Err(CommandError::Query(_))));
        assert!(matches!(parse_condition("status.neq=done"), Err(CommandError::Query(_))));
        assert!(matches!(parse_condition(".eq=done"), Err(CommandError::Query(_))));
    }

    #[test]
    fn test_build_filter_combinations() {
        assert_eq!(build_filter(&[], &[]).unwrap(), None);

        let single = build_filter(&["status.eq=done".to_string()], &[]).unwrap();
        assert_eq!(single, Some(FilterExpr::eq("status", "done")));

        let combined = build_filter(
            &["total.gte=100".to_string()],
            &["status.eq=done".to_string(), "status.eq=open".to_string()],
        )
        .unwrap();
        assert_eq!(
            combined,
            Some(FilterExpr::and([
                FilterExpr::gte("total", 100),
                FilterExpr::or([
                    FilterExpr::eq("status", "done"),
                    FilterExpr::eq("status", "open"),
                ]),
            ]))
        );
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("0:9").unwrap(), (0, 9));
        assert!(parse_range("0-9").is_err());
        assert!(parse_range("a:b").is_err());
    }

    #[test]
    fn test_list_options_from_args() {
        let args = QueryArgs {
            where_: vec!["status.eq=done".to_string()],
            select: vec!["id".to_string(), "data".to_string()],
            order: Some("created.desc".to_string()),
            limit: Some(5),
            output: OutputArgs {
                format: Some(Format::Dictionary),
                preview_key: Some("pk".to_string()),
                plugins: vec!["markdown".to_string()],
            },
            ..QueryArgs::default()
        };
        let options = list_options(&args).unwrap();
        assert_eq!(options.filter, Some(FilterExpr::eq("status", "done")));
        assert_eq!(
            options.select,
            Some(Select::Columns(vec!["id".to_string(), "data".to_string()]))
        );
        assert_eq!(options.limit, Some(5));
        assert_eq!(options.format, Some(Format::Dictionary));
        assert_eq!(options.preview_key.as_deref(), Some("pk"));
        assert_eq!(options.plugins, Some(vec!["markdown".to_string()]));
    }
}
