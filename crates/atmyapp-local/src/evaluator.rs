//! In-memory evaluation of collection queries against snapshot entries.
//!
//! The pipeline is filter, then order, then pagination, with the same
//! normalization the query compiler applies before a request goes out. The
//! reported total is the number of entries left after filtering.
//!
//! # Example
//!
//! ```
//! use atmyapp_api_rs::collections::{FilterExpr, ListOptions, RawEntry};
//! use atmyapp_local_rs::evaluator::evaluate;
//! use serde_json::json;
//!
//! let entries = vec![
//!     RawEntry::new("1", json!({"status": "done", "total": 150})),
//!     RawEntry::new("2", json!({"status": "open", "total": 90})),
//! ];
//! let options = ListOptions::new().filter(FilterExpr::eq("status", "done"));
//! let page = evaluate(entries, &options).unwrap();
//! assert_eq!(page.entries.len(), 1);
//! assert_eq!(page.total, Some(1));
//! ```

use std::borrow::Cow;
use std::cmp::Ordering;

use atmyapp_api_rs::collections::{
    check_pagination, clamp_limit, clamp_offset, normalize_order, EntriesPage, FilterExpr,
    FilterValue, ListOptions, Op, Primitive,
};
use atmyapp_api_rs::error::QueryError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::source::SnapshotEntry;

/// Evaluates a filter tree against snapshot entries.
///
/// Unlike the query compiler, the evaluator accepts every tree: `not` negates
/// and `and` may appear below `or`.
#[derive(Debug)]
pub struct FilterEvaluator<'a> {
    filter: &'a FilterExpr,
}

impl<'a> FilterEvaluator<'a> {
    pub fn new(filter: &'a FilterExpr) -> Self {
        Self { filter }
    }

    /// Returns true if the entry matches the filter.
    pub fn matches(&self, entry: &SnapshotEntry) -> bool {
        self.evaluate_filter(self.filter, entry)
    }

    /// Filters entries, keeping those that match.
    pub fn filter_entries(&self, entries: Vec<SnapshotEntry>) -> Vec<SnapshotEntry> {
        entries.into_iter().filter(|e| self.matches(e)).collect()
    }

    fn evaluate_filter(&self, filter: &FilterExpr, entry: &SnapshotEntry) -> bool {
        match filter {
            FilterExpr::Comparison { field, op, value } => {
                self.evaluate_comparison(entry, field, *op, value)
            }
            FilterExpr::And { conditions } => {
                conditions.iter().all(|c| self.evaluate_filter(c, entry))
            }
            FilterExpr::Or { conditions } => {
                conditions.iter().any(|c| self.evaluate_filter(c, entry))
            }
            FilterExpr::Not { condition } => !self.evaluate_filter(condition, entry),
        }
    }

    fn evaluate_comparison(&self, entry: &SnapshotEntry, field: &str, op: Op, value: &FilterValue) -> bool {
        let resolved = resolve_field(entry, field);
        let resolved = resolved.as_deref();
        let by_string = field == "id";

        match op {
            Op::Eq => match value {
                FilterValue::Single(expected) => values_equal(resolved, expected, by_string),
                FilterValue::List(_) => false,
            },
            Op::In => value
                .as_slice()
                .iter()
                .any(|expected| values_equal(resolved, expected, by_string)),
            Op::Lt => compare_to_filter(resolved, value) == Ordering::Less,
            Op::Lte => compare_to_filter(resolved, value) != Ordering::Greater,
            Op::Gt => compare_to_filter(resolved, value) == Ordering::Greater,
            Op::Gte => compare_to_filter(resolved, value) != Ordering::Less,
        }
    }
}

/// Resolves `field` on an entry.
///
/// `id`, `created`/`createdAt` and `updated`/`updatedAt` read the entry itself;
/// anything else is a dotted path into `data`, with an optional leading
/// `data.` stripped.
pub fn resolve_field<'e>(entry: &'e SnapshotEntry, field: &str) -> Option<Cow<'e, Value>> {
    match field {
        "id" => Some(Cow::Owned(Value::from(&entry.id))),
        "created" | "createdAt" => entry
            .created_at
            .as_ref()
            .map(|s| Cow::Owned(Value::String(s.clone()))),
        "updated" | "updatedAt" => entry
            .updated_at
            .as_ref()
            .map(|s| Cow::Owned(Value::String(s.clone()))),
        _ => {
            let path = field.strip_prefix("data.").unwrap_or(field);
            let mut current = &entry.data;
            for part in path.split('.') {
                current = match current {
                    Value::Object(map) => map.get(part)?,
                    Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                    _ => return None,
                };
            }
            Some(Cow::Borrowed(current))
        }
    }
}

/// Comparable view of a field value or filter operand.
#[derive(Debug, Clone, PartialEq)]
enum Operand<'v> {
    Null,
    Bool(bool),
    Number(f64),
    Str(Cow<'v, str>),
    Date(DateTime<Utc>),
    /// Arrays and objects, by their string form.
    Other(String),
}

impl<'v> Operand<'v> {
    fn from_value(value: Option<&'v Value>) -> Self {
        match value {
            None | Some(Value::Null) => Operand::Null,
            Some(Value::Bool(b)) => Operand::Bool(*b),
            Some(Value::Number(n)) => n.as_f64().map_or(Operand::Null, Operand::Number),
            Some(Value::String(s)) => Operand::Str(Cow::Borrowed(s)),
            Some(other) => Operand::Other(value_string_form(other)),
        }
    }

    fn from_primitive(value: &'v Primitive) -> Self {
        match value {
            Primitive::Bool(b) => Operand::Bool(*b),
            Primitive::Int(n) => Operand::Number(*n as f64),
            Primitive::Float(n) => Operand::Number(*n),
            Primitive::DateTime(dt) => Operand::Date(*dt),
            Primitive::String(s) => Operand::Str(Cow::Borrowed(s)),
        }
    }

    fn string_form(&self) -> Cow<'_, str> {
        match self {
            Operand::Null => Cow::Borrowed("null"),
            Operand::Bool(b) => Cow::Owned(b.to_string()),
            Operand::Number(n) => Cow::Owned(Primitive::Float(*n).to_string()),
            Operand::Str(s) => Cow::Borrowed(s),
            Operand::Date(dt) => Cow::Owned(dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Operand::Other(s) => Cow::Borrowed(s),
        }
    }
}

/// String form of a JSON value: arrays join their members with commas,
/// objects render as `[object Object]`.
fn value_string_form(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n
            .as_f64()
            .map(|f| Primitive::Float(f).to_string())
            .unwrap_or_else(|| n.to_string()),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_string_form)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Parses ISO-8601 date-times (with offset, without offset as UTC) and plain
/// `YYYY-MM-DD` dates.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Approximates locale collation: case-insensitive first, then lowercase
/// before uppercase at the first differing character.
pub fn collate(a: &str, b: &str) -> Ordering {
    let primary = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    if primary != Ordering::Equal {
        return primary;
    }

    for (ca, cb) in a.chars().zip(b.chars()) {
        if ca != cb {
            return match (ca.is_lowercase(), cb.is_lowercase()) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => ca.cmp(&cb),
            };
        }
    }
    a.len().cmp(&b.len())
}

fn compare_operands(a: &Operand<'_>, b: &Operand<'_>) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    match (a, b) {
        (Operand::Null, _) => Ordering::Less,
        (_, Operand::Null) => Ordering::Greater,
        (Operand::Number(x), Operand::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Operand::Str(x), Operand::Str(y)) => match (parse_datetime(x), parse_datetime(y)) {
            (Some(dx), Some(dy)) => dx.cmp(&dy),
            _ => collate(x, y),
        },
        (Operand::Date(x), Operand::Date(y)) => x.cmp(y),
        (Operand::Date(x), Operand::Str(y)) => match parse_datetime(y) {
            Some(dy) => x.cmp(&dy),
            None => collate(&a.string_form(), y),
        },
        (Operand::Str(x), Operand::Date(y)) => match parse_datetime(x) {
            Some(dx) => dx.cmp(y),
            None => collate(x, &b.string_form()),
        },
        _ => collate(&a.string_form(), &b.string_form()),
    }
}

/// Total order used for range comparisons and sorting. Missing values sort
/// before everything else.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    compare_operands(&Operand::from_value(a), &Operand::from_value(b))
}

fn compare_to_filter(field: Option<&Value>, value: &FilterValue) -> Ordering {
    let left = Operand::from_value(field);
    let right = match value {
        FilterValue::Single(p) => Operand::from_primitive(p),
        FilterValue::List(items) => Operand::Other(
            items
                .iter()
                .map(Primitive::to_string)
                .collect::<Vec<_>>()
                .join(","),
        ),
    };
    compare_operands(&left, &right)
}

/// Strict typed equality. Numbers compare numerically and date-time operands
/// match strings naming the same instant. With `by_string` both sides compare
/// by their string form, so `eq("id", "7")` matches a numeric id 7.
fn values_equal(field: Option<&Value>, expected: &Primitive, by_string: bool) -> bool {
    let Some(field) = field else {
        return false;
    };

    if by_string {
        return match field {
            Value::Null => false,
            other => value_string_form(other) == expected.to_string(),
        };
    }

    match (field, expected) {
        (Value::String(s), Primitive::String(t)) => s == t,
        (Value::String(s), Primitive::DateTime(dt)) => parse_datetime(s) == Some(*dt),
        (Value::Number(n), Primitive::Int(i)) => match n.as_i64() {
            Some(m) => m == *i,
            None => n.as_f64() == Some(*i as f64),
        },
        (Value::Number(n), Primitive::Float(f)) => n.as_f64() == Some(*f),
        (Value::Bool(b), Primitive::Bool(c)) => b == c,
        _ => false,
    }
}

/// Keeps entries matching `filter`; no filter keeps everything.
pub fn apply_filter(entries: Vec<SnapshotEntry>, filter: Option<&FilterExpr>) -> Vec<SnapshotEntry> {
    match filter {
        Some(filter) => FilterEvaluator::new(filter).filter_entries(entries),
        None => entries,
    }
}

/// Stable sort by `id`, `created` or `updated`.
///
/// `order` is normalized first: an unknown column leaves the entries as they
/// are, and only `desc` sorts descending. Ties keep their input order in both
/// directions.
pub fn apply_order(mut entries: Vec<SnapshotEntry>, order: Option<&str>) -> Vec<SnapshotEntry> {
    let Some(order) = normalize_order(order) else {
        return entries;
    };
    let (column, descending) = match order.split_once('.') {
        Some((column, dir)) => (column.to_string(), dir == "desc"),
        None => (order, false),
    };

    entries.sort_by(|a, b| {
        let ordering = compare_values(
            resolve_field(a, &column).as_deref(),
            resolve_field(b, &column).as_deref(),
        );
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
    entries
}

/// Applies `range` (inclusive), or `offset` then `limit`, with the same
/// clamping the query compiler uses.
pub fn apply_pagination(entries: Vec<SnapshotEntry>, options: &ListOptions) -> Vec<SnapshotEntry> {
    let len = entries.len();

    if let Some((start, end)) = options.range {
        let start = usize::try_from(start.max(0)).unwrap_or(usize::MAX).min(len);
        let end = usize::try_from(end.saturating_add(1).max(0))
            .unwrap_or(usize::MAX)
            .min(len);
        if start >= end {
            return Vec::new();
        }
        return entries.into_iter().skip(start).take(end - start).collect();
    }

    let offset = options
        .offset
        .map(clamp_offset)
        .and_then(|o| usize::try_from(o).ok())
        .unwrap_or(0);
    let limit = options
        .limit
        .map(clamp_limit)
        .and_then(|l| usize::try_from(l).ok())
        .unwrap_or(usize::MAX);

    entries.into_iter().skip(offset).take(limit).collect()
}

/// Runs the full pipeline. `total` counts the filtered entries before
/// pagination.
///
/// Fails only when `range` is combined with `limit` or `offset`.
pub fn evaluate(entries: Vec<SnapshotEntry>, options: &ListOptions) -> Result<EntriesPage, QueryError> {
    check_pagination(options)?;

    let scanned = entries.len();
    let filtered = apply_filter(entries, options.filter.as_ref());
    let total = filtered.len() as u64;
    let ordered = apply_order(filtered, options.order.as_deref());
    let page = apply_pagination(ordered, options);

    tracing::debug!(scanned, matched = total, returned = page.len(), "Evaluated local query");

    Ok(EntriesPage {
        entries: page,
        total: Some(total),
    })
}

#[cfg(test)]
#[path = "evaluator_tests.rs"]
mod tests;
