//! Compilation of list options into wire query parameters.
//!
//! AND-ed comparisons become one key each (`status.eq=done`). Every top-level
//! OR group becomes one repeated `or` parameter whose value is a parenthesized,
//! comma-separated token list (`or=(a.eq.1,b.in.(x,y))`).

use super::filter::{FilterExpr, FilterValue, Op, Primitive};
use super::types::{ListOptions, Select};
use crate::error::QueryError;

/// Server-imposed cap on `limit`.
pub const MAX_LIMIT: i64 = 250;

/// Columns accepted by `order`.
pub const ORDERABLE_COLUMNS: [&str; 3] = ["id", "created", "updated"];

/// Columns accepted by `select`.
pub const SELECTABLE_COLUMNS: [&str; 4] = ["id", "data", "created", "updated"];

/// Keys `build_params` emits that are not filter comparisons.
const RESERVED_KEYS: [&str; 8] = [
    "select",
    "order",
    "range",
    "limit",
    "offset",
    "or",
    "plugins",
    "amaPreviewKey",
];

/// Ordered multi-map of query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing every existing value for the key.
    /// The key keeps the position of its first occurrence.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter().position(|(k, _)| *k == key) {
            Some(index) => {
                self.pairs[index].1 = value;
                let mut seen = 0usize;
                self.pairs.retain(|(k, _)| {
                    if *k == key {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
            }
            None => self.pairs.push((key, value)),
        }
    }

    /// Appends another value for `key`.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Returns the first value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns every value for `key`, in insertion order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Renders the parameters as an `application/x-www-form-urlencoded` string.
    pub fn to_query_string(&self) -> String {
        serde_urlencoded::to_string(&self.pairs).unwrap_or_default()
    }
}

impl FromIterator<(String, String)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

/// Filter parameters produced by [`compile_filter`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledFilter {
    /// `(field.op, value)` pairs; a repeated key keeps its first position and
    /// its last value.
    pub and_params: Vec<(String, String)>,
    /// One `(token,token,...)` string per OR group.
    pub or_params: Vec<String>,
}

/// Returns true if `field` may appear in a wire comparison (`^[A-Za-z0-9_]+$`).
pub fn is_valid_field_name(field: &str) -> bool {
    !field.is_empty() && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Renders a comparison value: `in` lists as `(v1,v2,...)`, scalars as-is.
fn render_value(op: Op, value: &FilterValue) -> String {
    if op == Op::In {
        let joined = value
            .as_slice()
            .iter()
            .map(Primitive::to_string)
            .collect::<Vec<_>>()
            .join(",");
        return format!("({})", joined);
    }
    match value {
        FilterValue::Single(v) => v.to_string(),
        // A list given to a scalar operator renders the way the service would
        // stringify an array.
        FilterValue::List(values) => values
            .iter()
            .map(Primitive::to_string)
            .collect::<Vec<_>>()
            .join(","),
    }
}

struct FilterCompiler {
    compiled: CompiledFilter,
    or_group: Vec<String>,
}

impl FilterCompiler {
    fn add_and_comparison(&mut self, field: &str, op: Op, value: &FilterValue) {
        if !is_valid_field_name(field) {
            return;
        }
        let key = format!("{}.{}", field, op);
        let rendered = render_value(op, value);
        match self.compiled.and_params.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = rendered,
            None => self.compiled.and_params.push((key, rendered)),
        }
    }

    fn add_or_token(&mut self, field: &str, op: Op, value: &FilterValue) {
        if !is_valid_field_name(field) {
            return;
        }
        self.or_group
            .push(format!("{}.{}.{}", field, op, render_value(op, value)));
    }

    fn collect(&mut self, expr: &FilterExpr, within_or: bool) -> Result<(), QueryError> {
        match expr {
            FilterExpr::Comparison { field, op, value } => {
                if within_or {
                    self.add_or_token(field, *op, value);
                } else {
                    self.add_and_comparison(field, *op, value);
                }
                Ok(())
            }
            FilterExpr::And { conditions } => {
                if within_or {
                    return Err(QueryError::AndInsideOr);
                }
                for condition in conditions {
                    self.collect(condition, false)?;
                }
                Ok(())
            }
            FilterExpr::Or { conditions } => {
                if within_or {
                    // Nested OR flattens into the enclosing group
                    for condition in conditions {
                        self.collect(condition, true)?;
                    }
                    return Ok(());
                }
                self.or_group.clear();
                for condition in conditions {
                    self.collect(condition, true)?;
                }
                if !self.or_group.is_empty() {
                    let group = format!("({})", self.or_group.join(","));
                    self.compiled.or_params.push(group);
                }
                self.or_group.clear();
                Ok(())
            }
            FilterExpr::Not { .. } => Err(QueryError::NotUnsupported),
        }
    }
}

/// Compiles a filter tree into AND parameters and OR groups.
///
/// Comparisons on invalid field names are dropped silently. An `and` below an
/// `or`, or any `not`, is an error.
pub fn compile_filter(filter: Option<&FilterExpr>) -> Result<CompiledFilter, QueryError> {
    let mut compiler = FilterCompiler {
        compiled: CompiledFilter::default(),
        or_group: Vec::new(),
    };
    if let Some(filter) = filter {
        compiler.collect(filter, false)?;
    }
    Ok(compiler.compiled)
}

/// Normalizes `select`: raw strings pass through, column lists are reduced to
/// [`SELECTABLE_COLUMNS`]. Returns `None` when nothing survives.
pub fn normalize_select(select: Option<&Select>) -> Option<String> {
    match select? {
        Select::Raw(raw) if raw.is_empty() => None,
        Select::Raw(raw) => Some(raw.clone()),
        Select::Columns(columns) => {
            let allowed: Vec<&str> = columns
                .iter()
                .map(String::as_str)
                .filter(|c| SELECTABLE_COLUMNS.contains(c))
                .collect();
            if allowed.is_empty() {
                None
            } else {
                Some(allowed.join(","))
            }
        }
    }
}

/// Normalizes `order` to `column` or `column.asc|desc`.
///
/// An unknown column drops the whole order; a missing or unknown direction
/// means ascending and is omitted.
pub fn normalize_order(order: Option<&str>) -> Option<String> {
    let order = order?;
    let mut parts = order.split('.');
    let column = parts.next().filter(|c| ORDERABLE_COLUMNS.contains(c))?;
    match parts.next() {
        Some(dir @ ("asc" | "desc")) => Some(format!("{}.{}", column, dir)),
        _ => Some(column.to_string()),
    }
}

/// Clamps `limit` into `[0, MAX_LIMIT]`.
pub fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(0, MAX_LIMIT)
}

/// Clamps `offset` to be non-negative.
pub fn clamp_offset(offset: i64) -> i64 {
    offset.max(0)
}

/// Rejects options that combine `range` with `limit` or `offset`.
pub fn check_pagination(options: &ListOptions) -> Result<(), QueryError> {
    if options.range.is_some() && (options.limit.is_some() || options.offset.is_some()) {
        return Err(QueryError::RangeWithLimitOffset);
    }
    Ok(())
}

/// Builds the query parameters for a list request.
///
/// Only the query-shaping fields of `options` are read; `preview_key`,
/// `plugins` and `format` are ignored here.
pub fn build_params(options: &ListOptions) -> Result<QueryParams, QueryError> {
    let mut params = QueryParams::new();

    if let Some(select) = normalize_select(options.select.as_ref()) {
        params.set("select", select);
    }
    if let Some(order) = normalize_order(options.order.as_deref()) {
        params.set("order", order);
    }

    check_pagination(options)?;
    if let Some((start, end)) = options.range {
        params.set("range", format!("{},{}", start, end));
    }
    if let Some(limit) = options.limit {
        params.set("limit", clamp_limit(limit).to_string());
    }
    if let Some(offset) = options.offset {
        params.set("offset", clamp_offset(offset).to_string());
    }

    let compiled = compile_filter(options.filter.as_ref())?;
    for (key, value) in compiled.and_params {
        params.set(key, value);
    }
    for group in compiled.or_params {
        params.append("or", group);
    }

    Ok(params)
}

/// A comparison as it appears on the wire: field, operator and raw value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireCondition {
    pub field: String,
    pub op: Op,
    /// Rendered value; `(v1,v2,...)` for `in`.
    pub value: String,
}

impl WireCondition {
    /// Splits an `in` value into its members. Scalars yield themselves.
    pub fn values(&self) -> Vec<&str> {
        match self.op {
            Op::In => {
                let inner = self
                    .value
                    .strip_prefix('(')
                    .and_then(|v| v.strip_suffix(')'))
                    .unwrap_or(&self.value);
                if inner.is_empty() {
                    Vec::new()
                } else {
                    inner.split(',').collect()
                }
            }
            _ => vec![self.value.as_str()],
        }
    }

    /// Parses an AND parameter (`field.op` = `value`).
    pub fn from_and_param(key: &str, value: &str) -> Option<Self> {
        let (field, op) = key.split_once('.')?;
        Some(Self {
            field: field.to_string(),
            op: Op::parse(op)?,
            value: value.to_string(),
        })
    }

    /// Parses an OR token (`field.op.value`).
    pub fn from_or_token(token: &str) -> Option<Self> {
        let (field, rest) = token.split_once('.')?;
        let (op, value) = rest.split_once('.')?;
        Some(Self {
            field: field.to_string(),
            op: Op::parse(op)?,
            value: value.to_string(),
        })
    }
}

/// Splits an OR group `(t1,t2,...)` into its tokens, keeping `in` lists whole.
pub fn split_or_group(group: &str) -> Vec<&str> {
    let inner = group
        .strip_prefix('(')
        .and_then(|g| g.strip_suffix(')'))
        .unwrap_or(group);

    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in inner.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                tokens.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < inner.len() {
        tokens.push(&inner[start..]);
    }
    tokens
}

/// Recovers the filter conditions carried by a parameter list: the AND-ed
/// conditions and one condition list per OR group.
pub fn parse_conditions(params: &QueryParams) -> (Vec<WireCondition>, Vec<Vec<WireCondition>>) {
    let and_conditions = params
        .iter()
        .filter(|(k, _)| !RESERVED_KEYS.contains(k))
        .filter_map(|(k, v)| WireCondition::from_and_param(k, v))
        .collect();

    let or_groups = params
        .get_all("or")
        .into_iter()
        .map(|group| {
            split_or_group(group)
                .into_iter()
                .filter_map(WireCondition::from_or_token)
                .collect()
        })
        .collect();

    (and_conditions, or_groups)
}
