//! Filter expression DSL for collection queries.
//!
//! Filters are plain immutable trees. Nothing is validated while a tree is
//! built; a malformed tree (an `and` below an `or`, or any `not`) is only
//! rejected when it is compiled into wire parameters.
//!
//! # Example
//!
//! ```
//! use atmyapp_api_rs::collections::FilterExpr;
//!
//! let filter = FilterExpr::and([
//!     FilterExpr::eq("name", "John Doe"),
//!     FilterExpr::gt("age", 30),
//! ]);
//! assert!(matches!(filter, FilterExpr::And { .. }));
//! ```

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A scalar value a field can be compared against.
///
/// Date-times render as ISO-8601 extended format with millisecond precision;
/// everything else renders in its natural string form.
///
/// In the serde form a date-time is wrapped as `{"$date": "<iso>"}`, so a plain
/// string that happens to look like a date stays a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Primitive {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    #[serde(with = "tagged_date")]
    DateTime(DateTime<Utc>),
}

mod tagged_date {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Tagged {
        #[serde(rename = "$date")]
        date: DateTime<Utc>,
    }

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        Tagged { date: *date }.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        Tagged::deserialize(deserializer).map(|tagged| tagged.date)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Bool(b) => write!(f, "{}", b),
            Primitive::Int(n) => write!(f, "{}", n),
            Primitive::Float(n) if n.is_infinite() => {
                if n.is_sign_negative() {
                    write!(f, "-Infinity")
                } else {
                    write!(f, "Infinity")
                }
            }
            Primitive::Float(n) => write!(f, "{}", n),
            Primitive::DateTime(dt) => {
                write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Primitive::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Primitive {
    fn from(value: &str) -> Self {
        Primitive::String(value.to_string())
    }
}

impl From<String> for Primitive {
    fn from(value: String) -> Self {
        Primitive::String(value)
    }
}

impl From<&String> for Primitive {
    fn from(value: &String) -> Self {
        Primitive::String(value.clone())
    }
}

impl From<bool> for Primitive {
    fn from(value: bool) -> Self {
        Primitive::Bool(value)
    }
}

impl From<i32> for Primitive {
    fn from(value: i32) -> Self {
        Primitive::Int(i64::from(value))
    }
}

impl From<u32> for Primitive {
    fn from(value: u32) -> Self {
        Primitive::Int(i64::from(value))
    }
}

impl From<i64> for Primitive {
    fn from(value: i64) -> Self {
        Primitive::Int(value)
    }
}

impl From<u64> for Primitive {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(n) => Primitive::Int(n),
            Err(_) => Primitive::Float(value as f64),
        }
    }
}

impl From<f64> for Primitive {
    fn from(value: f64) -> Self {
        Primitive::Float(value)
    }
}

impl From<DateTime<Utc>> for Primitive {
    fn from(value: DateTime<Utc>) -> Self {
        Primitive::DateTime(value)
    }
}

/// Comparison operators understood by the collections service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
}

impl Op {
    /// Every operator, in wire order.
    pub const ALL: [Op; 6] = [Op::Eq, Op::Lt, Op::Lte, Op::Gt, Op::Gte, Op::In];

    /// Returns the wire spelling of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "eq",
            Op::Lt => "lt",
            Op::Lte => "lte",
            Op::Gt => "gt",
            Op::Gte => "gte",
            Op::In => "in",
        }
    }

    /// Parses a wire spelling back into an operator.
    pub fn parse(s: &str) -> Option<Op> {
        Op::ALL.into_iter().find(|op| op.as_str() == s)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of a comparison: one value, or a list for `in`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    List(Vec<Primitive>),
    Single(Primitive),
}

impl FilterValue {
    /// Returns the values as a slice; a single value is a one-element slice.
    pub fn as_slice(&self) -> &[Primitive] {
        match self {
            FilterValue::List(values) => values,
            FilterValue::Single(value) => std::slice::from_ref(value),
        }
    }
}

/// A boolean predicate over collection entry fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FilterExpr {
    /// `field <op> value`.
    Comparison {
        field: String,
        op: Op,
        value: FilterValue,
    },

    /// Every condition must hold.
    And { conditions: Vec<FilterExpr> },

    /// At least one condition must hold.
    Or { conditions: Vec<FilterExpr> },

    /// Negation. Local evaluation only; the wire syntax has no NOT.
    Not { condition: Box<FilterExpr> },
}

impl FilterExpr {
    fn comparison(field: impl Into<String>, op: Op, value: FilterValue) -> Self {
        FilterExpr::Comparison {
            field: field.into(),
            op,
            value,
        }
    }

    /// `field == value`.
    pub fn eq(field: impl Into<String>, value: impl Into<Primitive>) -> Self {
        Self::comparison(field, Op::Eq, FilterValue::Single(value.into()))
    }

    /// `field < value`.
    pub fn lt(field: impl Into<String>, value: impl Into<Primitive>) -> Self {
        Self::comparison(field, Op::Lt, FilterValue::Single(value.into()))
    }

    /// `field <= value`.
    pub fn lte(field: impl Into<String>, value: impl Into<Primitive>) -> Self {
        Self::comparison(field, Op::Lte, FilterValue::Single(value.into()))
    }

    /// `field > value`.
    pub fn gt(field: impl Into<String>, value: impl Into<Primitive>) -> Self {
        Self::comparison(field, Op::Gt, FilterValue::Single(value.into()))
    }

    /// `field >= value`.
    pub fn gte(field: impl Into<String>, value: impl Into<Primitive>) -> Self {
        Self::comparison(field, Op::Gte, FilterValue::Single(value.into()))
    }

    /// `field` equals one of `values`.
    ///
    /// ```
    /// use atmyapp_api_rs::collections::{FilterExpr, Op};
    ///
    /// let filter = FilterExpr::is_in("id", ["a", "b"]);
    /// assert!(matches!(filter, FilterExpr::Comparison { op: Op::In, .. }));
    /// ```
    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Primitive>,
    {
        let values = values.into_iter().map(Into::into).collect();
        Self::comparison(field, Op::In, FilterValue::List(values))
    }

    /// Conjunction of `conditions`.
    pub fn and(conditions: impl IntoIterator<Item = FilterExpr>) -> Self {
        FilterExpr::And {
            conditions: conditions.into_iter().collect(),
        }
    }

    /// Disjunction of `conditions`.
    pub fn or(conditions: impl IntoIterator<Item = FilterExpr>) -> Self {
        FilterExpr::Or {
            conditions: conditions.into_iter().collect(),
        }
    }

    /// Negation of `condition`.
    pub fn not(condition: FilterExpr) -> Self {
        FilterExpr::Not {
            condition: Box::new(condition),
        }
    }
}
