//! Wire data model for the collections endpoint.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::filter::{FilterExpr, Primitive};
use crate::error::{Error, Result};

/// Message used when a failed response carries no message of its own.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Collections request failed";

/// Identifier of a collection entry. The service uses both strings and numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryId {
    Int(i64),
    Str(String),
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryId::Int(n) => write!(f, "{}", n),
            EntryId::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        EntryId::Str(value.to_string())
    }
}

impl From<String> for EntryId {
    fn from(value: String) -> Self {
        EntryId::Str(value)
    }
}

impl From<i64> for EntryId {
    fn from(value: i64) -> Self {
        EntryId::Int(value)
    }
}

impl From<i32> for EntryId {
    fn from(value: i32) -> Self {
        EntryId::Int(i64::from(value))
    }
}

impl From<u32> for EntryId {
    fn from(value: u32) -> Self {
        EntryId::Int(i64::from(value))
    }
}

impl From<EntryId> for Primitive {
    fn from(value: EntryId) -> Self {
        match value {
            EntryId::Int(n) => Primitive::Int(n),
            EntryId::Str(s) => Primitive::String(s),
        }
    }
}

impl From<&EntryId> for Primitive {
    fn from(value: &EntryId) -> Self {
        value.clone().into()
    }
}

impl From<&EntryId> for Value {
    fn from(value: &EntryId) -> Self {
        match value {
            EntryId::Int(n) => Value::from(*n),
            EntryId::Str(s) => Value::String(s.clone()),
        }
    }
}

/// One row of a collection as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntry<T = Value> {
    /// Unique within the collection.
    pub id: EntryId,
    /// The entry payload.
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl<T> RawEntry<T> {
    /// Creates an entry without timestamps.
    pub fn new(id: impl Into<EntryId>, data: T) -> Self {
        Self {
            id: id.into(),
            data,
            created_at: None,
            updated_at: None,
        }
    }

    /// Sets the creation timestamp.
    pub fn created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = Some(created_at.into());
        self
    }

    /// Sets the update timestamp.
    pub fn updated_at(mut self, updated_at: impl Into<String>) -> Self {
        self.updated_at = Some(updated_at.into());
        self
    }

    /// Converts the payload, keeping id and timestamps.
    pub fn try_map_data<U, E>(self, f: impl FnOnce(T) -> std::result::Result<U, E>) -> std::result::Result<RawEntry<U>, E> {
        Ok(RawEntry {
            id: self.id,
            data: f(self.data)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// The `data` member of a successful response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntriesPage<T = Value> {
    #[serde(default = "Vec::new")]
    pub entries: Vec<RawEntry<T>>,
    /// Count matching the filter before pagination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl<T> EntriesPage<T> {
    /// Returns the reported total, or the number of returned entries when the
    /// service omitted it.
    pub fn total_or_len(&self) -> u64 {
        self.total.unwrap_or(self.entries.len() as u64)
    }
}

/// Response envelope of the collections endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T = Value> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<EntriesPage<T>>,
    /// Failure message; `{message}` objects are flattened to their message.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_error_message"
    )]
    pub error: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorPayload {
    Message(String),
    Object { message: Option<String> },
    Other(serde::de::IgnoredAny),
}

fn deserialize_error_message<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let payload = Option::<ErrorPayload>::deserialize(deserializer)?;
    Ok(payload.and_then(|p| match p {
        ErrorPayload::Message(message) => Some(message),
        ErrorPayload::Object { message } => message,
        ErrorPayload::Other(_) => None,
    }))
}

impl<T> ResponseEnvelope<T> {
    /// A successful envelope.
    pub fn ok(entries: Vec<RawEntry<T>>, total: u64) -> Self {
        Self {
            success: true,
            data: Some(EntriesPage {
                entries,
                total: Some(total),
            }),
            error: None,
        }
    }

    /// A failed envelope carrying `message`.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Returns true when the envelope reports success and carries data.
    pub fn is_ok(&self) -> bool {
        self.success && self.data.is_some()
    }

    /// Returns the failure message, falling back to a generic one.
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or(DEFAULT_FAILURE_MESSAGE)
    }

    /// Converts the envelope into its page, or an [`Error::Request`] with the
    /// failure message.
    pub fn into_page(self) -> Result<EntriesPage<T>> {
        match self {
            ResponseEnvelope {
                success: true,
                data: Some(page),
                ..
            } => Ok(page),
            failed => Err(Error::Request(failed.error_message().to_string())),
        }
    }
}

impl ResponseEnvelope<Value> {
    /// Decodes every entry payload into `T`.
    ///
    /// A payload that does not fit `T` turns the whole envelope into a failure,
    /// the same way a malformed response body would.
    pub fn decode<T: DeserializeOwned>(self) -> ResponseEnvelope<T> {
        let ResponseEnvelope {
            success,
            data,
            error,
        } = self;
        let Some(page) = data else {
            return ResponseEnvelope {
                success,
                data: None,
                error,
            };
        };

        let entries: std::result::Result<Vec<RawEntry<T>>, serde_json::Error> = page
            .entries
            .into_iter()
            .map(|entry| entry.try_map_data(serde_json::from_value))
            .collect();

        match entries {
            Ok(entries) => ResponseEnvelope {
                success,
                data: Some(EntriesPage {
                    entries,
                    total: page.total,
                }),
                error,
            },
            Err(e) => ResponseEnvelope::failure(format!("Malformed response: {}", e)),
        }
    }
}

/// Output representation of a list or single-record call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    /// Untransformed entries.
    #[serde(rename = "raw")]
    Raw,
    /// Entry payloads only.
    #[default]
    #[serde(rename = "data")]
    Data,
    /// Payloads keyed by stringified id.
    #[serde(rename = "dictionary")]
    Dictionary,
    /// Payloads plus the pre-pagination total.
    #[serde(rename = "dataWithMeta")]
    DataWithMeta,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Raw => "raw",
            Format::Data => "data",
            Format::Dictionary => "dictionary",
            Format::DataWithMeta => "dataWithMeta",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Format::Raw),
            "data" => Ok(Format::Data),
            "dictionary" => Ok(Format::Dictionary),
            "dataWithMeta" | "data-with-meta" => Ok(Format::DataWithMeta),
            other => Err(format!(
                "unknown format '{}' (expected raw, data, dictionary or dataWithMeta)",
                other
            )),
        }
    }
}

/// Column selection: either a raw `select` string or a list of columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Select {
    Raw(String),
    Columns(Vec<String>),
}

impl From<&str> for Select {
    fn from(value: &str) -> Self {
        Select::Raw(value.to_string())
    }
}

impl From<String> for Select {
    fn from(value: String) -> Self {
        Select::Raw(value)
    }
}

impl From<Vec<String>> for Select {
    fn from(value: Vec<String>) -> Self {
        Select::Columns(value)
    }
}

impl From<Vec<&str>> for Select {
    fn from(value: Vec<&str>) -> Self {
        Select::Columns(value.into_iter().map(str::to_string).collect())
    }
}

/// Options accepted by every list-style collections call.
///
/// `preview_key`, `plugins` and `format` never reach the query compiler; they
/// are consumed by the client before the request is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    pub select: Option<Select>,
    /// `column[.asc|.desc]`.
    pub order: Option<String>,
    /// Inclusive `(start, end)`; exclusive with `limit`/`offset`.
    pub range: Option<(i64, i64)>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub filter: Option<FilterExpr>,
    pub preview_key: Option<String>,
    pub plugins: Option<Vec<String>>,
    pub format: Option<Format>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, select: impl Into<Select>) -> Self {
        self.select = Some(select.into());
        self
    }

    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    pub fn range(mut self, start: i64, end: i64) -> Self {
        self.range = Some((start, end));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn filter(mut self, filter: FilterExpr) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn preview_key(mut self, preview_key: impl Into<String>) -> Self {
        self.preview_key = Some(preview_key.into());
        self
    }

    pub fn plugins<I, S>(mut self, plugins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plugins = Some(plugins.into_iter().map(Into::into).collect());
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Separates the output format from the rest of the options.
    pub fn split_format(mut self) -> (Format, ListOptions) {
        let format = self.format.take().unwrap_or_default();
        (format, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_id_display() {
        assert_eq!(EntryId::from("abc").to_string(), "abc");
        assert_eq!(EntryId::from(42).to_string(), "42");
    }

    #[test]
    fn test_entry_id_deserializes_both_shapes() {
        let ids: Vec<EntryId> = serde_json::from_value(json!([1, "two"])).unwrap();
        assert_eq!(ids, vec![EntryId::Int(1), EntryId::Str("two".to_string())]);
    }

    #[test]
    fn test_raw_entry_deserialize_camel_case_timestamps() {
        let entry: RawEntry = serde_json::from_value(json!({
            "id": "1",
            "data": {"t": "First"},
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-02T00:00:00Z",
            "extra": true
        }))
        .unwrap();
        assert_eq!(entry.id, EntryId::from("1"));
        assert_eq!(entry.created_at.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(entry.updated_at.as_deref(), Some("2024-01-02T00:00:00Z"));
    }

    #[test]
    fn test_envelope_error_string_shape() {
        let envelope: ResponseEnvelope =
            serde_json::from_value(json!({"success": false, "error": "Boom"})).unwrap();
        assert!(!envelope.is_ok());
        assert_eq!(envelope.error_message(), "Boom");
    }

    #[test]
    fn test_envelope_error_object_shape() {
        let envelope: ResponseEnvelope =
            serde_json::from_value(json!({"success": false, "error": {"message": "Nested"}}))
                .unwrap();
        assert_eq!(envelope.error.as_deref(), Some("Nested"));
    }

    #[test]
    fn test_envelope_error_missing_uses_generic_message() {
        let envelope: ResponseEnvelope =
            serde_json::from_value(json!({"success": false, "error": {"code": 7}})).unwrap();
        assert_eq!(envelope.error, None);
        assert_eq!(envelope.error_message(), DEFAULT_FAILURE_MESSAGE);
    }

    #[test]
    fn test_envelope_error_of_other_type_is_ignored() {
        for error in [json!(42), json!(["a", "b"]), json!(true)] {
            let envelope: ResponseEnvelope =
                serde_json::from_value(json!({"success": false, "error": error})).unwrap();
            assert_eq!(envelope.error, None);
        }
    }

    #[test]
    fn test_envelope_into_page() {
        let ok: ResponseEnvelope = ResponseEnvelope::ok(vec![RawEntry::new("1", json!({}))], 5);
        let page = ok.into_page().unwrap();
        assert_eq!(page.total, Some(5));

        let failed: ResponseEnvelope = ResponseEnvelope::failure("nope");
        let err = failed.into_page().unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }

    #[test]
    fn test_envelope_success_without_data_is_failure() {
        let envelope: ResponseEnvelope = serde_json::from_value(json!({"success": true})).unwrap();
        assert!(!envelope.is_ok());
        assert!(envelope.into_page().is_err());
    }

    #[test]
    fn test_page_total_defaults_to_len() {
        let page: EntriesPage = serde_json::from_value(json!({
            "entries": [{"id": 1, "data": {}}, {"id": 2, "data": {}}]
        }))
        .unwrap();
        assert_eq!(page.total_or_len(), 2);
    }

    #[test]
    fn test_decode_into_typed_rows() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Row {
            t: String,
        }

        let envelope: ResponseEnvelope =
            ResponseEnvelope::ok(vec![RawEntry::new("1", json!({"t": "First"}))], 1);
        let typed: ResponseEnvelope<Row> = envelope.decode();
        let page = typed.into_page().unwrap();
        assert_eq!(page.entries[0].data, Row { t: "First".to_string() });
    }

    #[test]
    fn test_decode_mismatch_becomes_failure() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Row {
            t: String,
        }

        let envelope: ResponseEnvelope =
            ResponseEnvelope::ok(vec![RawEntry::new("1", json!({"t": 5}))], 1);
        let typed: ResponseEnvelope<Row> = envelope.decode();
        assert!(!typed.success);
        assert!(typed.error_message().contains("Malformed response"));
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("raw".parse::<Format>().unwrap(), Format::Raw);
        assert_eq!("dataWithMeta".parse::<Format>().unwrap(), Format::DataWithMeta);
        assert!("table".parse::<Format>().is_err());
        assert_eq!(Format::default(), Format::Data);
    }

    #[test]
    fn test_split_format_strips_format() {
        let options = ListOptions::new().limit(3).format(Format::Dictionary);
        let (format, rest) = options.split_format();
        assert_eq!(format, Format::Dictionary);
        assert_eq!(rest.format, None);
        assert_eq!(rest.limit, Some(3));
    }
}
