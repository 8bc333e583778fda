//! Analytics endpoints: basic and custom event tracking.
//!
//! Tracking never fails the caller. Every outcome is reported as a `bool`, and
//! rejected or failed events are logged at `warn`.

use std::collections::BTreeMap;

use serde::de::IgnoredAny;
use serde::Serialize;

use crate::client::AtMyAppClient;

/// Most values a custom event may carry.
pub const MAX_EVENT_VALUES: usize = 20;

/// Largest total size, in UTF-8 bytes, of a custom event's values.
pub const MAX_EVENT_BYTES: usize = 5000;

/// Payload of a custom event.
///
/// Column data is sent as its values in column-name order, so both forms end
/// up as a positional list on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventData {
    Values(Vec<String>),
    Columns(BTreeMap<String, String>),
}

impl EventData {
    pub fn len(&self) -> usize {
        match self {
            EventData::Values(values) => values.len(),
            EventData::Columns(columns) => columns.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values in wire order.
    pub fn into_blobs(self) -> Vec<String> {
        match self {
            EventData::Values(values) => values,
            EventData::Columns(columns) => columns.into_values().collect(),
        }
    }
}

impl<S: Into<String>> From<Vec<S>> for EventData {
    fn from(values: Vec<S>) -> Self {
        EventData::Values(values.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for EventData {
    fn from(values: [S; N]) -> Self {
        EventData::Values(values.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EventData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        EventData::Columns(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<BTreeMap<String, String>> for EventData {
    fn from(columns: BTreeMap<String, String>) -> Self {
        EventData::Columns(columns)
    }
}

#[derive(Debug, Serialize)]
struct CustomEventBody {
    blobs: Vec<String>,
}

#[derive(Debug, Serialize)]
struct EmptyBody {}

/// Why a custom event was refused before sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventRejection {
    TooManyValues(usize),
    TooLarge(usize),
}

/// Checks the limits on a custom event and returns its wire values.
pub fn validate_event_data(data: EventData) -> Result<Vec<String>, EventRejection> {
    if data.len() > MAX_EVENT_VALUES {
        return Err(EventRejection::TooManyValues(data.len()));
    }
    let blobs = data.into_blobs();
    let size: usize = blobs.iter().map(String::len).sum();
    if size > MAX_EVENT_BYTES {
        return Err(EventRejection::TooLarge(size));
    }
    Ok(blobs)
}

impl AtMyAppClient {
    /// Records a basic event. POSTs an empty object to `/analytics/{event_id}`.
    pub async fn track_event(&self, event_id: &str) -> bool {
        match self
            .post_json::<IgnoredAny, _, _>(&["analytics", event_id], &EmptyBody {})
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(event = event_id, error = %e, "Failed to track basic event");
                false
            }
        }
    }

    /// Records a custom event with positional or column data.
    ///
    /// Events with more than [`MAX_EVENT_VALUES`] values, or whose values
    /// exceed [`MAX_EVENT_BYTES`] in total, are refused without a request.
    pub async fn track_custom_event(&self, event_id: &str, data: impl Into<EventData>) -> bool {
        let blobs = match validate_event_data(data.into()) {
            Ok(blobs) => blobs,
            Err(EventRejection::TooManyValues(count)) => {
                tracing::warn!(
                    event = event_id,
                    count,
                    max = MAX_EVENT_VALUES,
                    "Too many event data entries"
                );
                return false;
            }
            Err(EventRejection::TooLarge(size)) => {
                tracing::warn!(
                    event = event_id,
                    size,
                    max = MAX_EVENT_BYTES,
                    "Event data exceeds size limit"
                );
                return false;
            }
        };

        match self
            .post_json::<IgnoredAny, _, _>(&["analytics", event_id], &CustomEventBody { blobs })
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(event = event_id, error = %e, "Failed to track event");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_send_values_in_key_order() {
        let data: EventData = [("user_id", "12345"), ("action", "purchase")]
            .into_iter()
            .collect();
        assert_eq!(data.into_blobs(), vec!["purchase", "12345"]);
    }

    #[test]
    fn test_validate_value_count() {
        let data: Vec<String> = (0..21).map(|i| format!("value_{i}")).collect();
        assert_eq!(
            validate_event_data(data.into()),
            Err(EventRejection::TooManyValues(21))
        );

        let data: Vec<String> = (0..20).map(|i| format!("value_{i}")).collect();
        assert_eq!(validate_event_data(data.into()).unwrap().len(), 20);
    }

    #[test]
    fn test_validate_size_counts_utf8_bytes() {
        let data = EventData::from(["x".repeat(5001)]);
        assert_eq!(validate_event_data(data), Err(EventRejection::TooLarge(5001)));

        // 2500 two-byte characters
        let data = EventData::from(["é".repeat(2500)]);
        assert!(validate_event_data(data).is_ok());
        let data = EventData::from(["é".repeat(2501)]);
        assert_eq!(validate_event_data(data), Err(EventRejection::TooLarge(5002)));
    }
}
