//! Response shaping: raw entries into the representation the caller asked for.

use indexmap::IndexMap;
use serde::Serialize;

use super::types::{Format, RawEntry};

/// Result of a list-style call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ListResult<Row> {
    /// Untransformed entries.
    Raw(Vec<RawEntry<Row>>),
    /// Entry payloads in entry order.
    Data(Vec<Row>),
    /// Payloads keyed by stringified id, in response order. A later duplicate
    /// id overwrites the value but keeps the first position.
    Dictionary(IndexMap<String, Row>),
    /// Payloads plus the pre-pagination total.
    DataWithMeta { rows: Vec<Row>, total: u64 },
}

impl<Row> ListResult<Row> {
    /// Number of rows carried.
    pub fn len(&self) -> usize {
        match self {
            ListResult::Raw(entries) => entries.len(),
            ListResult::Data(rows) | ListResult::DataWithMeta { rows, .. } => rows.len(),
            ListResult::Dictionary(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The total carried by `DataWithMeta`, if that is the shape.
    pub fn total(&self) -> Option<u64> {
        match self {
            ListResult::DataWithMeta { total, .. } => Some(*total),
            _ => None,
        }
    }

    /// Flattens any shape into its payloads.
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            ListResult::Raw(entries) => entries.into_iter().map(|e| e.data).collect(),
            ListResult::Data(rows) | ListResult::DataWithMeta { rows, .. } => rows,
            ListResult::Dictionary(map) => map.into_values().collect(),
        }
    }
}

/// Result of a single-record call. Absence is `None` in every shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SingleResult<Row> {
    Raw(Option<RawEntry<Row>>),
    Data(Option<Row>),
    Dictionary(Option<IndexMap<String, Row>>),
    DataWithMeta { row: Option<Row>, total: u64 },
}

impl<Row> SingleResult<Row> {
    pub fn is_none(&self) -> bool {
        match self {
            SingleResult::Raw(entry) => entry.is_none(),
            SingleResult::Data(row) | SingleResult::DataWithMeta { row, .. } => row.is_none(),
            SingleResult::Dictionary(map) => map.is_none(),
        }
    }

    /// Returns the payload, whatever the shape.
    pub fn into_row(self) -> Option<Row> {
        match self {
            SingleResult::Raw(entry) => entry.map(|e| e.data),
            SingleResult::Data(row) | SingleResult::DataWithMeta { row, .. } => row,
            SingleResult::Dictionary(map) => map.and_then(|m| m.into_values().next()),
        }
    }
}

/// Shapes a list of entries. `total` defaults to the number of entries.
pub fn shape_list<Row>(entries: Vec<RawEntry<Row>>, format: Format, total: Option<u64>) -> ListResult<Row> {
    match format {
        Format::Raw => ListResult::Raw(entries),
        Format::Dictionary => ListResult::Dictionary(
            entries
                .into_iter()
                .map(|e| (e.id.to_string(), e.data))
                .collect(),
        ),
        Format::DataWithMeta => {
            let total = total.unwrap_or(entries.len() as u64);
            ListResult::DataWithMeta {
                rows: entries.into_iter().map(|e| e.data).collect(),
                total,
            }
        }
        Format::Data => ListResult::Data(entries.into_iter().map(|e| e.data).collect()),
    }
}

/// Shapes a single, possibly absent, entry.
pub fn shape_single<Row>(entry: Option<RawEntry<Row>>, format: Format, total: u64) -> SingleResult<Row> {
    match format {
        Format::Raw => SingleResult::Raw(entry),
        Format::Dictionary => SingleResult::Dictionary(entry.map(|e| {
            let mut map = IndexMap::new();
            map.insert(e.id.to_string(), e.data);
            map
        })),
        Format::DataWithMeta => SingleResult::DataWithMeta {
            row: entry.map(|e| e.data),
            total,
        },
        Format::Data => SingleResult::Data(entry.map(|e| e.data)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn entries() -> Vec<RawEntry> {
        vec![
            RawEntry::new("1", json!({"t": "First"})),
            RawEntry::new("2", json!({"t": "Second"})),
        ]
    }

    #[test]
    fn test_shape_data() {
        let shaped = shape_list(entries(), Format::Data, None);
        assert_eq!(
            serde_json::to_value(&shaped).unwrap(),
            json!([{"t": "First"}, {"t": "Second"}])
        );
    }

    #[test]
    fn test_shape_dictionary() {
        let shaped = shape_list(entries(), Format::Dictionary, None);
        assert_eq!(
            serde_json::to_value(&shaped).unwrap(),
            json!({"1": {"t": "First"}, "2": {"t": "Second"}})
        );
    }

    #[test]
    fn test_shape_dictionary_last_duplicate_wins() {
        let mut list = entries();
        list.push(RawEntry::new("1", json!({"t": "Again"})));
        let shaped = shape_list(list, Format::Dictionary, None);
        let ListResult::Dictionary(map) = shaped else {
            panic!("Expected dictionary");
        };
        assert_eq!(map.len(), 2);
        assert_eq!(map["1"], json!({"t": "Again"}));
        assert_eq!(map.get_index_of("1"), Some(0));
    }

    #[test]
    fn test_shape_dictionary_keeps_response_order() {
        let list = vec![
            RawEntry::new("zeta", json!({"n": 1})),
            RawEntry::new("alpha", json!({"n": 2})),
            RawEntry::new("mid", json!({"n": 3})),
        ];
        let shaped = shape_list(list, Format::Dictionary, None);
        let ListResult::Dictionary(map) = &shaped else {
            panic!("Expected dictionary");
        };
        assert_eq!(map.keys().collect::<Vec<_>>(), ["zeta", "alpha", "mid"]);
        assert_eq!(
            serde_json::to_string(&shaped).unwrap(),
            r#"{"zeta":{"n":1},"alpha":{"n":2},"mid":{"n":3}}"#
        );
    }

    #[test]
    fn test_shape_dictionary_numeric_ids_are_stringified() {
        let list = vec![RawEntry::new(7, json!({"n": 1}))];
        let shaped = shape_list(list, Format::Dictionary, None);
        assert_eq!(serde_json::to_value(&shaped).unwrap(), json!({"7": {"n": 1}}));
    }

    #[test]
    fn test_shape_data_with_meta() {
        let shaped = shape_list(entries(), Format::DataWithMeta, Some(5));
        assert_eq!(
            serde_json::to_value(&shaped).unwrap(),
            json!({"rows": [{"t": "First"}, {"t": "Second"}], "total": 5})
        );
        assert_eq!(shaped.total(), Some(5));
    }

    #[test]
    fn test_shape_data_with_meta_total_defaults_to_len() {
        let shaped = shape_list(entries(), Format::DataWithMeta, None);
        assert_eq!(shaped.total(), Some(2));
    }

    #[test]
    fn test_shape_raw_passes_through() {
        let original = entries();
        let shaped = shape_list(original.clone(), Format::Raw, Some(9));
        assert_eq!(shaped, ListResult::Raw(original));
        assert_eq!(shaped.total(), None);
    }

    #[test]
    fn test_into_rows_from_every_shape() {
        for format in [Format::Raw, Format::Data, Format::Dictionary, Format::DataWithMeta] {
            let rows = shape_list(entries(), format, None).into_rows();
            assert_eq!(rows, vec![json!({"t": "First"}), json!({"t": "Second"})]);
        }
    }

    #[test]
    fn test_shape_single_absent() {
        for format in [Format::Raw, Format::Data, Format::Dictionary] {
            let shaped = shape_single::<Value>(None, format, 0);
            assert!(shaped.is_none());
            assert_eq!(serde_json::to_value(&shaped).unwrap(), Value::Null);
        }

        let shaped = shape_single::<Value>(None, Format::DataWithMeta, 3);
        assert_eq!(
            serde_json::to_value(&shaped).unwrap(),
            json!({"row": null, "total": 3})
        );
    }

    #[test]
    fn test_shape_single_present() {
        let entry = RawEntry::new("1", json!({"t": "First"}));

        let data = shape_single(Some(entry.clone()), Format::Data, 1);
        assert_eq!(serde_json::to_value(&data).unwrap(), json!({"t": "First"}));

        let dict = shape_single(Some(entry.clone()), Format::Dictionary, 1);
        assert_eq!(
            serde_json::to_value(&dict).unwrap(),
            json!({"1": {"t": "First"}})
        );

        let meta = shape_single(Some(entry.clone()), Format::DataWithMeta, 4);
        assert_eq!(
            serde_json::to_value(&meta).unwrap(),
            json!({"row": {"t": "First"}, "total": 4})
        );

        let raw = shape_single(Some(entry.clone()), Format::Raw, 1);
        assert_eq!(raw.into_row(), Some(json!({"t": "First"})));
    }
}
