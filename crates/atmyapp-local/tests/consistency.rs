//! Remote and local reads of the same entries must agree.
//!
//! The mock service below implements the wire semantics directly: it parses
//! the compiled parameters back into conditions and filters, orders and pages
//! its own copy of the entries. The local path evaluates the filter tree
//! against the same entries.

use std::cmp::Ordering;
use std::sync::Arc;

use atmyapp_api_rs::client::AtMyAppClient;
use atmyapp_api_rs::collections::{
    parse_conditions, FilterExpr, Format, ListOptions, ListResult, Op, QueryParams, RawEntry,
    WireCondition,
};
use atmyapp_local_rs::{
    ClientMode, CollectionsClient, CollectionsConfig, MemorySnapshotSource, NullSnapshotSource,
};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

// ==================== Reference Service ====================

struct ReferenceService {
    entries: Vec<RawEntry>,
}

fn field_string(entry: &RawEntry, field: &str) -> Option<String> {
    match field {
        "id" => Some(entry.id.to_string()),
        "created" => entry.created_at.clone(),
        "updated" => entry.updated_at.clone(),
        _ => match entry.data.get(field)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        },
    }
}

fn compare_wire(left: &str, right: &str) -> Ordering {
    match (left.parse::<f64>(), right.parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => left.cmp(right),
    }
}

/// A missing field never equals anything and sorts before every value.
fn condition_holds(entry: &RawEntry, condition: &WireCondition) -> bool {
    let actual = field_string(entry, &condition.field);
    let ordering = || match &actual {
        Some(actual) => compare_wire(actual, &condition.value),
        None => Ordering::Less,
    };
    match condition.op {
        Op::Eq => actual.as_deref() == Some(condition.value.as_str()),
        Op::In => actual
            .as_deref()
            .is_some_and(|actual| condition.values().contains(&actual)),
        Op::Lt => ordering() == Ordering::Less,
        Op::Lte => ordering() != Ordering::Greater,
        Op::Gt => ordering() == Ordering::Greater,
        Op::Gte => ordering() != Ordering::Less,
    }
}

/// Inclusive `start,end` window; negative bounds clamp to 0.
fn parse_range(range: &str) -> Option<(usize, usize)> {
    let (start, end) = range.split_once(',')?;
    let start: i64 = start.trim().parse().ok()?;
    let end: i64 = end.trim().parse().ok()?;
    Some((start.max(0) as usize, (end + 1).max(0) as usize))
}

impl Respond for ReferenceService {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let params: QueryParams = request
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let (and_conditions, or_groups) = parse_conditions(&params);

        let mut matched: Vec<RawEntry> = self
            .entries
            .iter()
            .filter(|e| and_conditions.iter().all(|c| condition_holds(e, c)))
            .filter(|e| {
                or_groups
                    .iter()
                    .all(|group| group.iter().any(|c| condition_holds(e, c)))
            })
            .cloned()
            .collect();
        let total = matched.len();

        if let Some(order) = params.get("order") {
            let (column, dir) = order.split_once('.').unwrap_or((order, "asc"));
            matched.sort_by(|a, b| {
                let ordering = field_string(a, column).cmp(&field_string(b, column));
                if dir == "desc" {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        let page: Vec<RawEntry> = match params.get("range").and_then(parse_range) {
            Some((start, end)) => matched
                .into_iter()
                .skip(start)
                .take(end.saturating_sub(start))
                .collect(),
            None => {
                let offset: usize = params.get("offset").and_then(|o| o.parse().ok()).unwrap_or(0);
                let limit: usize = params
                    .get("limit")
                    .and_then(|l| l.parse().ok())
                    .unwrap_or(usize::MAX);
                matched.into_iter().skip(offset).take(limit).collect()
            }
        };

        ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"entries": page, "total": total}
        }))
    }
}

// ==================== Test Helpers ====================

fn entries() -> Vec<RawEntry> {
    vec![
        RawEntry::new("o-1", json!({"status": "done", "total": 150, "tag": "a"}))
            .created_at("2024-01-03T00:00:00Z"),
        RawEntry::new("o-2", json!({"status": "open", "total": 90, "tag": "b"}))
            .created_at("2024-01-01T00:00:00Z"),
        RawEntry::new("o-3", json!({"status": "done", "total": 320, "tag": "c"}))
            .created_at("2024-01-05T00:00:00Z"),
        RawEntry::new("o-4", json!({"status": "cancelled", "total": 40, "tag": "a"}))
            .created_at("2024-01-02T00:00:00Z"),
        RawEntry::new("o-5", json!({"status": "done", "total": 99, "tag": "b"}))
            .created_at("2024-01-04T00:00:00Z"),
        RawEntry::new("o-6", json!({"status": "open", "total": 100}))
            .created_at("2024-01-06T00:00:00Z"),
    ]
}

async fn clients() -> (MockServer, CollectionsClient, CollectionsClient) {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/orders/entries"))
        .respond_with(ReferenceService { entries: entries() })
        .mount(&mock_server)
        .await;

    let remote = AtMyAppClient::with_base_url("test-key", mock_server.uri()).unwrap();
    let online = CollectionsClient::new(
        CollectionsConfig::new(ClientMode::Online),
        Some(remote),
        Arc::new(NullSnapshotSource),
    );
    let local = CollectionsClient::new(
        CollectionsConfig::new(ClientMode::Local),
        None,
        Arc::new(MemorySnapshotSource::new().with_collection("orders", entries())),
    );
    (mock_server, online, local)
}

async fn assert_same(options: ListOptions) {
    let (_server, online, local) = clients().await;
    let options = options.format(Format::DataWithMeta);

    let remote_rows: ListResult<Value> = online.list("orders", options.clone()).await.unwrap();
    let local_rows: ListResult<Value> = local.list("orders", options.clone()).await.unwrap();
    assert_eq!(remote_rows, local_rows, "options: {:?}", options);
}

// ==================== Consistency Tests ====================

#[tokio::test]
async fn test_and_filter_matches() {
    assert_same(ListOptions::new().filter(FilterExpr::and([
        FilterExpr::eq("status", "done"),
        FilterExpr::gte("total", 100),
    ])))
    .await;
}

#[tokio::test]
async fn test_or_group_matches() {
    assert_same(ListOptions::new().filter(FilterExpr::or([
        FilterExpr::eq("status", "open"),
        FilterExpr::lt("total", 50),
    ])))
    .await;
}

#[tokio::test]
async fn test_and_with_or_groups_matches() {
    assert_same(ListOptions::new().filter(FilterExpr::and([
        FilterExpr::is_in("tag", ["a", "b"]),
        FilterExpr::or([FilterExpr::eq("status", "done"), FilterExpr::gt("total", 95)]),
        FilterExpr::or([FilterExpr::lte("total", 150)]),
    ])))
    .await;
}

#[tokio::test]
async fn test_nested_or_flattens_the_same_way() {
    assert_same(ListOptions::new().filter(FilterExpr::or([
        FilterExpr::eq("status", "cancelled"),
        FilterExpr::or([FilterExpr::eq("id", "o-6"), FilterExpr::eq("tag", "c")]),
    ])))
    .await;
}

#[tokio::test]
async fn test_order_and_pagination_match() {
    assert_same(
        ListOptions::new()
            .filter(FilterExpr::gte("total", 90))
            .order("created.desc")
            .offset(1)
            .limit(3),
    )
    .await;
}

#[tokio::test]
async fn test_order_ascending_with_clamped_limit_matches() {
    assert_same(ListOptions::new().order("created").limit(1_000)).await;
}

#[tokio::test]
async fn test_missing_field_never_matches_either_side() {
    assert_same(ListOptions::new().filter(FilterExpr::is_in("tag", ["a", "b", "c"]))).await;
}

#[tokio::test]
async fn test_range_window_matches() {
    assert_same(ListOptions::new().order("created").range(1, 2)).await;
    assert_same(
        ListOptions::new()
            .filter(FilterExpr::eq("status", "done"))
            .order("created.desc")
            .range(0, 1),
    )
    .await;
}

#[tokio::test]
async fn test_range_past_the_end_matches() {
    assert_same(ListOptions::new().order("created").range(4, 20)).await;
    assert_same(ListOptions::new().order("created").range(8, 9)).await;
}

#[tokio::test]
async fn test_missing_field_sorts_first_in_ranges() {
    // o-6 has no tag
    assert_same(ListOptions::new().filter(FilterExpr::lt("tag", "b")).order("created")).await;
    assert_same(ListOptions::new().filter(FilterExpr::lte("tag", "a")).order("created")).await;
    assert_same(ListOptions::new().filter(FilterExpr::gt("tag", "a")).order("created")).await;
}
