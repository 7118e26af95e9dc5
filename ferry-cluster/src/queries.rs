//! Working-state query bodies and response parsing
//!
//! Each status count is a search with a cardinality aggregation over the
//! unique index+shard prefix of the document id, so retries of the same
//! shard collapse into one identity server-side.

use ferry_coordinator::ShardFilter;
use serde_json::{json, Value};

/// Painless script projecting a document id onto its shard identity: the
/// substring up to the second `__` delimiter, with the attempt suffix
/// dropped.
pub const UNIQUE_SHARD_ID_SCRIPT: &str = "def id = doc['_id'].value;\
int a = id.indexOf('__');\
int b = id.indexOf('__', a + 2);\
if (a > -1 && b > -1) { return id.substring(0, a) + '__' + id.substring(a + 2, b); }";

/// Aggregation name used by [`unique_shard_count_query`].
pub const UNIQUE_SHARD_AGG: &str = "unique_shard_count";

// Clauses shared by every filter: the setup sentinel is bookkeeping, and a
// document with successor items was split and is counted via its successors.
fn base_exclusions() -> Vec<Value> {
    vec![
        json!({ "match": { "_id": "shard_setup" } }),
        json!({ "exists": { "field": "successor_items" } }),
    ]
}

fn filter_query(filter: &ShardFilter) -> Value {
    let mut must: Vec<Value> = Vec::new();
    let mut must_not = base_exclusions();

    match filter {
        ShardFilter::All => {}
        ShardFilter::Completed => {
            must.push(json!({ "exists": { "field": "completedAt" } }));
        }
        ShardFilter::Incomplete => {
            must_not.push(json!({ "exists": { "field": "completedAt" } }));
        }
        ShardFilter::InProgress { now_epoch } => {
            must.push(json!({ "range": { "expiration": { "gte": now_epoch } } }));
            must_not.push(json!({ "exists": { "field": "completedAt" } }));
        }
        ShardFilter::Unclaimed { now_epoch } => {
            must.push(json!({ "range": { "expiration": { "lt": now_epoch } } }));
            must_not.push(json!({ "exists": { "field": "completedAt" } }));
        }
    }

    json!({ "bool": { "must": must, "must_not": must_not } })
}

/// Search body counting unique shard identities matching `filter`.
pub fn unique_shard_count_query(filter: &ShardFilter) -> Value {
    json!({
        "size": 0,
        "query": filter_query(filter),
        "aggs": {
            UNIQUE_SHARD_AGG: {
                "cardinality": {
                    "script": { "lang": "painless", "source": UNIQUE_SHARD_ID_SCRIPT }
                }
            }
        }
    })
}

/// Search body for the maximum `completedAt` across all completed documents.
pub fn max_completed_query() -> Value {
    json!({
        "size": 0,
        "query": { "exists": { "field": "completedAt" } },
        "aggs": { "max_completed": { "max": { "field": "completedAt" } } }
    })
}

/// Unique-shard count from a search response.
pub fn parse_unique_count(response: &Value) -> Option<u64> {
    response
        .get("aggregations")?
        .get(UNIQUE_SHARD_AGG)?
        .get("value")?
        .as_f64()
        .map(|v| v.round() as u64)
}

/// Max-`completedAt` epoch from a search response. The aggregation yields
/// `null` when no document matched.
pub fn parse_max_completed(response: &Value) -> Option<i64> {
    let value = response
        .get("aggregations")?
        .get("max_completed")?
        .get("value")?
        .as_f64()?;
    if value > 0.0 {
        Some(value as i64)
    } else {
        None
    }
}
