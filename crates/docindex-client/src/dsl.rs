//! Elasticsearch query DSL encoder
//!
//! Isolated from [`FilterTree`] construction: the tree is data, this module
//! only renders it.

use crate::filter::FilterTree;
use serde_json::{json, Map, Value};

/// Render a filter as a non-scoring query (`constant_score`)
pub fn to_query(filter: &FilterTree) -> Value {
    json!({
        "constant_score": {
            "filter": to_clause(filter)
        }
    })
}

/// Request body for a sorted-by-`_doc` search page
pub fn to_search_body(filter: &FilterTree, size: usize) -> Value {
    json!({
        "size": size,
        "sort": ["_doc"],
        "query": to_query(filter),
    })
}

/// Request body for `_count` and `_delete_by_query`
pub fn to_query_body(filter: &FilterTree) -> Value {
    json!({ "query": to_query(filter) })
}

/// Render a single filter clause
pub fn to_clause(filter: &FilterTree) -> Value {
    match filter {
        FilterTree::MatchAll => json!({ "match_all": {} }),
        FilterTree::Equals { field, value } => json!({ "term": keyed(field, json!(value)) }),
        FilterTree::Exists { field } => json!({ "exists": { "field": field } }),
        FilterTree::NotExists { field } => json!({
            "bool": { "must_not": [ { "exists": { "field": field } } ] }
        }),
        FilterTree::Match { field, text } => json!({ "match": keyed(field, json!(text)) }),
        FilterTree::And(clauses) => json!({
            "bool": { "filter": clauses.iter().map(to_clause).collect::<Vec<_>>() }
        }),
    }
}

fn keyed(field: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(field.to_string(), value);
    Value::Object(map)
}
