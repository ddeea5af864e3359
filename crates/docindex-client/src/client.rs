//! DocumentStore trait: the unified interface for HTTP and in-memory stores

use serde_json::Value;

use crate::error::StoreResult;
use crate::filter::FilterTree;
use crate::models::{BulkItemResult, BulkOperation, DeleteByQueryOutcome, DeleteOutcome, ScrollPage};

/// Blocking client interface for a document index.
///
/// Implemented by:
/// - `HttpStore`: talks to an Elasticsearch-compatible server over HTTP
/// - `MemoryStore`: in-process, no network (for tests, benches, embedded use)
///
/// Every method is a potential suspension point; timeouts are the
/// implementation's concern.
pub trait DocumentStore: Send + Sync {
    /// Check whether an index exists
    fn index_exists(&self, index: &str) -> StoreResult<bool>;

    /// Create an index with the given mapping body (`{"properties": {...}}`)
    fn create_index(&self, index: &str, mapping: &Value) -> StoreResult<()>;

    /// Merge a mapping body into an existing index
    fn put_mapping(&self, index: &str, mapping: &Value) -> StoreResult<()>;

    /// Write a document, replacing any document with the same id
    fn index_document(&self, index: &str, id: &str, source: &Value, refresh: bool)
        -> StoreResult<()>;

    /// Delete a document by id
    fn delete_document(&self, index: &str, id: &str, refresh: bool) -> StoreResult<DeleteOutcome>;

    /// Check whether a document with this id exists
    fn document_exists(&self, index: &str, id: &str) -> StoreResult<bool>;

    /// Count documents matching a filter
    fn count(&self, index: &str, filter: &FilterTree) -> StoreResult<u64>;

    /// Delete every document matching a filter, proceeding past version conflicts
    fn delete_by_query(&self, index: &str, filter: &FilterTree, refresh: bool)
        -> StoreResult<DeleteByQueryOutcome>;

    /// Execute several operations in one request; results come back in request order
    fn bulk(&self, index: &str, operations: &[BulkOperation], refresh: bool)
        -> StoreResult<Vec<BulkItemResult>>;

    /// Open a scroll cursor and return its first page
    fn open_scroll(&self, index: &str, filter: &FilterTree, size: usize, keep_alive: &str)
        -> StoreResult<ScrollPage>;

    /// Advance a scroll cursor; an empty page means exhaustion
    fn next_scroll(&self, scroll_id: &str, keep_alive: &str) -> StoreResult<ScrollPage>;

    /// Release a scroll cursor. Releasing an unknown cursor is not an error.
    fn clear_scroll(&self, scroll_id: &str) -> StoreResult<()>;

    /// Whether `bulk` is available
    fn supports_bulk(&self) -> bool {
        true
    }
}
