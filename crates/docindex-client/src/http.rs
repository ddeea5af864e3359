//! HttpStore: client for an Elasticsearch-compatible server
//!
//! Uses the blocking reqwest client; each call is one HTTP round trip.

use std::collections::HashMap;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::client::DocumentStore;
use crate::dsl;
use crate::error::{StoreError, StoreResult};
use crate::filter::FilterTree;
use crate::models::{
    BulkAction, BulkItemResult, BulkOperation, DeleteByQueryOutcome, DeleteOutcome, Hit, ScrollPage,
};

/// Characters escaped in user-supplied path segments (index names, ids)
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'?')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Network store connecting to a running search server.
pub struct HttpStore {
    base_url: String,
    client: Client,
}

impl HttpStore {
    /// Create a store for the given base URL with a 30 second request timeout.
    ///
    /// # Example
    /// ```no_run
    /// # use docindex_client::HttpStore;
    /// let store = HttpStore::new("http://localhost:9200").unwrap();
    /// ```
    pub fn new(base_url: &str) -> StoreResult<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    /// Create a store with an explicit request timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(StoreError::from_transport)?;

        info!("HTTP document store at {}", base_url);

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn doc_url(&self, index: &str, id: &str, refresh: Option<bool>) -> String {
        let mut url = self.url(&format!("{}/_doc/{}", segment(index), segment(id)));
        if let Some(refresh) = refresh {
            url.push_str(&format!("?refresh={}", refresh));
        }
        url
    }

    fn send(request: reqwest::blocking::RequestBuilder) -> StoreResult<Response> {
        request.send().map_err(StoreError::from_transport)
    }

    fn check(response: Response) -> StoreResult<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().unwrap_or_default();
            Err(StoreError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    fn parse<T: DeserializeOwned>(response: Response) -> StoreResult<T> {
        let text = Self::check(response)?.text().map_err(StoreError::from_transport)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn exists(&self, url: String) -> StoreResult<bool> {
        let response = Self::send(self.client.head(url))?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            _ => Self::check(response).map(|_| true),
        }
    }

    fn search_page(response: SearchResponse) -> ScrollPage {
        ScrollPage {
            scroll_id: response.scroll_id,
            hits: response
                .hits
                .hits
                .into_iter()
                .map(|hit| Hit {
                    id: hit.id,
                    source: hit.source,
                })
                .collect(),
        }
    }
}

fn segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(rename = "_scroll_id")]
    scroll_id: Option<String>,
    hits: HitsEnvelope,
}

#[derive(Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source", default)]
    source: Value,
}

#[derive(Deserialize)]
struct BulkResponse {
    #[serde(default)]
    items: Vec<HashMap<String, RawBulkItem>>,
}

#[derive(Deserialize)]
struct RawBulkItem {
    #[serde(rename = "_id", default)]
    id: String,
    status: u16,
    #[serde(default)]
    error: Option<Value>,
}

/// Status recorded for an operation the bulk response has no item for
const MISSING_ITEM_STATUS: u16 = 500;

/// One result per operation, in request order. Operations without a
/// response item are failures.
fn bulk_results(operations: &[BulkOperation], response: BulkResponse) -> Vec<BulkItemResult> {
    let mut items = response.items.into_iter();
    operations
        .iter()
        .map(|op| {
            let raw = items.next().and_then(|item| item.into_iter().next());
            match raw {
                Some((key, raw)) => BulkItemResult {
                    action: if key == "delete" { BulkAction::Delete } else { BulkAction::Index },
                    id: if raw.id.is_empty() { op.id().to_string() } else { raw.id },
                    status: raw.status,
                    error: raw.error.as_ref().map(error_reason),
                },
                None => BulkItemResult {
                    action: op.action(),
                    id: op.id().to_string(),
                    status: MISSING_ITEM_STATUS,
                    error: Some("no item for operation in bulk response".to_string()),
                },
            }
        })
        .collect()
}

fn error_reason(error: &Value) -> String {
    error
        .get("reason")
        .and_then(|r| r.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}

impl DocumentStore for HttpStore {
    fn index_exists(&self, index: &str) -> StoreResult<bool> {
        self.exists(self.url(&segment(index)))
    }

    fn create_index(&self, index: &str, mapping: &Value) -> StoreResult<()> {
        let body = json!({ "mappings": mapping });
        let response = Self::send(self.client.put(self.url(&segment(index))).json(&body))?;
        Self::check(response)?;
        info!("Created index {}", index);
        Ok(())
    }

    fn put_mapping(&self, index: &str, mapping: &Value) -> StoreResult<()> {
        let url = self.url(&format!("{}/_mapping", segment(index)));
        let response = Self::send(self.client.put(url).json(mapping))?;
        Self::check(response)?;
        debug!("Applied mapping to index {}", index);
        Ok(())
    }

    fn index_document(&self, index: &str, id: &str, source: &Value, refresh: bool) -> StoreResult<()> {
        let url = self.doc_url(index, id, Some(refresh));
        let response = Self::send(self.client.put(url).json(source))?;
        Self::check(response)?;
        Ok(())
    }

    fn delete_document(&self, index: &str, id: &str, refresh: bool) -> StoreResult<DeleteOutcome> {
        let url = self.doc_url(index, id, Some(refresh));
        let response = Self::send(self.client.delete(url))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(DeleteOutcome::NotFound);
        }
        Self::check(response)?;
        Ok(DeleteOutcome::Deleted)
    }

    fn document_exists(&self, index: &str, id: &str) -> StoreResult<bool> {
        self.exists(self.doc_url(index, id, None))
    }

    fn count(&self, index: &str, filter: &FilterTree) -> StoreResult<u64> {
        let url = self.url(&format!("{}/_count", segment(index)));
        let response = Self::send(self.client.post(url).json(&dsl::to_query_body(filter)))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::IndexNotFound(index.to_string()));
        }
        let count: CountResponse = Self::parse(response)?;
        Ok(count.count)
    }

    fn delete_by_query(&self, index: &str, filter: &FilterTree, refresh: bool)
        -> StoreResult<DeleteByQueryOutcome> {
        let url = self.url(&format!(
            "{}/_delete_by_query?conflicts=proceed&refresh={}",
            segment(index),
            refresh
        ));
        let response = Self::send(self.client.post(url).json(&dsl::to_query_body(filter)))?;
        Self::parse(response)
    }

    fn bulk(&self, index: &str, operations: &[BulkOperation], refresh: bool)
        -> StoreResult<Vec<BulkItemResult>> {
        let mut body = String::new();
        for op in operations {
            let header = json!({ op.action().as_str(): { "_index": index, "_id": op.id() } });
            body.push_str(&serde_json::to_string(&header)?);
            body.push('\n');
            if let BulkOperation::Index { source, .. } = op {
                body.push_str(&serde_json::to_string(source)?);
                body.push('\n');
            }
        }

        let url = self.url(&format!("_bulk?refresh={}", refresh));
        let response = Self::send(
            self.client
                .post(url)
                .header("Content-Type", "application/x-ndjson")
                .body(body),
        )?;
        let parsed: BulkResponse = Self::parse(response)?;

        let results = bulk_results(operations, parsed);

        debug!("Bulk request with {} operations", operations.len());
        Ok(results)
    }

    fn open_scroll(&self, index: &str, filter: &FilterTree, size: usize, keep_alive: &str)
        -> StoreResult<ScrollPage> {
        let url = self.url(&format!("{}/_search?scroll={}", segment(index), segment(keep_alive)));
        let response = Self::send(self.client.post(url).json(&dsl::to_search_body(filter, size)))?;
        let parsed: SearchResponse = Self::parse(response)?;
        Ok(Self::search_page(parsed))
    }

    fn next_scroll(&self, scroll_id: &str, keep_alive: &str) -> StoreResult<ScrollPage> {
        let body = json!({ "scroll": keep_alive, "scroll_id": scroll_id });
        let response = Self::send(self.client.post(self.url("_search/scroll")).json(&body))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::UnknownScroll(scroll_id.to_string()));
        }
        let parsed: SearchResponse = Self::parse(response)?;
        Ok(Self::search_page(parsed))
    }

    fn clear_scroll(&self, scroll_id: &str) -> StoreResult<()> {
        let body = json!({ "scroll_id": [scroll_id] });
        let response = Self::send(self.client.delete(self.url("_search/scroll")).json(&body))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response)?;
        Ok(())
    }
}
