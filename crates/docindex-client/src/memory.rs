//! MemoryStore: in-process document index
//!
//! Evaluates [`FilterTree`]s directly, no network needed. Scroll cursors
//! snapshot their matching hits when opened, so a scan observes the index as
//! it was at scan start.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rustc_hash::FxHashMap;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::client::DocumentStore;
use crate::error::{StoreError, StoreResult};
use crate::filter::FilterTree;
use crate::models::{
    BulkItemResult, BulkOperation, DeleteByQueryOutcome, DeleteOutcome, Hit, ScrollPage,
};

#[derive(Debug, Default)]
struct MemoryIndex {
    mapping: Value,
    /// Ordered by id so scans are deterministic
    documents: BTreeMap<String, Value>,
}

#[derive(Debug)]
struct ScrollCursor {
    size: usize,
    remaining: VecDeque<Hit>,
}

impl ScrollCursor {
    fn next_page(&mut self) -> Vec<Hit> {
        let take = self.size.min(self.remaining.len());
        self.remaining.drain(..take).collect()
    }
}

/// In-process store that keeps documents in memory.
///
/// Ideal for tests, benches and embedded use.
#[derive(Debug)]
pub struct MemoryStore {
    indices: RwLock<FxHashMap<String, MemoryIndex>>,
    scrolls: Mutex<FxHashMap<String, ScrollCursor>>,
    bulk_enabled: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            indices: RwLock::new(FxHashMap::default()),
            scrolls: Mutex::new(FxHashMap::default()),
            bulk_enabled: true,
        }
    }

    /// A store that reports no bulk capability
    pub fn without_bulk() -> Self {
        Self {
            bulk_enabled: false,
            ..Self::new()
        }
    }

    /// Number of scroll cursors not yet cleared
    pub fn open_scroll_count(&self) -> usize {
        self.scrolls().len()
    }

    /// Current mapping of an index
    pub fn mapping(&self, index: &str) -> Option<Value> {
        self.read().get(index).map(|idx| idx.mapping.clone())
    }

    /// Raw source of a stored document
    pub fn document(&self, index: &str, id: &str) -> Option<Value> {
        self.read().get(index).and_then(|idx| idx.documents.get(id).cloned())
    }

    fn read(&self) -> RwLockReadGuard<'_, FxHashMap<String, MemoryIndex>> {
        self.indices.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FxHashMap<String, MemoryIndex>> {
        self.indices.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn scrolls(&self) -> MutexGuard<'_, FxHashMap<String, ScrollCursor>> {
        self.scrolls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluate a filter against a document source
pub fn matches(filter: &FilterTree, source: &Value) -> bool {
    match filter {
        FilterTree::MatchAll => true,
        FilterTree::Equals { field, value } => match field_value(source, field) {
            Some(Value::String(s)) => s == value,
            Some(other) => other.to_string() == *value,
            None => false,
        },
        FilterTree::Exists { field } => field_value(source, field).is_some(),
        FilterTree::NotExists { field } => field_value(source, field).is_none(),
        FilterTree::Match { field, text } => match field_value(source, field) {
            Some(Value::String(s)) => {
                let indexed: HashSet<String> = tokens(s).collect();
                tokens(text).any(|t| indexed.contains(&t))
            }
            _ => false,
        },
        FilterTree::And(clauses) => clauses.iter().all(|c| matches(c, source)),
    }
}

/// Resolve a field; a dotted path such as `v.lang_en` walks into objects
fn field_value<'a>(source: &'a Value, field: &str) -> Option<&'a Value> {
    let value = match source.get(field) {
        Some(value) => value,
        None => field
            .split('.')
            .try_fold(source, |value, key| value.get(key))?,
    };
    if value.is_null() {
        None
    } else {
        Some(value)
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn merge_json(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                merge_json(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

impl DocumentStore for MemoryStore {
    fn index_exists(&self, index: &str) -> StoreResult<bool> {
        Ok(self.read().contains_key(index))
    }

    fn create_index(&self, index: &str, mapping: &Value) -> StoreResult<()> {
        let mut indices = self.write();
        if indices.contains_key(index) {
            return Err(StoreError::Status {
                status: 400,
                body: json!({ "error": { "type": "resource_already_exists_exception", "index": index } })
                    .to_string(),
            });
        }
        indices.insert(
            index.to_string(),
            MemoryIndex {
                mapping: mapping.clone(),
                documents: BTreeMap::new(),
            },
        );
        debug!("Created in-memory index {}", index);
        Ok(())
    }

    fn put_mapping(&self, index: &str, mapping: &Value) -> StoreResult<()> {
        let mut indices = self.write();
        let idx = indices
            .get_mut(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;
        merge_json(&mut idx.mapping, mapping);
        Ok(())
    }

    fn index_document(&self, index: &str, id: &str, source: &Value, _refresh: bool) -> StoreResult<()> {
        self.write()
            .entry(index.to_string())
            .or_default()
            .documents
            .insert(id.to_string(), source.clone());
        Ok(())
    }

    fn delete_document(&self, index: &str, id: &str, _refresh: bool) -> StoreResult<DeleteOutcome> {
        let removed = self
            .write()
            .get_mut(index)
            .and_then(|idx| idx.documents.remove(id));
        Ok(match removed {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        })
    }

    fn document_exists(&self, index: &str, id: &str) -> StoreResult<bool> {
        Ok(self
            .read()
            .get(index)
            .map_or(false, |idx| idx.documents.contains_key(id)))
    }

    fn count(&self, index: &str, filter: &FilterTree) -> StoreResult<u64> {
        let indices = self.read();
        let idx = indices
            .get(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;
        Ok(idx.documents.values().filter(|doc| matches(filter, doc)).count() as u64)
    }

    fn delete_by_query(&self, index: &str, filter: &FilterTree, _refresh: bool)
        -> StoreResult<DeleteByQueryOutcome> {
        let mut indices = self.write();
        let idx = indices
            .get_mut(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;
        let before = idx.documents.len();
        idx.documents.retain(|_, doc| !matches(filter, doc));
        Ok(DeleteByQueryOutcome {
            deleted: (before - idx.documents.len()) as u64,
            version_conflicts: 0,
        })
    }

    fn bulk(&self, index: &str, operations: &[BulkOperation], _refresh: bool)
        -> StoreResult<Vec<BulkItemResult>> {
        let mut indices = self.write();
        let idx = indices.entry(index.to_string()).or_default();

        let results = operations
            .iter()
            .map(|op| {
                let status = match op {
                    BulkOperation::Index { id, source } => {
                        match idx.documents.insert(id.clone(), source.clone()) {
                            Some(_) => 200,
                            None => 201,
                        }
                    }
                    BulkOperation::Delete { id } => match idx.documents.remove(id) {
                        Some(_) => 200,
                        None => 404,
                    },
                };
                BulkItemResult {
                    action: op.action(),
                    id: op.id().to_string(),
                    status,
                    error: None,
                }
            })
            .collect();

        Ok(results)
    }

    fn open_scroll(&self, index: &str, filter: &FilterTree, size: usize, _keep_alive: &str)
        -> StoreResult<ScrollPage> {
        let remaining: VecDeque<Hit> = {
            let indices = self.read();
            let idx = indices
                .get(index)
                .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;
            idx.documents
                .iter()
                .filter(|(_, doc)| matches(filter, doc))
                .map(|(id, doc)| Hit {
                    id: id.clone(),
                    source: doc.clone(),
                })
                .collect()
        };

        let mut cursor = ScrollCursor {
            size: size.max(1),
            remaining,
        };
        let hits = cursor.next_page();
        let scroll_id = Uuid::new_v4().to_string();
        self.scrolls().insert(scroll_id.clone(), cursor);

        debug!("Opened scroll {} on {} ({} hits in first page)", scroll_id, index, hits.len());

        Ok(ScrollPage {
            scroll_id: Some(scroll_id),
            hits,
        })
    }

    fn next_scroll(&self, scroll_id: &str, _keep_alive: &str) -> StoreResult<ScrollPage> {
        let mut scrolls = self.scrolls();
        let cursor = scrolls
            .get_mut(scroll_id)
            .ok_or_else(|| StoreError::UnknownScroll(scroll_id.to_string()))?;
        Ok(ScrollPage {
            scroll_id: Some(scroll_id.to_string()),
            hits: cursor.next_page(),
        })
    }

    fn clear_scroll(&self, scroll_id: &str) -> StoreResult<()> {
        self.scrolls().remove(scroll_id);
        Ok(())
    }

    fn supports_bulk(&self) -> bool {
        self.bulk_enabled
    }
}
