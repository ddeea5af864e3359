//! Request and response models shared by all store implementations

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A retrieved document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub id: String,
    pub source: Value,
}

/// One page of a scroll (cursor) search
#[derive(Debug, Clone, Default)]
pub struct ScrollPage {
    /// Cursor to advance with; `None` when the store opened no cursor
    pub scroll_id: Option<String>,
    pub hits: Vec<Hit>,
}

impl ScrollPage {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Kind of a bulk operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    Index,
    Delete,
}

impl BulkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkAction::Index => "index",
            BulkAction::Delete => "delete",
        }
    }
}

/// A single operation inside a bulk request
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperation {
    Index { id: String, source: Value },
    Delete { id: String },
}

impl BulkOperation {
    pub fn id(&self) -> &str {
        match self {
            BulkOperation::Index { id, .. } | BulkOperation::Delete { id } => id,
        }
    }

    pub fn action(&self) -> BulkAction {
        match self {
            BulkOperation::Index { .. } => BulkAction::Index,
            BulkOperation::Delete { .. } => BulkAction::Delete,
        }
    }
}

/// Per-operation outcome of a bulk request, in request order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemResult {
    pub action: BulkAction,
    pub id: String,
    pub status: u16,
    pub error: Option<String>,
}

impl BulkItemResult {
    /// A delete of a missing document counts as success
    pub fn is_success(&self) -> bool {
        if self.error.is_some() && self.status != 404 {
            return false;
        }
        (200..300).contains(&self.status)
            || (self.action == BulkAction::Delete && self.status == 404)
    }
}

/// Outcome of deleting a single document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Outcome of a delete-by-query request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct DeleteByQueryOutcome {
    #[serde(default)]
    pub deleted: u64,
    #[serde(default)]
    pub version_conflicts: u64,
}
